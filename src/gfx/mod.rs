//! 图形后端模块
//!
//! 本模块封装了两种呈现模型：
//! - OpenGL：呈现目标是窗口的默认帧缓冲，尺寸随窗口隐式变化
//! - Direct3D 11：显式管理 DXGI 交换链，尺寸变化需要重建缓冲
//!
//! 两个后端都实现了统一的 `GraphicsBackend` trait，并通过驱动 trait
//! （`GlApi` / `D3d11Api`）与真实驱动或软件驱动解耦。

pub mod backend;
pub mod debug;
pub mod opengl;
pub mod d3d11;

pub use backend::{BackendState, GraphicsBackend};
pub use debug::{DebugMessage, DebugMessageSink, DebugSeverity, TracingDebugSink};
pub use opengl::OpenGlBackend;
pub use d3d11::Direct3D11Backend;
