//! OpenGL 后端
//!
//! - `api`：后端依赖的 GL 操作集合
//! - `backend`：生命周期与每帧流程
//! - `wgpu_gl`：通过 wgpu GL 后端实现的真实驱动
//! - `software`：只记录调用的软件驱动

pub mod api;
pub mod backend;
pub mod wgpu_gl;
pub mod software;

pub use api::GlApi;
pub use backend::{GlFrame, OpenGlBackend};
pub use wgpu_gl::WgpuGl;
pub use software::{SoftwareGl, SoftwareGlProbe};
