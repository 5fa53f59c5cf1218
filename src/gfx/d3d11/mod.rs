//! Direct3D 11 后端
//!
//! - `api`：后端依赖的 D3D11/DXGI 调用集合
//! - `swapchain`：交换链与后备缓冲管理
//! - `backend`：生命周期与每帧流程
//! - `win32`：Windows 上的真实驱动
//! - `software`：模拟 COM 引用计数的软件驱动

pub mod api;
pub mod swapchain;
pub mod backend;
#[cfg(target_os = "windows")]
pub mod win32;
pub mod software;

pub use api::{D3d11Api, FeatureLevel, PixelFormat, SwapchainDesc, BUFFER_COUNT, PRESENT_INTERVAL};
pub use swapchain::{Backbuffer, SwapchainManager, ViewLease};
pub use backend::{D3d11Frame, Direct3D11Backend};
#[cfg(target_os = "windows")]
pub use win32::Win32D3d11;
pub use software::{DriverCall, ObjectKind, SoftwareD3d11, SoftwareD3d11Probe};
