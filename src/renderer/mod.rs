//! 渲染器模块
//!
//! 根据配置选择窗口实现和图形后端，并把它们交给 [`FrameDriver`] 运行。
//!
//! | 模式 | 窗口 | OpenGL 驱动 | Direct3D 11 驱动 |
//! |------|------|-------------|------------------|
//! | 桌面 | `WinitWindow` | `WgpuGl` | `Win32D3d11`（仅 Windows） |
//! | 无窗口 | `HeadlessWindow` | `SoftwareGl` | `SoftwareD3d11` |

pub mod frame_driver;

pub use frame_driver::{FrameDriver, FrameStats};

use tracing::info;

use crate::core::config::{BackendKind, Config};
use crate::core::error::Result;
use crate::gfx::backend::GraphicsBackend;
use crate::gfx::d3d11::{Direct3D11Backend, SoftwareD3d11};
use crate::gfx::opengl::{OpenGlBackend, SoftwareGl, WgpuGl};
use crate::platform::{HeadlessWindow, Window, WinitWindow};

/// 在给定窗口上运行后端，直到窗口关闭
pub fn run<W: Window, B: GraphicsBackend>(window: W, backend: B, config: &Config) -> Result<FrameStats> {
    let mut driver = FrameDriver::new(backend, config.graphics.background_color);
    window.run(&mut driver)?;
    Ok(driver.stats())
}

/// 按配置创建窗口与后端并运行
pub fn launch(config: &Config) -> Result<FrameStats> {
    let backend = config.graphics.backend;
    let debug_device = config.graphics.debug_device;

    info!(
        backend = backend.name(),
        owns_swapchain = backend.owns_swapchain(),
        headless = config.headless.enabled,
        debug_device,
        "Launching"
    );

    if config.headless.enabled {
        let window = HeadlessWindow::new(&config.window)
            .with_keyboards(config.headless.keyboards)
            .with_ticks(config.headless.frames);
        return match backend {
            BackendKind::OpenGl => run(window, OpenGlBackend::new(SoftwareGl::new(), debug_device), config),
            BackendKind::Direct3D11 => run(window, Direct3D11Backend::new(SoftwareD3d11::new(), debug_device), config),
        };
    }

    match backend {
        BackendKind::OpenGl => {
            let window = WinitWindow::create(&config.window)?;
            run(window, OpenGlBackend::new(WgpuGl::new(), debug_device), config)
        }
        #[cfg(target_os = "windows")]
        BackendKind::Direct3D11 => {
            let window = WinitWindow::create(&config.window)?;
            run(window, Direct3D11Backend::new(crate::gfx::d3d11::Win32D3d11::new(), debug_device), config)
        }
        #[cfg(not(target_os = "windows"))]
        BackendKind::Direct3D11 => Err(crate::core::error::GraphicsError::DeviceCreation(
            "Direct3D 11 backend is only available on Windows".to_string(),
        )
        .into()),
    }
}
