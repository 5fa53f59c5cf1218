//! 窗口平台层
//!
//! - `window`：窗口抽象、窗口状态与事件回调
//! - `winit_window`：基于 winit 的桌面窗口
//! - `headless`：按脚本驱动的无窗口实现，用于测试和 `--headless` 模式

pub mod window;
pub mod winit_window;
pub mod headless;

pub use window::{NativeSurface, Window, WindowContext, WindowHandler};
pub use winit_window::WinitWindow;
pub use headless::HeadlessWindow;
