//! 窗口抽象
//!
//! 窗口拥有操作系统层面的句柄、尺寸、位置和标题，并按顺序发出
//! load / update / render / resize / input / close 生命周期事件。
//! 窗口本身不持有任何 GPU 资源。

use std::fmt;
use std::sync::Arc;

use crate::core::config::WindowConfig;
use crate::core::error::Result;
use crate::core::event::{Keyboard, KeyboardEvent};
use crate::core::math::{Extent2D, Position2D};

/// 图形后端绑定的原生表面
#[derive(Clone)]
pub enum NativeSurface {
    /// 由 winit 创建的真实窗口
    Winit(Arc<winit::window::Window>),
    /// 脚本化窗口，没有操作系统句柄
    Headless,
}

impl NativeSurface {
    /// 获取 winit 窗口（如果有）
    pub fn winit_window(&self) -> Option<&Arc<winit::window::Window>> {
        match self {
            NativeSurface::Winit(window) => Some(window),
            NativeSurface::Headless => None,
        }
    }
}

impl fmt::Debug for NativeSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeSurface::Winit(window) => write!(f, "NativeSurface::Winit({:?})", window.id()),
            NativeSurface::Headless => write!(f, "NativeSurface::Headless"),
        }
    }
}

/// 窗口状态
///
/// 在事件回调中以可变引用传递给 [`WindowHandler`]，
/// 回调通过它读取尺寸、枚举键盘或请求关闭。
#[derive(Debug)]
pub struct WindowContext {
    title: String,
    position: Position2D,
    framebuffer_size: Extent2D,
    closing: bool,
    surface: NativeSurface,
    keyboards: Vec<Keyboard>,
}

impl WindowContext {
    pub fn new(
        config: &WindowConfig,
        framebuffer_size: Extent2D,
        surface: NativeSurface,
        keyboards: Vec<Keyboard>,
    ) -> Self {
        Self {
            title: config.title.clone(),
            position: Position2D::new(config.x, config.y),
            framebuffer_size,
            closing: false,
            surface,
            keyboards,
        }
    }

    /// 构造一个没有系统句柄的窗口状态，带 `keyboards` 个模拟键盘
    pub fn headless(config: &WindowConfig, keyboards: u32) -> Self {
        let keyboards = (0..keyboards)
            .map(|i| Keyboard::new(i, format!("Virtual keyboard {}", i)))
            .collect();
        Self::new(
            config,
            Extent2D::new(config.width, config.height),
            NativeSurface::Headless,
            keyboards,
        )
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn position(&self) -> Position2D {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Position2D) {
        self.position = position;
    }

    /// 当前帧缓冲尺寸（像素）
    pub fn framebuffer_size(&self) -> Extent2D {
        self.framebuffer_size
    }

    pub(crate) fn set_framebuffer_size(&mut self, size: Extent2D) {
        self.framebuffer_size = size;
    }

    pub fn surface(&self) -> &NativeSurface {
        &self.surface
    }

    /// 当前连接的键盘
    pub fn keyboards(&self) -> &[Keyboard] {
        &self.keyboards
    }

    pub(crate) fn set_keyboards(&mut self, keyboards: Vec<Keyboard>) {
        self.keyboards = keyboards;
    }

    /// 请求关闭窗口
    ///
    /// 协作式：只设置标志，由事件循环在下一次迭代开始时检查，
    /// 不会打断正在进行的渲染。
    pub fn close(&mut self) {
        self.closing = true;
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }
}

/// 窗口事件回调
///
/// 所有回调都在事件循环线程上同步调用，不可重入。
pub trait WindowHandler {
    /// 窗口加载完成，只触发一次
    ///
    /// 返回错误视为致命错误，事件循环会立即结束。
    fn on_load(&mut self, window: &mut WindowContext) -> Result<()>;

    /// 每个 tick 在 `on_render` 之前调用
    fn on_update(&mut self, _window: &mut WindowContext, _delta_time: f64) {}

    /// 每个 tick 渲染一帧
    fn on_render(&mut self, window: &mut WindowContext, delta_time: f64);

    /// 帧缓冲尺寸变化，保证不会与渲染交错
    fn on_framebuffer_resize(&mut self, window: &mut WindowContext, size: Extent2D);

    /// 按键按下
    fn on_key_down(&mut self, window: &mut WindowContext, event: &KeyboardEvent);

    /// 事件循环结束前调用一次
    fn on_close(&mut self, window: &mut WindowContext);
}

/// 窗口
pub trait Window {
    fn context(&self) -> &WindowContext;

    /// 驱动事件循环直到窗口关闭
    fn run(self, handler: &mut dyn WindowHandler) -> Result<()>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_context() {
        let config = WindowConfig::default();
        let mut context = WindowContext::headless(&config, 2);

        assert_eq!(context.framebuffer_size(), Extent2D::new(800, 600));
        assert_eq!(context.position(), Position2D::new(100, 100));
        assert_eq!(context.keyboards().len(), 2);
        assert!(context.surface().winit_window().is_none());

        assert!(!context.is_closing());
        context.close();
        assert!(context.is_closing());
    }
}
