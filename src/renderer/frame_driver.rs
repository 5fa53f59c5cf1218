//! 帧驱动
//!
//! 把窗口生命周期事件接到图形后端上：
//!
//! - load：订阅键盘，初始化后端
//! - render：`begin_frame` → `clear` → `end_frame`
//! - resize：通知后端；失败时在下一次渲染前重试
//! - close：销毁后端，只执行一次
//!
//! 帧内的 Present 与 Resize 失败只丢弃当前帧，不会中断事件循环。

use tracing::{debug, trace};

use crate::core::event::KeyboardEvent;
use crate::core::input::InputRouter;
use crate::core::math::{Color, Extent2D};
use crate::core::error::Result;
use crate::gfx::backend::GraphicsBackend;
use crate::platform::{WindowContext, WindowHandler};
use crate::{engine_info, engine_warn};

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// 成功呈现的帧
    pub frames_rendered: u64,
    /// 因 Present / Resize / 资源错误丢弃的帧
    pub frames_dropped: u64,
    pub present_failures: u64,
    pub resize_failures: u64,
    pub updates: u64,
}

/// 帧驱动
pub struct FrameDriver<B: GraphicsBackend> {
    backend: B,
    input: InputRouter,
    background: Color,
    update_hook: Option<Box<dyn FnMut(f64)>>,
    stats: FrameStats,
    loaded: bool,
    closed: bool,
}

impl<B: GraphicsBackend> FrameDriver<B> {
    pub fn new(backend: B, background: Color) -> Self {
        Self {
            backend,
            input: InputRouter::new(),
            background,
            update_hook: None,
            stats: FrameStats::default(),
            loaded: false,
            closed: false,
        }
    }

    /// 替换输入路由
    pub fn with_input(mut self, input: InputRouter) -> Self {
        self.input = input;
        self
    }

    /// 每个 tick 调用一次，参数为帧间隔（秒）
    pub fn with_update_hook(mut self, hook: impl FnMut(f64) + 'static) -> Self {
        self.update_hook = Some(Box::new(hook));
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn input(&self) -> &InputRouter {
        &self.input
    }

    fn drop_frame(&mut self) {
        self.stats.frames_dropped += 1;
    }

    /// 使后端表面尺寸与窗口一致
    fn sync_surface(&mut self, framebuffer: Extent2D) -> bool {
        if self.backend.surface_extent() == Some(framebuffer) {
            return true;
        }
        match self.backend.on_resize(framebuffer) {
            Ok(()) => true,
            Err(e) => {
                self.stats.resize_failures += 1;
                engine_warn!(
                    width = framebuffer.width,
                    height = framebuffer.height,
                    "Resize retry failed, dropping frame: {}",
                    e
                );
                false
            }
        }
    }

    fn render_frame(&mut self) {
        let mut target = match self.backend.begin_frame() {
            Ok(target) => target,
            Err(e) => {
                engine_warn!("begin_frame failed, dropping frame: {}", e);
                self.drop_frame();
                return;
            }
        };

        self.backend.clear(&mut target, self.background);

        match self.backend.end_frame(target) {
            Ok(()) => self.stats.frames_rendered += 1,
            Err(e) => {
                self.stats.present_failures += 1;
                engine_warn!("Present failed, dropping frame: {}", e);
                self.drop_frame();
            }
        }
    }
}

impl<B: GraphicsBackend> WindowHandler for FrameDriver<B> {
    fn on_load(&mut self, window: &mut WindowContext) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        let keyboards = self.input.attach(window);
        self.backend.initialize(window)?;
        self.loaded = true;

        engine_info!(
            backend = self.backend.kind().name(),
            keyboards,
            size = %window.framebuffer_size(),
            "Surface ready"
        );
        Ok(())
    }

    fn on_update(&mut self, _window: &mut WindowContext, delta_time: f64) {
        self.stats.updates += 1;
        if let Some(hook) = self.update_hook.as_mut() {
            hook(delta_time);
        }
    }

    fn on_render(&mut self, window: &mut WindowContext, _delta_time: f64) {
        if !self.loaded || self.closed {
            return;
        }

        let framebuffer = window.framebuffer_size();
        if framebuffer.is_empty() {
            trace!("Framebuffer is empty, skipping render");
            return;
        }

        if !self.sync_surface(framebuffer) {
            self.drop_frame();
            return;
        }

        self.render_frame();
    }

    fn on_framebuffer_resize(&mut self, _window: &mut WindowContext, size: Extent2D) {
        if !self.loaded || self.closed {
            return;
        }
        if size.is_empty() {
            debug!("Window minimized, keeping current surface");
            return;
        }

        if let Err(e) = self.backend.on_resize(size) {
            self.stats.resize_failures += 1;
            engine_warn!(
                width = size.width,
                height = size.height,
                "Resize failed, will retry before next frame: {}",
                e
            );
        }
    }

    fn on_key_down(&mut self, window: &mut WindowContext, event: &KeyboardEvent) {
        self.input.on_key_down(window, event);
    }

    fn on_close(&mut self, _window: &mut WindowContext) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.backend.teardown();

        engine_info!(
            frames_rendered = self.stats.frames_rendered,
            frames_dropped = self.stats.frames_dropped,
            present_failures = self.stats.present_failures,
            resize_failures = self.stats.resize_failures,
            "Surface closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WindowConfig;
    use crate::core::error::{DistPresentError, GraphicsError};
    use crate::core::event::{Key, KeyboardId};
    use crate::gfx::backend::BackendState;
    use crate::gfx::d3d11::{Direct3D11Backend, DriverCall, SoftwareD3d11};
    use crate::gfx::opengl::{OpenGlBackend, SoftwareGl};
    use crate::platform::{HeadlessWindow, Window};
    use std::cell::Cell;
    use std::rc::Rc;

    fn headless(ticks: u64) -> HeadlessWindow {
        HeadlessWindow::new(&WindowConfig::default()).with_ticks(ticks)
    }

    #[test]
    fn test_d3d11_resize_between_frames() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        let mut driver = FrameDriver::new(Direct3D11Backend::new(api, false), Color::BACKGROUND);

        headless(5)
            .resize_at(3, Extent2D::new(1024, 768))
            .run(&mut driver)
            .unwrap();

        let calls = probe.calls();
        let resize = calls
            .iter()
            .position(|call| matches!(call, DriverCall::ResizeBuffers { ok: true, .. }))
            .unwrap();
        let presents_before = calls[..resize]
            .iter()
            .filter(|call| matches!(call, DriverCall::Present { .. }))
            .count();
        let clears_after: Vec<Extent2D> = calls[resize..]
            .iter()
            .filter_map(|call| match call {
                DriverCall::Clear { extent, .. } => Some(*extent),
                _ => None,
            })
            .collect();

        assert_eq!(calls[resize], DriverCall::ResizeBuffers { extent: Extent2D::new(1024, 768), ok: true });
        assert_eq!(presents_before, 3);
        assert_eq!(probe.present_calls(), 5);
        assert_eq!(clears_after, vec![Extent2D::new(1024, 768); 2]);
        assert_eq!(probe.stale_clears(), 0);
        assert_eq!(driver.stats().frames_rendered, 5);
        assert_eq!(probe.live_objects(), 0);
    }

    #[test]
    fn test_opengl_ten_frames() {
        let api = SoftwareGl::new();
        let probe = api.probe();
        let mut driver = FrameDriver::new(OpenGlBackend::new(api, false), Color::DARK_GRAY);

        headless(10).run(&mut driver).unwrap();

        assert_eq!(probe.clears().len(), 10);
        assert!(probe.clears().iter().all(|c| *c == Color::DARK_GRAY.to_array()));
        assert_eq!(probe.swaps(), 10);
        assert_eq!(probe.contexts_created(), 1);
        assert_eq!(probe.contexts_destroyed(), 1);
    }

    #[test]
    fn test_opengl_resize_keeps_context() {
        let api = SoftwareGl::new();
        let probe = api.probe();
        let mut driver = FrameDriver::new(OpenGlBackend::new(api, false), Color::BACKGROUND);

        headless(6)
            .resize_at(2, Extent2D::new(1280, 720))
            .resize_at(4, Extent2D::new(640, 480))
            .run(&mut driver)
            .unwrap();

        assert_eq!(probe.contexts_created(), 1);
        assert_eq!(probe.swaps(), 6);
        assert_eq!(driver.stats().resize_failures, 0);
    }

    #[test]
    fn test_long_run_releases_everything() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        let mut driver = FrameDriver::new(Direct3D11Backend::new(api, false), Color::BACKGROUND);

        let mut window = headless(10_000);
        for tick in (100..10_000).step_by(100) {
            let size = if (tick / 100) % 2 == 0 {
                Extent2D::new(800, 600)
            } else {
                Extent2D::new(1024, 768)
            };
            window = window.resize_at(tick, size);
        }
        window.run(&mut driver).unwrap();

        assert_eq!(probe.present_calls(), 10_000);
        assert_eq!(probe.live_objects(), 0);
        assert_eq!(probe.double_releases(), 0);
        assert_eq!(probe.stale_clears(), 0);
        assert_eq!(driver.stats().frames_rendered, 10_000);
    }

    #[test]
    fn test_escape_closes_and_tears_down_once() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        let mut driver = FrameDriver::new(Direct3D11Backend::new(api, false), Color::BACKGROUND);

        headless(100)
            .key_down_at(3, KeyboardId(0), Key::Escape)
            .run(&mut driver)
            .unwrap();

        assert_eq!(probe.present_calls(), 3);
        assert_eq!(driver.backend().state(), BackendState::TornDown);
        assert_eq!(probe.live_objects(), 0);
        assert_eq!(probe.double_releases(), 0);
    }

    #[test]
    fn test_present_failure_drops_frame_and_continues() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        probe.fail_present_on([2, 4]);
        let mut driver = FrameDriver::new(Direct3D11Backend::new(api, false), Color::BACKGROUND);

        headless(5).run(&mut driver).unwrap();

        let stats = driver.stats();
        assert_eq!(probe.present_calls(), 5);
        assert_eq!(stats.frames_rendered, 3);
        assert_eq!(stats.present_failures, 2);
        assert_eq!(stats.frames_dropped, 2);
        assert_eq!(probe.live_objects(), 0);
    }

    #[test]
    fn test_failed_resize_is_retried_at_next_frame() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        let mut driver = FrameDriver::new(Direct3D11Backend::new(api, false), Color::BACKGROUND);

        probe.fail_next_resizes(2);
        headless(4)
            .resize_at(1, Extent2D::new(1024, 768))
            .run(&mut driver)
            .unwrap();

        let stats = driver.stats();
        assert_eq!(stats.resize_failures, 2);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.frames_rendered, 3);
        assert_eq!(probe.stale_clears(), 0);

        let last_clear = probe.calls().into_iter().rev().find_map(|call| match call {
            DriverCall::Clear { extent, .. } => Some(extent),
            _ => None,
        });
        assert_eq!(last_clear, Some(Extent2D::new(1024, 768)));
    }

    #[test]
    fn test_minimized_window_skips_frames() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        let mut driver = FrameDriver::new(Direct3D11Backend::new(api, false), Color::BACKGROUND);

        headless(6)
            .resize_at(2, Extent2D::new(0, 0))
            .resize_at(4, Extent2D::new(800, 600))
            .run(&mut driver)
            .unwrap();

        let stats = driver.stats();
        assert_eq!(probe.present_calls(), 4);
        assert_eq!(stats.frames_dropped, 0);
        assert_eq!(stats.resize_failures, 0);
    }

    #[test]
    fn test_device_failure_aborts_and_releases() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        probe.fail_device_creation("no hardware adapter");
        let mut driver = FrameDriver::new(Direct3D11Backend::new(api, false), Color::BACKGROUND);

        let err = headless(10).run(&mut driver).unwrap_err();

        assert!(matches!(err, DistPresentError::Graphics(GraphicsError::DeviceCreation(_))));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(probe.present_calls(), 0);
        assert_eq!(probe.live_objects(), 0);
    }

    #[test]
    fn test_update_hook_runs_before_each_render() {
        let ticks = Rc::new(Cell::new(0u32));
        let counter = ticks.clone();
        let mut driver = FrameDriver::new(OpenGlBackend::new(SoftwareGl::new(), false), Color::BACKGROUND)
            .with_update_hook(move |delta_time| {
                assert!(delta_time > 0.0);
                counter.set(counter.get() + 1);
            });

        headless(7).run(&mut driver).unwrap();

        assert_eq!(ticks.get(), 7);
        assert_eq!(driver.stats().updates, 7);
    }

    #[test]
    fn test_close_is_idempotent() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        let mut driver = FrameDriver::new(Direct3D11Backend::new(api, false), Color::BACKGROUND);
        let mut window = WindowContext::headless(&WindowConfig::default(), 1);

        driver.on_load(&mut window).unwrap();
        driver.on_render(&mut window, 0.016);
        driver.on_close(&mut window);
        driver.on_close(&mut window);
        driver.on_render(&mut window, 0.016);

        assert_eq!(probe.present_calls(), 1);
        assert_eq!(probe.live_objects(), 0);
        assert_eq!(probe.double_releases(), 0);
    }

    #[test]
    fn test_keys_reach_input_router() {
        let mut driver = FrameDriver::new(OpenGlBackend::new(SoftwareGl::new(), false), Color::BACKGROUND);

        headless(3)
            .with_keyboards(2)
            .key_down_at(1, KeyboardId(1), Key::Escape)
            .run(&mut driver)
            .unwrap();

        assert_eq!(driver.input().subscribed().len(), 2);
        assert_eq!(driver.stats().frames_rendered, 1);
    }
}
