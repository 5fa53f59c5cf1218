//! Direct3D 11 图形后端
//!
//! # 初始化流程
//!
//! 1. 创建 DXGI 工厂
//! 2. 创建硬件设备和立即上下文（调试模式下启用调试层）
//! 3. 在窗口表面上创建交换链
//!
//! # 每帧流程
//!
//! 1. 获取当前后备缓冲，创建渲染目标视图
//! 2. 清除视图
//! 3. Present（同步间隔 1）
//! 4. 释放视图和后备缓冲引用
//!
//! 销毁时按创建的逆序释放：交换链 → 立即上下文 → 设备 → 工厂。

use tracing::{debug, info, warn};

use crate::core::config::BackendKind;
use crate::core::error::{GraphicsError, GraphicsResult};
use crate::core::math::{Color, Extent2D};
use crate::gfx::backend::{BackendState, GraphicsBackend};
use crate::gfx::debug::{DebugMessageSink, TracingDebugSink};
use crate::platform::WindowContext;
use super::api::{D3d11Api, FeatureLevel};
use super::swapchain::{Backbuffer, SwapchainManager, ViewLease};

/// Direct3D 11 一帧的绘制目标
///
/// 字段按释放顺序声明：视图 → 后备缓冲 → 登记。
pub struct D3d11Frame<A: D3d11Api> {
    view: A::RenderTargetView,
    backbuffer: Backbuffer<A>,
    _lease: ViewLease,
}

impl<A: D3d11Api> D3d11Frame<A> {
    pub fn extent(&self) -> Extent2D {
        self.backbuffer.extent
    }

    pub fn generation(&self) -> u64 {
        self.backbuffer.generation
    }
}

/// Direct3D 11 图形后端
pub struct Direct3D11Backend<A: D3d11Api> {
    api: A,
    state: BackendState,
    debug_device: bool,
    sink: Box<dyn DebugMessageSink>,
    feature_level: Option<FeatureLevel>,
    factory: Option<A::Factory>,
    device: Option<A::Device>,
    context: Option<A::Context>,
    swapchain: Option<SwapchainManager<A>>,
}

impl<A: D3d11Api> Direct3D11Backend<A> {
    pub fn new(api: A, debug_device: bool) -> Self {
        Self {
            api,
            state: BackendState::Uninitialized,
            debug_device,
            sink: Box::new(TracingDebugSink),
            feature_level: None,
            factory: None,
            device: None,
            context: None,
            swapchain: None,
        }
    }

    /// 替换调试消息接收者
    pub fn with_debug_sink(mut self, sink: impl DebugMessageSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn feature_level(&self) -> Option<FeatureLevel> {
        self.feature_level
    }

    pub fn swapchain(&self) -> Option<&SwapchainManager<A>> {
        self.swapchain.as_ref()
    }

    /// 重新获取当前后备缓冲并返回它的尺寸
    pub fn backbuffer_extent(&self) -> GraphicsResult<Extent2D> {
        let swapchain = self
            .swapchain
            .as_ref()
            .ok_or_else(|| GraphicsError::InvalidState("no swap chain".to_string()))?;
        Ok(swapchain.current_backbuffer(&self.api)?.extent)
    }

    fn ready(&self) -> GraphicsResult<(&A::Device, &A::Context, &SwapchainManager<A>)> {
        match (&self.device, &self.context, &self.swapchain) {
            (Some(device), Some(context), Some(swapchain)) => Ok((device, context, swapchain)),
            _ => Err(GraphicsError::InvalidState(format!(
                "Direct3D 11 backend not ready (state {:?})",
                self.state
            ))),
        }
    }
}

impl<A: D3d11Api> GraphicsBackend for Direct3D11Backend<A> {
    type FrameTarget = D3d11Frame<A>;

    fn kind(&self) -> BackendKind {
        BackendKind::Direct3D11
    }

    fn state(&self) -> BackendState {
        self.state
    }

    fn surface_extent(&self) -> Option<Extent2D> {
        self.swapchain.as_ref().map(SwapchainManager::extent)
    }

    fn initialize(&mut self, window: &WindowContext) -> GraphicsResult<()> {
        if self.state != BackendState::Uninitialized {
            return Err(GraphicsError::InvalidState(format!(
                "initialize called in state {:?}",
                self.state
            )));
        }

        info!(debug = self.debug_device, "Initializing Direct3D 11 backend");

        // 1. 创建 DXGI 工厂
        let factory = self.api.create_factory(self.debug_device).map_err(|e| match e {
            GraphicsError::DeviceCreation(_) => e,
            other => GraphicsError::DeviceCreation(other.to_string()),
        })?;
        let factory = self.factory.insert(factory);

        // 2. 创建设备和立即上下文
        let (device, context, feature_level) = self.api.create_device(self.debug_device).map_err(|e| match e {
            GraphicsError::DeviceCreation(_) => e,
            other => GraphicsError::DeviceCreation(other.to_string()),
        })?;
        info!(feature_level = %feature_level, "D3D11 device created");
        self.feature_level = Some(feature_level);
        self.context = Some(context);
        let device = self.device.insert(device);

        // 3. 创建交换链
        let swapchain = SwapchainManager::create(
            &self.api,
            factory,
            device,
            window.surface(),
            window.framebuffer_size(),
        )?;
        self.swapchain = Some(swapchain);

        self.state = BackendState::Initialized;
        Ok(())
    }

    fn begin_frame(&mut self) -> GraphicsResult<D3d11Frame<A>> {
        if !self.state.can_begin_frame() {
            return Err(GraphicsError::InvalidState(format!(
                "begin_frame called in state {:?}",
                self.state
            )));
        }

        let (device, _context, swapchain) = self.ready()?;
        let backbuffer = swapchain.current_backbuffer(&self.api)?;
        if backbuffer.extent != swapchain.extent() {
            return Err(GraphicsError::ResourceCreation(format!(
                "back buffer is {} but swap chain is {}",
                backbuffer.extent,
                swapchain.extent()
            )));
        }

        let lease = swapchain.lease_view();
        let view = self
            .api
            .create_render_target_view(device, &backbuffer.texture)
            .map_err(|e| GraphicsError::ResourceCreation(format!("CreateRenderTargetView failed: {}", e)))?;

        self.state = BackendState::Rendering;
        Ok(D3d11Frame {
            view,
            backbuffer,
            _lease: lease,
        })
    }

    fn clear(&mut self, target: &mut D3d11Frame<A>, color: Color) {
        let Ok((_device, context, swapchain)) = self.ready() else {
            warn!("clear on a backend that is not ready");
            return;
        };
        if target.generation() != swapchain.generation() {
            warn!(
                view_generation = target.generation(),
                swapchain_generation = swapchain.generation(),
                "Skipping clear of a view from a previous swap chain"
            );
            return;
        }
        self.api.clear_render_target_view(context, &target.view, color.to_array());
    }

    fn end_frame(&mut self, target: D3d11Frame<A>) -> GraphicsResult<()> {
        if self.state != BackendState::Rendering {
            drop(target);
            if self.state == BackendState::TornDown {
                // teardown 期间推迟的释放在视图释放后完成
                self.release_objects();
            }
            return Err(GraphicsError::InvalidState(format!(
                "end_frame called in state {:?}",
                self.state
            )));
        }
        self.state = BackendState::Initialized;

        let result = match self.swapchain.as_ref() {
            Some(swapchain) => swapchain.present(&self.api),
            None => Err(GraphicsError::InvalidState("no swap chain".to_string())),
        };

        // 无论 Present 是否成功都释放本帧的视图
        drop(target);

        if self.debug_device {
            if let Some(device) = self.device.as_ref() {
                self.api.drain_debug_messages(device, self.sink.as_mut());
            }
        }

        result.map_err(|e| match e {
            GraphicsError::Present(_) => e,
            other => GraphicsError::Present(other.to_string()),
        })
    }

    fn on_resize(&mut self, size: Extent2D) -> GraphicsResult<()> {
        match self.state {
            BackendState::Rendering => {
                return Err(GraphicsError::InvalidState("resize while a frame is open".to_string()));
            }
            BackendState::Uninitialized | BackendState::TornDown => {
                return Err(GraphicsError::InvalidState(format!(
                    "resize called in state {:?}",
                    self.state
                )));
            }
            _ => {}
        }

        let swapchain = self
            .swapchain
            .as_mut()
            .ok_or_else(|| GraphicsError::InvalidState("no swap chain".to_string()))?;
        swapchain.resize(&self.api, size.width, size.height)?;

        self.state = BackendState::Resized;
        Ok(())
    }

    fn teardown(&mut self) {
        if self.state == BackendState::TornDown {
            return;
        }

        let frame_open = self.state == BackendState::Rendering;
        self.state = BackendState::TornDown;
        if frame_open {
            warn!("Tearing down with an open frame, releasing after the frame ends");
            return;
        }

        self.release_objects();
        info!("Direct3D 11 backend torn down");
    }
}

impl<A: D3d11Api> Direct3D11Backend<A> {
    /// 按创建的逆序释放交换链、上下文、设备和工厂
    fn release_objects(&mut self) {
        if let Some(swapchain) = self.swapchain.take() {
            if swapchain.outstanding_views() > 0 {
                warn!(views = swapchain.outstanding_views(), "Render target views outlive the swap chain");
            }
            drop(swapchain);
            debug!("Swap chain released");
        }
        if self.context.take().is_some() {
            debug!("Immediate context released");
        }
        if self.device.take().is_some() {
            debug!("Device released");
        }
        if self.factory.take().is_some() {
            debug!("DXGI factory released");
        }
    }
}

impl<A: D3d11Api> Drop for Direct3D11Backend<A> {
    fn drop(&mut self) {
        self.teardown();
        self.release_objects();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WindowConfig;
    use crate::gfx::d3d11::software::{DriverCall, ObjectKind, SoftwareD3d11};
    use crate::gfx::debug::{DebugMessage, DebugSeverity};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn window() -> WindowContext {
        WindowContext::headless(&WindowConfig::default(), 1)
    }

    fn render(backend: &mut Direct3D11Backend<SoftwareD3d11>) -> GraphicsResult<()> {
        let mut frame = backend.begin_frame()?;
        backend.clear(&mut frame, Color::BACKGROUND);
        backend.end_frame(frame)
    }

    #[test]
    fn test_initialize_creates_swapchain() {
        for (width, height) in [(800, 600), (1, 1), (1920, 1080), (640, 1136), (3, 7)] {
            let api = SoftwareD3d11::new();
            let probe = api.probe();
            let mut backend = Direct3D11Backend::new(api, false);
            let config = WindowConfig {
                width,
                height,
                ..WindowConfig::default()
            };

            backend.initialize(&WindowContext::headless(&config, 1)).unwrap();

            let extent = Extent2D::new(width, height);
            assert_eq!(backend.state(), BackendState::Initialized);
            assert_eq!(backend.feature_level(), Some(FeatureLevel::Level11_0));
            assert_eq!(backend.surface_extent(), Some(extent));
            assert_eq!(backend.backbuffer_extent().unwrap(), extent);
            assert_eq!(
                probe.calls()[..3],
                [
                    DriverCall::CreateFactory,
                    DriverCall::CreateDevice,
                    DriverCall::CreateSwapChain(extent),
                ]
            );
        }
    }

    #[test]
    fn test_frame_releases_view_and_backbuffer() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        let mut backend = Direct3D11Backend::new(api, false);
        backend.initialize(&window()).unwrap();

        let frame = backend.begin_frame().unwrap();
        assert_eq!(probe.live_count(ObjectKind::RenderTargetView), 1);
        assert_eq!(backend.swapchain().map(|s| s.outstanding_views()), Some(1));
        backend.end_frame(frame).unwrap();

        assert_eq!(probe.live_count(ObjectKind::RenderTargetView), 0);
        assert_eq!(probe.live_count(ObjectKind::Texture), 0);
        assert_eq!(backend.swapchain().map(|s| s.outstanding_views()), Some(0));
    }

    #[test]
    fn test_view_released_when_present_fails() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        probe.fail_present_on([1]);
        let mut backend = Direct3D11Backend::new(api, false);
        backend.initialize(&window()).unwrap();

        assert!(matches!(render(&mut backend), Err(GraphicsError::Present(_))));
        assert_eq!(probe.live_count(ObjectKind::RenderTargetView), 0);
        assert_eq!(backend.state(), BackendState::Initialized);

        render(&mut backend).unwrap();
    }

    #[test]
    fn test_resize_during_frame_is_rejected() {
        let mut backend = Direct3D11Backend::new(SoftwareD3d11::new(), false);
        backend.initialize(&window()).unwrap();

        let frame = backend.begin_frame().unwrap();
        assert!(matches!(
            backend.on_resize(Extent2D::new(1024, 768)),
            Err(GraphicsError::InvalidState(_))
        ));
        backend.end_frame(frame).unwrap();

        backend.on_resize(Extent2D::new(1024, 768)).unwrap();
        assert_eq!(backend.state(), BackendState::Resized);
        assert_eq!(backend.backbuffer_extent().unwrap(), Extent2D::new(1024, 768));
    }

    #[test]
    fn test_zero_size_resize_is_an_error() {
        let mut backend = Direct3D11Backend::new(SoftwareD3d11::new(), false);
        backend.initialize(&window()).unwrap();

        let err = backend.on_resize(Extent2D::new(0, 0)).unwrap_err();
        assert!(matches!(err, GraphicsError::Resize { width: 0, height: 0, .. }));
        assert_eq!(backend.surface_extent(), Some(Extent2D::new(800, 600)));
    }

    #[test]
    fn test_teardown_order_and_idempotence() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        let mut backend = Direct3D11Backend::new(api, false);
        backend.initialize(&window()).unwrap();
        render(&mut backend).unwrap();

        let before = probe.release_order().len();
        backend.teardown();
        backend.teardown();
        drop(backend);

        assert_eq!(
            probe.release_order()[before..],
            [ObjectKind::SwapChain, ObjectKind::Context, ObjectKind::Device, ObjectKind::Factory]
        );
        assert_eq!(probe.live_objects(), 0);
        assert_eq!(probe.double_releases(), 0);
    }

    #[test]
    fn test_teardown_with_open_frame_releases_views_first() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        let mut backend = Direct3D11Backend::new(api, false);
        backend.initialize(&window()).unwrap();

        let frame = backend.begin_frame().unwrap();
        backend.teardown();
        assert_eq!(backend.state(), BackendState::TornDown);
        assert_eq!(probe.live_count(ObjectKind::SwapChain), 1);

        let before = probe.release_order().len();
        assert!(matches!(backend.end_frame(frame), Err(GraphicsError::InvalidState(_))));

        assert_eq!(backend.state(), BackendState::TornDown);
        assert_eq!(probe.present_calls(), 0);
        assert_eq!(
            probe.release_order()[before..],
            [
                ObjectKind::RenderTargetView,
                ObjectKind::Texture,
                ObjectKind::SwapChain,
                ObjectKind::Context,
                ObjectKind::Device,
                ObjectKind::Factory,
            ]
        );
        assert_eq!(probe.live_objects(), 0);
        assert!(backend.begin_frame().is_err());
    }

    #[test]
    fn test_swapchain_failure_releases_partial_objects() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        probe.fail_swapchain_creation("unsupported format");
        let mut backend = Direct3D11Backend::new(api, false);

        let err = backend.initialize(&window()).unwrap_err();
        assert!(matches!(err, GraphicsError::SwapchainCreation(_)));
        assert_eq!(probe.live_objects(), 3);

        backend.teardown();
        assert_eq!(probe.live_objects(), 0);
        assert_eq!(probe.release_order(), vec![ObjectKind::Context, ObjectKind::Device, ObjectKind::Factory]);
    }

    #[test]
    fn test_device_failure() {
        let api = SoftwareD3d11::new();
        api.probe().fail_device_creation("no hardware adapter");
        let mut backend = Direct3D11Backend::new(api, false);

        let err = backend.initialize(&window()).unwrap_err();
        assert!(matches!(err, GraphicsError::DeviceCreation(_)));
        assert!(backend.begin_frame().is_err());
    }

    #[test]
    fn test_debug_messages_forwarded_after_present() {
        let api = SoftwareD3d11::new();
        let probe = api.probe();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        let mut backend = Direct3D11Backend::new(api, true)
            .with_debug_sink(move |message: &DebugMessage| sink.borrow_mut().push(message.severity));
        backend.initialize(&window()).unwrap();

        probe.inject_debug_message(DebugMessage::new(DebugSeverity::Warning, "live object at shutdown"));
        render(&mut backend).unwrap();

        assert_eq!(*received.borrow(), vec![DebugSeverity::Warning]);
    }
}
