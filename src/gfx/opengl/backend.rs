//! OpenGL 图形后端
//!
//! 每帧：绑定默认帧缓冲 → 清除颜色缓冲 → 交换缓冲。
//! 交换链由窗口系统隐式持有，因此尺寸变化不需要任何 GPU 操作。

use tracing::{debug, info, warn};

use crate::core::config::BackendKind;
use crate::core::error::{GraphicsError, GraphicsResult};
use crate::core::math::{Color, Extent2D};
use crate::gfx::backend::{BackendState, GraphicsBackend};
use crate::gfx::debug::{DebugMessageSink, TracingDebugSink};
use crate::platform::WindowContext;
use super::api::GlApi;

/// OpenGL 一帧的绘制目标：默认帧缓冲
#[derive(Debug)]
pub struct GlFrame {
    extent: Extent2D,
}

impl GlFrame {
    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}

/// OpenGL 图形后端
pub struct OpenGlBackend<A: GlApi> {
    api: A,
    state: BackendState,
    debug_device: bool,
    sink: Box<dyn DebugMessageSink>,
    context_live: bool,
    extent: Option<Extent2D>,
}

impl<A: GlApi> OpenGlBackend<A> {
    pub fn new(api: A, debug_device: bool) -> Self {
        Self {
            api,
            state: BackendState::Uninitialized,
            debug_device,
            sink: Box::new(TracingDebugSink),
            context_live: false,
            extent: None,
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
}

impl<A: GlApi> GraphicsBackend for OpenGlBackend<A> {
    type FrameTarget = GlFrame;

    fn kind(&self) -> BackendKind {
        BackendKind::OpenGl
    }

    fn state(&self) -> BackendState {
        self.state
    }

    fn surface_extent(&self) -> Option<Extent2D> {
        self.extent
    }

    fn initialize(&mut self, window: &WindowContext) -> GraphicsResult<()> {
        if self.state != BackendState::Uninitialized {
            return Err(GraphicsError::InvalidState(format!(
                "initialize called in state {:?}",
                self.state
            )));
        }

        info!(driver = self.api.name(), debug = self.debug_device, "Initializing OpenGL backend");

        let framebuffer = window.framebuffer_size();
        self.api
            .create_context(window.surface(), framebuffer, self.debug_device)
            .map_err(|e| match e {
                GraphicsError::DeviceCreation(_) => e,
                other => GraphicsError::DeviceCreation(other.to_string()),
            })?;

        self.context_live = true;
        self.extent = Some(framebuffer);
        self.state = BackendState::Initialized;

        info!(width = framebuffer.width, height = framebuffer.height, "OpenGL context created");
        Ok(())
    }

    fn begin_frame(&mut self) -> GraphicsResult<GlFrame> {
        if !self.state.can_begin_frame() {
            return Err(GraphicsError::InvalidState(format!(
                "begin_frame called in state {:?}",
                self.state
            )));
        }

        let extent = self.api.bind_default_framebuffer()?;
        self.state = BackendState::Rendering;
        Ok(GlFrame { extent })
    }

    fn clear(&mut self, _target: &mut GlFrame, color: Color) {
        self.api.clear_color_buffer(color.to_array());
    }

    fn end_frame(&mut self, target: GlFrame) -> GraphicsResult<()> {
        drop(target);
        if self.state != BackendState::Rendering {
            return Err(GraphicsError::InvalidState(format!(
                "end_frame called in state {:?}",
                self.state
            )));
        }
        self.state = BackendState::Initialized;

        let result = self.api.swap_buffers();
        if self.debug_device {
            self.api.drain_debug_messages(self.sink.as_mut());
        }

        result.map_err(|e| match e {
            GraphicsError::Present(_) => e,
            other => GraphicsError::Present(other.to_string()),
        })
    }

    fn on_resize(&mut self, size: Extent2D) -> GraphicsResult<()> {
        match self.state {
            BackendState::Rendering => Err(GraphicsError::InvalidState(
                "resize while a frame is open".to_string(),
            )),
            BackendState::Uninitialized | BackendState::TornDown => Err(GraphicsError::InvalidState(
                format!("resize called in state {:?}", self.state),
            )),
            _ => {
                // 默认帧缓冲随窗口变化，只记录尺寸
                debug!(width = size.width, height = size.height, "OpenGL framebuffer resized");
                self.extent = Some(size);
                self.state = BackendState::Resized;
                Ok(())
            }
        }
    }

    fn teardown(&mut self) {
        if self.state == BackendState::TornDown {
            return;
        }
        if self.state == BackendState::Rendering {
            warn!("Tearing down OpenGL backend with an open frame");
        }

        if self.context_live {
            self.api.destroy_context();
            self.context_live = false;
            debug!("OpenGL context destroyed");
        }

        self.extent = None;
        self.state = BackendState::TornDown;
        info!("OpenGL backend torn down");
    }
}

impl<A: GlApi> Drop for OpenGlBackend<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}
