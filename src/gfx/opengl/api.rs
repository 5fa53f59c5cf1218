//! OpenGL 驱动接口
//!
//! [`OpenGlBackend`](super::OpenGlBackend) 需要的最小 GL 操作集合：
//! 创建上下文、绑定默认帧缓冲、清除颜色缓冲、交换缓冲。
//! 默认帧缓冲归窗口所有，尺寸随窗口隐式变化。

use crate::core::error::GraphicsResult;
use crate::core::math::Extent2D;
use crate::gfx::debug::DebugMessageSink;
use crate::platform::NativeSurface;

pub trait GlApi {
    /// 驱动名称，用于日志
    fn name(&self) -> &str;

    /// 在窗口表面上创建 GL 上下文
    fn create_context(&mut self, surface: &NativeSurface, framebuffer: Extent2D, debug: bool) -> GraphicsResult<()>;

    /// 绑定默认帧缓冲（名称 0），返回它当前的尺寸
    fn bind_default_framebuffer(&mut self) -> GraphicsResult<Extent2D>;

    /// 清除当前绑定帧缓冲的颜色缓冲
    fn clear_color_buffer(&mut self, color: [f32; 4]);

    /// 交换前后缓冲
    fn swap_buffers(&mut self) -> GraphicsResult<()>;

    /// 取出驱动积累的调试消息
    fn drain_debug_messages(&mut self, _sink: &mut dyn DebugMessageSink) {}

    /// 销毁上下文
    fn destroy_context(&mut self);
}
