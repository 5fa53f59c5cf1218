//! Direct3D 11 驱动接口
//!
//! 把后端和交换链管理器需要的 D3D11/DXGI 调用抽象成 trait。
//! 关联类型对应 COM 对象：值被丢弃即释放（对应 `Release`）。

use std::fmt;

use crate::core::error::GraphicsResult;
use crate::core::math::Extent2D;
use crate::gfx::debug::DebugMessageSink;
use crate::platform::NativeSurface;

/// 交换链缓冲区数量（双缓冲）
pub const BUFFER_COUNT: u32 = 2;

/// Present 的同步间隔（等待一次垂直同步）
pub const PRESENT_INTERVAL: u32 = 1;

/// 后备缓冲像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// `DXGI_FORMAT_B8G8R8A8_UNORM`
    Bgra8Unorm,
}

/// 交换效果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapEffect {
    /// `DXGI_SWAP_EFFECT_FLIP_DISCARD`
    FlipDiscard,
}

/// 设备支持的最高特性级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureLevel {
    Level10_0,
    Level10_1,
    Level11_0,
    Level11_1,
    Other(u32),
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureLevel::Level10_0 => f.write_str("10_0"),
            FeatureLevel::Level10_1 => f.write_str("10_1"),
            FeatureLevel::Level11_0 => f.write_str("11_0"),
            FeatureLevel::Level11_1 => f.write_str("11_1"),
            FeatureLevel::Other(raw) => write!(f, "0x{:x}", raw),
        }
    }
}

/// 交换链描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub extent: Extent2D,
    pub buffer_count: u32,
    pub format: PixelFormat,
    pub swap_effect: SwapEffect,
    pub sample_count: u32,
}

impl SwapchainDesc {
    /// 双缓冲、BGRA8、flip-discard、无多重采样
    pub fn double_buffered(extent: Extent2D) -> Self {
        Self {
            extent,
            buffer_count: BUFFER_COUNT,
            format: PixelFormat::Bgra8Unorm,
            swap_effect: SwapEffect::FlipDiscard,
            sample_count: 1,
        }
    }

    pub fn with_extent(&self, extent: Extent2D) -> Self {
        Self { extent, ..*self }
    }
}

/// D3D11 / DXGI 调用
pub trait D3d11Api {
    type Factory;
    type Device;
    type Context;
    type SwapChain;
    type Texture;
    type RenderTargetView;

    /// 创建硬件设备和立即上下文
    fn create_device(&self, debug: bool) -> GraphicsResult<(Self::Device, Self::Context, FeatureLevel)>;

    fn create_factory(&self, debug: bool) -> GraphicsResult<Self::Factory>;

    /// 在窗口表面上创建交换链
    fn create_swapchain_for_surface(
        &self,
        factory: &Self::Factory,
        device: &Self::Device,
        surface: &NativeSurface,
        desc: &SwapchainDesc,
    ) -> GraphicsResult<Self::SwapChain>;

    /// 获取第 `index` 个缓冲（flip 模型下 0 总是当前后备缓冲）
    fn get_buffer(&self, swapchain: &Self::SwapChain, index: u32) -> GraphicsResult<Self::Texture>;

    fn texture_extent(&self, texture: &Self::Texture) -> Extent2D;

    fn create_render_target_view(
        &self,
        device: &Self::Device,
        texture: &Self::Texture,
    ) -> GraphicsResult<Self::RenderTargetView>;

    fn clear_render_target_view(&self, context: &Self::Context, view: &Self::RenderTargetView, color: [f32; 4]);

    fn present(&self, swapchain: &Self::SwapChain, sync_interval: u32) -> GraphicsResult<()>;

    /// 重建交换链缓冲
    ///
    /// 调用前必须释放所有指向旧缓冲的引用。
    fn resize_buffers(&self, swapchain: &Self::SwapChain, desc: &SwapchainDesc) -> GraphicsResult<()>;

    /// 取出调试层积累的消息
    fn drain_debug_messages(&self, _device: &Self::Device, _sink: &mut dyn DebugMessageSink) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_buffered_desc() {
        let desc = SwapchainDesc::double_buffered(Extent2D::new(800, 600));
        assert_eq!(desc.buffer_count, 2);
        assert_eq!(desc.format, PixelFormat::Bgra8Unorm);
        assert_eq!(desc.swap_effect, SwapEffect::FlipDiscard);
        assert_eq!(desc.sample_count, 1);

        let resized = desc.with_extent(Extent2D::new(1024, 768));
        assert_eq!(resized.extent, Extent2D::new(1024, 768));
        assert_eq!(resized.buffer_count, 2);
    }
}
