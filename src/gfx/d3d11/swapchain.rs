//! 交换链管理
//!
//! 持有 DXGI 交换链及其描述，负责获取后备缓冲、Present 和尺寸变化。
//!
//! 每次成功的 resize 都会增加 `generation`。帧内创建的渲染目标视图通过
//! [`ViewLease`] 登记，只要还有未释放的视图，resize 就会被拒绝：
//! 旧缓冲的视图不可能跨越一次 resize 继续存活。

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::core::error::{GraphicsError, GraphicsResult};
use crate::core::math::Extent2D;
use crate::platform::NativeSurface;
use super::api::{D3d11Api, PixelFormat, SwapchainDesc, PRESENT_INTERVAL};

/// 当前后备缓冲
pub struct Backbuffer<A: D3d11Api> {
    pub texture: A::Texture,
    pub extent: Extent2D,
    /// 获取时交换链的 generation
    pub generation: u64,
}

/// 一个未释放的渲染目标视图的登记
///
/// 丢弃时注销。
#[derive(Debug)]
pub struct ViewLease {
    counter: Rc<Cell<usize>>,
}

impl Drop for ViewLease {
    fn drop(&mut self) {
        self.counter.set(self.counter.get().saturating_sub(1));
    }
}

/// 交换链管理器
pub struct SwapchainManager<A: D3d11Api> {
    swapchain: A::SwapChain,
    desc: SwapchainDesc,
    generation: u64,
    outstanding_views: Rc<Cell<usize>>,
}

impl<A: D3d11Api> SwapchainManager<A> {
    /// 创建双缓冲 BGRA8 flip-discard 交换链
    pub fn create(
        api: &A,
        factory: &A::Factory,
        device: &A::Device,
        surface: &NativeSurface,
        extent: Extent2D,
    ) -> GraphicsResult<Self> {
        if extent.is_empty() {
            return Err(GraphicsError::SwapchainCreation(format!(
                "surface has zero size ({})",
                extent
            )));
        }

        let desc = SwapchainDesc::double_buffered(extent);
        let swapchain = api
            .create_swapchain_for_surface(factory, device, surface, &desc)
            .map_err(|e| match e {
                GraphicsError::SwapchainCreation(_) => e,
                other => GraphicsError::SwapchainCreation(other.to_string()),
            })?;

        info!(
            width = extent.width,
            height = extent.height,
            buffers = desc.buffer_count,
            "Swap chain created"
        );

        Ok(Self {
            swapchain,
            desc,
            generation: 0,
            outstanding_views: Rc::new(Cell::new(0)),
        })
    }

    pub fn extent(&self) -> Extent2D {
        self.desc.extent
    }

    pub fn buffer_count(&self) -> u32 {
        self.desc.buffer_count
    }

    pub fn format(&self) -> PixelFormat {
        self.desc.format
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn outstanding_views(&self) -> usize {
        self.outstanding_views.get()
    }

    /// 获取当前后备缓冲
    pub fn current_backbuffer(&self, api: &A) -> GraphicsResult<Backbuffer<A>> {
        let texture = api
            .get_buffer(&self.swapchain, 0)
            .map_err(|e| GraphicsError::ResourceCreation(format!("GetBuffer failed: {}", e)))?;
        let extent = api.texture_extent(&texture);
        Ok(Backbuffer {
            texture,
            extent,
            generation: self.generation,
        })
    }

    /// 登记一个即将创建的渲染目标视图
    pub fn lease_view(&self) -> ViewLease {
        self.outstanding_views.set(self.outstanding_views.get() + 1);
        ViewLease {
            counter: self.outstanding_views.clone(),
        }
    }

    pub fn present(&self, api: &A) -> GraphicsResult<()> {
        api.present(&self.swapchain, PRESENT_INTERVAL)
    }

    /// 按新尺寸重建缓冲
    ///
    /// 失败时保留原尺寸和 generation。
    pub fn resize(&mut self, api: &A, width: u32, height: u32) -> GraphicsResult<()> {
        let extent = Extent2D::new(width, height);
        let resize_error = |reason: String| GraphicsError::Resize { width, height, reason };

        if extent.is_empty() {
            return Err(resize_error("zero-sized swap chain".to_string()));
        }
        if self.outstanding_views.get() > 0 {
            return Err(GraphicsError::InvalidState(format!(
                "{} render target view(s) still reference the back buffer",
                self.outstanding_views.get()
            )));
        }
        if extent == self.desc.extent {
            debug!(width, height, "Swap chain already at requested size");
            return Ok(());
        }

        let desc = self.desc.with_extent(extent);
        api.resize_buffers(&self.swapchain, &desc).map_err(|e| match e {
            GraphicsError::Resize { .. } => e,
            other => resize_error(other.to_string()),
        })?;

        self.desc = desc;
        self.generation += 1;
        info!(width, height, generation = self.generation, "Swap chain buffers resized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::d3d11::software::SoftwareD3d11;

    fn manager(api: &SoftwareD3d11) -> (SwapchainManager<SoftwareD3d11>, <SoftwareD3d11 as D3d11Api>::Device, <SoftwareD3d11 as D3d11Api>::Factory) {
        let factory = api.create_factory(false).unwrap();
        let (device, _context, _level) = api.create_device(false).unwrap();
        let manager = SwapchainManager::create(api, &factory, &device, &NativeSurface::Headless, Extent2D::new(800, 600)).unwrap();
        (manager, device, factory)
    }

    #[test]
    fn test_backbuffer_tracks_resize() {
        let api = SoftwareD3d11::new();
        let (mut manager, _device, _factory) = manager(&api);

        assert_eq!(manager.current_backbuffer(&api).unwrap().extent, Extent2D::new(800, 600));
        assert_eq!(manager.buffer_count(), 2);

        manager.resize(&api, 1024, 768).unwrap();
        let backbuffer = manager.current_backbuffer(&api).unwrap();
        assert_eq!(backbuffer.extent, Extent2D::new(1024, 768));
        assert_eq!(backbuffer.generation, 1);
    }

    #[test]
    fn test_resize_refused_while_view_outstanding() {
        let api = SoftwareD3d11::new();
        let (mut manager, _device, _factory) = manager(&api);

        let lease = manager.lease_view();
        assert!(matches!(manager.resize(&api, 640, 480), Err(GraphicsError::InvalidState(_))));
        drop(lease);

        manager.resize(&api, 640, 480).unwrap();
        assert_eq!(manager.extent(), Extent2D::new(640, 480));
    }

    #[test]
    fn test_zero_size_resize_keeps_previous_extent() {
        let api = SoftwareD3d11::new();
        let (mut manager, _device, _factory) = manager(&api);

        let err = manager.resize(&api, 0, 600).unwrap_err();
        assert!(matches!(err, GraphicsError::Resize { width: 0, height: 600, .. }));
        assert_eq!(manager.extent(), Extent2D::new(800, 600));
        assert_eq!(manager.generation(), 0);
    }

    #[test]
    fn test_failed_resize_keeps_previous_extent() {
        let api = SoftwareD3d11::new();
        api.probe().fail_next_resizes(1);
        let (mut manager, _device, _factory) = manager(&api);

        assert!(manager.resize(&api, 1280, 720).is_err());
        assert_eq!(manager.extent(), Extent2D::new(800, 600));

        manager.resize(&api, 1280, 720).unwrap();
        assert_eq!(manager.current_backbuffer(&api).unwrap().extent, Extent2D::new(1280, 720));
    }

    #[test]
    fn test_zero_size_creation_fails() {
        let api = SoftwareD3d11::new();
        let factory = api.create_factory(false).unwrap();
        let (device, _context, _level) = api.create_device(false).unwrap();

        let result = SwapchainManager::create(&api, &factory, &device, &NativeSurface::Headless, Extent2D::new(0, 0));
        assert!(matches!(result, Err(GraphicsError::SwapchainCreation(_))));
    }
}
