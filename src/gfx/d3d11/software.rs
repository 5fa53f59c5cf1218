//! 软件 D3D11 驱动
//!
//! 模拟 D3D11/DXGI 对象的引用计数语义：每个对象是一个句柄，被丢弃时在
//! 共享账本中记录一次 `Release`。账本同时记录驱动调用序列，
//! 并支持注入设备创建、交换链创建、Present 和 ResizeBuffers 故障。
//!
//! 与真实 DXGI 一致，只要还有指向后备缓冲的纹理或视图存活，
//! `resize_buffers` 就会失败。

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::core::error::{GraphicsError, GraphicsResult};
use crate::core::math::Extent2D;
use crate::gfx::debug::{DebugMessage, DebugMessageSink};
use crate::platform::NativeSurface;
use super::api::{D3d11Api, FeatureLevel, SwapchainDesc};

/// 模拟的 COM 对象类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Factory,
    Device,
    Context,
    SwapChain,
    Texture,
    RenderTargetView,
}

/// 账本中记录的驱动调用
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    CreateFactory,
    CreateDevice,
    CreateSwapChain(Extent2D),
    GetBuffer(Extent2D),
    CreateRenderTargetView(Extent2D),
    Clear { extent: Extent2D, color: [f32; 4] },
    Present { ok: bool },
    ResizeBuffers { extent: Extent2D, ok: bool },
    Release(ObjectKind),
}

#[derive(Debug, Default)]
struct Faults {
    device: Option<String>,
    swapchain: Option<String>,
    failing_presents: HashSet<u64>,
    resize_failures: u32,
}

#[derive(Debug, Default)]
struct Ledger {
    next_id: u64,
    live: HashMap<u64, ObjectKind>,
    double_releases: usize,
    calls: Vec<DriverCall>,
    presents: u64,
    swapchain_extent: Extent2D,
    stale_clears: usize,
    faults: Faults,
    messages: Vec<DebugMessage>,
}

impl Ledger {
    fn register(&mut self, kind: ObjectKind) -> u64 {
        self.next_id += 1;
        self.live.insert(self.next_id, kind);
        self.next_id
    }

    fn release(&mut self, id: u64, kind: ObjectKind) {
        if self.live.remove(&id).is_some() {
            self.calls.push(DriverCall::Release(kind));
        } else {
            self.double_releases += 1;
        }
    }

    fn live_count(&self, kind: ObjectKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }
}

/// 模拟的 COM 引用，丢弃时释放
#[derive(Debug)]
pub struct SoftObject {
    id: u64,
    kind: ObjectKind,
    ledger: Rc<RefCell<Ledger>>,
}

impl SoftObject {
    fn new(ledger: &Rc<RefCell<Ledger>>, kind: ObjectKind) -> Self {
        let id = ledger.borrow_mut().register(kind);
        Self {
            id,
            kind,
            ledger: ledger.clone(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }
}

impl Drop for SoftObject {
    fn drop(&mut self) {
        if let Ok(mut ledger) = self.ledger.try_borrow_mut() {
            ledger.release(self.id, self.kind);
        }
    }
}

/// 模拟的交换链
#[derive(Debug)]
pub struct SoftSwapChain {
    _handle: SoftObject,
    extent: RefCell<Extent2D>,
}

/// 模拟的纹理或视图，带尺寸
#[derive(Debug)]
pub struct SoftSurfaceObject {
    _handle: SoftObject,
    extent: Extent2D,
}

impl SoftSurfaceObject {
    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}

/// 软件 D3D11 驱动
#[derive(Debug, Default)]
pub struct SoftwareD3d11 {
    ledger: Rc<RefCell<Ledger>>,
}

impl SoftwareD3d11 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> SoftwareD3d11Probe {
        SoftwareD3d11Probe {
            ledger: self.ledger.clone(),
        }
    }
}

impl D3d11Api for SoftwareD3d11 {
    type Factory = SoftObject;
    type Device = SoftObject;
    type Context = SoftObject;
    type SwapChain = SoftSwapChain;
    type Texture = SoftSurfaceObject;
    type RenderTargetView = SoftSurfaceObject;

    fn create_device(&self, _debug: bool) -> GraphicsResult<(SoftObject, SoftObject, FeatureLevel)> {
        if let Some(reason) = self.ledger.borrow().faults.device.clone() {
            return Err(GraphicsError::DeviceCreation(reason));
        }
        self.ledger.borrow_mut().calls.push(DriverCall::CreateDevice);
        let device = SoftObject::new(&self.ledger, ObjectKind::Device);
        let context = SoftObject::new(&self.ledger, ObjectKind::Context);
        Ok((device, context, FeatureLevel::Level11_0))
    }

    fn create_factory(&self, _debug: bool) -> GraphicsResult<SoftObject> {
        self.ledger.borrow_mut().calls.push(DriverCall::CreateFactory);
        Ok(SoftObject::new(&self.ledger, ObjectKind::Factory))
    }

    fn create_swapchain_for_surface(
        &self,
        _factory: &SoftObject,
        _device: &SoftObject,
        _surface: &NativeSurface,
        desc: &SwapchainDesc,
    ) -> GraphicsResult<SoftSwapChain> {
        {
            let mut ledger = self.ledger.borrow_mut();
            if let Some(reason) = ledger.faults.swapchain.clone() {
                return Err(GraphicsError::SwapchainCreation(reason));
            }
            ledger.calls.push(DriverCall::CreateSwapChain(desc.extent));
            ledger.swapchain_extent = desc.extent;
        }
        Ok(SoftSwapChain {
            _handle: SoftObject::new(&self.ledger, ObjectKind::SwapChain),
            extent: RefCell::new(desc.extent),
        })
    }

    fn get_buffer(&self, swapchain: &SoftSwapChain, _index: u32) -> GraphicsResult<SoftSurfaceObject> {
        let extent = *swapchain.extent.borrow();
        self.ledger.borrow_mut().calls.push(DriverCall::GetBuffer(extent));
        Ok(SoftSurfaceObject {
            _handle: SoftObject::new(&self.ledger, ObjectKind::Texture),
            extent,
        })
    }

    fn texture_extent(&self, texture: &SoftSurfaceObject) -> Extent2D {
        texture.extent
    }

    fn create_render_target_view(&self, _device: &SoftObject, texture: &SoftSurfaceObject) -> GraphicsResult<SoftSurfaceObject> {
        self.ledger
            .borrow_mut()
            .calls
            .push(DriverCall::CreateRenderTargetView(texture.extent));
        Ok(SoftSurfaceObject {
            _handle: SoftObject::new(&self.ledger, ObjectKind::RenderTargetView),
            extent: texture.extent,
        })
    }

    fn clear_render_target_view(&self, _context: &SoftObject, view: &SoftSurfaceObject, color: [f32; 4]) {
        let mut ledger = self.ledger.borrow_mut();
        if view.extent != ledger.swapchain_extent {
            ledger.stale_clears += 1;
        }
        ledger.calls.push(DriverCall::Clear {
            extent: view.extent,
            color,
        });
    }

    fn present(&self, _swapchain: &SoftSwapChain, _sync_interval: u32) -> GraphicsResult<()> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.presents += 1;
        let ok = !ledger.faults.failing_presents.contains(&ledger.presents);
        ledger.calls.push(DriverCall::Present { ok });
        if ok {
            Ok(())
        } else {
            Err(GraphicsError::Present(format!(
                "simulated DXGI_ERROR_DEVICE_REMOVED on present #{}",
                ledger.presents
            )))
        }
    }

    fn resize_buffers(&self, swapchain: &SoftSwapChain, desc: &SwapchainDesc) -> GraphicsResult<()> {
        let mut ledger = self.ledger.borrow_mut();
        let resize_error = |reason: &str| GraphicsError::Resize {
            width: desc.extent.width,
            height: desc.extent.height,
            reason: reason.to_string(),
        };

        let references = ledger.live_count(ObjectKind::Texture) + ledger.live_count(ObjectKind::RenderTargetView);
        let failure = if references > 0 {
            Some(resize_error("DXGI_ERROR_INVALID_CALL: back buffer still referenced"))
        } else if ledger.faults.resize_failures > 0 {
            ledger.faults.resize_failures -= 1;
            Some(resize_error("simulated ResizeBuffers failure"))
        } else {
            None
        };

        ledger.calls.push(DriverCall::ResizeBuffers {
            extent: desc.extent,
            ok: failure.is_none(),
        });
        if let Some(err) = failure {
            return Err(err);
        }

        ledger.swapchain_extent = desc.extent;
        *swapchain.extent.borrow_mut() = desc.extent;
        Ok(())
    }

    fn drain_debug_messages(&self, _device: &SoftObject, sink: &mut dyn DebugMessageSink) {
        let messages = std::mem::take(&mut self.ledger.borrow_mut().messages);
        for message in &messages {
            sink.on_message(message);
        }
    }
}

/// [`SoftwareD3d11`] 的观察与故障注入句柄
#[derive(Debug, Clone)]
pub struct SoftwareD3d11Probe {
    ledger: Rc<RefCell<Ledger>>,
}

impl SoftwareD3d11Probe {
    /// 完整的驱动调用序列
    pub fn calls(&self) -> Vec<DriverCall> {
        self.ledger.borrow().calls.clone()
    }

    /// Present 调用次数（包括失败的）
    pub fn present_calls(&self) -> u64 {
        self.ledger.borrow().presents
    }

    pub fn successful_presents(&self) -> usize {
        self.ledger
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, DriverCall::Present { ok: true }))
            .count()
    }

    /// 当前存活的对象数量
    pub fn live_objects(&self) -> usize {
        self.ledger.borrow().live.len()
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.ledger.borrow().live_count(kind)
    }

    /// 对已释放对象再次释放的次数
    pub fn double_releases(&self) -> usize {
        self.ledger.borrow().double_releases
    }

    /// 按时间顺序的释放记录
    pub fn release_order(&self) -> Vec<ObjectKind> {
        self.ledger
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Release(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    /// 清除了尺寸与交换链不一致的视图的次数
    pub fn stale_clears(&self) -> usize {
        self.ledger.borrow().stale_clears
    }

    /// 第 n 次（从 1 开始）Present 失败
    pub fn fail_present_on(&self, presents: impl IntoIterator<Item = u64>) {
        self.ledger.borrow_mut().faults.failing_presents.extend(presents);
    }

    /// 接下来的 `count` 次 ResizeBuffers 失败
    pub fn fail_next_resizes(&self, count: u32) {
        self.ledger.borrow_mut().faults.resize_failures = count;
    }

    pub fn fail_device_creation(&self, reason: impl Into<String>) {
        self.ledger.borrow_mut().faults.device = Some(reason.into());
    }

    pub fn fail_swapchain_creation(&self, reason: impl Into<String>) {
        self.ledger.borrow_mut().faults.swapchain = Some(reason.into());
    }

    pub fn inject_debug_message(&self, message: DebugMessage) {
        self.ledger.borrow_mut().messages.push(message);
    }
}
