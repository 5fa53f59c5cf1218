//! 软件 GL 驱动
//!
//! 不访问 GPU，只记录调用。用于无窗口模式和测试：
//! 通过 [`SoftwareGlProbe`] 读取调用计数或注入故障。

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::core::error::{GraphicsError, GraphicsResult};
use crate::core::math::Extent2D;
use crate::gfx::debug::{DebugMessage, DebugMessageSink};
use crate::platform::NativeSurface;
use super::api::GlApi;

#[derive(Debug, Default)]
struct GlLedger {
    contexts_created: u32,
    contexts_destroyed: u32,
    context_live: bool,
    framebuffer: Extent2D,
    binds: u64,
    clears: Vec<[f32; 4]>,
    swaps: u64,
    successful_swaps: u64,
    failing_swaps: HashSet<u64>,
    context_failure: Option<String>,
    messages: Vec<DebugMessage>,
}

/// 软件 GL 驱动
#[derive(Debug, Default)]
pub struct SoftwareGl {
    ledger: Rc<RefCell<GlLedger>>,
}

impl SoftwareGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// 共享同一份调用记录的观察者
    pub fn probe(&self) -> SoftwareGlProbe {
        SoftwareGlProbe {
            ledger: self.ledger.clone(),
        }
    }
}

impl GlApi for SoftwareGl {
    fn name(&self) -> &str {
        "software"
    }

    fn create_context(&mut self, _surface: &NativeSurface, framebuffer: Extent2D, _debug: bool) -> GraphicsResult<()> {
        let mut ledger = self.ledger.borrow_mut();
        if let Some(reason) = ledger.context_failure.clone() {
            return Err(GraphicsError::DeviceCreation(reason));
        }
        ledger.contexts_created += 1;
        ledger.context_live = true;
        ledger.framebuffer = framebuffer;
        Ok(())
    }

    fn bind_default_framebuffer(&mut self) -> GraphicsResult<Extent2D> {
        let mut ledger = self.ledger.borrow_mut();
        if !ledger.context_live {
            return Err(GraphicsError::InvalidState("no current GL context".to_string()));
        }
        ledger.binds += 1;
        Ok(ledger.framebuffer)
    }

    fn clear_color_buffer(&mut self, color: [f32; 4]) {
        self.ledger.borrow_mut().clears.push(color);
    }

    fn swap_buffers(&mut self) -> GraphicsResult<()> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.swaps += 1;
        if ledger.failing_swaps.contains(&ledger.swaps) {
            return Err(GraphicsError::Present(format!("simulated swap failure #{}", ledger.swaps)));
        }
        ledger.successful_swaps += 1;
        Ok(())
    }

    fn drain_debug_messages(&mut self, sink: &mut dyn DebugMessageSink) {
        let messages = std::mem::take(&mut self.ledger.borrow_mut().messages);
        for message in &messages {
            sink.on_message(message);
        }
    }

    fn destroy_context(&mut self) {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.context_live {
            ledger.context_live = false;
            ledger.contexts_destroyed += 1;
        }
    }
}

/// [`SoftwareGl`] 的观察与故障注入句柄
#[derive(Debug, Clone)]
pub struct SoftwareGlProbe {
    ledger: Rc<RefCell<GlLedger>>,
}

impl SoftwareGlProbe {
    pub fn contexts_created(&self) -> u32 {
        self.ledger.borrow().contexts_created
    }

    pub fn contexts_destroyed(&self) -> u32 {
        self.ledger.borrow().contexts_destroyed
    }

    pub fn context_live(&self) -> bool {
        self.ledger.borrow().context_live
    }

    pub fn binds(&self) -> u64 {
        self.ledger.borrow().binds
    }

    pub fn clears(&self) -> Vec<[f32; 4]> {
        self.ledger.borrow().clears.clone()
    }

    /// 包括失败的交换
    pub fn swaps(&self) -> u64 {
        self.ledger.borrow().swaps
    }

    pub fn successful_swaps(&self) -> u64 {
        self.ledger.borrow().successful_swaps
    }

    /// 模拟窗口系统改变默认帧缓冲尺寸
    pub fn set_framebuffer(&self, extent: Extent2D) {
        self.ledger.borrow_mut().framebuffer = extent;
    }

    /// 第 n 次（从 1 开始）交换失败
    pub fn fail_swap_on(&self, swaps: impl IntoIterator<Item = u64>) {
        self.ledger.borrow_mut().failing_swaps.extend(swaps);
    }

    pub fn fail_context_creation(&self, reason: impl Into<String>) {
        self.ledger.borrow_mut().context_failure = Some(reason.into());
    }

    pub fn inject_debug_message(&self, message: DebugMessage) {
        self.ledger.borrow_mut().messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_requires_context() {
        let mut gl = SoftwareGl::new();
        assert!(gl.bind_default_framebuffer().is_err());

        gl.create_context(&NativeSurface::Headless, Extent2D::new(640, 480), false).unwrap();
        assert_eq!(gl.bind_default_framebuffer().unwrap(), Extent2D::new(640, 480));
    }

    #[test]
    fn test_destroy_counts_once() {
        let mut gl = SoftwareGl::new();
        let probe = gl.probe();
        gl.create_context(&NativeSurface::Headless, Extent2D::new(1, 1), false).unwrap();

        gl.destroy_context();
        gl.destroy_context();

        assert_eq!(probe.contexts_destroyed(), 1);
    }
}
