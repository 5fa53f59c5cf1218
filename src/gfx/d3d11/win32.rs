//! Win32 Direct3D 11 驱动
//!
//! 通过 `windows` crate 调用 D3D11 与 DXGI。交换链绑定到 winit 窗口的 HWND。

use tracing::{debug, warn};
use windows::Win32::Foundation::{HMODULE, HWND};
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::core::Interface;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};

use crate::core::error::{GraphicsError, GraphicsResult};
use crate::core::math::Extent2D;
use crate::gfx::debug::{DebugMessage, DebugMessageSink, DebugSeverity};
use crate::platform::NativeSurface;
use super::api::{D3d11Api, FeatureLevel, PixelFormat, SwapEffect, SwapchainDesc};

/// Win32 D3D11 驱动
#[derive(Debug, Default)]
pub struct Win32D3d11;

impl Win32D3d11 {
    pub fn new() -> Self {
        Self
    }
}

fn hwnd_of(surface: &NativeSurface) -> GraphicsResult<HWND> {
    let window = surface
        .winit_window()
        .ok_or_else(|| GraphicsError::SwapchainCreation("Direct3D 11 requires a native window surface".to_string()))?;
    let handle = window
        .window_handle()
        .map_err(|e| GraphicsError::SwapchainCreation(format!("Failed to get window handle: {}", e)))?;
    match handle.as_raw() {
        RawWindowHandle::Win32(win32_handle) => Ok(HWND(win32_handle.hwnd.get() as *mut std::ffi::c_void)),
        _ => Err(GraphicsError::SwapchainCreation("Expected a Win32 window handle".to_string())),
    }
}

fn dxgi_format(format: PixelFormat) -> DXGI_FORMAT {
    match format {
        PixelFormat::Bgra8Unorm => DXGI_FORMAT_B8G8R8A8_UNORM,
    }
}

fn swap_effect(effect: SwapEffect) -> DXGI_SWAP_EFFECT {
    match effect {
        SwapEffect::FlipDiscard => DXGI_SWAP_EFFECT_FLIP_DISCARD,
    }
}

fn feature_level(level: D3D_FEATURE_LEVEL) -> FeatureLevel {
    match level {
        D3D_FEATURE_LEVEL_11_1 => FeatureLevel::Level11_1,
        D3D_FEATURE_LEVEL_11_0 => FeatureLevel::Level11_0,
        D3D_FEATURE_LEVEL_10_1 => FeatureLevel::Level10_1,
        D3D_FEATURE_LEVEL_10_0 => FeatureLevel::Level10_0,
        other => FeatureLevel::Other(other.0 as u32),
    }
}

fn severity(severity: D3D11_MESSAGE_SEVERITY) -> DebugSeverity {
    match severity {
        D3D11_MESSAGE_SEVERITY_CORRUPTION => DebugSeverity::Corruption,
        D3D11_MESSAGE_SEVERITY_ERROR => DebugSeverity::Error,
        D3D11_MESSAGE_SEVERITY_WARNING => DebugSeverity::Warning,
        D3D11_MESSAGE_SEVERITY_INFO => DebugSeverity::Info,
        _ => DebugSeverity::Message,
    }
}

impl D3d11Api for Win32D3d11 {
    type Factory = IDXGIFactory2;
    type Device = ID3D11Device;
    type Context = ID3D11DeviceContext;
    type SwapChain = IDXGISwapChain1;
    type Texture = ID3D11Texture2D;
    type RenderTargetView = ID3D11RenderTargetView;

    fn create_device(&self, debug: bool) -> GraphicsResult<(ID3D11Device, ID3D11DeviceContext, FeatureLevel)> {
        let mut flags = D3D11_CREATE_DEVICE_BGRA_SUPPORT;
        if debug {
            flags |= D3D11_CREATE_DEVICE_DEBUG;
        }
        let levels = [
            D3D_FEATURE_LEVEL_11_1,
            D3D_FEATURE_LEVEL_11_0,
            D3D_FEATURE_LEVEL_10_1,
            D3D_FEATURE_LEVEL_10_0,
        ];

        let mut device: Option<ID3D11Device> = None;
        let mut context: Option<ID3D11DeviceContext> = None;
        let mut level = D3D_FEATURE_LEVEL::default();

        unsafe {
            D3D11CreateDevice(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                HMODULE::default(),
                flags,
                Some(&levels),
                D3D11_SDK_VERSION,
                Some(&mut device),
                Some(&mut level),
                Some(&mut context),
            )
        }
        .map_err(|e| GraphicsError::DeviceCreation(format!("D3D11CreateDevice failed: {}", e)))?;

        match (device, context) {
            (Some(device), Some(context)) => Ok((device, context, feature_level(level))),
            _ => Err(GraphicsError::DeviceCreation(
                "D3D11CreateDevice returned no device".to_string(),
            )),
        }
    }

    fn create_factory(&self, debug: bool) -> GraphicsResult<IDXGIFactory2> {
        let flags = if debug {
            DXGI_CREATE_FACTORY_DEBUG
        } else {
            DXGI_CREATE_FACTORY_FLAGS(0)
        };
        unsafe { CreateDXGIFactory2(flags) }
            .map_err(|e| GraphicsError::DeviceCreation(format!("CreateDXGIFactory2 failed: {}", e)))
    }

    fn create_swapchain_for_surface(
        &self,
        factory: &IDXGIFactory2,
        device: &ID3D11Device,
        surface: &NativeSurface,
        desc: &SwapchainDesc,
    ) -> GraphicsResult<IDXGISwapChain1> {
        let hwnd = hwnd_of(surface)?;
        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: desc.extent.width,
            Height: desc.extent.height,
            Format: dxgi_format(desc.format),
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: desc.sample_count,
                Quality: 0,
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: desc.buffer_count,
            SwapEffect: swap_effect(desc.swap_effect),
            ..Default::default()
        };

        unsafe { factory.CreateSwapChainForHwnd(device, hwnd, &swap_chain_desc, None, None) }
            .map_err(|e| GraphicsError::SwapchainCreation(format!("CreateSwapChainForHwnd failed: {}", e)))
    }

    fn get_buffer(&self, swapchain: &IDXGISwapChain1, index: u32) -> GraphicsResult<ID3D11Texture2D> {
        unsafe { swapchain.GetBuffer::<ID3D11Texture2D>(index) }
            .map_err(|e| GraphicsError::ResourceCreation(e.to_string()))
    }

    fn texture_extent(&self, texture: &ID3D11Texture2D) -> Extent2D {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };
        Extent2D::new(desc.Width, desc.Height)
    }

    fn create_render_target_view(
        &self,
        device: &ID3D11Device,
        texture: &ID3D11Texture2D,
    ) -> GraphicsResult<ID3D11RenderTargetView> {
        let mut view: Option<ID3D11RenderTargetView> = None;
        unsafe { device.CreateRenderTargetView(texture, None, Some(&mut view)) }
            .map_err(|e| GraphicsError::ResourceCreation(e.to_string()))?;
        view.ok_or_else(|| GraphicsError::ResourceCreation("CreateRenderTargetView returned no view".to_string()))
    }

    fn clear_render_target_view(&self, context: &ID3D11DeviceContext, view: &ID3D11RenderTargetView, color: [f32; 4]) {
        unsafe { context.ClearRenderTargetView(view, &color) };
    }

    fn present(&self, swapchain: &IDXGISwapChain1, sync_interval: u32) -> GraphicsResult<()> {
        unsafe { swapchain.Present(sync_interval, DXGI_PRESENT(0)) }
            .ok()
            .map_err(|e| GraphicsError::Present(e.to_string()))
    }

    fn resize_buffers(&self, swapchain: &IDXGISwapChain1, desc: &SwapchainDesc) -> GraphicsResult<()> {
        unsafe {
            swapchain.ResizeBuffers(
                desc.buffer_count,
                desc.extent.width,
                desc.extent.height,
                dxgi_format(desc.format),
                DXGI_SWAP_CHAIN_FLAG(0),
            )
        }
        .map_err(|e| GraphicsError::Resize {
            width: desc.extent.width,
            height: desc.extent.height,
            reason: e.to_string(),
        })
    }

    fn drain_debug_messages(&self, device: &ID3D11Device, sink: &mut dyn DebugMessageSink) {
        // 只有调试设备才暴露 InfoQueue
        let Ok(queue) = device.cast::<ID3D11InfoQueue>() else {
            return;
        };

        unsafe {
            let count = queue.GetNumStoredMessages();
            for index in 0..count {
                let mut length = 0usize;
                if queue.GetMessage(index, None, &mut length).is_err() || length == 0 {
                    continue;
                }

                // D3D11_MESSAGE 后面紧跟描述字符串，按 8 字节对齐分配
                let mut storage = vec![0u64; length.div_ceil(8)];
                let message = storage.as_mut_ptr() as *mut D3D11_MESSAGE;
                if let Err(e) = queue.GetMessage(index, Some(message), &mut length) {
                    warn!("Failed to read D3D11 debug message: {}", e);
                    continue;
                }

                let message = &*message;
                let bytes = std::slice::from_raw_parts(message.pDescription, message.DescriptionByteLength);
                let text = String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string();
                sink.on_message(&DebugMessage::new(severity(message.Severity), text));
            }
            if count > 0 {
                debug!(count, "Drained D3D11 debug messages");
            }
            queue.ClearStoredMessages();
        }
    }
}
