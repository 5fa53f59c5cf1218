//! 基于 wgpu GL 后端的 OpenGL 驱动
//!
//! 本模块通过 wgpu 的 OpenGL（EGL / WGL）后端驱动窗口的默认帧缓冲：
//! - 创建只启用 GL 后端的 wgpu 实例
//! - 在 winit 窗口上创建表面
//! - 选择适配器并创建设备和队列
//! - 按窗口尺寸配置表面
//!
//! 表面尺寸在每次绑定帧缓冲时与窗口同步，
//! 调用方不需要显式处理尺寸变化。

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use winit::window::Window;

use crate::core::error::{GraphicsError, GraphicsResult};
use crate::core::math::Extent2D;
use crate::gfx::debug::{DebugMessage, DebugMessageSink, DebugSeverity};
use crate::platform::NativeSurface;
use super::api::GlApi;

/// 已创建的 GL 对象
///
/// 字段按释放顺序声明：表面先于设备释放，窗口最后释放。
struct GlGpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
}

impl GlGpu {
    fn reconfigure(&mut self, extent: Extent2D) {
        self.surface_config.width = extent.width;
        self.surface_config.height = extent.height;
        self.surface.configure(&self.device, &self.surface_config);
    }
}

/// 当前帧：后备缓冲和它的视图
struct GlBackbuffer {
    view: wgpu::TextureView,
    texture: wgpu::SurfaceTexture,
}

/// wgpu GL 驱动
#[derive(Default)]
pub struct WgpuGl {
    gpu: Option<GlGpu>,
    frame: Option<GlBackbuffer>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl WgpuGl {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GlApi for WgpuGl {
    fn name(&self) -> &str {
        "wgpu-gl"
    }

    fn create_context(&mut self, surface: &NativeSurface, framebuffer: Extent2D, debug: bool) -> GraphicsResult<()> {
        let window = surface
            .winit_window()
            .cloned()
            .ok_or_else(|| GraphicsError::DeviceCreation("OpenGL requires a native window surface".to_string()))?;

        // 1. 创建只启用 GL 后端的实例
        debug!("Creating wgpu GL instance");
        let flags = if debug {
            wgpu::InstanceFlags::DEBUG | wgpu::InstanceFlags::VALIDATION
        } else {
            wgpu::InstanceFlags::default()
        };
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::GL,
            dx12_shader_compiler: Default::default(),
            flags,
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        // 2. 创建表面
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create GL surface: {}", e)))?;

        // 3. 请求适配器
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| GraphicsError::DeviceCreation("No OpenGL adapter available".to_string()))?;

        info!("Selected GL adapter: {:?}", adapter.get_info());

        // 4. 请求设备和队列
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("GL Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
            },
            None,
        ))
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create GL device: {}", e)))?;

        let errors = self.errors.clone();
        device.on_uncaptured_error(Box::new(move |error: wgpu::Error| {
            if let Ok(mut queue) = errors.lock() {
                queue.push(error.to_string());
            }
        }));

        // 5. 配置表面
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| matches!(f, wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Rgba8Unorm))
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| GraphicsError::DeviceCreation("GL surface reports no formats".to_string()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        debug!("GL surface format: {:?}", format);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: framebuffer.width.max(1),
            height: framebuffer.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        self.gpu = Some(GlGpu {
            surface,
            device,
            queue,
            surface_config,
            window,
        });
        Ok(())
    }

    fn bind_default_framebuffer(&mut self) -> GraphicsResult<Extent2D> {
        let gpu = self
            .gpu
            .as_mut()
            .ok_or_else(|| GraphicsError::InvalidState("no current GL context".to_string()))?;

        let size = gpu.window.inner_size();
        let extent = Extent2D::new(size.width, size.height);
        if extent.is_empty() {
            return Err(GraphicsError::ResourceCreation("default framebuffer has zero size".to_string()));
        }
        if extent.width != gpu.surface_config.width || extent.height != gpu.surface_config.height {
            gpu.reconfigure(extent);
        }

        let texture = match gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                gpu.reconfigure(extent);
                return Err(GraphicsError::ResourceCreation("surface outdated, reconfigured".to_string()));
            }
            Err(e) => return Err(GraphicsError::ResourceCreation(e.to_string())),
        };
        let view = texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(GlBackbuffer { view, texture });
        Ok(extent)
    }

    fn clear_color_buffer(&mut self, color: [f32; 4]) {
        let (Some(gpu), Some(frame)) = (self.gpu.as_ref(), self.frame.as_ref()) else {
            warn!("clear without a bound framebuffer");
            return;
        };

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Clear Encoder"),
        });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(color[0]),
                            g: f64::from(color[1]),
                            b: f64::from(color[2]),
                            a: f64::from(color[3]),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        gpu.queue.submit(Some(encoder.finish()));
    }

    fn swap_buffers(&mut self) -> GraphicsResult<()> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| GraphicsError::Present("no framebuffer bound".to_string()))?;
        drop(frame.view);
        frame.texture.present();
        Ok(())
    }

    fn drain_debug_messages(&mut self, sink: &mut dyn DebugMessageSink) {
        let messages = match self.errors.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => return,
        };
        for text in messages {
            sink.on_message(&DebugMessage::new(DebugSeverity::Error, text));
        }
    }

    fn destroy_context(&mut self) {
        self.frame = None;
        if self.gpu.take().is_some() {
            debug!("wgpu GL device released");
        }
    }
}
