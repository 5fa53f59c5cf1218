//! winit 桌面窗口
//!
//! 把 winit 0.29 的事件循环翻译成 [`WindowHandler`] 生命周期回调：
//!
//! | winit 事件 | 回调 |
//! |------------|------|
//! | `Resumed`（首次） | `on_load` |
//! | `Resized` | `on_framebuffer_resize` |
//! | `KeyboardInput`（按下） | `on_key_down` |
//! | `RedrawRequested` | `on_update` + `on_render` |
//! | `LoopExiting` | `on_close` |

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, StartCause, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, NativeKeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::core::config::{RedrawMode, WindowConfig};
use crate::core::error::{DistPresentError, Result, WindowError};
use crate::core::event::{Key, Keyboard, KeyboardEvent, KeyboardId};
use crate::core::math::{Extent2D, Position2D};
use super::window::{NativeSurface, Window, WindowContext, WindowHandler};

/// winit 不区分物理键盘，所有按键都归到这个逻辑键盘上
pub const SYSTEM_KEYBOARD: KeyboardId = KeyboardId(0);

/// 基于 winit 的桌面窗口
pub struct WinitWindow {
    event_loop: EventLoop<()>,
    window: Arc<winit::window::Window>,
    context: WindowContext,
    redraw: RedrawMode,
}

impl WinitWindow {
    /// 创建事件循环和窗口
    ///
    /// 窗口立即可见，但在事件循环开始前不会发出任何回调。
    pub fn create(config: &WindowConfig) -> Result<Self> {
        info!(
            width = config.width,
            height = config.height,
            title = %config.title,
            "Creating window"
        );

        let event_loop = EventLoop::new()
            .map_err(|e| WindowError::Creation(format!("Failed to create event loop: {}", e)))?;

        let window = WindowBuilder::new()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_position(PhysicalPosition::new(config.x, config.y))
            .with_resizable(config.resizable)
            .build(&event_loop)
            .map_err(|e| WindowError::Creation(format!("Failed to create window: {}", e)))?;
        let window = Arc::new(window);

        let size = window.inner_size();
        let context = WindowContext::new(
            config,
            Extent2D::new(size.width, size.height),
            NativeSurface::Winit(window.clone()),
            vec![Keyboard::new(SYSTEM_KEYBOARD.0, "System keyboard")],
        );

        Ok(Self {
            event_loop,
            window,
            context,
            redraw: config.redraw,
        })
    }
}

impl Window for WinitWindow {
    fn context(&self) -> &WindowContext {
        &self.context
    }

    fn run(self, handler: &mut dyn WindowHandler) -> Result<()> {
        let WinitWindow {
            event_loop,
            window,
            mut context,
            redraw,
        } = self;

        let mut loaded = false;
        let mut closed = false;
        let mut load_error: Option<DistPresentError> = None;
        let mut last_frame = Instant::now();

        event_loop
            .run(|event, elwt| match event {
                Event::NewEvents(StartCause::Init) => {
                    elwt.set_control_flow(match redraw {
                        RedrawMode::Continuous => ControlFlow::Poll,
                        RedrawMode::OnDemand => ControlFlow::Wait,
                    });
                }
                Event::Resumed if !loaded => {
                    loaded = true;
                    if let Err(e) = handler.on_load(&mut context) {
                        error!("Window load failed: {}", e);
                        load_error = Some(e);
                        context.close();
                        elwt.exit();
                    } else {
                        last_frame = Instant::now();
                        window.request_redraw();
                    }
                }
                Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                    WindowEvent::CloseRequested => {
                        info!("Close requested");
                        context.close();
                    }
                    WindowEvent::Resized(size) => {
                        let extent = Extent2D::new(size.width, size.height);
                        if extent != context.framebuffer_size() {
                            debug!(width = extent.width, height = extent.height, "Window resized");
                            context.set_framebuffer_size(extent);
                            if loaded {
                                handler.on_framebuffer_resize(&mut context, extent);
                            }
                            if redraw == RedrawMode::OnDemand {
                                window.request_redraw();
                            }
                        }
                    }
                    WindowEvent::Moved(position) => {
                        context.set_position(Position2D::new(position.x, position.y));
                    }
                    WindowEvent::KeyboardInput { event: key_event, .. } => {
                        if loaded && key_event.state == ElementState::Pressed && !key_event.repeat {
                            let (key, code) = translate_key(key_event.physical_key);
                            handler.on_key_down(&mut context, &KeyboardEvent::new(SYSTEM_KEYBOARD, key, code));
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        if loaded && !context.is_closing() {
                            let now = Instant::now();
                            let delta_time = now.duration_since(last_frame).as_secs_f64();
                            last_frame = now;

                            handler.on_update(&mut context, delta_time);
                            handler.on_render(&mut context, delta_time);
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    if context.is_closing() {
                        elwt.exit();
                    } else if loaded && redraw == RedrawMode::Continuous {
                        window.request_redraw();
                    }
                }
                Event::LoopExiting => {
                    if !closed {
                        closed = true;
                        handler.on_close(&mut context);
                    }
                }
                _ => {}
            })
            .map_err(|e| WindowError::EventLoop(e.to_string()))?;

        match load_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// 把 winit 物理按键转换为 [`Key`] 和扫描码
///
/// 扫描码使用 USB HID 键盘页的 usage id，没有命名的按键以 `Key::Other(usage)` 转发。
/// 键盘页以外的按键（媒体键、浏览器键等）和未识别的按键使用平台原生码。
fn translate_key(physical: PhysicalKey) -> (Key, i32) {
    match physical {
        PhysicalKey::Code(code) => {
            let usage = hid_usage(code).unwrap_or(0);
            let key = named_key(code).unwrap_or(Key::Other(usage));
            (key, usage as i32)
        }
        PhysicalKey::Unidentified(native) => {
            let code = native_code(native);
            (Key::Other(code), code as i32)
        }
    }
}

fn native_code(native: NativeKeyCode) -> u32 {
    match native {
        NativeKeyCode::Windows(code) => u32::from(code),
        NativeKeyCode::MacOS(code) => u32::from(code),
        NativeKeyCode::Xkb(code) | NativeKeyCode::Android(code) => code,
        NativeKeyCode::Unidentified => 0,
    }
}

fn named_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter => Key::Enter,
        KeyCode::Space => Key::Space,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        KeyCode::F6 => Key::F6,
        KeyCode::F7 => Key::F7,
        KeyCode::F8 => Key::F8,
        KeyCode::F9 => Key::F9,
        KeyCode::F10 => Key::F10,
        KeyCode::F11 => Key::F11,
        KeyCode::F12 => Key::F12,
        _ => return None,
    };
    Some(key)
}

/// USB HID 键盘页（0x07）usage id
fn hid_usage(code: KeyCode) -> Option<u32> {
    let usage = match code {
        KeyCode::KeyA => 0x04,
        KeyCode::KeyB => 0x05,
        KeyCode::KeyC => 0x06,
        KeyCode::KeyD => 0x07,
        KeyCode::KeyE => 0x08,
        KeyCode::KeyF => 0x09,
        KeyCode::KeyG => 0x0A,
        KeyCode::KeyH => 0x0B,
        KeyCode::KeyI => 0x0C,
        KeyCode::KeyJ => 0x0D,
        KeyCode::KeyK => 0x0E,
        KeyCode::KeyL => 0x0F,
        KeyCode::KeyM => 0x10,
        KeyCode::KeyN => 0x11,
        KeyCode::KeyO => 0x12,
        KeyCode::KeyP => 0x13,
        KeyCode::KeyQ => 0x14,
        KeyCode::KeyR => 0x15,
        KeyCode::KeyS => 0x16,
        KeyCode::KeyT => 0x17,
        KeyCode::KeyU => 0x18,
        KeyCode::KeyV => 0x19,
        KeyCode::KeyW => 0x1A,
        KeyCode::KeyX => 0x1B,
        KeyCode::KeyY => 0x1C,
        KeyCode::KeyZ => 0x1D,
        KeyCode::Digit1 => 0x1E,
        KeyCode::Digit2 => 0x1F,
        KeyCode::Digit3 => 0x20,
        KeyCode::Digit4 => 0x21,
        KeyCode::Digit5 => 0x22,
        KeyCode::Digit6 => 0x23,
        KeyCode::Digit7 => 0x24,
        KeyCode::Digit8 => 0x25,
        KeyCode::Digit9 => 0x26,
        KeyCode::Digit0 => 0x27,
        KeyCode::Enter => 0x28,
        KeyCode::Escape => 0x29,
        KeyCode::Backspace => 0x2A,
        KeyCode::Tab => 0x2B,
        KeyCode::Space => 0x2C,
        KeyCode::Minus => 0x2D,
        KeyCode::Equal => 0x2E,
        KeyCode::BracketLeft => 0x2F,
        KeyCode::BracketRight => 0x30,
        KeyCode::Backslash => 0x31,
        KeyCode::Semicolon => 0x33,
        KeyCode::Quote => 0x34,
        KeyCode::Backquote => 0x35,
        KeyCode::Comma => 0x36,
        KeyCode::Period => 0x37,
        KeyCode::Slash => 0x38,
        KeyCode::CapsLock => 0x39,
        KeyCode::F1 => 0x3A,
        KeyCode::F2 => 0x3B,
        KeyCode::F3 => 0x3C,
        KeyCode::F4 => 0x3D,
        KeyCode::F5 => 0x3E,
        KeyCode::F6 => 0x3F,
        KeyCode::F7 => 0x40,
        KeyCode::F8 => 0x41,
        KeyCode::F9 => 0x42,
        KeyCode::F10 => 0x43,
        KeyCode::F11 => 0x44,
        KeyCode::F12 => 0x45,
        KeyCode::PrintScreen => 0x46,
        KeyCode::ScrollLock => 0x47,
        KeyCode::Pause => 0x48,
        KeyCode::Insert => 0x49,
        KeyCode::Home => 0x4A,
        KeyCode::PageUp => 0x4B,
        KeyCode::Delete => 0x4C,
        KeyCode::End => 0x4D,
        KeyCode::PageDown => 0x4E,
        KeyCode::ArrowRight => 0x4F,
        KeyCode::ArrowLeft => 0x50,
        KeyCode::ArrowDown => 0x51,
        KeyCode::ArrowUp => 0x52,
        KeyCode::NumLock => 0x53,
        KeyCode::NumpadDivide => 0x54,
        KeyCode::NumpadMultiply => 0x55,
        KeyCode::NumpadSubtract => 0x56,
        KeyCode::NumpadAdd => 0x57,
        KeyCode::NumpadEnter => 0x58,
        KeyCode::Numpad1 => 0x59,
        KeyCode::Numpad2 => 0x5A,
        KeyCode::Numpad3 => 0x5B,
        KeyCode::Numpad4 => 0x5C,
        KeyCode::Numpad5 => 0x5D,
        KeyCode::Numpad6 => 0x5E,
        KeyCode::Numpad7 => 0x5F,
        KeyCode::Numpad8 => 0x60,
        KeyCode::Numpad9 => 0x61,
        KeyCode::Numpad0 => 0x62,
        KeyCode::NumpadDecimal => 0x63,
        KeyCode::IntlBackslash => 0x64,
        KeyCode::ContextMenu => 0x65,
        KeyCode::Power => 0x66,
        KeyCode::NumpadEqual => 0x67,
        KeyCode::F13 => 0x68,
        KeyCode::F14 => 0x69,
        KeyCode::F15 => 0x6A,
        KeyCode::F16 => 0x6B,
        KeyCode::F17 => 0x6C,
        KeyCode::F18 => 0x6D,
        KeyCode::F19 => 0x6E,
        KeyCode::F20 => 0x6F,
        KeyCode::F21 => 0x70,
        KeyCode::F22 => 0x71,
        KeyCode::F23 => 0x72,
        KeyCode::F24 => 0x73,
        KeyCode::Help => 0x75,
        KeyCode::AudioVolumeMute => 0x7F,
        KeyCode::AudioVolumeUp => 0x80,
        KeyCode::AudioVolumeDown => 0x81,
        KeyCode::NumpadComma => 0x85,
        KeyCode::IntlRo => 0x87,
        KeyCode::KanaMode => 0x88,
        KeyCode::IntlYen => 0x89,
        KeyCode::Convert => 0x8A,
        KeyCode::NonConvert => 0x8B,
        KeyCode::Lang1 => 0x90,
        KeyCode::Lang2 => 0x91,
        KeyCode::Lang3 => 0x92,
        KeyCode::Lang4 => 0x93,
        KeyCode::Lang5 => 0x94,
        KeyCode::ControlLeft => 0xE0,
        KeyCode::ShiftLeft => 0xE1,
        KeyCode::AltLeft => 0xE2,
        KeyCode::SuperLeft => 0xE3,
        KeyCode::ControlRight => 0xE4,
        KeyCode::ShiftRight => 0xE5,
        KeyCode::AltRight => 0xE6,
        KeyCode::SuperRight => 0xE7,
        _ => return None,
    };
    Some(usage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_named_keys() {
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::Escape)), (Key::Escape, 0x29));
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::KeyW)), (Key::W, 0x1A));
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::F12)), (Key::F12, 0x45));
    }

    #[test]
    fn test_unnamed_keys_keep_their_usage() {
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::KeyQ)), (Key::Other(0x14), 0x14));
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::Digit1)), (Key::Other(0x1E), 0x1E));
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::ControlLeft)), (Key::Other(0xE0), 0xE0));
    }

    #[test]
    fn test_keyboard_page_usages_are_distinct() {
        let codes = [
            KeyCode::KeyA,
            KeyCode::KeyQ,
            KeyCode::KeyZ,
            KeyCode::Digit0,
            KeyCode::Digit9,
            KeyCode::Minus,
            KeyCode::Delete,
            KeyCode::Numpad5,
            KeyCode::F24,
            KeyCode::ShiftRight,
            KeyCode::SuperLeft,
        ];
        let mut seen = std::collections::HashSet::new();
        for code in codes {
            let (key, usage) = translate_key(PhysicalKey::Code(code));
            assert_ne!(usage, 0, "{:?} has no usage", code);
            assert!(seen.insert(key), "{:?} collides with another key", code);
        }
    }

    #[test]
    fn test_translate_unidentified_key() {
        let (key, code) = translate_key(PhysicalKey::Unidentified(NativeKeyCode::Windows(0x5B)));
        assert_eq!(key, Key::Other(0x5B));
        assert_eq!(code, 0x5B);
    }
}
