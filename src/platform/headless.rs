//! 脚本化窗口
//!
//! 不连接任何窗口系统，按固定 tick 数驱动 [`WindowHandler`]。
//! 尺寸变化、按键和关闭请求可以预先安排在指定 tick 上，
//! 它们在该 tick 的 update/render 之前送达。

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::core::config::WindowConfig;
use crate::core::error::Result;
use crate::core::event::{Key, Keyboard, KeyboardEvent, KeyboardId};
use crate::core::math::Extent2D;
use super::window::{Window, WindowContext, WindowHandler};

/// 固定的逻辑帧间隔（60 Hz）
const TICK_SECONDS: f64 = 1.0 / 60.0;

#[derive(Debug, Clone, PartialEq)]
enum ScriptedEvent {
    Resize(Extent2D),
    KeyDown(KeyboardEvent),
    Close,
}

/// 无窗口实现
pub struct HeadlessWindow {
    context: WindowContext,
    ticks: u64,
    script: BTreeMap<u64, Vec<ScriptedEvent>>,
}

impl HeadlessWindow {
    /// 创建带一个模拟键盘、运行 1 个 tick 的窗口
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            context: WindowContext::headless(config, 1),
            ticks: 1,
            script: BTreeMap::new(),
        }
    }

    /// 设置模拟键盘数量
    pub fn with_keyboards(mut self, keyboards: u32) -> Self {
        let keyboards = (0..keyboards)
            .map(|i| Keyboard::new(i, format!("Virtual keyboard {}", i)))
            .collect();
        self.context.set_keyboards(keyboards);
        self
    }

    /// 设置运行的 tick 数
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    /// 在第 `tick` 个 tick（从 0 开始）渲染前改变帧缓冲尺寸
    pub fn resize_at(mut self, tick: u64, size: Extent2D) -> Self {
        self.schedule(tick, ScriptedEvent::Resize(size));
        self
    }

    /// 在第 `tick` 个 tick 渲染前按下一个键
    pub fn key_down_at(mut self, tick: u64, keyboard: KeyboardId, key: Key) -> Self {
        self.schedule(tick, ScriptedEvent::KeyDown(KeyboardEvent::new(keyboard, key, 0)));
        self
    }

    /// 在第 `tick` 个 tick 渲染前请求关闭
    pub fn close_at(mut self, tick: u64) -> Self {
        self.schedule(tick, ScriptedEvent::Close);
        self
    }

    fn schedule(&mut self, tick: u64, event: ScriptedEvent) {
        self.script.entry(tick).or_default().push(event);
    }
}

impl Window for HeadlessWindow {
    fn context(&self) -> &WindowContext {
        &self.context
    }

    fn run(self, handler: &mut dyn WindowHandler) -> Result<()> {
        let HeadlessWindow {
            mut context,
            ticks,
            mut script,
        } = self;

        info!(ticks, "Running headless window");

        if let Err(e) = handler.on_load(&mut context) {
            handler.on_close(&mut context);
            return Err(e);
        }

        let mut executed = 0u64;
        for tick in 0..ticks {
            if context.is_closing() {
                break;
            }

            for event in script.remove(&tick).unwrap_or_default() {
                match event {
                    ScriptedEvent::Resize(size) => {
                        if size != context.framebuffer_size() {
                            context.set_framebuffer_size(size);
                            handler.on_framebuffer_resize(&mut context, size);
                        }
                    }
                    ScriptedEvent::KeyDown(event) => handler.on_key_down(&mut context, &event),
                    ScriptedEvent::Close => context.close(),
                }
            }

            if context.is_closing() {
                break;
            }

            handler.on_update(&mut context, TICK_SECONDS);
            handler.on_render(&mut context, TICK_SECONDS);
            executed += 1;
        }

        debug!(executed, "Headless loop finished");
        handler.on_close(&mut context);
        Ok(())
    }
}
