//! 输入事件类型
//!
//! 与平台无关的键盘事件表示。窗口实现把各自的原生按键码转换为 [`Key`]，
//! 再交给 [`InputRouter`](crate::core::input::InputRouter) 分发。

use std::fmt;

/// 键盘按键码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Escape 键，默认策略下用于关闭窗口
    Escape,
    Enter,
    Space,
    Tab,
    Backspace,

    W,
    A,
    S,
    D,

    Up,
    Down,
    Left,
    Right,

    /// F1-F12 功能键
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,

    /// 其他按键
    ///
    /// 参数为平台相关的扫描码
    Other(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Other(code) => write!(f, "Other({})", code),
            other => write!(f, "{:?}", other),
        }
    }
}

/// 键盘设备标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyboardId(pub u32);

/// 已连接的键盘设备
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    pub id: KeyboardId,
    pub name: String,
}

impl Keyboard {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: KeyboardId(id),
            name: name.into(),
        }
    }
}

/// 按键按下事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// 产生事件的键盘
    pub keyboard: KeyboardId,

    /// 按键码
    pub key: Key,

    /// 平台扫描码
    pub code: i32,
}

impl KeyboardEvent {
    pub fn new(keyboard: KeyboardId, key: Key, code: i32) -> Self {
        Self { keyboard, key, code }
    }

    pub fn is_escape(&self) -> bool {
        self.key == Key::Escape
    }
}

impl fmt::Display for KeyboardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyDown {} (keyboard {}, code {})", self.key, self.keyboard.0, self.code)
    }
}
