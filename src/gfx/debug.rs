//! 驱动调试消息
//!
//! 启用调试设备时，后端在每次 Present 之后取出驱动积累的调试消息，
//! 交给一个可替换的 [`DebugMessageSink`]。默认实现写入 tracing 日志。

use std::fmt;

use tracing::{debug, error, info, warn};

/// 调试消息严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugSeverity {
    Corruption,
    Error,
    Warning,
    Info,
    Message,
}

impl fmt::Display for DebugSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DebugSeverity::Corruption => "corruption",
            DebugSeverity::Error => "error",
            DebugSeverity::Warning => "warning",
            DebugSeverity::Info => "info",
            DebugSeverity::Message => "message",
        };
        f.write_str(name)
    }
}

/// 一条驱动调试消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugMessage {
    pub severity: DebugSeverity,
    pub text: String,
}

impl DebugMessage {
    pub fn new(severity: DebugSeverity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

/// 调试消息接收者
pub trait DebugMessageSink {
    fn on_message(&mut self, message: &DebugMessage);
}

impl<F> DebugMessageSink for F
where
    F: FnMut(&DebugMessage),
{
    fn on_message(&mut self, message: &DebugMessage) {
        self(message)
    }
}

/// 写入 tracing 日志，target 为 `distpresent::driver`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDebugSink;

impl DebugMessageSink for TracingDebugSink {
    fn on_message(&mut self, message: &DebugMessage) {
        match message.severity {
            DebugSeverity::Corruption | DebugSeverity::Error => {
                error!(target: "distpresent::driver", severity = %message.severity, "{}", message.text)
            }
            DebugSeverity::Warning => {
                warn!(target: "distpresent::driver", "{}", message.text)
            }
            DebugSeverity::Info => {
                info!(target: "distpresent::driver", "{}", message.text)
            }
            DebugSeverity::Message => {
                debug!(target: "distpresent::driver", "{}", message.text)
            }
        }
    }
}
