//! 核心功能模块
//!
//! 本模块提供与具体图形 API 无关的基础功能：配置、错误处理、日志、
//! 几何与颜色类型、输入事件以及键盘输入路由。
//!
//! # 模块组织
//!
//! - `math`：尺寸、位置、颜色
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `config`：配置管理，支持从配置文件和命令行加载设置
//! - `error`：错误处理，定义统一的错误类型和退出码
//! - `event`：按键与键盘设备类型
//! - `input`：键盘订阅与按键分发

pub mod math;
pub mod log;
pub mod config;
pub mod error;
pub mod event;
pub mod input;

// 重新导出常用类型，方便使用
pub use math::{Color, Extent2D, Position2D};
pub use error::{DistPresentError, GraphicsError, GraphicsResult, Result};
pub use config::{BackendKind, Config};
pub use event::{Key, Keyboard, KeyboardEvent, KeyboardId};
pub use input::{EscapeClosesWindow, InputRouter, KeyDownHandler, KeyResponse};
