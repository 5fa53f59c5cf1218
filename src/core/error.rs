//! 错误处理模块
//!
//! 定义了表面生命周期管理器中使用的统一错误类型。
//!
//! # 错误分类
//!
//! - 构造期错误（窗口、设备、交换链创建失败）是致命的，向上传播并终止进程
//! - 帧内错误（Present、Resize）是可恢复的，在 `FrameDriver` 边界被捕获并记录

use std::fmt;

/// 统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, DistPresentError>;

/// 图形后端操作的 Result 类型
///
/// 帧内操作需要区分可恢复与致命错误，因此直接返回 [`GraphicsError`]。
pub type GraphicsResult<T> = std::result::Result<T, GraphicsError>;

/// DistPresent 的错误类型
#[derive(Debug)]
pub enum DistPresentError {
    /// 配置错误
    Config(ConfigError),

    /// 窗口错误
    Window(WindowError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// IO 错误
    Io(std::io::Error),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 窗口相关的错误
#[derive(Debug)]
pub enum WindowError {
    /// 操作系统无法分配窗口表面
    Creation(String),

    /// 事件循环运行失败
    EventLoop(String),
}

/// 图形 API 相关的错误
#[derive(Debug, Clone, PartialEq)]
pub enum GraphicsError {
    /// 没有兼容的适配器或驱动
    DeviceCreation(String),

    /// 表面与请求的交换链格式不兼容
    SwapchainCreation(String),

    /// 呈现失败（可恢复，丢弃当前帧）
    Present(String),

    /// 交换链缓冲区重建失败（可恢复，保留原尺寸）
    Resize { width: u32, height: u32, reason: String },

    /// 帧内临时资源（后备缓冲、渲染目标视图）创建失败
    ResourceCreation(String),

    /// 在错误的生命周期状态下调用
    InvalidState(String),
}

impl GraphicsError {
    /// 是否可在帧循环内恢复
    ///
    /// 设备与交换链创建失败意味着没有可用的设备，程序无法继续；
    /// 其余错误只影响当前帧。
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            GraphicsError::DeviceCreation(_) | GraphicsError::SwapchainCreation(_)
        )
    }
}

impl DistPresentError {
    /// 映射为进程退出码
    ///
    /// - `2`：窗口创建失败
    /// - `3`：设备创建失败
    /// - `4`：交换链创建失败
    /// - `1`：其他错误
    pub fn exit_code(&self) -> i32 {
        match self {
            DistPresentError::Window(WindowError::Creation(_)) => 2,
            DistPresentError::Graphics(GraphicsError::DeviceCreation(_)) => 3,
            DistPresentError::Graphics(GraphicsError::SwapchainCreation(_)) => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for DistPresentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistPresentError::Config(e) => write!(f, "Configuration error: {}", e),
            DistPresentError::Window(e) => write!(f, "Window error: {}", e),
            DistPresentError::Graphics(e) => write!(f, "Graphics error: {}", e),
            DistPresentError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::Creation(msg) => write!(f, "Window creation failed: {}", msg),
            WindowError::EventLoop(msg) => write!(f, "Event loop failed: {}", msg),
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::SwapchainCreation(msg) => write!(f, "Swapchain creation failed: {}", msg),
            GraphicsError::Present(msg) => write!(f, "Present failed: {}", msg),
            GraphicsError::Resize { width, height, reason } => {
                write!(f, "Resize to {}x{} failed: {}", width, height, reason)
            }
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::InvalidState(msg) => write!(f, "Invalid backend state: {}", msg),
        }
    }
}

impl std::error::Error for DistPresentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DistPresentError::Io(e) => Some(e),
            DistPresentError::Config(e) => Some(e),
            DistPresentError::Window(e) => Some(e),
            DistPresentError::Graphics(e) => Some(e),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for WindowError {}
impl std::error::Error for GraphicsError {}

impl From<std::io::Error> for DistPresentError {
    fn from(err: std::io::Error) -> Self {
        DistPresentError::Io(err)
    }
}

impl From<ConfigError> for DistPresentError {
    fn from(err: ConfigError) -> Self {
        DistPresentError::Config(err)
    }
}

impl From<WindowError> for DistPresentError {
    fn from(err: WindowError) -> Self {
        DistPresentError::Window(err)
    }
}

impl From<GraphicsError> for DistPresentError {
    fn from(err: GraphicsError) -> Self {
        DistPresentError::Graphics(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let window: DistPresentError = WindowError::Creation("no display".into()).into();
        let device: DistPresentError = GraphicsError::DeviceCreation("no adapter".into()).into();
        let swapchain: DistPresentError =
            GraphicsError::SwapchainCreation("bad format".into()).into();
        let config: DistPresentError = ConfigError::ParseError("eof".into()).into();

        assert_eq!(window.exit_code(), 2);
        assert_eq!(device.exit_code(), 3);
        assert_eq!(swapchain.exit_code(), 4);
        assert_eq!(config.exit_code(), 1);
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(GraphicsError::Present("lost".into()).is_recoverable());
        assert!(GraphicsError::Resize { width: 1, height: 1, reason: "busy".into() }.is_recoverable());
        assert!(!GraphicsError::DeviceCreation("none".into()).is_recoverable());
        assert!(!GraphicsError::SwapchainCreation("none".into()).is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let err = GraphicsError::Resize { width: 1024, height: 768, reason: "device removed".into() };
        assert_eq!(err.to_string(), "Resize to 1024x768 failed: device removed");

        let err: DistPresentError = GraphicsError::Present("timeout".into()).into();
        assert_eq!(err.to_string(), "Graphics error: Present failed: timeout");
    }
}
