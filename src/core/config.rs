//! 配置管理模块
//!
//! 提供启动配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 800
//! height = 600
//! x = 100
//! y = 100
//! title = "DistPresent"
//! resizable = true
//! redraw = "continuous"   # 或 "on_demand"
//!
//! [graphics]
//! backend = "opengl"      # 或 "direct3d11"
//! debug_device = false
//! background_color = [0.1, 0.1, 0.1, 1.0]
//!
//! [headless]
//! enabled = false
//! frames = 120
//! keyboards = 1
//!
//! [logging]
//! level = "info"          # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::error::{ConfigError, DistPresentError, Result};
use super::math::Color;

/// 未指定 `--config` 时读取的配置文件
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 启动配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 无窗口运行配置
    #[serde(default)]
    pub headless: HeadlessConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口左上角 X 坐标
    #[serde(default = "default_position")]
    pub x: i32,

    /// 窗口左上角 Y 坐标
    #[serde(default = "default_position")]
    pub y: i32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,

    /// 重绘模式
    #[serde(default)]
    pub redraw: RedrawMode,
}

/// 重绘模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedrawMode {
    /// 每次循环迭代都渲染一帧
    #[default]
    Continuous,
    /// 仅在系统请求重绘时渲染（类似窗体的 Paint 事件）
    OnDemand,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// 启用调试设备并把驱动的调试消息转发到日志
    #[serde(default)]
    pub debug_device: bool,

    /// 清屏颜色
    #[serde(default)]
    pub background_color: Color,
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenGL 后端，通过窗口的默认帧缓冲隐式呈现
    #[serde(alias = "gl")]
    OpenGl,
    /// Direct3D 11 后端，显式管理 DXGI 交换链
    #[serde(alias = "d3d11")]
    Direct3D11,
}

/// 无窗口运行配置
///
/// 启用后使用脚本化窗口和软件驱动，不需要显示器或 GPU。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessConfig {
    #[serde(default)]
    pub enabled: bool,

    /// 渲染的帧数
    #[serde(default = "default_headless_frames")]
    pub frames: u64,

    /// 模拟的键盘数量
    #[serde(default = "default_headless_keyboards")]
    pub keyboards: u32,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_position() -> i32 { 100 }
fn default_title() -> String { "DistPresent".to_string() }
fn default_resizable() -> bool { true }
fn default_backend() -> BackendKind {
    if cfg!(target_os = "windows") {
        BackendKind::Direct3D11
    } else {
        BackendKind::OpenGl
    }
}
fn default_headless_frames() -> u64 { 120 }
fn default_headless_keyboards() -> u32 { 1 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "distpresent.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            x: default_position(),
            y: default_position(),
            title: default_title(),
            resizable: default_resizable(),
            redraw: RedrawMode::default(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            debug_device: false,
            background_color: Color::default(),
        }
    }
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            frames: default_headless_frames(),
            keyboards: default_headless_keyboards(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_string_lossy().to_string()).into(),
            _ => DistPresentError::Io(e),
        })?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，文件不存在时使用默认配置
    ///
    /// 文件存在但无法读取或解析时返回错误。
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::from_file(path) {
            Err(DistPresentError::Config(ConfigError::FileNotFound(_))) => Ok(Self::default()),
            other => other,
        }
    }

    /// 按命令行加载配置
    ///
    /// 显式给出的 `--config <path>` 必须存在；否则读取 [`DEFAULT_CONFIG_PATH`]，
    /// 它不存在时使用默认配置。
    pub fn load<I>(args: I) -> Result<(Self, String)>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        let config = match Self::config_path_from_args(&args) {
            Some(path) => (Self::from_file(&path)?, path),
            None => (Self::from_file_or_default(DEFAULT_CONFIG_PATH)?, DEFAULT_CONFIG_PATH.to_string()),
        };
        Ok(config)
    }

    /// 从命令行参数中找出 `--config <path>`
    pub fn config_path_from_args<I>(args: I) -> Option<String>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        args.iter()
            .position(|a| a == "--config")
            .and_then(|idx| args.get(idx + 1).cloned())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--opengl` / `--d3d11`: 选择图形后端
    /// - `--debug-device`: 启用调试设备
    /// - `--headless`: 使用脚本化窗口和软件驱动
    /// - `--frames <n>`: 无窗口模式下的帧数
    /// - `--width <value>` / `--height <value>`: 窗口尺寸
    /// - `--title <value>`: 窗口标题
    pub fn apply_args<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--opengl") {
            self.graphics.backend = BackendKind::OpenGl;
        }

        if args.iter().any(|a| a == "--d3d11") {
            self.graphics.backend = BackendKind::Direct3D11;
        }

        if args.iter().any(|a| a == "--debug-device") {
            self.graphics.debug_device = true;
        }

        if args.iter().any(|a| a == "--headless") {
            self.headless.enabled = true;
        }

        if let Some(frames) = parse_flag(&args, "--frames")? {
            self.headless.frames = frames;
        }

        if let Some(width) = parse_flag(&args, "--width")? {
            self.window.width = width;
        }

        if let Some(height) = parse_flag(&args, "--height")? {
            self.window.height = height;
        }

        if let Some(title) = parse_flag::<String>(&args, "--title")? {
            self.window.title = title;
        }

        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }.into());
        }

        if !self.graphics.background_color.is_normalized() {
            return Err(ConfigError::InvalidValue {
                field: "graphics.background_color".to_string(),
                reason: "Color components must be within [0, 1]".to_string(),
            }.into());
        }

        if self.headless.enabled && self.headless.frames == 0 {
            return Err(ConfigError::InvalidValue {
                field: "headless.frames".to_string(),
                reason: "Headless runs need at least one frame".to_string(),
            }.into());
        }

        Ok(())
    }
}

/// 解析 `flag` 后面的值；给出了参数但缺少值或无法解析时返回错误
fn parse_flag<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(idx) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let value = args.get(idx + 1).ok_or_else(|| ConfigError::InvalidValue {
        field: flag.to_string(),
        reason: "missing value".to_string(),
    })?;
    value.parse().map(Some).map_err(|e: T::Err| {
        ConfigError::InvalidValue {
            field: flag.to_string(),
            reason: format!("'{}': {}", value, e),
        }
        .into()
    })
}

impl BackendKind {
    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::OpenGl => "OpenGL",
            BackendKind::Direct3D11 => "Direct3D 11",
        }
    }

    /// 后端是否显式管理交换链
    pub fn owns_swapchain(&self) -> bool {
        matches!(self, BackendKind::Direct3D11)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.window.x, 100);
        assert_eq!(config.window.y, 100);
        assert_eq!(config.graphics.background_color, Color::new(0.1, 0.1, 0.1, 1.0));
        assert!(!config.graphics.debug_device);
        assert!(!config.headless.enabled);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.background_color = Color::new(2.0, 0.0, 0.0, 1.0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.headless.enabled = true;
        config.headless.frames = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::from_toml_str(
            r#"
            [window]
            width = 1024
            height = 768
            x = -20
            title = "Surface"
            redraw = "on_demand"

            [graphics]
            backend = "direct3d11"
            debug_device = true
            background_color = [0.2, 0.3, 0.4, 1.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.x, -20);
        assert_eq!(config.window.y, 100);
        assert_eq!(config.window.redraw, RedrawMode::OnDemand);
        assert_eq!(config.graphics.backend, BackendKind::Direct3D11);
        assert!(config.graphics.debug_device);
        assert_eq!(config.graphics.background_color, Color::new(0.2, 0.3, 0.4, 1.0));
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_parse_backend_alias() {
        let config = Config::from_toml_str("[graphics]\nbackend = \"gl\"\n").unwrap();
        assert_eq!(config.graphics.backend, BackendKind::OpenGl);
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args([
            "dist_present", "--d3d11", "--headless", "--frames", "5",
            "--width", "640", "--height", "480", "--debug-device",
        ])
        .unwrap();

        assert_eq!(config.graphics.backend, BackendKind::Direct3D11);
        assert!(config.headless.enabled);
        assert_eq!(config.headless.frames, 5);
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 480);
        assert!(config.graphics.debug_device);
    }

    #[test]
    fn test_apply_args_rejects_bad_values() {
        let mut config = Config::default();
        let err = config.apply_args(["dist_present", "--width", "abc"]).unwrap_err();
        assert!(matches!(
            err,
            DistPresentError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "--width"
        ));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(config.window.width, 800);

        assert!(config.apply_args(["dist_present", "--frames"]).is_err());
        assert!(config.apply_args(["dist_present", "--height", "-3"]).is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("dist_present_bad_{}.toml", std::process::id()));
        std::fs::write(&path, "[graphics]\nbackend = \"direct3d11\"\ndebug_device = tru\n").unwrap();

        let loaded = Config::from_file_or_default(&path);
        let explicit = Config::load(["dist_present", "--config", path.to_str().unwrap()]);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(loaded, Err(DistPresentError::Config(ConfigError::ParseError(_)))));
        assert_eq!(explicit.unwrap_err().exit_code(), 1);
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("dist_present_missing/custom.toml");

        let config = Config::from_file_or_default(&path).unwrap();
        assert_eq!(config.graphics.backend, BackendKind::OpenGl);

        let err = Config::load(["dist_present", "--config", path.to_str().unwrap()]).unwrap_err();
        assert!(matches!(err, DistPresentError::Config(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_config_path_from_args() {
        let path = Config::config_path_from_args(["app", "--config", "custom.toml"]);
        assert_eq!(path.as_deref(), Some("custom.toml"));
        assert_eq!(Config::config_path_from_args(["app"]), None);
    }
}
