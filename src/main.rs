//! DistPresent - 窗口表面与呈现循环
//!
//! 打开一个窗口，选择 OpenGL 或 Direct3D 11 后端，每帧清屏并呈现，
//! 直到窗口关闭或按下 Escape。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件（默认 config.toml，不存在时使用默认配置）
//! cargo run
//!
//! # 使用 OpenGL 后端
//! cargo run -- --opengl
//!
//! # 使用 Direct3D 11 后端并启用调试设备（仅 Windows）
//! cargo run -- --d3d11 --debug-device
//!
//! # 无窗口运行 300 帧
//! cargo run -- --headless --frames 300
//! ```
//!
//! # 架构概览
//!
//! ```text
//! ┌─────────────┐
//! │   main.rs   │  应用程序入口
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ FrameDriver │  load / render / resize / close
//! └──────┬──────┘
//!        │
//!   ┌────┴─────┐
//!   │          │
//! ┌─▼────┐  ┌──▼───┐
//! │OpenGL│  │D3D11 │  具体后端实现
//! └──────┘  └──────┘
//! ```
//!
//! # 退出码
//!
//! - `0`：正常退出
//! - `1`：配置或其他错误
//! - `2`：窗口创建失败
//! - `3`：设备创建失败
//! - `4`：交换链创建失败

use anyhow::Context;
use tracing::info;

use dist_present::core::{log, Config, DistPresentError};
use dist_present::engine_error;
use dist_present::renderer;

/// 应用程序入口点
///
/// # 初始化流程
///
/// 1. 加载配置文件（`--config <path>`，默认 config.toml）
/// 2. 应用命令行参数覆盖
/// 3. 验证配置
/// 4. 初始化日志系统
/// 5. 创建窗口与后端并进入事件循环
fn main() {
    // 1-3. 加载配置、应用命令行参数并验证（在初始化日志之前）
    let (config, config_path) = match load_config() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    // 4. 初始化日志系统（使用配置中的设置）
    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!("DistPresent starting...");
    info!(version = env!("CARGO_PKG_VERSION"), config = %config_path, "Application initialized");

    info!(
        backend = config.graphics.backend.name(),
        width = config.window.width,
        height = config.window.height,
        headless = config.headless.enabled,
        "Graphics configuration"
    );

    // 5. 运行
    match run(&config) {
        Ok(()) => info!("DistPresent exited cleanly"),
        Err(e) => {
            let code = e
                .downcast_ref::<DistPresentError>()
                .map(DistPresentError::exit_code)
                .unwrap_or(1);
            engine_error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(code);
        }
    }
}

fn load_config() -> Result<(Config, String), DistPresentError> {
    let (mut config, path) = Config::load(std::env::args())?;
    config.apply_args(std::env::args())?;
    config.validate()?;
    Ok((config, path))
}

fn run(config: &Config) -> anyhow::Result<()> {
    let stats = renderer::launch(config)
        .with_context(|| format!("{} backend failed", config.graphics.backend.name()))?;

    info!(
        frames_rendered = stats.frames_rendered,
        frames_dropped = stats.frames_dropped,
        "Run finished"
    );
    Ok(())
}
