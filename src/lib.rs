//! DistPresent - 窗口表面与呈现循环生命周期管理
//!
//! 打开一个窗口，把 OpenGL 或 Direct3D 11 后端绑定到窗口表面，
//! 每帧用纯色清屏并呈现，处理尺寸变化与键盘输入，退出时按逆序释放 GPU 资源。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（配置、错误处理、日志、尺寸与颜色、输入）
//! - `platform`: 窗口抽象（winit 桌面窗口与脚本化无窗口实现）
//! - `gfx`: 图形后端（OpenGL 与 Direct3D 11，以及各自的驱动接口）
//! - `renderer`: 帧驱动与启动入口
//!
//! # 使用示例
//!
//! ```no_run
//! use dist_present::core::Config;
//!
//! let mut config = Config::default();
//! config.headless.enabled = true;
//! config.headless.frames = 60;
//!
//! let stats = dist_present::renderer::launch(&config).unwrap();
//! assert_eq!(stats.frames_rendered, 60);
//! ```

pub mod core;
pub mod platform;
pub mod gfx;
pub mod renderer;
