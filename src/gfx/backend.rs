//! 图形后端的统一抽象接口
//!
//! 本模块定义了所有图形后端（OpenGL、Direct3D 11）必须实现的统一接口。
//! 帧驱动只通过这个接口工作，不关心后端是隐式呈现（OpenGL 默认帧缓冲）
//! 还是显式管理交换链（Direct3D 11）。
//!
//! # 生命周期
//!
//! ```text
//! Uninitialized ──initialize──▶ Initialized ──begin_frame──▶ Rendering
//!                                    ▲    ▲                      │
//!                                    │    └──────end_frame───────┘
//!                               on_resize
//!                                    ▼
//!                                 Resized ──begin_frame──▶ Rendering
//!
//! 任意状态 ──teardown──▶ TornDown
//! ```

use crate::core::config::BackendKind;
use crate::core::error::GraphicsResult;
use crate::core::math::{Color, Extent2D};
use crate::platform::WindowContext;

/// 后端生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Uninitialized,
    Initialized,
    /// `begin_frame` 与 `end_frame` 之间
    Rendering,
    /// 最近一次尺寸变化已经生效，下一帧使用新尺寸
    Resized,
    TornDown,
}

impl BackendState {
    /// 是否可以开始新的一帧
    pub fn can_begin_frame(&self) -> bool {
        matches!(self, BackendState::Initialized | BackendState::Resized)
    }
}

/// 图形后端的统一接口
///
/// `FrameTarget` 是一帧内可以绘制的目标。`begin_frame` 产生它，`end_frame`
/// 消耗它，因此“先 begin 再 end”的顺序由类型系统保证，
/// 帧内资源也会在 `end_frame` 返回前释放（无论 Present 是否成功）。
pub trait GraphicsBackend {
    /// 一帧的绘制目标
    type FrameTarget;

    /// 后端类型
    fn kind(&self) -> BackendKind;

    /// 当前生命周期状态
    fn state(&self) -> BackendState;

    /// 当前可呈现表面的尺寸
    ///
    /// 初始化之前和销毁之后返回 `None`。
    fn surface_extent(&self) -> Option<Extent2D>;

    /// 绑定窗口表面，创建设备和（需要时）交换链
    ///
    /// 失败时已经创建的对象保留在后端中，由 `teardown` 释放。
    fn initialize(&mut self, window: &WindowContext) -> GraphicsResult<()>;

    /// 获取当前后备缓冲并准备绘制
    fn begin_frame(&mut self) -> GraphicsResult<Self::FrameTarget>;

    /// 用纯色清除目标的颜色缓冲
    fn clear(&mut self, target: &mut Self::FrameTarget, color: Color);

    /// 结束当前帧并呈现
    ///
    /// 目标在返回前释放；Present 失败返回 [`GraphicsError::Present`](crate::core::GraphicsError::Present)。
    fn end_frame(&mut self, target: Self::FrameTarget) -> GraphicsResult<()>;

    /// 窗口帧缓冲尺寸变化
    ///
    /// 不能在 `begin_frame` 与 `end_frame` 之间调用。
    fn on_resize(&mut self, size: Extent2D) -> GraphicsResult<()>;

    /// 按创建的逆序释放所有 GPU 对象
    ///
    /// 幂等：重复调用不会产生任何效果。
    fn teardown(&mut self);
}
