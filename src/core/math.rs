//! 基础几何与颜色类型
//!
//! 表面管理只需要少量的值类型：窗口/帧缓冲尺寸、窗口位置和清屏颜色。

use serde::{Deserialize, Serialize};

/// 二维尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 任一维度为 0（例如窗口最小化）
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Extent2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// 窗口位置（屏幕坐标，可为负）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position2D {
    pub x: i32,
    pub y: i32,
}

impl Position2D {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 颜色类型（RGBA，范围 0.0-1.0）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// 创建新的颜色
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 转换为 `[r, g, b, a]`，即 `ClearRenderTargetView` 需要的布局
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// 所有分量都在 [0, 1] 内
    pub fn is_normalized(&self) -> bool {
        self.to_array().iter().all(|c| (0.0..=1.0).contains(c))
    }

    /// 默认背景色
    pub const BACKGROUND: Color = Color { r: 0.1, g: 0.1, b: 0.1, a: 1.0 };
    pub const DARK_GRAY: Color = Color { r: 169.0 / 255.0, g: 169.0 / 255.0, b: 169.0 / 255.0, a: 1.0 };
}

impl Default for Color {
    fn default() -> Self {
        Color::BACKGROUND
    }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Color::new(c[0], c[1], c[2], c[3])
    }
}

impl From<Color> for [f32; 4] {
    fn from(c: Color) -> Self {
        c.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_empty() {
        assert!(Extent2D::new(0, 600).is_empty());
        assert!(Extent2D::new(800, 0).is_empty());
        assert!(!Extent2D::new(800, 600).is_empty());
        assert_eq!(Extent2D::new(1024, 768).to_string(), "1024x768");
    }

    #[test]
    fn test_color_creation() {
        let color = Color::new(1.0, 0.5, 0.0, 1.0);
        assert_eq!(color.r, 1.0);
        assert_eq!(color.a, 1.0);
        assert_eq!(Color::from([0.1, 0.2, 0.3, 0.4]).to_array(), [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_color_normalized() {
        assert!(Color::BACKGROUND.is_normalized());
        assert!(!Color::new(1.5, 0.0, 0.0, 1.0).is_normalized());
        assert!(!Color::new(0.0, -0.1, 0.0, 1.0).is_normalized());
    }
}
