//! 坐标映射: 分析帧坐标 → 显示表面坐标
//!
//! 只使用已经按旋转校正过的逻辑宽高,映射本身从不检查旋转角度。

use crate::error::{OverlayError, Result};

/// 坐标转换的几何基准
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceInfo {
    frame_width: u32,
    frame_height: u32,
    is_mirrored: bool,
}

impl SourceInfo {
    pub fn new(frame_width: u32, frame_height: u32, is_mirrored: bool) -> Result<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(OverlayError::InvalidDimensions {
                width: frame_width,
                height: frame_height,
            });
        }
        Ok(Self {
            frame_width,
            frame_height,
            is_mirrored,
        })
    }

    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    pub fn is_mirrored(&self) -> bool {
        self.is_mirrored
    }
}

/// Translates analysis-frame coordinates into surface pixels for one draw pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    source: Option<SourceInfo>,
    surface_width: f32,
    surface_height: f32,
}

impl CoordinateMapper {
    pub fn new(source: Option<SourceInfo>, surface_width: u32, surface_height: u32) -> Self {
        Self {
            source,
            surface_width: surface_width as f32,
            surface_height: surface_height as f32,
        }
    }

    fn source(&self) -> Result<&SourceInfo> {
        self.source
            .as_ref()
            .ok_or(OverlayError::InvalidState("SourceInfo must be set before translating"))
    }

    pub fn source_info(&self) -> Option<SourceInfo> {
        self.source
    }

    pub fn surface_size(&self) -> (f32, f32) {
        (self.surface_width, self.surface_height)
    }

    pub fn is_mirrored(&self) -> Result<bool> {
        Ok(self.source()?.is_mirrored)
    }

    pub fn scale_x(&self) -> Result<f32> {
        Ok(self.surface_width / self.source()?.frame_width as f32)
    }

    pub fn scale_y(&self) -> Result<f32> {
        Ok(self.surface_height / self.source()?.frame_height as f32)
    }

    /// 前置摄像头时X轴翻转
    pub fn translate_x(&self, x: f32) -> Result<f32> {
        let source = self.source()?;
        let scaled = x * (self.surface_width / source.frame_width as f32);
        if source.is_mirrored {
            Ok(self.surface_width - scaled)
        } else {
            Ok(scaled)
        }
    }

    pub fn translate_y(&self, y: f32) -> Result<f32> {
        Ok(y * self.scale_y()?)
    }

    pub fn translate_point(&self, x: f32, y: f32) -> Result<(f32, f32)> {
        Ok((self.translate_x(x)?, self.translate_y(y)?))
    }

    /// 矩形映射 `(left, top, right, bottom)`,镜像后重新排序左右边
    pub fn translate_rect(&self, rect: [f32; 4]) -> Result<[f32; 4]> {
        let [l, t, r, b] = rect;
        let x0 = self.translate_x(l)?;
        let x1 = self.translate_x(r)?;
        let y0 = self.translate_y(t)?;
        let y1 = self.translate_y(b)?;
        Ok([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)])
    }
}
