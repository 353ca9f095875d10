//! 分析帧 (相机 → 分发循环)
//!
//! `AnalysisFrame` 在交给检测器时被消费,释放回调随之触发,不会被保留。

use image::{ImageBuffer, Rgba, RgbaImage};
use std::sync::Arc;
use std::time::Instant;

/// 按旋转角度得到逻辑宽高 (90°/270° 交换)
pub fn logical_size(width: u32, height: u32, rotation_degrees: u32) -> (u32, u32) {
    match rotation_degrees % 360 {
        90 | 270 => (height, width),
        _ => (width, height),
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

pub struct AnalysisFrame {
    data: Arc<Vec<u8>>, // RGBA
    width: u32,
    height: u32,
    rotation_degrees: u32,
    frame_id: u64,
    captured_at: Instant,
    release: Option<ReleaseHook>,
}

impl AnalysisFrame {
    pub fn new(data: impl Into<Arc<Vec<u8>>>, width: u32, height: u32, rotation_degrees: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            rotation_degrees,
            frame_id: 0,
            captured_at: Instant::now(),
            release: None,
        }
    }

    pub fn with_frame_id(mut self, frame_id: u64) -> Self {
        self.frame_id = frame_id;
        self
    }

    /// 缓冲区归还给相机子系统时调用
    pub fn on_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rotation_degrees(&self) -> u32 {
        self.rotation_degrees
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn logical_size(&self) -> (u32, u32) {
        logical_size(self.width, self.height, self.rotation_degrees)
    }

    /// 转为检测器输入并释放帧
    pub fn into_input_image(self) -> InputImage {
        InputImage {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
            rotation_degrees: self.rotation_degrees,
            frame_id: self.frame_id,
            captured_at: self.captured_at,
        }
    }
}

impl Drop for AnalysisFrame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// 检测器看到的图像
#[derive(Clone, Debug)]
pub struct InputImage {
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub rotation_degrees: u32,
    pub frame_id: u64,
    pub captured_at: Instant,
}

impl InputImage {
    pub fn logical_size(&self) -> (u32, u32) {
        logical_size(self.width, self.height, self.rotation_degrees)
    }

    /// RGBA → RgbaImage, 数据长度不符时返回 None
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        ImageBuffer::<Rgba<u8>, _>::from_raw(self.width, self.height, self.data.to_vec())
    }
}
