//! 姿态标注 (Pose skeleton)
//!
//! 只绘制固定子集: 鼻子、双肩、双髋。
//! 左侧身体绿色,右侧黄色,肩线/髋线白色;
//! 开启深度可视化时颜色随 z 在红(近) → 白 → 蓝(远) 之间变化。

use log::trace;

use super::Annotation;
use crate::config::PresentationFlags;
use crate::detection::{LandmarkType, Point3, Pose, PoseLandmark};
use crate::error::Result;
use crate::overlay::surface::{Color, GREEN, WHITE, YELLOW};
use crate::overlay::{CoordinateMapper, Surface};
use image::Rgba;

pub const DOT_RADIUS: f32 = 8.0;
pub const IN_FRAME_LIKELIHOOD_TEXT_SIZE: f32 = 30.0;
pub const STROKE_WIDTH: f32 = 10.0;
pub const POSE_CLASSIFICATION_TEXT_SIZE: f32 = 60.0;

/// z_min == z_max 时的归一化深度
pub const DEPTH_MIDPOINT: f32 = 0.5;

/// 把 z 归一化到 [0, 1]; 退化区间返回中点
pub fn normalize_depth(z: f32, z_min: f32, z_max: f32) -> f32 {
    let span = z_max - z_min;
    if !(span.abs() > f32::EPSILON) || !span.is_finite() {
        return DEPTH_MIDPOINT;
    }
    ((z - z_min) / span).clamp(0.0, 1.0)
}

/// 深度渐变色: 0 → 红, 0.5 → 白, 1 → 蓝
pub fn depth_color(t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    if t < DEPTH_MIDPOINT {
        let v = ((DEPTH_MIDPOINT - t) * 2.0 * 255.0).round() as u8;
        Rgba([255, 255 - v, 255 - v, 255])
    } else {
        let v = ((t - DEPTH_MIDPOINT) * 2.0 * 255.0).round() as u8;
        Rgba([255 - v, 255 - v, 255, 255])
    }
}

/// 肩→髋 3D距离, z 差按一半计
pub fn side_distance(a: &Point3, b: &Point3) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = (a.z - b.z) * 0.5;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// 绘制所需的五个关键点
#[derive(Clone, Copy, Debug)]
struct Skeleton {
    nose: PoseLandmark,
    left_shoulder: PoseLandmark,
    right_shoulder: PoseLandmark,
    left_hip: PoseLandmark,
    right_hip: PoseLandmark,
}

impl Skeleton {
    fn from_pose(pose: &Pose) -> Option<Self> {
        Some(Self {
            nose: *pose.landmark(LandmarkType::Nose)?,
            left_shoulder: *pose.landmark(LandmarkType::LeftShoulder)?,
            right_shoulder: *pose.landmark(LandmarkType::RightShoulder)?,
            left_hip: *pose.landmark(LandmarkType::LeftHip)?,
            right_hip: *pose.landmark(LandmarkType::RightHip)?,
        })
    }

    fn points(&self) -> [&PoseLandmark; 5] {
        [
            &self.nose,
            &self.right_shoulder,
            &self.left_shoulder,
            &self.right_hip,
            &self.left_hip,
        ]
    }

    /// 本帧子集的 z 范围 (每次绘制重新扫描)
    fn depth_range(&self) -> (f32, f32) {
        self.points()
            .iter()
            .map(|l| l.position.z)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), z| {
                (lo.min(z), hi.max(z))
            })
    }
}

pub struct PoseGraphic {
    pose: Pose,
    flags: PresentationFlags,
}

impl PoseGraphic {
    pub fn new(pose: Pose, flags: PresentationFlags) -> Self {
        Self { pose, flags }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// (右侧长度 - 左侧长度) / 2
    pub fn average_distance(&self) -> Option<f32> {
        let s = Skeleton::from_pose(&self.pose)?;
        let left = side_distance(&s.left_shoulder.position, &s.left_hip.position);
        let right = side_distance(&s.right_shoulder.position, &s.right_hip.position);
        Some((right - left) / 2.0)
    }

    fn paint(&self, base: Color, z: f32, range: (f32, f32)) -> Color {
        if !self.flags.visualize_z {
            return base;
        }
        depth_color(normalize_depth(z, range.0, range.1))
    }

    fn draw_point(
        &self,
        surface: &mut dyn Surface,
        mapper: &CoordinateMapper,
        landmark: &PoseLandmark,
        range: (f32, f32),
    ) -> Result<()> {
        let p = landmark.position;
        let color = self.paint(WHITE, p.z, range);
        surface.draw_circle(mapper.translate_point(p.x, p.y)?, DOT_RADIUS, color);
        Ok(())
    }

    fn draw_line(
        &self,
        surface: &mut dyn Surface,
        mapper: &CoordinateMapper,
        start: &PoseLandmark,
        end: &PoseLandmark,
        base: Color,
        range: (f32, f32),
    ) -> Result<()> {
        let (a, b) = (start.position, end.position);
        // 线段颜色取两端 z 的平均值
        let color = self.paint(base, (a.z + b.z) / 2.0, range);
        surface.draw_line(
            mapper.translate_point(a.x, a.y)?,
            mapper.translate_point(b.x, b.y)?,
            STROKE_WIDTH,
            color,
        );
        Ok(())
    }

    fn draw_classification(&self, surface: &mut dyn Surface) {
        let (_, height) = surface.size();
        let n = self.pose.classification.len();
        let x = POSE_CLASSIFICATION_TEXT_SIZE * 0.5;
        for (i, text) in self.pose.classification.iter().enumerate() {
            let y = height as f32 - POSE_CLASSIFICATION_TEXT_SIZE * 1.5 * (n - i) as f32;
            surface.draw_text(text, (x, y), POSE_CLASSIFICATION_TEXT_SIZE, WHITE);
        }
    }
}

impl Annotation for PoseGraphic {
    fn kind(&self) -> &'static str {
        "pose"
    }

    fn draw(&self, surface: &mut dyn Surface, mapper: &CoordinateMapper) -> Result<()> {
        if self.flags.run_classification {
            self.draw_classification(surface);
        }

        let Some(s) = Skeleton::from_pose(&self.pose) else {
            trace!("姿态关键点不完整,跳过绘制 ({} 个)", self.pose.landmarks.len());
            return Ok(());
        };

        let range = if self.flags.rescale_z_for_visualization {
            s.depth_range()
        } else {
            // 默认范围: ±帧宽 (图像像素)
            let w = match mapper.source_info() {
                Some(info) => info.frame_width() as f32,
                None => mapper.surface_size().0,
            };
            (-w, w)
        };

        for landmark in s.points() {
            self.draw_point(surface, mapper, landmark, range)?;
        }

        self.draw_line(surface, mapper, &s.left_shoulder, &s.right_shoulder, WHITE, range)?;
        self.draw_line(surface, mapper, &s.left_hip, &s.right_hip, WHITE, range)?;
        // 左侧身体
        self.draw_line(surface, mapper, &s.left_shoulder, &s.left_hip, GREEN, range)?;
        // 右侧身体
        self.draw_line(surface, mapper, &s.right_shoulder, &s.right_hip, YELLOW, range)?;

        if self.flags.show_in_frame_likelihood {
            if let Some(avg) = self.average_distance() {
                let origin = mapper.translate_point(s.nose.position.x, s.nose.position.y)?;
                surface.draw_text(
                    &format!("{:.2}", avg),
                    origin,
                    IN_FRAME_LIKELIHOOD_TEXT_SIZE,
                    WHITE,
                );
                trace!("Distance: {}", avg);
            }
        }
        Ok(())
    }
}
