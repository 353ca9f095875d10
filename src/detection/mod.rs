/// 检测系统 (Detection System)
///
/// 检测器本身是外部协作者,这里定义:
/// - Detector:        调用边界 (在独立线程上执行)
/// - DetectionResult: 目标框 / 姿态关键点 / 分割掩码 / 空
pub mod detector;
pub mod types;

pub use detector::Detector;
pub use types::{
    DetectedObject, DetectionResult, Label, LandmarkType, Point3, Pose, PoseLandmark,
    SegmentationMask,
};
