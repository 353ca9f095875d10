//! 检测结果数据结构
//! Data structures produced by detectors

use ndarray::Array2;

/// 检测结果 (检测器 → 分发循环,只消费一次)
#[derive(Clone, Debug, PartialEq, Default)]
pub enum DetectionResult {
    ObjectBoxes(Vec<DetectedObject>),
    PoseLandmarks(Pose),
    SegmentationMask(SegmentationMask),
    #[default]
    None,
}

impl DetectionResult {
    pub fn kind(&self) -> &'static str {
        match self {
            DetectionResult::ObjectBoxes(_) => "object_boxes",
            DetectionResult::PoseLandmarks(_) => "pose_landmarks",
            DetectionResult::SegmentationMask(_) => "segmentation_mask",
            DetectionResult::None => "none",
        }
    }
}

// ========== 目标检测 ==========

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    pub confidence: f32,
    pub index: usize,
}

impl Label {
    pub fn new(text: impl Into<String>, confidence: f32, index: usize) -> Self {
        Self {
            text: text.into(),
            confidence,
            index,
        }
    }
}

/// 检测到的目标,坐标位于分析帧空间
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedObject {
    /// `(left, top, right, bottom)`
    pub bounding_box: [f32; 4],
    pub tracking_id: Option<u32>,
    pub labels: Vec<Label>,
}

// ========== 姿态估计 ==========

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// 33个人体关键点
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LandmarkType {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    LeftMouth,
    RightMouth,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseLandmark {
    pub landmark_type: LandmarkType,
    /// x/y 为分析帧像素, z 为相对深度(与x同尺度)
    pub position: Point3,
    pub in_frame_likelihood: f32,
}

impl PoseLandmark {
    pub fn new(landmark_type: LandmarkType, position: Point3, in_frame_likelihood: f32) -> Self {
        Self {
            landmark_type,
            position,
            in_frame_likelihood,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Pose {
    pub landmarks: Vec<PoseLandmark>,
    /// 姿态分类结果 (可选)
    pub classification: Vec<String>,
}

impl Pose {
    pub fn new(landmarks: Vec<PoseLandmark>) -> Self {
        Self {
            landmarks,
            classification: Vec::new(),
        }
    }

    pub fn landmark(&self, landmark_type: LandmarkType) -> Option<&PoseLandmark> {
        self.landmarks
            .iter()
            .find(|l| l.landmark_type == landmark_type)
    }
}

// ========== 分割 ==========

/// 前景置信度掩码 `[height, width]`, 值域 0..1
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationMask {
    pub confidences: Array2<f32>,
}

impl SegmentationMask {
    pub fn new(confidences: Array2<f32>) -> Self {
        Self { confidences }
    }

    pub fn width(&self) -> u32 {
        self.confidences.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.confidences.nrows() as u32
    }
}
