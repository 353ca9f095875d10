/// 标注渲染器 (Annotation Renderers)
///
/// 每种检测结果对应一种标注,全部通过 `Annotation::draw` 绘制:
/// - ObjectGraphic:        目标框 + 标签
/// - PoseGraphic:          姿态骨架 (鼻子/肩/髋)
/// - SegmentationGraphic:  分割掩码
/// - InferenceInfoGraphic: 延迟/帧率/分辨率 (始终最后绘制)
pub mod info;
pub mod object;
pub mod pose;
pub mod segmentation;

pub use info::InferenceInfoGraphic;
pub use object::ObjectGraphic;
pub use pose::PoseGraphic;
pub use segmentation::SegmentationGraphic;

use std::any::Any;
use std::sync::Arc;

use crate::config::PresentationFlags;
use crate::detection::DetectionResult;
use crate::error::Result;
use crate::overlay::{CoordinateMapper, Surface};
use crate::pipeline::FrameStats;

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 可绘制的标注: 构造后不可变,绘制时只读取自身数据与坐标映射
pub trait Annotation: AsAny + Send + Sync {
    fn kind(&self) -> &'static str;

    fn draw(&self, surface: &mut dyn Surface, mapper: &CoordinateMapper) -> Result<()>;
}

/// 根据一次检测结果构造整批标注,推理信息始终位于最后
pub fn build_batch(
    result: &DetectionResult,
    flags: &PresentationFlags,
    stats: &FrameStats,
) -> Vec<Arc<dyn Annotation>> {
    let mut batch: Vec<Arc<dyn Annotation>> = Vec::new();
    match result {
        DetectionResult::ObjectBoxes(objects) => {
            for object in objects {
                batch.push(Arc::new(ObjectGraphic::new(object.clone())));
            }
        }
        DetectionResult::PoseLandmarks(pose) => {
            batch.push(Arc::new(PoseGraphic::new(pose.clone(), *flags)));
        }
        DetectionResult::SegmentationMask(mask) => {
            batch.push(Arc::new(SegmentationGraphic::new(mask.clone())));
        }
        DetectionResult::None => {}
    }
    batch.push(Arc::new(InferenceInfoGraphic::new(stats.clone())));
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DetectedObject, Label, Pose};

    fn object(id: u32) -> DetectedObject {
        DetectedObject {
            bounding_box: [0.0, 0.0, 10.0, 10.0],
            tracking_id: Some(id),
            labels: vec![Label::new("Food", 0.9, 1)],
        }
    }

    #[test]
    fn info_graphic_is_last() {
        let stats = FrameStats::default();
        let flags = PresentationFlags::default();
        let batch = build_batch(
            &DetectionResult::ObjectBoxes(vec![object(1), object(2), object(3)]),
            &flags,
            &stats,
        );
        let kinds: Vec<_> = batch.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec!["object", "object", "object", "inference_info"]);
    }

    #[test]
    fn none_result_only_info() {
        let batch = build_batch(
            &DetectionResult::None,
            &PresentationFlags::default(),
            &FrameStats::default(),
        );
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind(), "inference_info");
    }

    #[test]
    fn pose_result_single_graphic() {
        let batch = build_batch(
            &DetectionResult::PoseLandmarks(Pose::default()),
            &PresentationFlags::default(),
            &FrameStats::default(),
        );
        assert_eq!(batch.len(), 2);
        assert!((*batch[0]).as_any().downcast_ref::<PoseGraphic>().is_some());
    }
}
