//! 检测器接口 (Detector)
//! 职责: 接收输入图像 → 返回检测结果或失败原因
//!
//! 具体模型由外部维护,这里只定义调用边界。

use crate::detection::DetectionResult;
use crate::error::DetectionError;
use crate::pipeline::InputImage;

pub trait Detector: Send {
    fn name(&self) -> &str {
        "detector"
    }

    /// 在检测线程上调用,可以阻塞
    fn detect(&mut self, image: &InputImage) -> Result<DetectionResult, DetectionError>;

    /// 会话结束时释放模型资源
    fn close(&mut self) {}
}

impl<F> Detector for F
where
    F: FnMut(&InputImage) -> Result<DetectionResult, DetectionError> + Send,
{
    fn name(&self) -> &str {
        "closure"
    }

    fn detect(&mut self, image: &InputImage) -> Result<DetectionResult, DetectionError> {
        self(image)
    }
}
