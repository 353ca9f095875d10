/// 帧分发流水线 (Frame Dispatch Pipeline)
///
/// 双线程架构,通过有界通道通信:
/// - Camera:   产生分析帧,调用 `FrameProcessor::process_frame`
/// - Detector: 执行检测,整批替换画布标注 (独立线程)
///
/// 渲染线程只读取画布已发布的快照。
pub mod frame;
pub mod processor;
pub mod stats;

pub use frame::{logical_size, AnalysisFrame, InputImage};
pub use processor::{FrameProcessor, PipelineEvent};
pub use stats::FrameStats;
