pub mod annotation; // 标注渲染器
pub mod config; // 叠加层配置
pub mod detection; // 检测结果与检测器接口
pub mod error; // 错误类型
pub mod overlay; // 坐标映射与画布
pub mod pipeline; // 帧分发流水线
pub mod session; // 相机会话

pub use crate::config::{OverlayConfig, PresentationFlags};
pub use crate::error::{DetectionError, OverlayError, Result};
pub use crate::overlay::{CoordinateMapper, OverlayCanvas, SourceInfo};
pub use crate::pipeline::{AnalysisFrame, FrameProcessor, PipelineEvent};
pub use crate::session::{CameraSession, DetectorModel, LensFacing};

/// 本地时间字符串,用于输出文件名
pub fn gen_time_string(delimiter: &str) -> String {
    let fmt = ["%Y", "%m", "%d", "%H", "%M", "%S", "%3f"].join(delimiter);
    chrono::Local::now().format(&fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_string_uses_delimiter() {
        let s = gen_time_string("-");
        assert_eq!(s.split('-').count(), 7);
        assert!(s.chars().all(|c| c.is_ascii_digit() || c == '-'));
    }
}
