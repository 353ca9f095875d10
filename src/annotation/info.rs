//! 推理信息标注: 左上角固定位置的文字块

use super::Annotation;
use crate::error::Result;
use crate::overlay::surface::WHITE;
use crate::overlay::{CoordinateMapper, Surface};
use crate::pipeline::FrameStats;

pub const TEXT_SIZE: f32 = 60.0;

pub struct InferenceInfoGraphic {
    stats: FrameStats,
}

impl InferenceInfoGraphic {
    pub fn new(stats: FrameStats) -> Self {
        Self { stats }
    }

    pub fn lines(&self) -> Vec<String> {
        let s = &self.stats;
        let mut lines = vec![format!("InputImage size: {}x{}", s.input_height, s.input_width)];
        if s.fps > 0.0 {
            lines.push(format!(
                "FPS: {:.0}, Frame latency: {:.0} ms",
                s.fps, s.frame_latency_ms
            ));
        } else {
            lines.push(format!("Frame latency: {:.0} ms", s.frame_latency_ms));
        }
        lines.push(format!("Detector latency: {:.0} ms", s.detector_latency_ms));
        lines
    }
}

impl Annotation for InferenceInfoGraphic {
    fn kind(&self) -> &'static str {
        "inference_info"
    }

    /// 不依赖坐标映射,SourceInfo 未设置时也能绘制
    fn draw(&self, surface: &mut dyn Surface, _mapper: &CoordinateMapper) -> Result<()> {
        let x = TEXT_SIZE * 0.5;
        let y = TEXT_SIZE * 1.5;
        for (i, line) in self.lines().iter().enumerate() {
            surface.draw_text(line, (x, y + TEXT_SIZE * i as f32), TEXT_SIZE, WHITE);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::RecordingSurface;

    #[test]
    fn test_info_lines() {
        let stats = FrameStats {
            input_width: 480,
            input_height: 640,
            fps: 14.6,
            frame_latency_ms: 71.2,
            detector_latency_ms: 64.9,
            ..Default::default()
        };
        let g = InferenceInfoGraphic::new(stats);
        let mut s = RecordingSurface::new(100, 100);
        g.draw(&mut s, &CoordinateMapper::new(None, 100, 100)).unwrap();
        assert_eq!(
            s.texts(),
            vec![
                "InputImage size: 640x480",
                "FPS: 15, Frame latency: 71 ms",
                "Detector latency: 65 ms"
            ]
        );
    }
}
