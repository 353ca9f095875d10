//! 帧统计: 检测延迟 / 帧延迟 / 每秒帧数

use std::time::{Duration, Instant};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// 逻辑(旋转校正后)尺寸
    pub input_width: u32,
    pub input_height: u32,
    pub fps: f64,
    pub frame_latency_ms: f64,
    pub detector_latency_ms: f64,
    pub frames_processed: u64,
    pub frames_dropped: u64,
}

/// 按1秒窗口统计帧率
#[derive(Debug)]
pub(crate) struct StatsTracker {
    count: u64,
    last: Instant,
    current_fps: f64,
    frames_processed: u64,
    latest: FrameStats,
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self {
            count: 0,
            last: Instant::now(),
            current_fps: 0.0,
            frames_processed: 0,
            latest: FrameStats::default(),
        }
    }
}

impl StatsTracker {
    pub(crate) fn record(
        &mut self,
        logical: (u32, u32),
        captured_at: Instant,
        detector_latency: Duration,
        frames_dropped: u64,
    ) -> FrameStats {
        self.count += 1;
        self.frames_processed += 1;

        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.current_fps = self.count as f64 / elapsed;
            self.last = Instant::now();
            self.count = 0;
        }

        self.latest = FrameStats {
            input_width: logical.0,
            input_height: logical.1,
            fps: self.current_fps,
            frame_latency_ms: captured_at.elapsed().as_secs_f64() * 1000.0,
            detector_latency_ms: detector_latency.as_secs_f64() * 1000.0,
            frames_processed: self.frames_processed,
            frames_dropped,
        };
        self.latest.clone()
    }

    pub(crate) fn latest(&self) -> &FrameStats {
        &self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_frames() {
        let mut tracker = StatsTracker::default();
        let stats = tracker.record((480, 640), Instant::now(), Duration::from_millis(20), 3);
        assert_eq!(stats.frames_processed, 1);
        assert_eq!(stats.frames_dropped, 3);
        assert_eq!((stats.input_width, stats.input_height), (480, 640));
        assert!(stats.detector_latency_ms >= 19.9);
        assert_eq!(stats.fps, 0.0);

        tracker.record((480, 640), Instant::now(), Duration::ZERO, 3);
        assert_eq!(tracker.latest().frames_processed, 2);
    }
}
