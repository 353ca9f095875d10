//! 帧处理器 (Frame Processor)
//! 职责: 接收分析帧 → 检测线程 → 整批替换画布标注
//!
//! 状态机: Idle ⇄ Analyzing。任意时刻最多一帧在检测中,
//! 忙碌时到达的帧直接释放并计入丢帧。

use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::{debug, error, info, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::frame::{AnalysisFrame, InputImage};
use super::stats::{FrameStats, StatsTracker};
use crate::annotation::build_batch;
use crate::config::PresentationFlags;
use crate::detection::{DetectionResult, Detector};
use crate::error::{DetectionError, Result};
use crate::overlay::{OverlayCanvas, SourceInfo};

const NOTIFICATION_CAPACITY: usize = 16;

/// 流水线通知 (检测线程 → 界面)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    DetectionFailed {
        message: String,
        cause: Option<String>,
    },
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 离开作用域时回到 Idle
struct IdleGuard<'a>(&'a AtomicBool);

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Default)]
struct Geometry {
    logical: Option<(u32, u32)>,
    mirrored: bool,
}

struct Shared {
    canvas: Arc<OverlayCanvas>,
    flags: PresentationFlags,
    analyzing: AtomicBool,
    /// 会话是否仍在运行;检查与发布在同一把锁下完成
    active: Mutex<bool>,
    dropped: AtomicU64,
    stats: Mutex<StatsTracker>,
    events: Sender<PipelineEvent>,
}

impl Shared {
    fn complete(
        &self,
        image: &InputImage,
        outcome: std::result::Result<DetectionResult, DetectionError>,
        detector_latency: Duration,
    ) {
        match outcome {
            Ok(result) => {
                let active = lock(&self.active);
                if !*active {
                    debug!("会话已停止,丢弃帧 {} 的检测结果", image.frame_id);
                    return;
                }
                let stats = lock(&self.stats).record(
                    image.logical_size(),
                    image.captured_at,
                    detector_latency,
                    self.dropped.load(Ordering::Relaxed),
                );
                let batch = build_batch(&result, &self.flags, &stats);
                self.canvas.swap(batch);
            }
            Err(e) => {
                let active = lock(&self.active);
                if !*active {
                    debug!("会话已停止,忽略帧 {} 的检测失败", image.frame_id);
                    return;
                }
                self.canvas.swap(Vec::new());
                drop(active);

                error!("❌ 检测失败 (帧 {}): {}", image.frame_id, e);
                let event = PipelineEvent::DetectionFailed {
                    message: e.message,
                    cause: e.cause,
                };
                if let Err(TrySendError::Full(_)) = self.events.try_send(event) {
                    warn!("⚠️  通知队列已满,丢弃检测失败通知");
                }
            }
        }
    }
}

/// 检测线程主循环
fn run_worker(shared: Arc<Shared>, mut detector: Box<dyn Detector>, jobs: Receiver<InputImage>) {
    info!("🔍 检测线程启动: {}", detector.name());
    while let Ok(image) = jobs.recv() {
        let _idle = IdleGuard(&shared.analyzing);

        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| detector.detect(&image)))
            .unwrap_or_else(|_| Err(DetectionError::new("detector panicked")));
        shared.complete(&image, outcome, start.elapsed());
    }
    detector.close();
    info!("🛑 检测线程退出: {}", detector.name());
}

pub struct FrameProcessor {
    shared: Arc<Shared>,
    jobs: Mutex<Option<Sender<InputImage>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    geometry: Mutex<Geometry>,
    events: Receiver<PipelineEvent>,
}

impl FrameProcessor {
    pub fn new(
        canvas: Arc<OverlayCanvas>,
        detector: Box<dyn Detector>,
        flags: PresentationFlags,
        is_mirrored: bool,
    ) -> Result<Self> {
        let (events_tx, events) = crossbeam_channel::bounded(NOTIFICATION_CAPACITY);
        // 容量1: Analyzing 标志保证队列中至多一帧
        let (jobs_tx, jobs_rx) = crossbeam_channel::bounded(1);

        let shared = Arc::new(Shared {
            canvas,
            flags,
            analyzing: AtomicBool::new(false),
            active: Mutex::new(true),
            dropped: AtomicU64::new(0),
            stats: Mutex::new(StatsTracker::default()),
            events: events_tx,
        });

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("detector".into())
            .spawn(move || run_worker(worker_shared, detector, jobs_rx))?;

        Ok(Self {
            shared,
            jobs: Mutex::new(Some(jobs_tx)),
            worker: Mutex::new(Some(worker)),
            geometry: Mutex::new(Geometry {
                logical: None,
                mirrored: is_mirrored,
            }),
            events,
        })
    }

    /// 分发一帧。返回 false 表示该帧被丢弃 (忙碌/已停止/尺寸无效)
    pub fn process_frame(&self, frame: AnalysisFrame) -> bool {
        if !self.is_active() {
            return false;
        }
        if self
            .shared
            .analyzing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        match self.refresh_geometry(frame.logical_size()) {
            Ok(true) => {}
            Ok(false) => {
                self.shared.analyzing.store(false, Ordering::Release);
                return false;
            }
            Err(e) => {
                warn!("⚠️  帧 {} 尺寸无效: {}", frame.frame_id(), e);
                self.shared.analyzing.store(false, Ordering::Release);
                return false;
            }
        }

        let image = frame.into_input_image();
        let sent = match lock(&self.jobs).as_ref() {
            Some(jobs) => jobs.try_send(image).is_ok(),
            None => false,
        };
        if !sent {
            self.shared.analyzing.store(false, Ordering::Release);
        }
        sent
    }

    /// 逻辑尺寸或镜像变化时刷新 SourceInfo。会话已停止时返回 false,不写画布
    fn refresh_geometry(&self, logical: (u32, u32)) -> Result<bool> {
        let active = lock(&self.shared.active);
        if !*active {
            return Ok(false);
        }
        let mut geometry = lock(&self.geometry);
        if geometry.logical == Some(logical) {
            return Ok(true);
        }
        let info = SourceInfo::new(logical.0, logical.1, geometry.mirrored)?;
        self.shared.canvas.set_source_info(info);
        geometry.logical = Some(logical);
        drop(active);
        debug!("SourceInfo → {}x{} mirrored={}", logical.0, logical.1, geometry.mirrored);
        Ok(true)
    }

    /// 手动设置几何信息 (静态图片等非相机输入)
    pub fn set_image_source_info(&self, width: u32, height: u32, is_mirrored: bool) -> Result<()> {
        let mut geometry = lock(&self.geometry);
        self.shared
            .canvas
            .set_image_source_info(width, height, is_mirrored)?;
        *geometry = Geometry {
            logical: Some((width, height)),
            mirrored: is_mirrored,
        };
        Ok(())
    }

    /// 停止会话: 清空画布,等待检测线程退出。可重复调用。
    pub fn stop(&self) {
        {
            let mut active = lock(&self.shared.active);
            if *active {
                *active = false;
                self.shared.canvas.reset();
                info!("⏹️  帧处理器已停止");
            }
        }
        drop(lock(&self.jobs).take());
        if let Some(worker) = lock(&self.worker).take() {
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                warn!("⚠️  检测线程异常退出");
            }
        }
    }

    pub fn notifications(&self) -> Receiver<PipelineEvent> {
        self.events.clone()
    }

    pub fn canvas(&self) -> &Arc<OverlayCanvas> {
        &self.shared.canvas
    }

    pub fn is_active(&self) -> bool {
        *lock(&self.shared.active)
    }

    pub fn is_analyzing(&self) -> bool {
        self.shared.analyzing.load(Ordering::Acquire)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// 最近一次成功检测的统计
    pub fn stats(&self) -> FrameStats {
        let mut stats = lock(&self.shared.stats).latest().clone();
        stats.frames_dropped = self.frames_dropped();
        stats
    }
}

impl Drop for FrameProcessor {
    fn drop(&mut self) {
        self.stop();
    }
}
