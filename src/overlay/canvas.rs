//! 叠加层画布 (Overlay Canvas)
//!
//! 写线程在暂存区 `clear → add* → request_redraw`,
//! `request_redraw` 以一次 `Arc` 替换发布完整快照;
//! 渲染线程只读取已发布的快照,因此不会看到半批结果。

use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::trace;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::mapper::{CoordinateMapper, SourceInfo};
use super::surface::Surface;
use crate::annotation::Annotation;
use crate::error::Result;

/// 已发布的叠加层状态 (只读)
#[derive(Clone, Default)]
pub struct OverlaySnapshot {
    pub generation: u64,
    pub source: Option<SourceInfo>,
    pub annotations: Vec<Arc<dyn Annotation>>,
}

impl OverlaySnapshot {
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

impl std::fmt::Debug for OverlaySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlaySnapshot")
            .field("generation", &self.generation)
            .field("source", &self.source)
            .field(
                "annotations",
                &self.annotations.iter().map(|a| a.kind()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[derive(Default)]
struct Staged {
    source: Option<SourceInfo>,
    annotations: Vec<Arc<dyn Annotation>>,
}

pub struct OverlayCanvas {
    staged: Mutex<Staged>,
    published: RwLock<Arc<OverlaySnapshot>>,
    redraw_tx: Sender<u64>,
    redraw_rx: Receiver<u64>,
}

impl Default for OverlayCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayCanvas {
    pub fn new() -> Self {
        // 容量1: 未被消费的重绘请求会合并
        let (redraw_tx, redraw_rx) = crossbeam_channel::bounded(1);
        Self {
            staged: Mutex::new(Staged::default()),
            published: RwLock::new(Arc::new(OverlaySnapshot::default())),
            redraw_tx,
            redraw_rx,
        }
    }

    fn staged(&self) -> std::sync::MutexGuard<'_, Staged> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clear(&self) {
        self.staged().annotations.clear();
    }

    pub fn add(&self, annotation: Arc<dyn Annotation>) {
        self.staged().annotations.push(annotation);
    }

    /// 设置分析帧几何信息,随下一次 `request_redraw` 一起发布
    pub fn set_source_info(&self, info: SourceInfo) {
        self.staged().source = Some(info);
    }

    pub fn set_image_source_info(
        &self,
        frame_width: u32,
        frame_height: u32,
        is_mirrored: bool,
    ) -> Result<()> {
        self.set_source_info(SourceInfo::new(frame_width, frame_height, is_mirrored)?);
        Ok(())
    }

    /// 发布暂存区并通知渲染线程
    pub fn request_redraw(&self) -> u64 {
        let staged = self.staged();
        self.publish_locked(&staged)
    }

    pub fn post_invalidate(&self) -> u64 {
        self.request_redraw()
    }

    /// 整批替换: 等价于 `clear + add* + request_redraw`,且对其他写者也是原子的
    pub fn swap(&self, annotations: Vec<Arc<dyn Annotation>>) -> u64 {
        let mut staged = self.staged();
        staged.annotations = annotations;
        self.publish_locked(&staged)
    }

    /// 会话结束: 清空标注与几何信息
    pub fn reset(&self) -> u64 {
        let mut staged = self.staged();
        *staged = Staged::default();
        self.publish_locked(&staged)
    }

    fn publish_locked(&self, staged: &Staged) -> u64 {
        let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
        let generation = published.generation + 1;
        *published = Arc::new(OverlaySnapshot {
            generation,
            source: staged.source,
            annotations: staged.annotations.clone(),
        });
        drop(published);

        match self.redraw_tx.try_send(generation) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => trace!("redraw channel closed"),
        }
        generation
    }

    pub fn snapshot(&self) -> Arc<OverlaySnapshot> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn source_info(&self) -> Option<SourceInfo> {
        self.snapshot().source
    }

    /// 渲染线程订阅重绘请求 (值为快照代数)
    pub fn redraw_requests(&self) -> Receiver<u64> {
        self.redraw_rx.clone()
    }

    /// 按插入顺序绘制当前快照,返回绘制的快照代数
    pub fn draw(&self, surface: &mut dyn Surface) -> Result<u64> {
        let snapshot = self.snapshot();
        if snapshot.annotations.is_empty() {
            return Ok(snapshot.generation);
        }
        let (w, h) = surface.size();
        let mapper = CoordinateMapper::new(snapshot.source, w, h);
        for annotation in &snapshot.annotations {
            annotation.draw(surface, &mapper)?;
        }
        Ok(snapshot.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::surface::{RecordingSurface, WHITE};
    use crate::OverlayError;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// 带批次号的测试标注
    struct Tagged {
        batch: u64,
        batch_len: usize,
    }

    impl Annotation for Tagged {
        fn kind(&self) -> &'static str {
            "tagged"
        }

        fn draw(&self, surface: &mut dyn Surface, mapper: &CoordinateMapper) -> Result<()> {
            let p = mapper.translate_point(self.batch as f32, 0.0)?;
            surface.draw_circle(p, 1.0, WHITE);
            Ok(())
        }
    }

    fn tagged(batch: u64, batch_len: usize) -> Arc<dyn Annotation> {
        Arc::new(Tagged { batch, batch_len })
    }

    #[test]
    fn empty_canvas_draws_nothing_without_source() {
        let canvas = OverlayCanvas::new();
        let mut surface = RecordingSurface::new(100, 100);
        canvas.draw(&mut surface).unwrap();
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn staged_changes_invisible_until_redraw() {
        let canvas = OverlayCanvas::new();
        canvas.set_image_source_info(10, 10, false).unwrap();
        canvas.add(tagged(1, 2));
        canvas.add(tagged(1, 2));
        assert!(canvas.snapshot().is_empty());
        assert!(canvas.source_info().is_none());

        let generation = canvas.request_redraw();
        let snap = canvas.snapshot();
        assert_eq!(snap.generation, generation);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.source.unwrap().frame_width(), 10);
    }

    #[test]
    fn draw_without_source_is_invalid_state() {
        let canvas = OverlayCanvas::new();
        canvas.add(tagged(1, 1));
        canvas.request_redraw();
        let mut surface = RecordingSurface::new(100, 100);
        assert!(matches!(
            canvas.draw(&mut surface),
            Err(OverlayError::InvalidState(_))
        ));
    }

    #[test]
    fn draw_keeps_insertion_order() {
        let canvas = OverlayCanvas::new();
        canvas.set_image_source_info(100, 100, false).unwrap();
        canvas.swap(vec![tagged(3, 3), tagged(1, 3), tagged(2, 3)]);
        let mut surface = RecordingSurface::new(100, 100);
        canvas.draw(&mut surface).unwrap();
        let xs: Vec<f32> = surface
            .circles()
            .map(|op| match op {
                crate::overlay::surface::DrawOp::Circle { center, .. } => center.0,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(xs, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn redraw_requests_coalesce() {
        let canvas = OverlayCanvas::new();
        let rx = canvas.redraw_requests();
        canvas.request_redraw();
        canvas.request_redraw();
        canvas.post_invalidate();
        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(canvas.snapshot().generation, 3);
    }

    #[test]
    fn reset_clears_source_and_annotations() {
        let canvas = OverlayCanvas::new();
        canvas.set_image_source_info(10, 10, true).unwrap();
        canvas.swap(vec![tagged(1, 1)]);
        canvas.reset();
        let snap = canvas.snapshot();
        assert!(snap.is_empty());
        assert!(snap.source.is_none());
    }

    #[test]
    fn readers_never_see_partial_batch() {
        let canvas = Arc::new(OverlayCanvas::new());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let canvas = canvas.clone();
                let done = done.clone();
                std::thread::spawn(move || {
                    let mut observed = 0;
                    while !done.load(Ordering::Acquire) {
                        let snap = canvas.snapshot();
                        let tags: Vec<(u64, usize)> = snap
                            .annotations
                            .iter()
                            .map(|a| {
                                let t = (**a).as_any().downcast_ref::<Tagged>().unwrap();
                                (t.batch, t.batch_len)
                            })
                            .collect();
                        if let Some(&(batch, len)) = tags.first() {
                            assert_eq!(tags.len(), len);
                            assert!(tags.iter().all(|&(b, _)| b == batch));
                        }
                        observed += 1;
                    }
                    observed
                })
            })
            .collect();

        for batch in 0..2000u64 {
            let len = (batch % 7) as usize;
            canvas.clear();
            for _ in 0..len {
                canvas.add(tagged(batch, len));
            }
            canvas.request_redraw();
        }
        done.store(true, Ordering::Release);
        for r in readers {
            assert!(r.join().unwrap() > 0);
        }
    }
}
