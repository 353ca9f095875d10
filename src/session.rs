/// 相机会话 (Camera Session)
///
/// 管理检测模型选择、镜头朝向与帧处理器的绑定:
/// - start:         按当前配置创建检测器并绑定帧处理器
/// - select_model:  切换模型 → 重新绑定
/// - toggle_facing: 切换前/后镜头,设备不支持时保留原配置
/// - stop:          停止处理器并清空画布
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{OverlayConfig, Resolution};
use crate::detection::Detector;
use crate::error::{OverlayError, Result};
use crate::overlay::OverlayCanvas;
use crate::pipeline::{AnalysisFrame, FrameProcessor, FrameStats, PipelineEvent};
use crossbeam_channel::Receiver;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LensFacing {
    Back,
    Front,
}

impl LensFacing {
    /// 前置镜头画面需要水平镜像
    pub fn is_mirrored(self) -> bool {
        self == LensFacing::Front
    }

    pub fn toggled(self) -> Self {
        match self {
            LensFacing::Back => LensFacing::Front,
            LensFacing::Front => LensFacing::Back,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorModel {
    ObjectDetection,
    CustomObjectDetection,
    CustomAutoMlObjectDetection,
    PoseDetection,
    SelfieSegmentation,
}

impl DetectorModel {
    pub const ALL: [DetectorModel; 5] = [
        DetectorModel::ObjectDetection,
        DetectorModel::CustomObjectDetection,
        DetectorModel::CustomAutoMlObjectDetection,
        DetectorModel::PoseDetection,
        DetectorModel::SelfieSegmentation,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            DetectorModel::ObjectDetection => "Object Detection",
            DetectorModel::CustomObjectDetection => "Custom Object Detection",
            DetectorModel::CustomAutoMlObjectDetection => {
                "Custom AutoML Object Detection (Flower)"
            }
            DetectorModel::PoseDetection => "Pose Detection",
            DetectorModel::SelfieSegmentation => "Selfie Segmentation",
        }
    }
}

impl fmt::Display for DetectorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DetectorModel {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        DetectorModel::ALL
            .into_iter()
            .find(|m| m.display_name() == name)
            .ok_or_else(|| OverlayError::InvalidModel(name.to_string()))
    }
}

/// 相机设备查询
pub trait CameraProvider: Send + Sync {
    fn has_camera(&self, facing: LensFacing) -> bool;
}

/// 按模型创建检测器
pub trait DetectorFactory: Send + Sync {
    fn create(&self, model: DetectorModel, config: &OverlayConfig) -> Result<Box<dyn Detector>>;
}

pub struct CameraSession {
    canvas: Arc<OverlayCanvas>,
    provider: Box<dyn CameraProvider>,
    factory: Box<dyn DetectorFactory>,
    config: OverlayConfig,
    processor: Option<FrameProcessor>,
}

impl CameraSession {
    pub fn new(
        canvas: Arc<OverlayCanvas>,
        provider: Box<dyn CameraProvider>,
        factory: Box<dyn DetectorFactory>,
        config: OverlayConfig,
    ) -> Self {
        Self {
            canvas,
            provider,
            factory,
            config,
            processor: None,
        }
    }

    pub fn canvas(&self) -> &Arc<OverlayCanvas> {
        &self.canvas
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn lens_facing(&self) -> LensFacing {
        self.config.lens_facing
    }

    pub fn selected_model(&self) -> DetectorModel {
        self.config.selected_model
    }

    /// 是否显示相机预览 (关闭时只绘制叠加层)
    pub fn preview_enabled(&self) -> bool {
        self.config.camera_live_viewport
    }

    pub fn is_bound(&self) -> bool {
        self.processor.is_some()
    }

    pub fn start(&mut self) -> Result<()> {
        if !self.provider.has_camera(self.config.lens_facing) {
            return Err(OverlayError::UnsupportedConfiguration {
                facing: self.config.lens_facing,
            });
        }
        self.bind()
    }

    fn bind(&mut self) -> Result<()> {
        self.unbind();

        let model = self.config.selected_model;
        let detector = self.factory.create(model, &self.config).map_err(|e| {
            error!("❌ 无法创建检测器 {}: {}", model, e);
            OverlayError::ProcessorCreation(format!("{}: {}", model, e))
        })?;

        let facing = self.config.lens_facing;
        let processor = FrameProcessor::new(
            self.canvas.clone(),
            detector,
            self.config.flags,
            facing.is_mirrored(),
        )?;
        self.processor = Some(processor);
        info!("📷 绑定分析用例: {} ({:?})", model, facing);
        Ok(())
    }

    fn unbind(&mut self) {
        if let Some(processor) = self.processor.take() {
            processor.stop();
        }
    }

    /// 切换模型;已绑定时立即重新绑定
    pub fn select_model(&mut self, model: DetectorModel) -> Result<()> {
        info!("🔀 选择模型: {}", model);
        self.config.selected_model = model;
        if self.is_bound() {
            self.bind()?;
        }
        Ok(())
    }

    /// 偏好设置变化后重新读取配置
    pub fn reconfigure(&mut self, config: OverlayConfig) -> Result<()> {
        self.config = config;
        if self.is_bound() {
            self.bind()?;
        }
        Ok(())
    }

    /// 切换前/后镜头,设备不支持时返回错误并保留当前朝向
    pub fn toggle_facing(&mut self) -> Result<LensFacing> {
        let facing = self.config.lens_facing.toggled();
        if !self.provider.has_camera(facing) {
            warn!("⚠️  设备没有 {:?} 镜头", facing);
            return Err(OverlayError::UnsupportedConfiguration { facing });
        }
        self.config.lens_facing = facing;
        if self.is_bound() {
            self.bind()?;
        }
        Ok(facing)
    }

    /// 转发分析帧;未绑定时释放该帧
    pub fn process_frame(&self, frame: AnalysisFrame) -> bool {
        match &self.processor {
            Some(processor) => processor.process_frame(frame),
            None => false,
        }
    }

    pub fn notifications(&self) -> Option<Receiver<PipelineEvent>> {
        self.processor.as_ref().map(|p| p.notifications())
    }

    pub fn stats(&self) -> Option<FrameStats> {
        self.processor.as_ref().map(|p| p.stats())
    }

    pub fn target_resolution(&self) -> Option<Resolution> {
        self.config.target_resolution(self.config.lens_facing)
    }

    pub fn stop(&mut self) {
        self.unbind();
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PresentationFlags;
    use crate::detection::DetectionResult;
    use crate::error::DetectionError;
    use crate::pipeline::InputImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct BackOnly;

    impl CameraProvider for BackOnly {
        fn has_camera(&self, facing: LensFacing) -> bool {
            facing == LensFacing::Back
        }
    }

    struct BothCameras;

    impl CameraProvider for BothCameras {
        fn has_camera(&self, _: LensFacing) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: Arc<Mutex<Vec<DetectorModel>>>,
        flags: Arc<Mutex<Vec<PresentationFlags>>>,
    }

    impl DetectorFactory for CountingFactory {
        fn create(&self, model: DetectorModel, config: &OverlayConfig) -> Result<Box<dyn Detector>> {
            if model == DetectorModel::SelfieSegmentation {
                return Err(OverlayError::InvalidModel("no segmenter".into()));
            }
            self.created.lock().unwrap().push(model);
            self.flags.lock().unwrap().push(config.flags);
            Ok(Box::new(
                |_: &InputImage| -> std::result::Result<DetectionResult, DetectionError> {
                    Ok(DetectionResult::None)
                },
            ))
        }
    }

    fn session(provider: Box<dyn CameraProvider>) -> (CameraSession, Arc<Mutex<Vec<DetectorModel>>>) {
        let factory = CountingFactory::default();
        let created = factory.created.clone();
        let s = CameraSession::new(
            Arc::new(OverlayCanvas::new()),
            provider,
            Box::new(factory),
            OverlayConfig::default(),
        );
        (s, created)
    }

    #[test]
    fn model_names_round_trip() {
        for model in DetectorModel::ALL {
            assert_eq!(model.to_string().parse::<DetectorModel>().unwrap(), model);
        }
        assert_eq!(
            "Pose Detection".parse::<DetectorModel>().unwrap(),
            DetectorModel::PoseDetection
        );
        assert!(matches!(
            "Face Mesh".parse::<DetectorModel>(),
            Err(OverlayError::InvalidModel(name)) if name == "Face Mesh"
        ));
    }

    #[test]
    fn front_lens_is_mirrored() {
        assert!(LensFacing::Front.is_mirrored());
        assert!(!LensFacing::Back.is_mirrored());
        assert_eq!(LensFacing::Back.toggled(), LensFacing::Front);
    }

    #[test]
    fn toggle_without_front_camera_keeps_configuration() {
        let (mut s, created) = session(Box::new(BackOnly));
        s.start().unwrap();
        let err = s.toggle_facing().unwrap_err();
        assert!(matches!(
            err,
            OverlayError::UnsupportedConfiguration {
                facing: LensFacing::Front
            }
        ));
        assert_eq!(s.lens_facing(), LensFacing::Back);
        assert!(s.is_bound());
        assert_eq!(created.lock().unwrap().len(), 1);
    }

    #[test]
    fn toggle_rebinds_processor() {
        let (mut s, created) = session(Box::new(BothCameras));
        s.start().unwrap();
        assert_eq!(s.toggle_facing().unwrap(), LensFacing::Front);
        assert_eq!(created.lock().unwrap().len(), 2);
    }

    #[test]
    fn select_model_rebinds_only_when_bound() {
        let (mut s, created) = session(Box::new(BothCameras));
        s.select_model(DetectorModel::PoseDetection).unwrap();
        assert!(created.lock().unwrap().is_empty());

        s.start().unwrap();
        s.select_model(DetectorModel::ObjectDetection).unwrap();
        assert_eq!(
            *created.lock().unwrap(),
            vec![DetectorModel::PoseDetection, DetectorModel::ObjectDetection]
        );
    }

    #[test]
    fn factory_failure_leaves_session_unbound() {
        let (mut s, _) = session(Box::new(BothCameras));
        s.start().unwrap();
        let err = s.select_model(DetectorModel::SelfieSegmentation).unwrap_err();
        assert!(matches!(err, OverlayError::ProcessorCreation(_)));
        assert!(!s.is_bound());
        assert!(!s.process_frame(AnalysisFrame::new(vec![0u8; 4], 1, 1, 0)));
    }

    #[test]
    fn stop_clears_canvas() {
        let (mut s, _) = session(Box::new(BothCameras));
        s.start().unwrap();
        s.canvas().set_image_source_info(10, 10, false).unwrap();
        s.canvas().request_redraw();
        s.stop();
        s.stop();
        assert!(!s.is_bound());
        assert!(s.canvas().source_info().is_none());
    }

    #[test]
    fn unbound_session_drops_frames() {
        let released = Arc::new(AtomicUsize::new(0));
        let r = released.clone();
        let (s, _) = session(Box::new(BothCameras));
        let frame = AnalysisFrame::new(vec![0u8; 4], 1, 1, 0).on_release(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!s.process_frame(frame));
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(s.target_resolution(), None);
    }

    #[test]
    fn reconfigure_rebinds_with_new_flags() {
        let factory = CountingFactory::default();
        let flags_seen = factory.flags.clone();
        let mut s = CameraSession::new(
            Arc::new(OverlayCanvas::new()),
            Box::new(BothCameras),
            Box::new(factory),
            OverlayConfig::default(),
        );
        s.start().unwrap();

        let mut config = OverlayConfig::default();
        config.flags.run_classification = true;
        config.flags.visualize_z = false;
        config.camera_live_viewport = false;
        s.reconfigure(config).unwrap();

        let seen = flags_seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].run_classification);
        assert!(seen[1].run_classification);
        assert!(!seen[1].visualize_z);
        assert!(s.is_bound());
        assert!(!s.preview_enabled());
    }

    #[test]
    fn reconfigure_while_unbound_does_not_bind() {
        let factory = CountingFactory::default();
        let created = factory.created.clone();
        let mut s = CameraSession::new(
            Arc::new(OverlayCanvas::new()),
            Box::new(BothCameras),
            Box::new(factory),
            OverlayConfig::default(),
        );
        assert!(s.preview_enabled());
        s.reconfigure(OverlayConfig::default()).unwrap();
        assert!(created.lock().unwrap().is_empty());
        assert!(!s.is_bound());
    }
}
