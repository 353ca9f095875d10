/// 叠加层演示 (Overlay Demo)
///
/// 合成相机帧 → 模拟检测器 → 叠加层渲染为PNG
///
/// 线程:
/// 1. 主线程:   按帧率产生分析帧
/// 2. 检测线程: 模拟可变延迟的检测 (由 FrameProcessor 管理)
/// 3. 渲染线程: 响应重绘请求,绘制快照并保存
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use image::{Rgba, RgbaImage};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use vision_overlay::config::OverlayConfig;
use vision_overlay::detection::{
    DetectedObject, DetectionResult, Detector, Label, LandmarkType, Point3, Pose, PoseLandmark,
    SegmentationMask,
};
use vision_overlay::overlay::{ImageSurface, OverlayCanvas};
use vision_overlay::pipeline::{AnalysisFrame, InputImage};
use vision_overlay::session::{CameraProvider, CameraSession, DetectorFactory, DetectorModel, LensFacing};
use vision_overlay::{gen_time_string, DetectionError};

#[derive(Parser, Debug)]
#[command(author, version, about = "叠加层演示 - 合成帧 → 检测 → PNG", long_about = None)]
struct Args {
    /// 配置文件
    #[arg(short, long, default_value = "overlay_config.json")]
    config: PathBuf,

    /// 检测模型: object / custom / automl / pose / segmentation 或完整名称
    #[arg(short, long)]
    model: Option<String>,

    /// 使用前置镜头 (镜像)
    #[arg(long)]
    front: bool,

    /// 帧数
    #[arg(short, long, default_value_t = 60)]
    frames: u64,

    /// 相机帧率
    #[arg(long, default_value_t = 30)]
    fps: u32,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,

    /// 传感器旋转角度 (0/90/180/270)
    #[arg(long, default_value_t = 90)]
    rotation: u32,

    /// 显示表面缩放倍数
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// 检测失败概率
    #[arg(long, default_value_t = 0.05)]
    fail_rate: f64,

    /// 每N次重绘保存一张PNG
    #[arg(long, default_value_t = 5)]
    save_every: u64,

    /// 输出目录
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// 字体文件 (TTF/OTF),未提供时不绘制文字
    #[arg(long)]
    font: Option<PathBuf>,
}

fn parse_model(name: &str) -> Result<DetectorModel> {
    let model = match name.to_ascii_lowercase().as_str() {
        "object" => DetectorModel::ObjectDetection,
        "custom" => DetectorModel::CustomObjectDetection,
        "automl" => DetectorModel::CustomAutoMlObjectDetection,
        "pose" => DetectorModel::PoseDetection,
        "segmentation" | "selfie" => DetectorModel::SelfieSegmentation,
        _ => name.parse()?,
    };
    Ok(model)
}

/// 合成相机: 前后镜头都可用
struct SyntheticCamera;

impl CameraProvider for SyntheticCamera {
    fn has_camera(&self, _facing: LensFacing) -> bool {
        true
    }
}

struct SyntheticFactory {
    fail_rate: f64,
}

impl DetectorFactory for SyntheticFactory {
    fn create(
        &self,
        model: DetectorModel,
        _config: &OverlayConfig,
    ) -> vision_overlay::Result<Box<dyn Detector>> {
        Ok(Box::new(SyntheticDetector {
            model,
            fail_rate: self.fail_rate,
            rng: StdRng::seed_from_u64(42),
        }))
    }
}

/// 合成相机帧的灰度值
const FRAME_GRAY: u8 = 128;

const LABELS: [&str; 5] = ["Fashion good", "Food", "Home good", "Place", "Plant"];

/// 模拟检测器: 20~80ms 延迟,按概率失败
struct SyntheticDetector {
    model: DetectorModel,
    fail_rate: f64,
    rng: StdRng,
}

impl SyntheticDetector {
    fn objects(&mut self, w: f32, h: f32) -> DetectionResult {
        let n = self.rng.gen_range(1..=3);
        let objects = (0..n)
            .map(|i| {
                let left = self.rng.gen_range(0.0..w * 0.6);
                let top = self.rng.gen_range(0.0..h * 0.6);
                let right = left + self.rng.gen_range(w * 0.1..w * 0.4);
                let bottom = top + self.rng.gen_range(h * 0.1..h * 0.4);
                let index = self.rng.gen_range(0..LABELS.len());
                DetectedObject {
                    bounding_box: [left, top, right.min(w), bottom.min(h)],
                    tracking_id: Some(i as u32),
                    labels: vec![Label::new(
                        LABELS[index],
                        self.rng.gen_range(0.5..1.0),
                        index,
                    )],
                }
            })
            .collect();
        DetectionResult::ObjectBoxes(objects)
    }

    fn pose(&mut self, w: f32, h: f32) -> DetectionResult {
        let (cx, cy) = (w * 0.5, h * 0.5);
        let mut z = || self.rng.gen_range(-w * 0.3..w * 0.3);
        let landmarks = vec![
            PoseLandmark::new(LandmarkType::Nose, Point3::new(cx, cy - h * 0.3, z()), 0.99),
            PoseLandmark::new(
                LandmarkType::LeftShoulder,
                Point3::new(cx + w * 0.15, cy - h * 0.15, z()),
                0.95,
            ),
            PoseLandmark::new(
                LandmarkType::RightShoulder,
                Point3::new(cx - w * 0.15, cy - h * 0.15, z()),
                0.95,
            ),
            PoseLandmark::new(
                LandmarkType::LeftHip,
                Point3::new(cx + w * 0.1, cy + h * 0.2, z()),
                0.9,
            ),
            PoseLandmark::new(
                LandmarkType::RightHip,
                Point3::new(cx - w * 0.1, cy + h * 0.2, z()),
                0.9,
            ),
        ];
        DetectionResult::PoseLandmarks(Pose::new(landmarks))
    }

    fn segmentation(&mut self, w: u32, h: u32) -> DetectionResult {
        let (mw, mh) = ((w / 4).max(1), (h / 4).max(1));
        let r = self.rng.gen_range(0.3..0.45);
        let confidences = Array2::from_shape_fn((mh as usize, mw as usize), |(y, x)| {
            let dx = x as f32 / mw as f32 - 0.5;
            let dy = y as f32 / mh as f32 - 0.5;
            if (dx * dx + dy * dy).sqrt() < r {
                1.0
            } else {
                0.0
            }
        });
        DetectionResult::SegmentationMask(SegmentationMask::new(confidences))
    }
}

impl Detector for SyntheticDetector {
    fn name(&self) -> &str {
        self.model.display_name()
    }

    fn detect(&mut self, image: &InputImage) -> std::result::Result<DetectionResult, DetectionError> {
        thread::sleep(Duration::from_millis(self.rng.gen_range(20..80)));
        if self.rng.gen_bool(self.fail_rate) {
            return Err(DetectionError::with_cause(
                "inference failed",
                format!("synthetic failure on frame {}", image.frame_id),
            ));
        }

        let (w, h) = image.logical_size();
        Ok(match self.model {
            DetectorModel::ObjectDetection
            | DetectorModel::CustomObjectDetection
            | DetectorModel::CustomAutoMlObjectDetection => self.objects(w as f32, h as f32),
            DetectorModel::PoseDetection => self.pose(w as f32, h as f32),
            DetectorModel::SelfieSegmentation => self.segmentation(w, h),
        })
    }
}

/// 渲染线程: 等待重绘请求并保存快照
fn spawn_renderer(
    canvas: Arc<OverlayCanvas>,
    surface: ImageSurface,
    output: PathBuf,
    save_every: u64,
    done: Arc<AtomicBool>,
) -> thread::JoinHandle<u64> {
    thread::spawn(move || {
        let mut surface = surface;
        let requests = canvas.redraw_requests();
        let mut redraws = 0u64;
        while !done.load(Ordering::Acquire) {
            if requests.recv_timeout(Duration::from_millis(50)).is_err() {
                continue;
            }
            surface.clear();
            let generation = match canvas.draw(&mut surface) {
                Ok(generation) => generation,
                Err(e) => {
                    error!("❌ 绘制失败: {}", e);
                    continue;
                }
            };
            redraws += 1;
            if save_every > 0 && redraws % save_every == 0 {
                let path = output.join(format!(
                    "overlay_{}_{:05}.png",
                    gen_time_string(""),
                    generation
                ));
                match surface.image().save(&path) {
                    Ok(()) => info!("💾 已保存 {}", path.display()),
                    Err(e) => warn!("⚠️  保存失败 {}: {}", path.display(), e),
                }
            }
        }
        redraws
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = OverlayConfig::load(&args.config);
    if let Some(name) = &args.model {
        config.selected_model = parse_model(name)?;
    }
    if args.front {
        config.lens_facing = LensFacing::Front;
    }
    config.print_summary();

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("无法创建输出目录 {}", args.output.display()))?;

    // 显示表面按逻辑尺寸缩放
    let (lw, lh) = vision_overlay::pipeline::logical_size(args.width, args.height, args.rotation);
    let (sw, sh) = (
        (lw as f32 * args.scale).round().max(1.0) as u32,
        (lh as f32 * args.scale).round().max(1.0) as u32,
    );
    let mut surface = ImageSurface::new(sw, sh);
    if let Some(font) = &args.font {
        surface = surface.with_font_file(font);
    }

    let canvas = Arc::new(OverlayCanvas::new());
    let mut session = CameraSession::new(
        canvas.clone(),
        Box::new(SyntheticCamera),
        Box::new(SyntheticFactory {
            fail_rate: args.fail_rate.clamp(0.0, 1.0),
        }),
        config,
    );
    session.start()?;

    // 开启预览时叠加到相机帧上,否则只输出透明叠加层
    if session.preview_enabled() {
        let preview = RgbaImage::from_pixel(lw, lh, Rgba([FRAME_GRAY, FRAME_GRAY, FRAME_GRAY, 255]));
        surface = surface.with_background(&preview);
    } else {
        info!("🙈 相机预览已关闭,只绘制叠加层");
    }
    let notifications = session
        .notifications()
        .context("会话启动后未绑定帧处理器")?;

    let done = Arc::new(AtomicBool::new(false));
    let renderer = spawn_renderer(
        canvas.clone(),
        surface,
        args.output.clone(),
        args.save_every,
        done.clone(),
    );

    info!("🎬 开始发送 {} 帧 ({}x{} @{}°)", args.frames, args.width, args.height, args.rotation);
    let interval = Duration::from_secs_f64(1.0 / args.fps.max(1) as f64);
    let frame_bytes = (args.width * args.height * 4) as usize;
    let start = Instant::now();
    let mut admitted = 0u64;
    for frame_id in 0..args.frames {
        let frame = AnalysisFrame::new(vec![FRAME_GRAY; frame_bytes], args.width, args.height, args.rotation)
            .with_frame_id(frame_id);
        if session.process_frame(frame) {
            admitted += 1;
        }
        for event in notifications.try_iter() {
            warn!("⚠️  {:?}", event);
        }
        thread::sleep(interval);
    }

    let stats = session.stats().unwrap_or_default();
    session.stop();
    done.store(true, Ordering::Release);
    let redraws = renderer
        .join()
        .map_err(|_| anyhow::anyhow!("渲染线程异常退出"))?;

    info!("📊 统计:");
    info!("  用时: {:.1}s", start.elapsed().as_secs_f64());
    info!("  发送帧数: {}", args.frames);
    info!("  进入检测: {}", admitted);
    info!("  检测完成: {}", stats.frames_processed);
    info!("  丢弃帧数: {}", stats.frames_dropped);
    info!("  重绘次数: {}", redraws);
    info!("  最近检测延迟: {:.0} ms", stats.detector_latency_ms);
    Ok(())
}
