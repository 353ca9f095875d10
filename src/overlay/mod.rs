/// 叠加层系统 (Overlay System)
///
/// 渲染线程读取,检测线程写入
/// - Mapper:  分析帧坐标 → 屏幕坐标
/// - Canvas:  标注集合 + 原子发布 + 重绘通知
/// - Surface: 绘制表面 (imageproc 光栅化 / 指令记录)
pub mod canvas;
pub mod mapper;
pub mod surface;

pub use canvas::{OverlayCanvas, OverlaySnapshot};
pub use mapper::{CoordinateMapper, SourceInfo};
pub use surface::{Color, DrawOp, ImageSurface, RecordingSurface, Surface};
