//! 绘制表面 (Drawing surface)
//!
//! `Surface` 是标注绘制的唯一出口:
//! - `ImageSurface`:     基于 `RgbaImage` + imageproc 的CPU光栅化
//! - `RecordingSurface`: 只记录绘制指令,用于无头环境与测试

use ab_glyph::{FontArc, PxScale};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_polygon_mut, draw_text_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use log::{debug, info, warn};
use std::path::Path;

pub type Color = Rgba<u8>;

pub const WHITE: Color = Rgba([255, 255, 255, 255]);
pub const BLACK: Color = Rgba([0, 0, 0, 255]);
pub const GREEN: Color = Rgba([0, 255, 0, 255]);
pub const YELLOW: Color = Rgba([255, 255, 0, 255]);
pub const RED: Color = Rgba([255, 0, 0, 255]);
pub const BLUE: Color = Rgba([0, 0, 255, 255]);
pub const TRANSPARENT: Color = Rgba([0, 0, 0, 0]);

/// Target of annotation drawing. Coordinates are surface pixels.
pub trait Surface {
    fn size(&self) -> (u32, u32);

    fn draw_circle(&mut self, center: (f32, f32), radius: f32, color: Color);

    fn draw_line(&mut self, start: (f32, f32), end: (f32, f32), stroke_width: f32, color: Color);

    /// `rect` = `(left, top, right, bottom)`
    fn draw_rect(&mut self, rect: [f32; 4], stroke_width: f32, color: Color);

    fn fill_rect(&mut self, rect: [f32; 4], color: Color);

    /// `origin` 为文字基线左端 (与 Android Canvas.drawText 一致)
    fn draw_text(&mut self, text: &str, origin: (f32, f32), size: f32, color: Color);

    /// 将图像缩放到 `rect` 并做 alpha 混合
    fn draw_image(&mut self, image: &RgbaImage, rect: [f32; 4], flip_horizontal: bool);
}

// ========== ImageSurface ==========

/// 光栅化前坐标收拢到表面四周的这一范围内
const COORD_MARGIN: f32 = 4096.0;

fn clamp_coord(v: f32, extent: u32) -> f32 {
    v.round().clamp(-COORD_MARGIN, extent as f32 + COORD_MARGIN)
}

pub struct ImageSurface {
    image: RgbaImage,
    font: Option<FontArc>,
    /// `clear` 时恢复的底图 (相机预览帧)
    background: Option<RgbaImage>,
}

impl ImageSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
            font: None,
            background: None,
        }
    }

    /// 在已有图像(例如相机预览帧)上叠加绘制
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image,
            font: None,
            background: None,
        }
    }

    /// 设置预览底图,缩放到表面尺寸;之后每次 `clear` 都恢复为该底图
    pub fn with_background(mut self, frame: &RgbaImage) -> Self {
        let (w, h) = self.image.dimensions();
        let background = if frame.dimensions() == (w, h) {
            frame.clone()
        } else {
            imageops::resize(frame, w, h, imageops::FilterType::Triangle)
        };
        self.image = background.clone();
        self.background = Some(background);
        self
    }

    fn point(&self, p: (f32, f32)) -> (f32, f32) {
        let (w, h) = self.image.dimensions();
        (clamp_coord(p.0, w), clamp_coord(p.1, h))
    }

    fn rect(&self, rect: [f32; 4]) -> [f32; 4] {
        let (l, t) = self.point((rect[0], rect[1]));
        let (r, b) = self.point((rect[2], rect[3]));
        [l, t, r, b]
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// 加载字体文件,失败时仅告警,文字将不被绘制
    pub fn with_font_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(bytes) => match FontArc::try_from_vec(bytes) {
                Ok(font) => {
                    info!("✅ 字体加载成功: {}", path.display());
                    self.font = Some(font);
                }
                Err(e) => warn!("⚠️ 字体加载失败: {}", e),
            },
            Err(_) => warn!("⚠️ 未找到字体文件: {}", path.display()),
        }
        self
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// 清空为底图,没有底图时为透明
    pub fn clear(&mut self) {
        match &self.background {
            Some(background) => self.image.copy_from_slice(background),
            None => self.image.pixels_mut().for_each(|p| *p = TRANSPARENT),
        }
    }
}

impl Surface for ImageSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn draw_circle(&mut self, center: (f32, f32), radius: f32, color: Color) {
        let (x, y) = self.point(center);
        draw_filled_circle_mut(
            &mut self.image,
            (x as i32, y as i32),
            radius.round().clamp(1.0, COORD_MARGIN) as i32,
            color,
        );
    }

    fn draw_line(&mut self, start: (f32, f32), end: (f32, f32), stroke_width: f32, color: Color) {
        let (start, end) = (self.point(start), self.point(end));
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        let len = (dx * dx + dy * dy).sqrt();
        if stroke_width <= 1.5 || len < 1.0 {
            draw_line_segment_mut(&mut self.image, start, end, color);
            return;
        }

        // 粗线: 沿法线方向展开为四边形
        let hw = stroke_width.min(COORD_MARGIN) / 2.0;
        let (nx, ny) = (-dy / len * hw, dx / len * hw);
        let poly = [
            Point::new((start.0 + nx).round() as i32, (start.1 + ny).round() as i32),
            Point::new((end.0 + nx).round() as i32, (end.1 + ny).round() as i32),
            Point::new((end.0 - nx).round() as i32, (end.1 - ny).round() as i32),
            Point::new((start.0 - nx).round() as i32, (start.1 - ny).round() as i32),
        ];
        if poly[0] == poly[3] {
            draw_line_segment_mut(&mut self.image, start, end, color);
        } else {
            draw_polygon_mut(&mut self.image, &poly, color);
        }
    }

    fn draw_rect(&mut self, rect: [f32; 4], stroke_width: f32, color: Color) {
        let [l, t, r, b] = self.rect(rect);
        let steps = stroke_width.round().clamp(1.0, COORD_MARGIN) as i32;
        for i in 0..steps {
            let x = l.round() as i32 + i;
            let y = t.round() as i32 + i;
            let w = (r - l).round() as i32 - 2 * i;
            let h = (b - t).round() as i32 - 2 * i;
            if w <= 0 || h <= 0 {
                break;
            }
            draw_hollow_rect_mut(
                &mut self.image,
                Rect::at(x, y).of_size(w as u32, h as u32),
                color,
            );
        }
    }

    fn fill_rect(&mut self, rect: [f32; 4], color: Color) {
        let [l, t, r, b] = self.rect(rect);
        let w = (r - l).round() as i32;
        let h = (b - t).round() as i32;
        if w <= 0 || h <= 0 {
            return;
        }
        draw_filled_rect_mut(
            &mut self.image,
            Rect::at(l.round() as i32, t.round() as i32).of_size(w as u32, h as u32),
            color,
        );
    }

    fn draw_text(&mut self, text: &str, origin: (f32, f32), size: f32, color: Color) {
        let Some(font) = self.font.as_ref() else {
            debug!("未加载字体,跳过文字: {}", text);
            return;
        };
        let (x, y) = self.point((origin.0, origin.1 - size));
        draw_text_mut(
            &mut self.image,
            color,
            x as i32,
            y as i32,
            PxScale::from(size),
            font,
            text,
        );
    }

    fn draw_image(&mut self, image: &RgbaImage, rect: [f32; 4], flip_horizontal: bool) {
        let [l, t, r, b] = self.rect(rect);
        let w = (r - l).round() as i64;
        let h = (b - t).round() as i64;
        if w <= 0 || h <= 0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        let mut scaled = imageops::resize(image, w as u32, h as u32, imageops::FilterType::Triangle);
        if flip_horizontal {
            imageops::flip_horizontal_in_place(&mut scaled);
        }
        imageops::overlay(&mut self.image, &scaled, l.round() as i64, t.round() as i64);
    }
}

// ========== RecordingSurface ==========

/// 单条绘制指令
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Circle {
        center: (f32, f32),
        radius: f32,
        color: Color,
    },
    Line {
        start: (f32, f32),
        end: (f32, f32),
        stroke_width: f32,
        color: Color,
    },
    Rect {
        rect: [f32; 4],
        stroke_width: f32,
        color: Color,
    },
    FillRect {
        rect: [f32; 4],
        color: Color,
    },
    Text {
        text: String,
        origin: (f32, f32),
        size: f32,
        color: Color,
    },
    Image {
        width: u32,
        height: u32,
        rect: [f32; 4],
        flip_horizontal: bool,
    },
}

/// Records draw calls instead of rasterising them.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn circles(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Circle { .. }))
    }

    pub fn lines(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Line { .. }))
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw_circle(&mut self, center: (f32, f32), radius: f32, color: Color) {
        self.ops.push(DrawOp::Circle {
            center,
            radius,
            color,
        });
    }

    fn draw_line(&mut self, start: (f32, f32), end: (f32, f32), stroke_width: f32, color: Color) {
        self.ops.push(DrawOp::Line {
            start,
            end,
            stroke_width,
            color,
        });
    }

    fn draw_rect(&mut self, rect: [f32; 4], stroke_width: f32, color: Color) {
        self.ops.push(DrawOp::Rect {
            rect,
            stroke_width,
            color,
        });
    }

    fn fill_rect(&mut self, rect: [f32; 4], color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn draw_text(&mut self, text: &str, origin: (f32, f32), size: f32, color: Color) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            origin,
            size,
            color,
        });
    }

    fn draw_image(&mut self, image: &RgbaImage, rect: [f32; 4], flip_horizontal: bool) {
        self.ops.push(DrawOp::Image {
            width: image.width(),
            height: image.height(),
            rect,
            flip_horizontal,
        });
    }
}
