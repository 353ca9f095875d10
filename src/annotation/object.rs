//! 目标框标注: 每个检测目标一个实例

use image::Rgba;

use super::Annotation;
use crate::detection::DetectedObject;
use crate::error::Result;
use crate::overlay::surface::{Color, BLACK, BLUE, GREEN, RED, WHITE, YELLOW};
use crate::overlay::{CoordinateMapper, Surface};

pub const TEXT_SIZE: f32 = 54.0;
pub const STROKE_WIDTH: f32 = 4.0;

const MAGENTA: Color = Rgba([255, 0, 255, 255]);
const CYAN: Color = Rgba([0, 255, 255, 255]);
const LIGHT_GRAY: Color = Rgba([204, 204, 204, 255]);
const DARK_GRAY: Color = Rgba([68, 68, 68, 255]);

/// (文字色, 背景/边框色), 按 tracking id 取模
const COLORS: [(Color, Color); 10] = [
    (BLACK, WHITE),
    (WHITE, MAGENTA),
    (BLACK, LIGHT_GRAY),
    (WHITE, RED),
    (WHITE, BLUE),
    (WHITE, DARK_GRAY),
    (BLACK, CYAN),
    (BLACK, YELLOW),
    (WHITE, BLACK),
    (BLACK, GREEN),
];

pub struct ObjectGraphic {
    object: DetectedObject,
}

impl ObjectGraphic {
    pub fn new(object: DetectedObject) -> Self {
        Self { object }
    }

    pub fn object(&self) -> &DetectedObject {
        &self.object
    }

    fn palette(&self) -> (Color, Color) {
        let idx = self
            .object
            .tracking_id
            .map(|id| id as usize % COLORS.len())
            .unwrap_or(0);
        COLORS[idx]
    }

    /// 标签文字行
    pub fn label_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(1 + self.object.labels.len() * 2);
        if let Some(id) = self.object.tracking_id {
            lines.push(format!("Tracking ID: {}", id));
        }
        for label in &self.object.labels {
            lines.push(format!("{} ({})", label.text, label.index));
            lines.push(format!("{:.2}%", label.confidence * 100.0));
        }
        lines
    }
}

impl Annotation for ObjectGraphic {
    fn kind(&self) -> &'static str {
        "object"
    }

    fn draw(&self, surface: &mut dyn Surface, mapper: &CoordinateMapper) -> Result<()> {
        let (text_color, box_color) = self.palette();
        let [left, top, right, bottom] = mapper.translate_rect(self.object.bounding_box)?;

        let lines = self.label_lines();
        if !lines.is_empty() {
            // 没有字体度量,按字号估算文字宽度
            let max_chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
            let text_width = max_chars as f32 * TEXT_SIZE * 0.55;
            let line_height = TEXT_SIZE + STROKE_WIDTH * 2.0;
            let block_top = top - STROKE_WIDTH - line_height * lines.len() as f32;

            surface.fill_rect(
                [
                    left - STROKE_WIDTH,
                    block_top,
                    left + text_width + STROKE_WIDTH * 2.0,
                    top,
                ],
                box_color,
            );
            for (i, line) in lines.iter().enumerate() {
                let baseline = block_top + line_height * (i + 1) as f32 - STROKE_WIDTH;
                surface.draw_text(line, (left, baseline), TEXT_SIZE, text_color);
            }
        }

        surface.draw_rect([left, top, right, bottom], STROKE_WIDTH, box_color);
        Ok(())
    }
}
