//! 分割掩码标注: 背景区域以半透明品红覆盖

use image::{Rgba, RgbaImage};

use super::Annotation;
use crate::detection::SegmentationMask;
use crate::error::{OverlayError, Result};
use crate::overlay::{CoordinateMapper, Surface};

pub struct SegmentationGraphic {
    mask: SegmentationMask,
}

/// 背景概率 → 掩码像素
fn mask_pixel(foreground: f32) -> Rgba<u8> {
    let background = 1.0 - foreground.clamp(0.0, 1.0);
    if background > 0.9 {
        Rgba([255, 0, 255, 128])
    } else if background > 0.2 {
        let alpha = (182.9 * background - 36.6 + 0.5) as u8;
        Rgba([255, 0, 255, alpha])
    } else {
        Rgba([0, 0, 0, 0])
    }
}

impl SegmentationGraphic {
    pub fn new(mask: SegmentationMask) -> Self {
        Self { mask }
    }

    pub fn to_image(&self) -> RgbaImage {
        let (w, h) = (self.mask.width(), self.mask.height());
        RgbaImage::from_fn(w, h, |x, y| {
            mask_pixel(self.mask.confidences[[y as usize, x as usize]])
        })
    }
}

impl Annotation for SegmentationGraphic {
    fn kind(&self) -> &'static str {
        "segmentation"
    }

    fn draw(&self, surface: &mut dyn Surface, mapper: &CoordinateMapper) -> Result<()> {
        let info = mapper
            .source_info()
            .ok_or(OverlayError::InvalidState("SourceInfo must be set before translating"))?;
        if self.mask.width() == 0 || self.mask.height() == 0 {
            return Ok(());
        }
        // 掩码覆盖整个分析帧
        let rect = mapper.translate_rect([
            0.0,
            0.0,
            info.frame_width() as f32,
            info.frame_height() as f32,
        ])?;
        surface.draw_image(&self.to_image(), rect, info.is_mirrored());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{DrawOp, ImageSurface, RecordingSurface, SourceInfo};
    use ndarray::Array2;

    #[test]
    fn mask_alpha_follows_background_likelihood() {
        assert_eq!(mask_pixel(0.0), Rgba([255, 0, 255, 128]));
        assert_eq!(mask_pixel(1.0)[3], 0);
        let mid = mask_pixel(0.5)[3];
        assert!(mid > 0 && mid < 128);
    }

    #[test]
    fn mask_covers_whole_frame() {
        let mask = SegmentationMask::new(Array2::zeros((32, 24)));
        let g = SegmentationGraphic::new(mask);
        let mapper =
            CoordinateMapper::new(Some(SourceInfo::new(480, 640, true).unwrap()), 960, 1280);
        let mut s = RecordingSurface::new(960, 1280);
        g.draw(&mut s, &mapper).unwrap();
        assert_eq!(
            s.ops,
            vec![DrawOp::Image {
                width: 24,
                height: 32,
                rect: [0.0, 0.0, 960.0, 1280.0],
                flip_horizontal: true,
            }]
        );
    }

    #[test]
    fn background_is_tinted_on_image_surface() {
        let mut conf = Array2::<f32>::zeros((2, 2));
        conf[[0, 0]] = 1.0;
        let g = SegmentationGraphic::new(SegmentationMask::new(conf));
        let mapper = CoordinateMapper::new(Some(SourceInfo::new(2, 2, false).unwrap()), 2, 2);
        let mut s = ImageSurface::new(2, 2);
        g.draw(&mut s, &mapper).unwrap();
        assert_eq!(s.image().get_pixel(0, 0)[3], 0);
        assert!(s.image().get_pixel(1, 1)[3] > 0);
    }
}
