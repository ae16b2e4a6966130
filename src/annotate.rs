use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::warn;

use crate::mapping::ClassLabels;
use crate::postprocess::Detection;

const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_HEIGHT: i32 = 18;
const LABEL_CHAR_WIDTH: f32 = 8.0; // rough per-character estimate
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 2;
const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

// Probed when no font is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Renders detections onto a copy of the original image: a box outline in a
/// fixed color and a `"{name}: {confidence:.2}"` label above the top edge.
///
/// Boxes are clamped to the image bounds before drawing; a box with no area
/// left after clamping is skipped. Labels that would start above the image
/// are pushed down to the top edge and truncated at the right edge. The input
/// image is never mutated.
pub struct Annotator {
    font: Option<FontVec>,
    font_size: f32,
}

impl Annotator {
    /// Creates an annotator using the first available system font; without
    /// one, boxes and label backgrounds still render, only the text is
    /// omitted.
    pub fn new() -> Self {
        let font = FONT_CANDIDATES
            .iter()
            .find_map(|path| load_font(Path::new(path)).ok());
        if font.is_none() {
            warn!("no usable label font found; annotations will omit text");
        }
        Self {
            font,
            font_size: LABEL_FONT_SIZE,
        }
    }

    pub fn with_font_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let font = load_font(path.as_ref())?;
        Ok(Self {
            font: Some(font),
            font_size: LABEL_FONT_SIZE,
        })
    }

    pub fn annotate(
        &self,
        image: &DynamicImage,
        detections: &[Detection],
        labels: &ClassLabels,
    ) -> RgbImage {
        let mut canvas = image.to_rgb8();
        if detections.is_empty() || canvas.width() == 0 || canvas.height() == 0 {
            return canvas;
        }
        let (width, height) = (canvas.width() as i32, canvas.height() as i32);

        for detection in detections {
            let x1 = (detection.x1.floor() as i32).clamp(0, width - 1);
            let y1 = (detection.y1.floor() as i32).clamp(0, height - 1);
            let x2 = (detection.x2.ceil() as i32).clamp(0, width - 1);
            let y2 = (detection.y2.ceil() as i32).clamp(0, height - 1);
            if x1 >= x2 || y1 >= y2 {
                continue;
            }

            for inset in 0..BOX_THICKNESS {
                let (bx1, by1) = (x1 + inset, y1 + inset);
                let (bx2, by2) = (x2 - inset, y2 - inset);
                if bx1 >= bx2 || by1 >= by2 {
                    break;
                }
                let rect = Rect::at(bx1, by1).of_size((bx2 - bx1) as u32, (by2 - by1) as u32);
                draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
            }

            let label = format_label(&labels.label_for(detection.class_id), detection.confidence);
            self.draw_label(&mut canvas, x1, y1, &label);
        }
        canvas
    }

    fn draw_label(&self, canvas: &mut RgbImage, x1: i32, y1: i32, label: &str) {
        let width = canvas.width() as i32;
        let label_x = x1;
        let label_y = (y1 - LABEL_TEXT_HEIGHT).max(0);
        let text_width = (label.len() as f32 * LABEL_CHAR_WIDTH) as i32;
        let label_width = text_width.min(width - label_x);
        if label_width <= 0 {
            return;
        }

        let rect = Rect::at(label_x, label_y).of_size(label_width as u32, LABEL_TEXT_HEIGHT as u32);
        draw_filled_rect_mut(canvas, rect, BOX_COLOR);

        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                TEXT_COLOR,
                label_x + 2,
                label_y + LABEL_TEXT_VERTICAL_PADDING,
                PxScale::from(self.font_size),
                font,
                label,
            );
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

/// Label text for a detection, e.g. `person: 0.87`.
pub fn format_label(name: &str, confidence: f32) -> String {
    format!("{name}: {confidence:.2}")
}

fn load_font(path: &Path) -> Result<FontVec> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read font file {}", path.display()))?;
    FontVec::try_from_vec(bytes).map_err(|_| anyhow!("invalid font file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
            class_id: 0,
        }
    }

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 60, 90])))
    }

    #[test]
    fn empty_detections_leave_the_image_untouched() {
        let image = test_image(64, 48);
        let annotated = Annotator::new().annotate(&image, &[], &ClassLabels::coco());
        assert_eq!(annotated.as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn in_bounds_detection_changes_pixels() {
        let image = test_image(64, 64);
        let annotated = Annotator::new().annotate(
            &image,
            &[detection(10.0, 20.0, 50.0, 60.0)],
            &ClassLabels::coco(),
        );
        assert_ne!(annotated.as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn out_of_bounds_box_is_clamped_without_panicking() {
        let image = test_image(64, 64);
        let annotator = Annotator::new();
        let annotated = annotator.annotate(
            &image,
            &[detection(-50.0, -50.0, 30.0, 30.0)],
            &ClassLabels::coco(),
        );
        assert_eq!(annotated.dimensions(), (64, 64));
        assert_ne!(annotated.as_raw(), image.to_rgb8().as_raw());

        // entirely outside: clamps to nothing, draws nothing
        let untouched = annotator.annotate(
            &image,
            &[detection(-50.0, -50.0, -10.0, -10.0)],
            &ClassLabels::coco(),
        );
        assert_eq!(untouched.as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn inverted_box_is_skipped() {
        let image = test_image(64, 64);
        let annotated = Annotator::new().annotate(
            &image,
            &[detection(30.0, 30.0, 10.0, 10.0)],
            &ClassLabels::coco(),
        );
        assert_eq!(annotated.as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn label_text_uses_generic_fallback_for_unknown_class() {
        let labels = ClassLabels::new(vec!["a".into(); 20]);
        assert_eq!(format_label(&labels.label_for(99), 0.85), "Class 99: 0.85");
    }
}
