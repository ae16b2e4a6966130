use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;

use crate::error::PipelineError;

/// Maps between the canonical model input space and the original image space.
///
/// The forward direction is a plain stretch resize with no letterboxing, so
/// the inverse is the matching per-axis linear rescale. Both directions live
/// in one type so the preprocessing and rescaling assumptions cannot drift
/// apart; boxes on non-square sources stay consistent with the distortion the
/// resize introduced.
#[derive(Clone, Copy, Debug)]
pub struct FrameTransform {
    model_width: f32,
    model_height: f32,
    image_width: f32,
    image_height: f32,
}

impl FrameTransform {
    pub fn new(model: (u32, u32), image: (u32, u32)) -> Result<Self, PipelineError> {
        if image.0 == 0 || image.1 == 0 {
            return Err(PipelineError::EmptyImage {
                width: image.0,
                height: image.1,
            });
        }
        if model.0 == 0 || model.1 == 0 {
            return Err(PipelineError::CanonicalSize {
                width: model.0,
                height: model.1,
            });
        }
        Ok(Self {
            model_width: model.0 as f32,
            model_height: model.1 as f32,
            image_width: image.0 as f32,
            image_height: image.1 as f32,
        })
    }

    /// Converts a center-form box in model space into a corner-form box in
    /// original image pixels.
    pub fn to_image_box(&self, [cx, cy, w, h]: [f32; 4]) -> [f32; 4] {
        let x1 = cx - w / 2.0;
        let y1 = cy - h / 2.0;
        let x2 = cx + w / 2.0;
        let y2 = cy + h / 2.0;
        [
            x1 / self.model_width * self.image_width,
            y1 / self.model_height * self.image_height,
            x2 / self.model_width * self.image_width,
            y2 / self.model_height * self.image_height,
        ]
    }
}

/// Builds the fixed-size network input tensor from a decoded image.
pub struct Preprocessor {
    width: u32,
    height: u32,
}

impl Preprocessor {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Converts an image into a (1, 3, height, width) tensor with values in
    /// [0, 1] and RGB plane order, stretched to the canonical size.
    ///
    /// Also returns the transform needed to map boxes back into the original
    /// frame.
    pub fn preprocess(
        &self,
        image: &DynamicImage,
    ) -> Result<(Array4<f32>, FrameTransform), PipelineError> {
        let (orig_width, orig_height) = image.dimensions();
        let transform = FrameTransform::new((self.width, self.height), (orig_width, orig_height))?;

        let resized = self.resize(image)?;
        let (height, width) = (self.height as usize, self.width as usize);
        let mut tensor = Array4::<f32>::zeros((1, 3, height, width));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
            tensor[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
            tensor[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
        }
        Ok((tensor, transform))
    }

    fn resize(&self, image: &DynamicImage) -> Result<RgbImage, PipelineError> {
        // to_rgb8 also normalizes whatever channel order the codec produced
        let src = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut dst = Image::new(self.width, self.height, PixelType::U8x3);
        let mut resizer = Resizer::new();
        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
        resizer
            .resize(&src, &mut dst, Some(&options))
            .map_err(|e| PipelineError::Image(e.to_string()))?;
        RgbImage::from_raw(self.width, self.height, dst.buffer().to_vec())
            .ok_or_else(|| PipelineError::Image("resized buffer has the wrong length".into()))
    }
}
