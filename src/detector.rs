use image::DynamicImage;

use crate::error::PipelineError;
use crate::model::InferenceEngine;
use crate::postprocess::{decode_and_filter, non_maximum_suppression, rescale_boxes, Detection};
use crate::preprocess::Preprocessor;

/// Pipeline tunables. All of these are configuration, not constants.
#[derive(Clone, Copy, Debug)]
pub struct DetectorConfig {
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Suppress overlapping boxes per class instead of across all classes.
    /// Off by default: suppression is class-agnostic.
    pub per_class_nms: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_width: 640,
            input_height: 640,
            confidence_threshold: 0.5,
            iou_threshold: 0.5,
            per_class_nms: false,
        }
    }
}

/// The full detection pipeline: preprocess, infer, decode and filter,
/// rescale, suppress.
///
/// Each call is an independent, stateless computation over request-local
/// buffers; only the injected engine is shared across calls.
pub struct YoloDetector {
    engine: Box<dyn InferenceEngine>,
    preprocessor: Preprocessor,
    config: DetectorConfig,
}

impl YoloDetector {
    pub fn new(engine: Box<dyn InferenceEngine>, config: DetectorConfig) -> Self {
        let preprocessor = Preprocessor::new(config.input_width, config.input_height);
        Self {
            engine,
            preprocessor,
            config,
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.config.iou_threshold = threshold;
        self
    }

    pub fn with_per_class_nms(mut self, per_class: bool) -> Self {
        self.config.per_class_nms = per_class;
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Runs the pipeline on one image and returns the final detections in
    /// suppression pick order, highest confidence first.
    pub fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>, PipelineError> {
        let (tensor, transform) = self.preprocessor.preprocess(image)?;
        let output = self.engine.infer(tensor)?;

        let (boxes, confidences, class_ids) =
            decode_and_filter(&output, self.config.confidence_threshold)?;
        if boxes.is_empty() {
            return Ok(Vec::new());
        }

        let boxes = rescale_boxes(&boxes, &transform);
        let keep = non_maximum_suppression(
            &boxes,
            &confidences,
            &class_ids,
            self.config.iou_threshold,
            self.config.per_class_nms,
        );
        Ok(keep
            .into_iter()
            .map(|i| Detection {
                x1: boxes[i][0],
                y1: boxes[i][1],
                x2: boxes[i][2],
                y2: boxes[i][3],
                confidence: confidences[i],
                class_id: class_ids[i],
            })
            .collect())
    }
}
