pub mod annotate;
pub mod cli;
pub mod detector;
pub mod error;
pub mod grpc;
pub mod mapping;
pub mod model;
pub mod postprocess;
pub mod preprocess;
pub mod service;

pub use crate::annotate::{format_label, Annotator};
pub use crate::cli::Args;
pub use crate::detector::{DetectorConfig, YoloDetector};
pub use crate::error::PipelineError;
pub use crate::grpc::{DetectRequest, DetectResponse};
pub use crate::mapping::{load_class_mapping, ClassLabels};
pub use crate::model::{resolve_model, FixedOutputEngine, InferenceEngine, OnnxModel, OrtEngine};
pub use crate::postprocess::{
    compute_iou, decode_and_filter, non_maximum_suppression, rescale_boxes, Detection,
};
pub use crate::preprocess::{FrameTransform, Preprocessor};
pub use crate::service::DetectorService;
