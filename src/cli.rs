use clap::Parser;

use crate::detector::DetectorConfig;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// ONNX model path
    #[arg(long, default_value = "yolov8n.onnx")]
    pub model: String,

    /// URL to fetch the model from when the file is missing
    #[arg(long)]
    pub model_url: Option<String>,

    /// Class label file, one name per line (COCO-80 when omitted)
    #[arg(long)]
    pub labels: Option<String>,

    /// Confidence threshold
    #[arg(long, default_value_t = 0.5)]
    pub confidence_threshold: f32,

    /// IoU threshold for non-maximum suppression
    #[arg(long, default_value_t = 0.5)]
    pub iou_threshold: f32,

    /// Canonical model input size (square)
    #[arg(long, default_value_t = 640)]
    pub input_size: u32,

    /// Suppress overlapping boxes per class instead of across all classes
    #[arg(long, default_value_t = false)]
    pub per_class_nms: bool,

    /// Use the CUDA execution provider
    #[arg(long, default_value_t = false)]
    pub cuda: bool,

    /// TTF font used for label text (system fonts probed when omitted)
    #[arg(long)]
    pub font: Option<String>,

    /// gRPC listen address
    #[arg(long, default_value = "[::1]:50051")]
    pub addr: String,
}

impl Args {
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            input_width: self.input_size,
            input_height: self.input_size,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            per_class_nms: self.per_class_nms,
        }
    }
}
