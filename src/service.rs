use std::io::Cursor;
use std::time::Instant;

use image::{DynamicImage, ImageFormat};
use tokio::sync::Mutex;
use tonic::{Request, Response, Status};
use tracing::info;

use crate::annotate::Annotator;
use crate::detector::YoloDetector;
use crate::error::PipelineError;
use crate::grpc::detector_server::Detector;
use crate::grpc::{DetectRequest, DetectResponse, DetectionBox};
use crate::mapping::ClassLabels;
use crate::postprocess::Detection;

/// gRPC front end around the detection pipeline.
///
/// The session behind the detector is created once at startup and shared
/// across requests through the mutex; every other buffer is request-local.
pub struct DetectorService {
    detector: Mutex<YoloDetector>,
    annotator: Annotator,
    labels: ClassLabels,
}

impl DetectorService {
    pub fn new(detector: YoloDetector, annotator: Annotator, labels: ClassLabels) -> Self {
        Self {
            detector: Mutex::new(detector),
            annotator,
            labels,
        }
    }
}

/// Converts an internal detection to the wire message, resolving the label.
pub fn detection_to_proto(detection: &Detection, labels: &ClassLabels) -> DetectionBox {
    DetectionBox {
        x1: detection.x1,
        y1: detection.y1,
        x2: detection.x2,
        y2: detection.y2,
        confidence: detection.confidence,
        class_id: detection.class_id as u32,
        label: labels.label_for(detection.class_id),
    }
}

fn status_from_pipeline(err: PipelineError) -> Status {
    match err {
        PipelineError::EmptyImage { .. } => Status::invalid_argument(err.to_string()),
        _ => Status::internal(err.to_string()),
    }
}

#[tonic::async_trait]
impl Detector for DetectorService {
    async fn detect_image(
        &self,
        request: Request<DetectRequest>,
    ) -> Result<Response<DetectResponse>, Status> {
        let image_data = request.into_inner().image_data;
        info!(bytes = image_data.len(), "detect request received");

        let image = image::load_from_memory(&image_data)
            .map_err(|e| Status::invalid_argument(format!("failed to decode image: {e}")))?;

        let started = Instant::now();
        let detections = {
            let mut detector = self.detector.lock().await;
            detector.detect(&image).map_err(status_from_pipeline)?
        };

        let annotated = self.annotator.annotate(&image, &detections, &self.labels);
        let mut encoded = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(annotated)
            .write_to(&mut encoded, ImageFormat::Jpeg)
            .map_err(|e| Status::internal(format!("failed to encode annotated image: {e}")))?;

        info!(
            detections = detections.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "detect request served"
        );

        Ok(Response::new(DetectResponse {
            annotated_image: encoded.into_inner(),
            detections: detections
                .iter()
                .map(|detection| detection_to_proto(detection, &self.labels))
                .collect(),
        }))
    }
}
