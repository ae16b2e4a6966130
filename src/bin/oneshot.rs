use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use yolo_serve::{
    load_class_mapping, resolve_model, Annotator, ClassLabels, Detection, OnnxModel, OrtEngine,
    YoloDetector,
};

/// Run detection on a single image and save the annotated result.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: yolo_serve::Args,

    /// Input image path
    #[arg(long)]
    source: String,

    /// Output directory
    #[arg(long, default_value = "output")]
    output: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let labels = match &args.common.labels {
        Some(path) => load_class_mapping(path)?,
        None => ClassLabels::coco(),
    };
    let model_path = resolve_model(&args.common.model, args.common.model_url.as_deref())?;
    let session = OnnxModel::new(args.common.cuda).load(&model_path)?;
    let mut detector = YoloDetector::new(
        Box::new(OrtEngine::new(session)),
        args.common.detector_config(),
    );
    let annotator = match &args.common.font {
        Some(path) => Annotator::with_font_path(path)?,
        None => Annotator::new(),
    };

    let image = image::open(&args.source)?;
    let started = std::time::Instant::now();
    let detections = detector.detect(&image)?;
    info!(count = detections.len(), elapsed = ?started.elapsed(), "inference finished");

    for detection in &detections {
        info!(
            "{}: {:.2}%",
            labels.label_for(detection.class_id),
            detection.confidence * 100.0
        );
    }

    let annotated = annotator.annotate(&image, &detections, &labels);
    let output_dir = Path::new(&args.output);
    fs::create_dir_all(output_dir)?;
    let annotated_path = output_dir.join("output.png");
    annotated.save(&annotated_path)?;
    write_sidecar(&output_dir.join("detections.json"), &detections, &labels)?;
    info!(path = %annotated_path.display(), "annotated image saved");

    Ok(())
}

/// Records the final detections as JSON next to the annotated image.
fn write_sidecar(path: &Path, detections: &[Detection], labels: &ClassLabels) -> Result<()> {
    let mut records = Vec::with_capacity(detections.len());
    for detection in detections {
        let mut record = serde_json::to_value(detection)?;
        record["label"] = serde_json::Value::String(labels.label_for(detection.class_id));
        records.push(record);
    }
    fs::write(path, serde_json::to_string_pretty(&records)?)?;
    Ok(())
}
