use anyhow::Result;
use clap::Parser;
use tonic::transport::Server;
use tracing::info;

use yolo_serve::grpc::detector_server::DetectorServer;
use yolo_serve::{
    load_class_mapping, resolve_model, Annotator, Args, ClassLabels, DetectorService, OnnxModel,
    OrtEngine, YoloDetector,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let labels = match &args.labels {
        Some(path) => load_class_mapping(path)?,
        None => ClassLabels::coco(),
    };
    let model_path = resolve_model(&args.model, args.model_url.as_deref())?;
    let session = OnnxModel::new(args.cuda).load(&model_path)?;
    let detector = YoloDetector::new(Box::new(OrtEngine::new(session)), args.detector_config());
    let annotator = match &args.font {
        Some(path) => Annotator::with_font_path(path)?,
        None => Annotator::new(),
    };

    let service = DetectorService::new(detector, annotator, labels);
    let addr = args.addr.parse()?;
    info!(%addr, "detection server listening");

    Server::builder()
        .add_service(DetectorServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}
