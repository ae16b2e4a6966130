use thiserror::Error;

/// Failure taxonomy for the detection pipeline.
///
/// Empty results are not errors: a request with no candidate above the
/// confidence threshold yields an empty detection list and an unmodified
/// image copy. Malformed input fails closed instead of producing a partial
/// detection list.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input image has a zero dimension ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("invalid canonical input size {width}x{height}")]
    CanonicalSize { width: u32, height: u32 },

    #[error("unexpected output tensor shape {shape:?}, expected [1, 4 + classes, candidates]")]
    OutputShape { shape: Vec<usize> },

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("inference failed: {0}")]
    Inference(String),
}
