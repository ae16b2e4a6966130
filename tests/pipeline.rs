use image::{DynamicImage, Rgb, RgbImage};
use ndarray::{Array2, Array3, ArrayD};

use yolo_serve::{
    Annotator, ClassLabels, DetectorConfig, FixedOutputEngine, PipelineError, YoloDetector,
};

/// Builds a raw (1, attrs, N) output tensor from candidate rows of
/// [cx, cy, w, h, scores...] in canonical 640x640 space.
fn raw_output(candidates: &[&[f32]]) -> ArrayD<f32> {
    let attrs = candidates[0].len();
    let mut tensor = Array3::<f32>::zeros((1, attrs, candidates.len()));
    for (i, candidate) in candidates.iter().enumerate() {
        for (a, &value) in candidate.iter().enumerate() {
            tensor[[0, a, i]] = value;
        }
    }
    tensor.into_dyn()
}

fn detector_for(output: ArrayD<f32>) -> YoloDetector {
    YoloDetector::new(
        Box::new(FixedOutputEngine::new(output)),
        DetectorConfig::default(),
    )
}

fn test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([32, 64, 96])))
}

#[test]
fn single_full_frame_candidate_spans_the_original_image() {
    let output = raw_output(&[&[320.0, 320.0, 640.0, 640.0, 0.9, 0.1]]);
    let mut detector = detector_for(output);

    let detections = detector.detect(&test_image(200, 100)).unwrap();
    assert_eq!(detections.len(), 1);

    let detection = &detections[0];
    assert_eq!(detection.class_id, 0);
    assert!((detection.confidence - 0.9).abs() < 1e-6);
    assert!(detection.x1.abs() < 1e-3);
    assert!(detection.y1.abs() < 1e-3);
    assert!((detection.x2 - 200.0).abs() < 1e-3);
    assert!((detection.y2 - 100.0).abs() < 1e-3);
}

#[test]
fn heavily_overlapping_same_class_candidates_collapse_to_one() {
    let output = raw_output(&[
        &[320.0, 320.0, 600.0, 600.0, 0.9, 0.05],
        &[320.0, 320.0, 580.0, 580.0, 0.6, 0.05],
    ]);
    let mut detector = detector_for(output);

    let detections = detector.detect(&test_image(640, 640)).unwrap();
    assert_eq!(detections.len(), 1);
    assert!((detections[0].confidence - 0.9).abs() < 1e-6);
}

#[test]
fn disjoint_candidates_are_both_kept_in_confidence_order() {
    let output = raw_output(&[
        &[400.0, 400.0, 80.0, 80.0, 0.7, 0.1],
        &[100.0, 100.0, 80.0, 80.0, 0.8, 0.1],
    ]);
    let mut detector = detector_for(output);

    let detections = detector.detect(&test_image(640, 640)).unwrap();
    assert_eq!(detections.len(), 2);
    assert!((detections[0].confidence - 0.8).abs() < 1e-6);
    assert!((detections[1].confidence - 0.7).abs() < 1e-6);
}

#[test]
fn below_threshold_yields_empty_list_and_untouched_annotation() {
    let output = raw_output(&[&[320.0, 320.0, 100.0, 100.0, 0.3, 0.2]]);
    let mut detector = detector_for(output);

    let image = test_image(64, 64);
    let detections = detector.detect(&image).unwrap();
    assert!(detections.is_empty());

    let annotated = Annotator::new().annotate(&image, &detections, &ClassLabels::coco());
    assert_eq!(annotated.as_raw(), image.to_rgb8().as_raw());
}

#[test]
fn suppression_never_adds_detections() {
    // three candidates above threshold, two of them redundant
    let output = raw_output(&[
        &[320.0, 320.0, 600.0, 600.0, 0.9, 0.05],
        &[320.0, 320.0, 590.0, 590.0, 0.7, 0.05],
        &[50.0, 50.0, 60.0, 60.0, 0.8, 0.05],
    ]);
    let mut detector = detector_for(output);

    let detections = detector.detect(&test_image(640, 640)).unwrap();
    assert!(detections.len() <= 3);
    assert_eq!(detections.len(), 2);
}

#[test]
fn zero_dimension_image_is_a_distinct_error() {
    let output = raw_output(&[&[320.0, 320.0, 100.0, 100.0, 0.9, 0.1]]);
    let mut detector = detector_for(output);

    let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
    assert!(matches!(
        detector.detect(&empty),
        Err(PipelineError::EmptyImage { .. })
    ));
}

#[test]
fn malformed_output_tensor_is_a_distinct_error() {
    let mut detector = detector_for(Array2::<f32>::zeros((6, 10)).into_dyn());
    assert!(matches!(
        detector.detect(&test_image(64, 64)),
        Err(PipelineError::OutputShape { .. })
    ));
}

#[test]
fn out_of_range_class_id_annotates_with_fallback_label() {
    // class scores beyond the label table: argmax lands on index 24
    let mut row = vec![320.0, 320.0, 200.0, 200.0];
    row.extend(std::iter::repeat(0.01).take(24));
    row.push(0.85);
    let output = raw_output(&[&row]);
    let mut detector = detector_for(output);

    let labels = ClassLabels::new(vec!["x".to_string(); 20]);
    let image = test_image(640, 640);
    let detections = detector.detect(&image).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].class_id, 24);
    assert_eq!(labels.label_for(detections[0].class_id), "Class 24");

    // rendering with the short table must not fail
    let annotated = Annotator::new().annotate(&image, &detections, &labels);
    assert_ne!(annotated.as_raw(), image.to_rgb8().as_raw());
}
