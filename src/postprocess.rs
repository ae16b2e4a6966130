use ndarray::{s, ArrayD, ArrayView1, Axis, Ix3};
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::error::PipelineError;
use crate::preprocess::FrameTransform;

/// A final detection: corner-form box in original image pixels, confidence
/// in [0, 1] and the class index the network assigned.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

fn argmax_and_max(scores: &ArrayView1<f32>) -> (usize, f32) {
    scores
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_idx, best), (i, &val)| {
            if val > best { (i, val) } else { (best_idx, best) }
        })
}

/// Decodes the raw (1, 4 + C, N) output tensor into per-candidate records and
/// drops everything at or below the confidence threshold.
///
/// For each candidate the maximum of the C class scores is its confidence and
/// the argmax its class (first maximum wins). Survivors are returned as
/// parallel arrays of center-form boxes, confidences and class ids, in tensor
/// order; nothing is deduplicated or sorted here.
pub fn decode_and_filter(
    output: &ArrayD<f32>,
    confidence_threshold: f32,
) -> Result<(Vec<[f32; 4]>, Vec<f32>, Vec<usize>), PipelineError> {
    let view = output
        .view()
        .into_dimensionality::<Ix3>()
        .map_err(|_| PipelineError::OutputShape {
            shape: output.shape().to_vec(),
        })?;
    let shape = view.shape();
    if shape[0] != 1 || shape[1] < 5 {
        return Err(PipelineError::OutputShape {
            shape: output.shape().to_vec(),
        });
    }

    let predictions = view.index_axis(Axis(0), 0);

    let mut boxes = Vec::new();
    let mut confidences = Vec::new();
    let mut class_ids = Vec::new();
    for candidate in predictions.axis_iter(Axis(1)) {
        let scores = candidate.slice(s![4..]);
        let (class_id, confidence) = argmax_and_max(&scores);
        if confidence > confidence_threshold {
            boxes.push([candidate[0], candidate[1], candidate[2], candidate[3]]);
            confidences.push(confidence);
            class_ids.push(class_id);
        }
    }
    Ok((boxes, confidences, class_ids))
}

/// Maps center-form canonical-space boxes into corner-form original-image
/// boxes through the transform the preprocessor produced.
pub fn rescale_boxes(boxes: &[[f32; 4]], transform: &FrameTransform) -> Vec<[f32; 4]> {
    boxes
        .iter()
        .map(|&candidate| transform.to_image_box(candidate))
        .collect()
}

/// Intersection over union of two corner-form boxes.
///
/// Negative intersection extents and negative box areas clamp to zero, so
/// disjoint or inverted boxes never produce a negative ratio.
pub fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_x1 = a[0].max(b[0]);
    let inter_y1 = a[1].max(b[1]);
    let inter_x2 = a[2].min(b[2]);
    let inter_y2 = a[3].min(b[3]);

    let inter_area = (inter_x2 - inter_x1).max(0.0) * (inter_y2 - inter_y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union_area = area_a + area_b - inter_area;
    if union_area <= 0.0 {
        0.0
    } else {
        inter_area / union_area
    }
}

/// Greedy non-maximum suppression over corner-form boxes.
///
/// Candidates are visited in descending confidence (stable sort, so equal
/// confidences keep their input order); each kept box suppresses every
/// remaining box whose IoU with it exceeds the threshold. With `per_class`
/// set, suppression only applies between boxes of the same class; the default
/// is class-agnostic across all detections.
///
/// The returned indices are in pick order, highest confidence first.
pub fn non_maximum_suppression(
    boxes: &[[f32; 4]],
    confidences: &[f32],
    class_ids: &[usize],
    iou_threshold: f32,
    per_class: bool,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| OrderedFloat(confidences[b]).cmp(&OrderedFloat(confidences[a])));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; order.len()];
    for i in 0..order.len() {
        if suppressed[i] {
            continue;
        }
        let kept = order[i];
        keep.push(kept);
        for j in (i + 1)..order.len() {
            if suppressed[j] {
                continue;
            }
            let other = order[j];
            if per_class && class_ids[kept] != class_ids[other] {
                continue;
            }
            if compute_iou(&boxes[kept], &boxes[other]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }
    keep
}
