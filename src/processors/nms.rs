//! Class-aware non-maximum suppression over axis-aligned boxes.

use crate::domain::RawDetection;

/// Suppresses overlapping boxes of the same class.
///
/// Boxes are visited by descending confidence. A box survives unless a
/// higher-scoring box of the same class overlaps it with IoU strictly greater
/// than `iou_threshold`. At most `max_detections` boxes are kept, and the result
/// is ordered by descending confidence.
pub fn non_max_suppression(
    detections: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    if detections.is_empty() || max_detections == 0 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = (0..detections.len()).collect();
    indices.sort_by(|&a, &b| {
        detections[b]
            .confidence
            .total_cmp(&detections[a].confidence)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for (rank, &i) in indices.iter().enumerate() {
        if suppressed[i] {
            continue;
        }

        keep.push(i);
        if keep.len() >= max_detections {
            break;
        }

        for &j in &indices[rank + 1..] {
            if !suppressed[j]
                && detections[i].class_id == detections[j].class_id
                && iou(&detections[i].bbox, &detections[j].bbox) > iou_threshold
            {
                suppressed[j] = true;
            }
        }
    }

    keep.into_iter().map(|i| detections[i]).collect()
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes.
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x_min = a[0].max(b[0]);
    let y_min = a[1].max(b[1]);
    let x_max = a[2].min(b[2]);
    let y_max = a[3].min(b[3]);

    if x_max <= x_min || y_max <= y_min {
        return 0.0;
    }

    let intersection = (x_max - x_min) * (y_max - y_min);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;

    if union > 0.0 { intersection / union } else { 0.0 }
}
