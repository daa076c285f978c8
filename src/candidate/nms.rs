//! Class-aware non-maximum suppression.

use crate::boxes::BBox;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Removes overlapping duplicates independently per class.
///
/// For each class in `0..num_classes`, candidates of that class are sorted by
/// descending score (ties broken by original index, ascending) and walked
/// greedily: a candidate is kept if its IoU with every previously kept box of
/// the class is at most `iou_thresh`. Returned indices reference the input
/// slices and are concatenated class by class, each class in descending-score
/// order. Candidates of different classes never suppress one another.
///
/// `boxes`, `scores`, and `class_ids` must have equal lengths; a `class_id`
/// outside `0..num_classes` is never selected.
pub fn multiclass_nms(
    boxes: &[BBox],
    scores: &[f32],
    class_ids: &[usize],
    iou_thresh: f32,
    num_classes: usize,
) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len());
    debug_assert_eq!(boxes.len(), class_ids.len());

    let mut kept = Vec::new();
    for class in 0..num_classes {
        kept.extend(suppress_class(boxes, scores, class_ids, class, iou_thresh));
    }
    kept
}

/// Parallel variant of [`multiclass_nms`]; classes are suppressed on the
/// rayon pool and the output is identical to the serial version.
#[cfg(feature = "rayon")]
pub fn multiclass_nms_par(
    boxes: &[BBox],
    scores: &[f32],
    class_ids: &[usize],
    iou_thresh: f32,
    num_classes: usize,
) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len());
    debug_assert_eq!(boxes.len(), class_ids.len());

    let per_class: Vec<Vec<usize>> = (0..num_classes)
        .into_par_iter()
        .map(|class| suppress_class(boxes, scores, class_ids, class, iou_thresh))
        .collect();
    per_class.into_iter().flatten().collect()
}

fn suppress_class(
    boxes: &[BBox],
    scores: &[f32],
    class_ids: &[usize],
    class: usize,
    iou_thresh: f32,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len())
        .filter(|&idx| class_ids[idx] == class)
        .collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then_with(|| a.cmp(&b)));

    let mut kept: Vec<usize> = Vec::new();
    'outer: for idx in order {
        for &kept_idx in kept.iter() {
            if boxes[idx].iou(&boxes[kept_idx]) > iou_thresh {
                continue 'outer;
            }
        }
        kept.push(idx);
    }
    kept
}
