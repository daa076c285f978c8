//! Per-level confidence scoring and top-K pruning.

use crate::candidate::topk::{ScoredPair, TopK};
use crate::tensor::LevelView;
use crate::util::math::sigmoid;

/// Scoring-surface filter parameters.
#[derive(Clone, Copy, Debug)]
pub struct FilterParams {
    /// Maximum candidates to keep per level.
    pub topk: usize,
    /// Strict lower bound on the fused score; entries scoring exactly the
    /// threshold are discarded.
    pub conf_thresh: f32,
}

/// Scores every (cell, class) pair of a level and keeps the best survivors.
///
/// The scoring surface has `cells * classes` entries, one per (cell, class)
/// pair rather than one per cell: a single cell may plausibly belong to
/// several classes. Each entry's fused score is the geometric mean of the
/// sigmoid objectness and sigmoid class probability. Entries at or below
/// `conf_thresh` can never survive the final cut, so they skip the collector;
/// everything above streams through a bounded top-K without materializing a
/// full sorted order. The result holds at most `min(topk, cells * classes)`
/// pairs, sorted by descending score, ties resolved by lower flat index.
pub fn filter_level(level: &LevelView<'_>, params: FilterParams) -> Vec<ScoredPair> {
    if params.topk == 0 {
        return Vec::new();
    }

    let classes = level.classes();
    let mut topk = TopK::new(params.topk);
    for cell in 0..level.cells() {
        let obj_prob = sigmoid(level.objectness(cell));
        for class in 0..classes {
            let score = (obj_prob * sigmoid(level.class_score(cell, class))).sqrt();
            if score > params.conf_thresh {
                topk.push(ScoredPair {
                    flat: cell * classes + class,
                    score,
                });
            }
        }
    }
    topk.into_sorted_desc()
}
