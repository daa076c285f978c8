//! Decoding pipeline orchestration.
//!
//! A [`Decoder`] turns per-level dense predictions into a final detection
//! list: per-level fused scoring with top-K pruning, box decoding against
//! grid points, cross-level aggregation, class-aware NMS, and coordinate
//! normalization. Every invocation depends only on its inputs; no state is
//! carried between calls.

pub mod filter;

use crate::boxes::{decode_box, BBox};
use crate::candidate::nms::multiclass_nms;
#[cfg(feature = "rayon")]
use crate::candidate::nms::multiclass_nms_par;
use crate::decode::filter::{filter_level, FilterParams};
use crate::grid::generate_grid;
use crate::tensor::LevelView;
use crate::trace::{trace_event, trace_span};
use crate::util::math::sigmoid;
use crate::util::{FreeDetError, FreeDetResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Decoding pipeline configuration.
#[derive(Clone, Copy, Debug)]
pub struct DecodeConfig {
    /// Number of classes scored per cell.
    pub num_classes: usize,
    /// Strict lower bound on the fused confidence score.
    pub conf_thresh: f32,
    /// IoU above which a lower-scoring box of the same class is suppressed.
    pub iou_thresh: f32,
    /// Maximum candidates kept per level before aggregation.
    pub topk: usize,
    /// Skip decoding and NMS entirely and return the raw per-cell rows.
    pub no_decode: bool,
    /// Run per-level filtering and per-class NMS on the rayon pool.
    /// Effective only with the `rayon` feature; output is identical either
    /// way.
    pub parallel: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            num_classes: 80,
            conf_thresh: 0.05,
            iou_thresh: 0.6,
            topk: 1000,
            no_decode: false,
            parallel: false,
        }
    }
}

/// Final detection with coordinates normalized to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Normalized, clamped box.
    pub bbox: BBox,
    /// Fused confidence score.
    pub score: f32,
    /// Class index in `0..num_classes`.
    pub class_id: usize,
}

/// Raw per-cell passthrough produced in no-decode mode.
///
/// Rows are concatenated across levels in level order, one row per grid
/// cell: `[tx, ty, tw, th, objectness, class_0, .., class_{C-1}]` with
/// sigmoid applied to the scores and the regression left untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct RawOutput {
    data: Vec<f32>,
    row_len: usize,
}

impl RawOutput {
    /// The contiguous row-major buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Elements per row, `4 + 1 + num_classes`.
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Number of rows, `sum over levels of H*W`.
    pub fn rows(&self) -> usize {
        if self.row_len == 0 {
            0
        } else {
            self.data.len() / self.row_len
        }
    }

    /// One cell's row, if in range.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.row_len)?;
        let end = start.checked_add(self.row_len)?;
        self.data.get(start..end)
    }
}

/// Output of a single pipeline invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeOutput {
    /// Decoded, suppressed, normalized detections.
    Detections(Vec<Detection>),
    /// Raw passthrough for deferred external post-processing.
    Raw(RawOutput),
}

/// Aggregated candidate awaiting suppression, in image-pixel coordinates.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    bbox: BBox,
    score: f32,
    class_id: usize,
}

/// Anchor-free detection decoder over a fixed stride pyramid.
pub struct Decoder {
    strides: Vec<usize>,
    config: DecodeConfig,
}

impl Decoder {
    /// Creates a decoder for the given per-level strides with the default
    /// configuration.
    pub fn new(strides: Vec<usize>) -> Self {
        Self {
            strides,
            config: DecodeConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: DecodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Per-level strides, in level order.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Active configuration.
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Runs the pipeline over one image's predictions.
    ///
    /// `levels` must match the decoder's stride list in length and order.
    /// All configuration and shape validation happens before any tensor
    /// work; an empty detection list is a valid outcome, not an error.
    pub fn run(
        &self,
        levels: &[LevelView<'_>],
        image_height: usize,
        image_width: usize,
    ) -> FreeDetResult<DecodeOutput> {
        self.validate(levels, image_height, image_width)?;

        if self.config.no_decode {
            return Ok(DecodeOutput::Raw(self.passthrough(levels)));
        }

        let detections = self.decode_levels(levels, image_height, image_width);
        Ok(DecodeOutput::Detections(detections))
    }

    fn validate(
        &self,
        levels: &[LevelView<'_>],
        image_height: usize,
        image_width: usize,
    ) -> FreeDetResult<()> {
        let cfg = &self.config;
        if cfg.num_classes == 0 {
            return Err(FreeDetError::InvalidClassCount);
        }
        if !(0.0..=1.0).contains(&cfg.conf_thresh) {
            return Err(FreeDetError::InvalidThreshold {
                name: "conf_thresh",
                value: cfg.conf_thresh,
            });
        }
        if !(0.0..=1.0).contains(&cfg.iou_thresh) {
            return Err(FreeDetError::InvalidThreshold {
                name: "iou_thresh",
                value: cfg.iou_thresh,
            });
        }
        if image_height == 0 || image_width == 0 {
            return Err(FreeDetError::InvalidImageSize {
                height: image_height,
                width: image_width,
            });
        }
        if levels.len() != self.strides.len() {
            return Err(FreeDetError::LevelCountMismatch {
                strides: self.strides.len(),
                levels: levels.len(),
            });
        }
        for (level, &stride) in self.strides.iter().enumerate() {
            if stride == 0 {
                return Err(FreeDetError::InvalidStride { level });
            }
        }
        for (idx, level) in levels.iter().enumerate() {
            if level.classes() != cfg.num_classes {
                return Err(FreeDetError::ClassCountMismatch {
                    level: idx,
                    expected: cfg.num_classes,
                    got: level.classes(),
                });
            }
        }
        Ok(())
    }

    fn decode_levels(
        &self,
        levels: &[LevelView<'_>],
        image_height: usize,
        image_width: usize,
    ) -> Vec<Detection> {
        let params = FilterParams {
            topk: self.config.topk,
            conf_thresh: self.config.conf_thresh,
        };

        let per_level = self.filter_levels(levels, params);

        let mut candidates: Vec<Candidate> = Vec::new();
        for mut level_candidates in per_level {
            candidates.append(&mut level_candidates);
        }
        trace_event!("aggregated_candidates", count = candidates.len());
        if candidates.is_empty() {
            return Vec::new();
        }

        let boxes: Vec<BBox> = candidates.iter().map(|c| c.bbox).collect();
        let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
        let class_ids: Vec<usize> = candidates.iter().map(|c| c.class_id).collect();

        let kept = {
            let _span = trace_span!("nms", candidates = candidates.len()).entered();
            self.run_nms(&boxes, &scores, &class_ids)
        };
        trace_event!("retained_detections", count = kept.len());

        let norm = image_height.max(image_width) as f32;
        let mut detections = Vec::with_capacity(kept.len());
        for idx in kept {
            let c = &candidates[idx];
            detections.push(Detection {
                bbox: BBox {
                    x1: (c.bbox.x1 / norm).clamp(0.0, 1.0),
                    y1: (c.bbox.y1 / norm).clamp(0.0, 1.0),
                    x2: (c.bbox.x2 / norm).clamp(0.0, 1.0),
                    y2: (c.bbox.y2 / norm).clamp(0.0, 1.0),
                },
                score: c.score,
                class_id: c.class_id,
            });
        }
        detections
    }

    fn filter_levels(
        &self,
        levels: &[LevelView<'_>],
        params: FilterParams,
    ) -> Vec<Vec<Candidate>> {
        #[cfg(feature = "rayon")]
        if self.config.parallel {
            return levels
                .par_iter()
                .enumerate()
                .map(|(idx, level)| decode_level(level, self.strides[idx], params))
                .collect();
        }

        levels
            .iter()
            .enumerate()
            .map(|(idx, level)| decode_level(level, self.strides[idx], params))
            .collect()
    }

    fn run_nms(&self, boxes: &[BBox], scores: &[f32], class_ids: &[usize]) -> Vec<usize> {
        #[cfg(feature = "rayon")]
        if self.config.parallel {
            return multiclass_nms_par(
                boxes,
                scores,
                class_ids,
                self.config.iou_thresh,
                self.config.num_classes,
            );
        }

        multiclass_nms(
            boxes,
            scores,
            class_ids,
            self.config.iou_thresh,
            self.config.num_classes,
        )
    }

    fn passthrough(&self, levels: &[LevelView<'_>]) -> RawOutput {
        let classes = self.config.num_classes;
        let row_len = 4 + 1 + classes;
        let total_cells: usize = levels.iter().map(|level| level.cells()).sum();

        let mut data = Vec::with_capacity(total_cells * row_len);
        for level in levels {
            for cell in 0..level.cells() {
                data.extend_from_slice(&level.regression(cell));
                data.push(sigmoid(level.objectness(cell)));
                for class in 0..classes {
                    data.push(sigmoid(level.class_score(cell, class)));
                }
            }
        }
        trace_event!("raw_rows", count = total_cells);
        RawOutput { data, row_len }
    }
}

/// Filters one level and decodes the survivors into image-space candidates.
fn decode_level(level: &LevelView<'_>, stride: usize, params: FilterParams) -> Vec<Candidate> {
    let _span = trace_span!("filter_level", cells = level.cells(), stride = stride).entered();

    let pairs = filter_level(level, params);
    if pairs.is_empty() {
        return Vec::new();
    }

    let grid = generate_grid(level.height(), level.width(), stride);
    let classes = level.classes();
    let mut out = Vec::with_capacity(pairs.len());
    for pair in pairs {
        // Invert the cell-major, class-minor flattening of the scoring
        // surface.
        let cell = pair.flat / classes;
        let class_id = pair.flat % classes;
        let bbox = decode_box(grid[cell], level.regression(cell), stride);
        out.push(Candidate {
            bbox,
            score: pair.score,
            class_id,
        });
    }
    trace_event!("level_candidates", count = out.len());
    out
}
