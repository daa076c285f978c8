//! FreeDet decodes dense anchor-free detection-head outputs into final
//! detections.
//!
//! The upstream network emits, per pyramid level, three flat tensors: an
//! objectness logit per cell, a class-logit vector per cell, and a 4-value
//! box regression per cell. This crate turns those into a deduplicated list
//! of scored, class-labeled boxes: grid-point generation, fused confidence
//! scoring with top-K pruning, stride-aware box decoding, class-aware
//! non-maximum suppression, and coordinate normalization. Optional
//! parallelism is available via the `rayon` feature.

pub mod boxes;
mod candidate;
pub mod decode;
pub mod grid;
pub mod tensor;
mod trace;
pub mod util;

pub use boxes::{decode_box, BBox};
pub use candidate::nms::multiclass_nms;
#[cfg(feature = "rayon")]
pub use candidate::nms::multiclass_nms_par;
pub use candidate::topk::{ScoredPair, TopK};
pub use decode::filter::{filter_level, FilterParams};
pub use decode::{DecodeConfig, DecodeOutput, Decoder, Detection, RawOutput};
pub use grid::{generate_grid, GridPoint};
pub use tensor::LevelView;
pub use util::{FreeDetError, FreeDetResult};
