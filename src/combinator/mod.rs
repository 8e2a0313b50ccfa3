//! Masked pixel algebra over aligned raster blocks

pub mod block;
pub mod ops;
pub mod pixel;
pub mod predicate;

pub use block::Block;
pub use ops::{BlockOp, Classifier, Clip, MaskedFn, MaxMerge};
pub use pixel::{PixelClass, classify_pixel, is_nodata, merge_max_pixel};
pub use predicate::{BoundPredicate, Comparison, Predicate};
