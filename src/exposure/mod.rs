//! # Exposure Module
//!
//! Per-pixel extremum accumulation and the final-size resampling of the
//! resulting composites.

pub mod accumulator;
pub mod mode;
pub mod resize;

pub use accumulator::{accumulate, ExtremumAccumulator};
pub use mode::Mode;
pub use resize::{calculate_new_size, resize};
