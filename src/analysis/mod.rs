//! Analysis modules.
//!
//! Classification of fetched records and the count aggregations built
//! on top of the primary ones.

pub mod aggregator;
pub mod classifier;

pub use aggregator::*;
pub use classifier::*;
