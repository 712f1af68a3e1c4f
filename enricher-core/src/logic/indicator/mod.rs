//! Indicator Module - Classification of raw IOC strings
//!
//! # Components
//! - `types.rs`: `Indicator`, `IndicatorType`, `HashKind`
//! - `classifier.rs`: pure `classify` / `is_valid`

pub mod classifier;
pub mod types;

pub use classifier::{classify, is_valid};
pub use types::{HashKind, Indicator, IndicatorType};
