//! Common types and utilities shared across all pipeline stages.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::CrsCode;
pub use error::{ErrorCategory, PipelineError, PipelineResult};
pub use time::DateRange;
