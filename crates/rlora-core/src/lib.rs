#![deny(missing_docs)]
#![doc = "Core error and metadata types shared by the rlora aggregation crates."]

pub mod errors;
pub mod metadata;

pub use errors::{AggError, ErrorInfo};
pub use metadata::{normalize_metadata, parse_seconds, ExperimentMetadata, MetaValue};
