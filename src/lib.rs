pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod records;
pub mod sources;

pub use error::{PipelineError, Result};
