// Export modules for library usage
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod errors;
pub mod inflator;
pub mod io;
pub mod metadata;
pub mod pipeline;
pub mod sources;
pub mod version;

// Re-export commonly used types
pub use crate::context::RunContext;
pub use crate::errors::{InflateError, Result};
pub use crate::inflator::Inflator;
pub use crate::metadata::{Metadata, Reference};
pub use crate::pipeline::{Pipeline, PipelineBuilder, Stage};
pub use crate::sources::{FixtureSources, ReleaseSource, Sources};
pub use crate::version::{GameVersion, ModuleVersion, SpecVersion};
