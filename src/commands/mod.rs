//! CLI command implementations.
//!
//! Available commands:
//! - **inflate**: Inflate one netkan file into `.ckan` files
//! - **init**: Initialize a new `.netkan.toml` configuration file

pub mod inflate;
pub mod init;

pub use inflate::{inflate_file, print_outcome, InflateOptions, InflateOutcome};
pub use init::init_config;
