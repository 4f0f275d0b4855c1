//! `.netkan.toml` configuration.
//!
//! Every setting has a default and every one can be overridden on the
//! command line, so the file is optional.

mod core;
mod loader;

pub use self::core::{
    AllReleases, InflateConfig, NetkanConfig, OutputConfig, ReleaseCount, DEFAULT_INDENT,
    MAX_INDENT,
};
pub use loader::{
    directory_ancestors, load_config, load_config_from, parse_and_validate_config,
    user_config_path, CONFIG_FILE_NAME,
};
