use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::NetkanConfig;
use crate::errors::{InflateError, Result};

pub const CONFIG_FILE_NAME: &str = ".netkan.toml";

/// Pure function to read config file contents
pub(crate) fn read_config_file(path: &Path) -> std::io::Result<String> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Pure function to parse and validate config from TOML string
pub fn parse_and_validate_config(contents: &str) -> Result<NetkanConfig> {
    let config = toml::from_str::<NetkanConfig>(contents).map_err(|e| {
        InflateError::Config(format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))
    })?;
    config.validate().map_err(InflateError::Config)?;
    Ok(config)
}

/// Try loading config from a specific path; `None` when missing or invalid
pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<NetkanConfig> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            log::debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("{}. Using defaults.", e);
            None
        }
    }
}

/// Only log actual errors, not "file not found"
pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    if error.kind() != std::io::ErrorKind::NotFound {
        log::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// Pure function to generate directory ancestors up to a depth limit
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// `<user config dir>/netkan/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("netkan").join("config.toml"))
}

/// Load configuration from an explicit file. Unlike discovery, a missing or
/// invalid explicit file is an error.
pub fn load_config_from(path: &Path) -> Result<NetkanConfig> {
    let contents = read_config_file(path)
        .map_err(|e| InflateError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    parse_and_validate_config(&contents)
}

/// Search upwards from the working directory for `.netkan.toml`, then the
/// user config directory, then fall back to defaults.
pub fn load_config() -> NetkanConfig {
    const MAX_TRAVERSAL_DEPTH: usize = 10;

    let current = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            return NetkanConfig::default();
        }
    };

    directory_ancestors(current, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .chain(user_config_path())
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            log::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            NetkanConfig::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllReleases, ReleaseCount};
    use indoc::indoc;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let config = parse_and_validate_config(indoc! {r#"
            [inflate]
            releases = "all"
            skip_releases = 2
            prerelease = true
            allow_out_of_order = true
            staging_links = false

            [output]
            directory = "out"
            indent = 2
        "#})
        .unwrap();
        assert_eq!(config.inflate.releases, ReleaseCount::All(AllReleases::All));
        assert_eq!(config.inflate.releases.limit(), None);
        assert_eq!(config.inflate.skip_releases, Some(2));
        assert_eq!(config.inflate.prerelease, Some(true));
        assert!(config.inflate.allow_out_of_order);
        assert!(!config.inflate.staging_links);
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert_eq!(config.output.indent, 2);
    }

    #[test]
    fn test_defaults_for_missing_sections() {
        let config = parse_and_validate_config("[inflate]\nreleases = 3\n").unwrap();
        assert_eq!(config.inflate.releases.limit(), Some(3));
        assert!(config.inflate.staging_links);
        assert_eq!(config.output.indent, 4);

        let config = parse_and_validate_config("").unwrap();
        assert_eq!(config.inflate.releases.limit(), Some(1));
    }

    #[test]
    fn test_invalid_config() {
        for contents in ["[output]\nindent = 12\n", "[inflate]\nreleases = \"some\"\n", "not toml"] {
            let err = parse_and_validate_config(contents).unwrap_err();
            assert!(matches!(err, InflateError::Config(_)), "{}", err);
        }
    }

    #[test]
    fn test_missing_explicit_config_is_config_error() {
        let temp = TempDir::new().unwrap();
        let err = load_config_from(&temp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, InflateError::Config(ref msg) if msg.starts_with("Failed to read")));
    }

    #[test]
    fn test_directory_ancestors_respects_depth() {
        let dirs: Vec<PathBuf> = directory_ancestors(PathBuf::from("/a/b/c/d"), 2).collect();
        assert_eq!(dirs, vec![PathBuf::from("/a/b/c/d"), PathBuf::from("/a/b/c")]);
    }

    #[test]
    fn test_try_load_missing_and_present() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        assert!(try_load_config_from_path(&path).is_none());

        fs::write(&path, "[output]\nindent = 0\n").unwrap();
        let config = try_load_config_from_path(&path).unwrap();
        assert_eq!(config.output.indent, 0);
        assert_eq!(load_config_from(&path).unwrap().output.indent, 0);
    }
}
