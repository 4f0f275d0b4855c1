use crate::config::CONFIG_FILE_NAME;
use crate::io;
use anyhow::Result;
use std::path::Path;

pub const DEFAULT_CONFIG: &str = r#"# Netkan Configuration

[inflate]
# Releases to inflate per run: a number, or "all"
releases = 1
# Newest releases to skip before inflating
# skip_releases = 0
# Force prerelease matching on or off; unset follows each netkan
# prerelease = false
allow_out_of_order = false
# Append a table of resource links to escalation reasons
staging_links = true

[output]
directory = "."
indent = 4
"#;

/// Write the default configuration into `dir`.
pub fn init_config_in(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!("Configuration file already exists. Use --force to overwrite.");
    }

    io::write_file(&config_path, DEFAULT_CONFIG)?;
    println!("Created {} configuration file", CONFIG_FILE_NAME);

    Ok(())
}

pub fn init_config(force: bool) -> Result<()> {
    init_config_in(Path::new("."), force)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_and_validate_config;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_parses() {
        let config = parse_and_validate_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.inflate.releases.limit(), Some(1));
        assert_eq!(config.output.indent, 4);
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        init_config_in(temp.path(), false).unwrap();
        assert!(init_config_in(temp.path(), false).is_err());
        init_config_in(temp.path(), true).unwrap();
    }
}
