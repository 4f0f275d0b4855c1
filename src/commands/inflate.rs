use crate::config::{self, NetkanConfig};
use crate::context::RunContext;
use crate::inflator::Inflator;
use crate::io;
use crate::sources::{FixtureSources, Sources};
use crate::version::ModuleVersion;
use anyhow::{Context, Result};
use colored::*;
use std::path::PathBuf;

/// Command-line settings for one inflation. `None` falls back to the
/// configuration file.
#[derive(Debug, Clone, Default)]
pub struct InflateOptions {
    pub file: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub releases: Option<config::ReleaseCount>,
    pub skip_releases: Option<usize>,
    pub highest_version: Option<String>,
    pub highest_version_prerelease: Option<String>,
    pub prerelease: Option<bool>,
    pub allow_out_of_order: bool,
    pub fixtures: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct InflateOutcome {
    pub written: Vec<PathBuf>,
    pub escalated: bool,
    pub escalate_reasons: Vec<String>,
}

fn load_config(options: &InflateOptions) -> Result<NetkanConfig> {
    match &options.config {
        Some(path) => Ok(config::load_config_from(path)?),
        None => Ok(config::load_config()),
    }
}

fn build_context(options: &InflateOptions, config: &NetkanConfig) -> RunContext {
    let releases = options.releases.unwrap_or(config.inflate.releases);
    RunContext::new()
        .with_release_limit(releases.limit())
        .with_release_skip(options.skip_releases.or(config.inflate.skip_releases))
        .with_prerelease(options.prerelease.or(config.inflate.prerelease))
        .with_allow_out_of_order(options.allow_out_of_order || config.inflate.allow_out_of_order)
        .with_staging_links(config.inflate.staging_links)
        .with_highest_version(options.highest_version.as_deref().map(ModuleVersion::parse))
        .with_highest_prerelease_version(
            options
                .highest_version_prerelease
                .as_deref()
                .map(ModuleVersion::parse),
        )
}

fn load_sources(options: &InflateOptions) -> Result<Sources> {
    let fixtures = match &options.fixtures {
        Some(path) => FixtureSources::from_path(path)
            .with_context(|| format!("Failed to load fixtures from {}", path.display()))?,
        None => FixtureSources::new(),
    };
    Ok(Sources::from_fixtures(fixtures))
}

/// Inflate `options.file` and write every result.
pub fn inflate_file(options: InflateOptions) -> Result<InflateOutcome> {
    let config = load_config(&options)?;
    let mut ctx = build_context(&options, &config);
    let inflator = Inflator::new(load_sources(&options)?);

    let netkans = io::read_netkans(&options.file)
        .with_context(|| format!("Failed to read {}", options.file.display()))?;
    let results = inflator
        .inflate(&netkans, &mut ctx)
        .with_context(|| format!("Failed to inflate {}", options.file.display()))?;

    let directory = options
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.directory.clone());
    let written = results
        .iter()
        .map(|metadata| io::write_ckan(&directory, metadata, config.output.indent))
        .collect::<crate::errors::Result<Vec<_>>>()
        .with_context(|| format!("Failed to write output to {}", directory.display()))?;

    Ok(InflateOutcome {
        written,
        escalated: ctx.is_escalated(),
        escalate_reasons: ctx.escalate_reasons().to_vec(),
    })
}

pub fn print_outcome(outcome: &InflateOutcome) {
    for path in &outcome.written {
        println!("{} {}", "Wrote".green(), path.display());
    }
    if outcome.escalated {
        println!("{}", "Staging requested:".yellow().bold());
        for reason in &outcome.escalate_reasons {
            println!("{}", reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllReleases, ReleaseCount};

    #[test]
    fn test_cli_values_override_config() {
        let mut config = NetkanConfig::default();
        config.inflate.releases = ReleaseCount::Count(5);
        config.inflate.skip_releases = Some(1);
        config.inflate.staging_links = false;

        let options = InflateOptions {
            releases: Some(ReleaseCount::All(AllReleases::All)),
            highest_version: Some("2:1.0".into()),
            ..InflateOptions::default()
        };
        let ctx = build_context(&options, &config);
        assert_eq!(ctx.release_limit, None);
        assert_eq!(ctx.release_skip, Some(1));
        assert!(!ctx.staging_links);
        assert_eq!(ctx.highest_version(), Some(&ModuleVersion::parse("2:1.0")));

        let ctx = build_context(&InflateOptions::default(), &config);
        assert_eq!(ctx.release_limit, Some(5));
    }
}
