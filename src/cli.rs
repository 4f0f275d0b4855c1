use crate::config::{AllReleases, ReleaseCount};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "netkan")]
#[command(about = "Inflate netkan descriptors into complete .ckan metadata", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inflate a netkan file into .ckan files
    Inflate {
        /// Netkan file (JSON or YAML)
        file: PathBuf,

        /// Directory for the generated .ckan files
        #[arg(short, long = "output-dir")]
        output_dir: Option<PathBuf>,

        /// Number of releases to inflate, or "all"
        #[arg(long, value_parser = parse_release_count)]
        releases: Option<ReleaseCount>,

        /// Number of newest releases to skip
        #[arg(long = "skip-releases")]
        skip_releases: Option<usize>,

        /// Highest stable version already published
        #[arg(long = "highest-version")]
        highest_version: Option<String>,

        /// Highest prerelease version already published
        #[arg(long = "highest-version-prerelease")]
        highest_version_prerelease: Option<String>,

        /// Force prerelease matching on or off
        #[arg(long)]
        prerelease: Option<bool>,

        /// Skip the out-of-order version check
        #[arg(long = "allow-out-of-order")]
        allow_out_of_order: bool,

        /// JSON file answering release, version-file and raw-text lookups
        #[arg(long, env = "NETKAN_FIXTURES")]
        fixtures: Option<PathBuf>,

        /// Configuration file (defaults to .netkan.toml discovery)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Increase verbosity level (can be repeated: -v, -vv)
        /// -v: Show each stage
        /// -vv: Show all debug information
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },

    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

fn parse_release_count(value: &str) -> Result<ReleaseCount, String> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(ReleaseCount::All(AllReleases::All));
    }
    value
        .parse::<usize>()
        .map(ReleaseCount::Count)
        .map_err(|_| format!("expected a number or \"all\", got {}", value))
}
