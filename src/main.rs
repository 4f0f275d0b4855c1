use anyhow::Result;
use clap::Parser;
use netkan::cli::{Cli, Commands};
use netkan::commands::{self, InflateOptions};

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inflate {
            file,
            output_dir,
            releases,
            skip_releases,
            highest_version,
            highest_version_prerelease,
            prerelease,
            allow_out_of_order,
            fixtures,
            config,
            verbosity,
        } => {
            init_logging(verbosity);
            let outcome = commands::inflate_file(InflateOptions {
                file,
                output_dir,
                releases,
                skip_releases,
                highest_version,
                highest_version_prerelease,
                prerelease,
                allow_out_of_order,
                fixtures,
                config,
            })?;
            commands::print_outcome(&outcome);
            Ok(())
        }
        Commands::Init { force } => {
            init_logging(0);
            commands::init_config(force)
        }
    }
}
