// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - A telephony-triggered AI phone assistant.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod probe;
mod serve;
mod telemetry;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parley_config::{ConfigError, ParleyConfig};

/// Parley - A telephony-triggered AI phone assistant.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server and answer calls until Ctrl-C.
    Serve,
    /// Probe every configured AI backend and print which are reachable.
    Probe,
    /// Print the effective configuration with secrets redacted.
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<ParleyConfig, Vec<ConfigError>> {
    match path {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    }
}

fn exit_with_errors(errors: &[ConfigError]) -> ! {
    parley_config::render_errors(errors);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => exit_with_errors(&errors),
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(errors) = parley_config::validate_for_serve(&config) {
                exit_with_errors(&errors);
            }
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Probe) => match probe::run_probe(&config).await {
            Ok(true) => {}
            Ok(false) => std::process::exit(2),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        },
        Some(Commands::Config) => match toml::to_string_pretty(&config.redacted()) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("error: failed to render configuration: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("parley: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands_and_global_config() {
        let cli = Cli::try_parse_from(["parley", "probe", "--config", "/tmp/p.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Probe)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));

        let cli = Cli::try_parse_from(["parley", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert!(cli.config.is_none());
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["parley", "dial"]).is_err());
    }

    #[test]
    fn redacted_config_renders_as_toml() {
        let mut config = ParleyConfig::default();
        config.twilio.auth_token = Some("tw-secret".into());

        let rendered = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(rendered.contains("[twilio]"));
        assert!(rendered.contains("auth_token = \"***\""));
        assert!(!rendered.contains("tw-secret"));
    }
}
