//! Command line interface built on clap.
//!
//! [`Cli`] carries the subcommands ([`Command`]: run, generate, status) and
//! the global `--config` / `--verbose` flags. Flags given to `run` override
//! the `[run]` table of the config file one field at a time.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::RunConfig;

/// pdg: batch SEO product description generator.
#[derive(Debug, Parser)]
#[command(name = "pdg", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file (default: ./pdg.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate descriptions for every row of an input CSV.
    Run(RunArgs),

    /// Generate one product and print the result and SEO report as JSON.
    Generate {
        #[arg(long)]
        name: String,

        #[arg(long)]
        features: String,

        /// Lengths-only SEO analysis.
        #[arg(long, default_value_t = false)]
        fast_mode: bool,
    },

    /// Summarize the ledger of an output directory.
    Status {
        #[arg(long, default_value = "output")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Input CSV with columns name, features, category, audience, keywords.
    #[arg(long)]
    pub input: PathBuf,

    /// Output root directory.
    #[arg(long, default_value = "output")]
    pub out: PathBuf,

    /// Seconds to wait after each successful item.
    #[arg(long)]
    pub delay: Option<f64>,

    /// First row index to process (0-based).
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Maximum number of rows to process; 0 means all.
    #[arg(long, default_value_t = 0)]
    pub max: usize,

    #[arg(long)]
    pub max_retries: Option<u32>,

    #[arg(long)]
    pub max_backoff: Option<f64>,

    #[arg(long)]
    pub backoff_base: Option<f64>,

    /// Jitter fraction in [0, 1).
    #[arg(long)]
    pub jitter: Option<f64>,

    /// Multiplier applied to the delay after each rate-limit response.
    #[arg(long)]
    pub delay_increase_factor: Option<f64>,

    /// Lengths-only SEO analysis.
    #[arg(long, default_value_t = false)]
    pub fast_mode: bool,

    /// Trim title and meta description to their limits before analysis.
    #[arg(long, default_value_t = false)]
    pub enforce_limits: bool,
}

impl RunArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(v) = self.delay {
            config.delay = v;
        }
        if let Some(v) = self.max_retries {
            config.max_retries = v;
        }
        if let Some(v) = self.max_backoff {
            config.max_backoff = v;
        }
        if let Some(v) = self.backoff_base {
            config.backoff_base = v;
        }
        if let Some(v) = self.jitter {
            config.jitter = v;
        }
        if let Some(v) = self.delay_increase_factor {
            config.delay_increase_factor = v;
        }
        config.fast_mode |= self.fast_mode;
        config.enforce_limits |= self.enforce_limits;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_run_subcommand() {
        let cli = Cli::parse_from([
            "pdg", "run", "--input", "products.csv", "--start", "2", "--max", "10",
        ]);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.input, PathBuf::from("products.csv"));
                assert_eq!(args.out, PathBuf::from("output"));
                assert_eq!(args.start, 2);
                assert_eq!(args.max, 10);
                assert!(args.delay.is_none());
                assert!(!args.fast_mode);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from(["pdg", "--config", "alt.toml", "--verbose", "status", "--out", "runs/a"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        match cli.command {
            Command::Status { out } => assert_eq!(out, PathBuf::from("runs/a")),
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn cli_parses_generate_subcommand() {
        let cli = Cli::parse_from([
            "pdg", "generate", "--name", "Lamp", "--features", "warm light", "--fast-mode",
        ]);
        match cli.command {
            Command::Generate { name, features, fast_mode } => {
                assert_eq!(name, "Lamp");
                assert_eq!(features, "warm light");
                assert!(fast_mode);
            }
            _ => panic!("expected Generate command"),
        }
    }

    #[test]
    fn run_args_override_only_given_fields() {
        let cli = Cli::parse_from([
            "pdg", "run", "--input", "in.csv", "--delay", "0.2", "--jitter", "0.1", "--enforce-limits",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected Run command");
        };
        let mut config = RunConfig {
            max_retries: 9,
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.delay, 0.2);
        assert_eq!(config.jitter, 0.1);
        assert_eq!(config.max_retries, 9);
        assert!(config.enforce_limits);
        assert!(!config.fast_mode);
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
