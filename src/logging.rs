//! tracing subscriber setup.
//!
//! Logs go to stderr so `pdg generate` output on stdout stays clean JSON.
//! `--verbose` forces `debug`; otherwise `PDG_LOG` is used as an
//! `EnvFilter` directive, falling back to `info`.

use anyhow::{Context, Result};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "PDG_LOG";

fn filter_directive(verbose: bool, env: Option<String>) -> String {
    if verbose {
        return "debug".to_string();
    }
    env.filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

pub fn init(verbose: bool) -> Result<()> {
    let directive = filter_directive(verbose, std::env::var(LOG_ENV).ok());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid {LOG_ENV} directive {directive:?}"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_timer(ChronoLocal::new("%H:%M:%S%.3f".to_string()))
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_wins() {
        assert_eq!(filter_directive(true, Some("warn".into())), "debug");
    }

    #[test]
    fn env_directive_or_info() {
        assert_eq!(filter_directive(false, Some("pdg=trace".into())), "pdg=trace");
        assert_eq!(filter_directive(false, Some("  ".into())), "info");
        assert_eq!(filter_directive(false, None), "info");
    }
}
