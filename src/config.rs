//! Configuration loaded from `pdg.toml`.
//!
//! [`PdgConfig`] holds the boundary-call settings and a `[run]` table with
//! batch defaults. Missing values use sensible defaults. The
//! `OPENAI_API_KEY` environment variable takes precedence over the file,
//! and CLI flags override the `[run]` table field by field.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::error::PdgError;
use crate::openai::client::DEFAULT_API_BASE;

pub const DEFAULT_CONFIG_FILE: &str = "pdg.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct PdgConfig {
    #[serde(default)]
    pub api_key: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub run: RunConfig,
}

/// Batch knobs. All durations are in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Pause after each successful item.
    pub delay: f64,
    /// Retries after the first attempt; an item gets `max_retries + 1` attempts.
    pub max_retries: u32,
    pub backoff_base: f64,
    pub max_backoff: f64,
    pub jitter: f64,
    /// Growth of `delay` per rate-limit failure.
    pub delay_increase_factor: f64,
    /// Reduced SEO analysis (lengths only).
    pub fast_mode: bool,
    /// Trim title/meta and prefix the primary keyword before analysis.
    pub enforce_limits: bool,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            delay: 1.0,
            max_retries: 5,
            backoff_base: 2.0,
            max_backoff: 60.0,
            jitter: 0.3,
            delay_increase_factor: 1.5,
            fast_mode: false,
            enforce_limits: false,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), PdgError> {
        let bad = |msg: String| Err(PdgError::Config(msg));
        if !(self.delay >= 0.0 && self.delay.is_finite()) {
            return bad(format!("delay must be >= 0, got {}", self.delay));
        }
        if !(self.backoff_base > 0.0 && self.backoff_base.is_finite()) {
            return bad(format!("backoff_base must be > 0, got {}", self.backoff_base));
        }
        if !(self.max_backoff >= crate::backoff::MIN_DELAY_SECS && self.max_backoff.is_finite()) {
            return bad(format!("max_backoff must be >= 0.5, got {}", self.max_backoff));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return bad(format!("jitter must be in [0, 1), got {}", self.jitter));
        }
        if !(self.delay_increase_factor >= 1.0 && self.delay_increase_factor.is_finite()) {
            return bad(format!(
                "delay_increase_factor must be >= 1, got {}",
                self.delay_increase_factor
            ));
        }
        Ok(())
    }
}

impl Default for PdgConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            run: RunConfig::default(),
        }
    }
}

impl PdgConfig {
    /// Load from `path`, or from `pdg.toml` in the working directory when it exists.
    /// An explicit `path` that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        // Environment variable takes precedence over the file for the API key.
        config.apply_env_key(std::env::var("OPENAI_API_KEY").ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = toml::from_str::<PdgConfig>(&contents)
            .map_err(PdgError::from)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    fn apply_env_key(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.api_key = key;
        }
    }
}
