//! Command-line options shared by `xmacroplay` and the recorders.
//!
//! The `#[derive(Args)]` macro from `clap` generates the parser fragment;
//! each binary flattens it into its own `Cli` struct.  `-v` replaces clap's
//! `-V`, so the parent command must set `version` and
//! `disable_version_flag = true`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::debug;
use xmacro_core::{ConfigOverrides, MacroConfig};

/// Options every xmacro binary understands.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Delay in milliseconds passed with every synthetic key/button event [default: 10]
    #[arg(short = 'd', long = "delay", value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Factor applied to pointer coordinates on replay [default: 1.0]
    #[arg(short = 's', long = "scale", value_name = "FACTOR")]
    pub scale: Option<f64>,

    /// TOML file with default settings
    #[arg(long, value_name = "PATH", env = xmacro_core::config::CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Print version information
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    pub version: Option<bool>,
}

impl CommonArgs {
    /// Loads the config file (if any) and layers `overrides` on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or the
    /// resulting scale factor is invalid.
    pub fn load_config(&self, overrides: ConfigOverrides) -> anyhow::Result<MacroConfig> {
        let overrides = ConfigOverrides {
            delay_ms: self.delay_ms,
            scale: self.scale,
            ..overrides
        };
        let config = MacroConfig::load(self.config.as_deref(), overrides).with_context(|| {
            match &self.config {
                Some(path) => format!("invalid configuration in {}", path.display()),
                None => "invalid configuration".to_string(),
            }
        })?;
        debug!(?config, "effective configuration");
        Ok(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
