//! `xmacroplay`: replays a macro from standard input on an X display.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse()              -- flags, config file, remote display
//!  └─ XTestInput::connect()     -- open display, check XTest, grab control
//!  └─ ReplayDispatcher::run()   -- one directive per stdin line
//!       ├─ echo "Keyword: args" to stdout
//!       ├─ translate keys on the target keyboard
//!       └─ XTest calls + flush
//! ```
//!
//! Logging goes to stderr so stdout carries only the directive echo.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xmacro_core::{ConfigOverrides, MacroConfig};
use xmacro_play::cli::CommonArgs;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Replays keyboard and pointer macros read from standard input.
#[derive(Debug, Parser)]
#[command(name = "xmacroplay", version, disable_version_flag = true)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Display to replay on, e.g. `remote:0`
    #[arg(value_name = "DISPLAY")]
    remote_display: Option<String>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<MacroConfig> {
        self.common.load_config(ConfigOverrides {
            display: self.remote_display,
            ..ConfigOverrides::default()
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().into_config()?;
    play(&config)?;

    info!("pointer and keyboard released");
    Ok(())
}

#[cfg(target_os = "linux")]
fn play(config: &MacroConfig) -> anyhow::Result<()> {
    use std::io;

    use anyhow::Context;
    use xmacro_core::EventStreamReader;
    use xmacro_play::application::replay::ReplayDispatcher;
    use xmacro_play::infrastructure::input_emulation::xtest::XTestInput;

    let display = config
        .display
        .as_deref()
        .context("no remote display given (pass DISPLAY or set `display` in the config file)")?;
    let backend = XTestInput::connect(Some(display))
        .with_context(|| format!("cannot use display '{display}' for playback"))?;
    info!(display = %backend.display().name(), delay_ms = config.delay_ms, scale = config.scale, "replaying");

    let mut stdout = io::stdout().lock();
    let mut dispatcher = ReplayDispatcher::new(config, &backend, backend.display(), &mut stdout);
    let stats = dispatcher.run(EventStreamReader::new(io::stdin().lock()))?;

    info!(directives = stats.directives, skipped = stats.skipped, "replay finished");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn play(_config: &MacroConfig) -> anyhow::Result<()> {
    anyhow::bail!("xmacroplay needs an X11 display and is only supported on Linux")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_display_becomes_config_display() {
        // Arrange
        let cli = Cli::parse_from(["xmacroplay", "-d", "5", "remote:0"]);

        // Act
        let cfg = cli.into_config().unwrap();

        // Assert
        assert_eq!(cfg.display.as_deref(), Some("remote:0"));
        assert_eq!(cfg.delay_ms, 5);
    }

    #[test]
    fn test_display_is_optional_at_parse_time() {
        let cli = Cli::parse_from(["xmacroplay"]);
        assert!(cli.remote_display.is_none());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
