//! `xmacrorec2`: records local input without grabbing it.
//!
//! Uses the RECORD extension, so the user keeps working normally while the
//! recorder listens.  Nothing is mirrored; the macro goes to stdout.
//!
//! ```text
//! main()
//!  └─ XDisplay::open()                 -- control connection
//!  └─ resolve_quit_key()
//!  └─ XDisplay::query_pointer()        -- seed the start position
//!  └─ InterceptSource::start()         -- data connection + context
//!  └─ RecordMacroUseCase::run_interception()
//! ```

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xmacro_core::{ConfigOverrides, MacroConfig};
use xmacro_play::cli::CommonArgs;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Records keyboard and pointer input on the local display.
#[derive(Debug, Parser)]
#[command(name = "xmacrorec2", version, disable_version_flag = true)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Keycode of the key that ends the recording (asked for when omitted)
    #[arg(short = 'k', long = "quit-key", value_name = "KEYCODE")]
    quit_key: Option<u8>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<MacroConfig> {
        self.common.load_config(ConfigOverrides {
            quit_key: self.quit_key,
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
    record(&config)?;

    info!("recording context released");
    Ok(())
}

#[cfg(target_os = "linux")]
fn record(config: &MacroConfig) -> anyhow::Result<()> {
    use std::io;

    use anyhow::Context;
    use xmacro_play::infrastructure::display::XDisplay;
    use xmacro_rec::application::record_macro::RecordMacroUseCase;
    use xmacro_rec::infrastructure::input_capture::intercept::InterceptSource;
    use xmacro_rec::infrastructure::input_capture::quit_key::resolve_quit_key;
    use xmacro_rec::infrastructure::input_capture::session_at;

    let local = XDisplay::open(None).context("cannot open the local display")?;
    let quit_key = resolve_quit_key(config.quit_key, &local)?;

    let session = session_at(quit_key, local.query_pointer());
    let records = InterceptSource::start(&local)?;
    info!(display = %local.name(), "recording");

    let mut stdout = io::stdout().lock();
    let mut recorder = RecordMacroUseCase::new(session, &local, &mut stdout);
    recorder.run_interception(records)?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn record(_config: &MacroConfig) -> anyhow::Result<()> {
    anyhow::bail!("xmacrorec2 needs an X11 display and is only supported on Linux")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_key_reaches_config() {
        let cli = Cli::parse_from(["xmacrorec2", "--quit-key", "66"]);

        let cfg = cli.into_config().unwrap();

        assert_eq!(cfg.quit_key, Some(66));
        assert_eq!(cfg.display, None);
    }

    #[test]
    fn test_no_positional_display() {
        assert!(Cli::try_parse_from(["xmacrorec2", "remote:0"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
