//! `xmacrorec`: records local input and mirrors it on a remote display.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse()               -- flags, config file, remote display
//!  └─ XTestInput::connect()      -- remote display for the live mirror
//!  └─ resolve_quit_key()         -- -k, config, or "press a key"
//!  └─ XDisplay::query_pointer()  -- seed the start position
//!  └─ GrabSource::acquire()      -- exclusive pointer + keyboard grab
//!  └─ RecordMacroUseCase::run_grab()
//!       ├─ CaptureSession policy -> stdout
//!       └─ ReplayDispatcher      -> remote display
//! ```
//!
//! Logging goes to stderr so stdout carries only the macro.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xmacro_core::{ConfigOverrides, MacroConfig};
use xmacro_play::cli::CommonArgs;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Records keyboard and pointer input and replays it live on another display.
#[derive(Debug, Parser)]
#[command(name = "xmacrorec", version, disable_version_flag = true)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Keycode of the key that ends the recording (asked for when omitted)
    #[arg(short = 'k', long = "quit-key", value_name = "KEYCODE")]
    quit_key: Option<u8>,

    /// Display to mirror the recording on, e.g. `remote:0`
    #[arg(value_name = "DISPLAY")]
    remote_display: Option<String>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<MacroConfig> {
        self.common.load_config(ConfigOverrides {
            quit_key: self.quit_key,
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
    record(&config)?;

    info!("pointer and keyboard released");
    Ok(())
}

#[cfg(target_os = "linux")]
fn record(config: &MacroConfig) -> anyhow::Result<()> {
    use std::io;

    use anyhow::Context;
    use xmacro_play::application::replay::ReplayDispatcher;
    use xmacro_play::infrastructure::display::XDisplay;
    use xmacro_play::infrastructure::input_emulation::xtest::XTestInput;
    use xmacro_rec::application::record_macro::RecordMacroUseCase;
    use xmacro_rec::infrastructure::input_capture::grab::GrabSource;
    use xmacro_rec::infrastructure::input_capture::quit_key::resolve_quit_key;
    use xmacro_rec::infrastructure::input_capture::session_at;

    let remote_name = config
        .display
        .as_deref()
        .context("no remote display given (pass DISPLAY or set `display` in the config file)")?;
    let local = XDisplay::open(None).context("cannot open the local display")?;
    let remote = XTestInput::connect(Some(remote_name))
        .with_context(|| format!("cannot use display '{remote_name}' for mirroring"))?;
    info!(local = %local.name(), remote = %remote.display().name(), "recording");

    let quit_key = resolve_quit_key(config.quit_key, &local)?;
    let session = session_at(quit_key, local.query_pointer());
    let grab = GrabSource::acquire(&local)?;

    let mut stdout = io::stdout().lock();
    let mut mirror_echo = io::sink();
    let mirror = ReplayDispatcher::new(config, &remote, remote.display(), &mut mirror_echo);
    let mut recorder = RecordMacroUseCase::new(session, &local, &mut stdout)
        .with_mirror(mirror);
    recorder.run_grab(grab)?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn record(_config: &MacroConfig) -> anyhow::Result<()> {
    anyhow::bail!("xmacrorec needs an X11 display and is only supported on Linux")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
