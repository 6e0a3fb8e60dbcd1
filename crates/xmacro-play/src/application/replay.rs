//! ReplayDispatcher: turns macro events into synthetic input.
//!
//! This use case sits at the application layer and delegates to a
//! [`SyntheticInput`] trait object for the actual injection (XTest on Linux,
//! a recording mock in tests).  Keys are resolved against the target
//! display's [`KeyboardMapping`] through a [`KeyTranslator`].
//!
//! # Per-event behaviour
//!
//! | Event               | Synthetic calls                                        |
//! |---------------------|--------------------------------------------------------|
//! | `MotionNotify x y`  | motion to `(floor(x*scale), floor(y*scale))`           |
//! | `ButtonPress/Release` | button event with the configured delay               |
//! | `KeyPress/Release`  | key event on the translated keycode                    |
//! | `KeyStroke`         | press, flush, release                                  |
//! | `Text`              | per char: [shift press], press, flush, release, [shift release], flush |
//! | `Delay ms`          | pause for `ms` milliseconds                            |
//! | `Comment`/`Unknown` | nothing (echo only)                                    |
//!
//! Every directive is echoed to the diagnostic writer before it is carried
//! out, and the output channel is flushed after every directive.

use std::io::{self, Write};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use xmacro_core::{
    encode_event, CharStroke, InputEvent, Key, KeyTranslator, KeyboardMapping, Keycode,
    MacroConfig, StreamError, TranslateError,
};

/// Error type for synthetic input operations.
#[derive(Debug, Error)]
pub enum EmulationError {
    /// The platform rejected or failed a synthetic input call.
    #[error("platform error: {0}")]
    Platform(String),

    /// The key cannot be typed on the target keyboard.
    #[error(transparent)]
    Translate(#[from] TranslateError),
}

/// Errors that end a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("synthetic input failed: {0}")]
    Emulation(#[from] EmulationError),

    #[error("failed to read macro stream: {0}")]
    Stream(#[source] StreamError),

    #[error("failed to write directive echo: {0}")]
    Echo(#[from] io::Error),
}

/// Platform-agnostic synthetic input.
///
/// `delay_ms` asks the platform to hold the event back by that many
/// milliseconds relative to the previous one.
pub trait SyntheticInput {
    /// Emulates a key press or release of a target keycode.
    fn fake_key(&self, keycode: Keycode, pressed: bool, delay_ms: u64) -> Result<(), EmulationError>;

    /// Emulates a pointer button press or release.
    fn fake_button(&self, button: u32, pressed: bool, delay_ms: u64) -> Result<(), EmulationError>;

    /// Moves the pointer to an absolute position on the target screen.
    fn fake_motion(&self, x: i32, y: i32, delay_ms: u64) -> Result<(), EmulationError>;

    /// Sends everything queued so far to the target.
    fn flush(&self) -> Result<(), EmulationError>;

    /// Drops any synthetic state left over on the target, such as keys
    /// still held by an earlier session.
    fn discard(&self) -> Result<(), EmulationError> {
        Ok(())
    }
}

/// Lifecycle of a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Running,
    Stopped,
}

/// Counters reported at the end of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Directives read from the stream, including skipped ones.
    pub directives: usize,
    /// Directives or characters skipped because they could not be replayed.
    pub skipped: usize,
}

/// The replay use case.
pub struct ReplayDispatcher<'a> {
    config: &'a MacroConfig,
    input: &'a dyn SyntheticInput,
    translator: KeyTranslator<'a, dyn KeyboardMapping + 'a>,
    echo: &'a mut dyn Write,
    pause: Box<dyn FnMut(Duration) + 'a>,
    state: ReplayState,
    stats: ReplayStats,
}

impl<'a> ReplayDispatcher<'a> {
    /// Creates a dispatcher in the `Running` state.
    ///
    /// `mapping` must describe the keyboard of the display `input` injects
    /// into.  Directive echoes go to `echo`.
    pub fn new(
        config: &'a MacroConfig,
        input: &'a dyn SyntheticInput,
        mapping: &'a dyn KeyboardMapping,
        echo: &'a mut dyn Write,
    ) -> Self {
        Self {
            config,
            input,
            translator: KeyTranslator::new(mapping),
            echo,
            pause: Box::new(std::thread::sleep),
            state: ReplayState::Running,
            stats: ReplayStats::default(),
        }
    }

    /// Replaces the sleep used for `Delay` directives.
    pub fn with_pause(mut self, pause: impl FnMut(Duration) + 'a) -> Self {
        self.pause = Box::new(pause);
        self
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    /// Stops the dispatcher; later events are ignored.
    pub fn stop(&mut self) {
        self.state = ReplayState::Stopped;
    }

    /// Replays a whole stream until it is exhausted.
    ///
    /// Malformed directives and keys that cannot be typed on the target are
    /// logged and skipped.  Pending synthetic state is discarded before the
    /// first and after the last directive.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] if reading the stream, echoing, or a platform
    /// call fails.
    pub fn run<I>(&mut self, events: I) -> Result<ReplayStats, ReplayError>
    where
        I: IntoIterator<Item = Result<InputEvent, StreamError>>,
    {
        self.input.discard()?;
        let result = self.run_events(events);
        self.stop();
        self.input.discard()?;
        self.input.flush()?;
        result.map(|()| self.stats)
    }

    fn run_events<I>(&mut self, events: I) -> Result<(), ReplayError>
    where
        I: IntoIterator<Item = Result<InputEvent, StreamError>>,
    {
        for item in events {
            if self.state == ReplayState::Stopped {
                break;
            }
            match item {
                Ok(event) => self.dispatch(&event)?,
                Err(e) if e.is_fatal() => return Err(ReplayError::Stream(e)),
                Err(e) => {
                    warn!("skipping directive: {e}");
                    self.stats.directives += 1;
                    self.stats.skipped += 1;
                }
            }
        }
        info!(
            directives = self.stats.directives,
            skipped = self.stats.skipped,
            "end of macro stream"
        );
        Ok(())
    }

    /// Echoes and replays one event, then flushes the output channel.
    ///
    /// An event whose key cannot be resolved on the target is logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] for echo or platform failures.
    pub fn dispatch(&mut self, event: &InputEvent) -> Result<(), ReplayError> {
        if self.state == ReplayState::Stopped {
            debug!(?event, "replay stopped; ignoring event");
            return Ok(());
        }
        self.stats.directives += 1;
        writeln!(self.echo, "{}", echo_line(event))?;
        self.echo.flush()?;

        match self.apply(event) {
            Ok(()) => {}
            Err(EmulationError::Translate(e)) => {
                warn!("skipping {}: {e}", encode_event(event));
                self.stats.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
        self.input.flush()?;
        Ok(())
    }

    fn apply(&mut self, event: &InputEvent) -> Result<(), EmulationError> {
        let delay = self.config.delay_ms;
        match event {
            InputEvent::KeyPress(key) => self.key(key, true),
            InputEvent::KeyRelease(key) => self.key(key, false),
            InputEvent::KeyStroke(key) => {
                let keycode = self.translator.resolve(key)?;
                self.input.fake_key(keycode, true, delay)?;
                self.input.flush()?;
                self.input.fake_key(keycode, false, delay)
            }
            InputEvent::ButtonPress(button) => self.input.fake_button(*button, true, delay),
            InputEvent::ButtonRelease(button) => self.input.fake_button(*button, false, delay),
            InputEvent::MotionNotify { x, y } => self.input.fake_motion(
                self.config.scale_coordinate(*x),
                self.config.scale_coordinate(*y),
                0,
            ),
            InputEvent::Delay(ms) => {
                (self.pause)(Duration::from_millis(*ms));
                Ok(())
            }
            InputEvent::Text(text) => self.type_text(text),
            InputEvent::Comment(_) | InputEvent::Unknown(_) => Ok(()),
        }
    }

    fn key(&mut self, key: &Key, pressed: bool) -> Result<(), EmulationError> {
        let keycode = self.translator.resolve(key)?;
        self.input.fake_key(keycode, pressed, self.config.delay_ms)
    }

    /// Types `text` character by character; untypeable characters are
    /// skipped individually.
    fn type_text(&mut self, text: &str) -> Result<(), EmulationError> {
        for c in text.chars() {
            match self.translator.resolve_char(c) {
                Ok(stroke) => self.type_stroke(stroke)?,
                Err(e) => {
                    warn!("skipping character {c:?}: {e}");
                    self.stats.skipped += 1;
                }
            }
        }
        Ok(())
    }

    fn type_stroke(&self, stroke: CharStroke) -> Result<(), EmulationError> {
        let delay = self.config.delay_ms;
        if let Some(shift) = stroke.shift {
            self.input.fake_key(shift, true, delay)?;
        }
        self.input.fake_key(stroke.keycode, true, delay)?;
        self.input.flush()?;
        self.input.fake_key(stroke.keycode, false, delay)?;
        if let Some(shift) = stroke.shift {
            self.input.fake_key(shift, false, delay)?;
        }
        self.input.flush()
    }
}

/// The diagnostic echo for one directive, e.g. `ButtonPress: 1`.
pub fn echo_line(event: &InputEvent) -> String {
    match event {
        InputEvent::Comment(text) => format!("Comment: #{text}"),
        InputEvent::Unknown(raw) => format!("Unknown tag: {raw}"),
        _ => {
            let line = encode_event(event);
            match line.split_once(' ') {
                Some((keyword, args)) => format!("{keyword}: {args}"),
                None => format!("{line}:"),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
