//! RecordMacroUseCase: turns captured input into a macro stream.
//!
//! This use case is the heart of both recorders.  It receives raw input
//! from whichever capture strategy is active, runs it through the shared
//! [`CaptureSession`] policy, and writes the accepted events to the output
//! stream.  Key events are written by name (`KeyStrPress Return`), using
//! the local keyboard mapping, so the macro replays on other layouts.
//!
//! # Architecture
//!
//! The use case depends only on traits (`KeyboardMapping`, `Write`) and on
//! the player's [`ReplayDispatcher`] for the optional live mirror.  Capture
//! sources are plain iterators, so tests drive it with scripted input.
//!
//! ```text
//! grab source ──► RawInputEvent ──────────────┐
//!                                             ├─► CaptureSession ─► stream
//! interception ─► InterceptedRecord ─► decode ┘         │
//!                                                       └─► mirror (xmacrorec)
//! ```

use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, info, warn};
use xmacro_core::keymap::translate::NO_SYMBOL;
use xmacro_core::protocol::write_event;
use xmacro_core::{
    decode_record, CaptureSession, Decoded, Disposition, InputEvent, InterceptedRecord, Key,
    KeyTranslator, KeyboardMapping, Keycode, RawInputEvent, SessionState,
};
use xmacro_play::application::replay::{ReplayDispatcher, ReplayError};

/// Errors that end a recording.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to write event stream: {0}")]
    Io(#[from] io::Error),

    #[error("live mirror failed: {0}")]
    Mirror(#[from] ReplayError),
}

/// Counters reported at the end of a recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordStats {
    /// Raw events handed to the capture policy.
    pub raw_events: usize,
    /// Stream events written.
    pub written: usize,
    /// Raw events swallowed by the policy.
    pub dropped: usize,
    /// Intercepted records that carried no usable event.
    pub skipped_records: usize,
}

/// The record use case.
pub struct RecordMacroUseCase<'a> {
    session: CaptureSession,
    local: &'a dyn KeyboardMapping,
    namer: KeyTranslator<'a, dyn KeyboardMapping + 'a>,
    out: &'a mut dyn Write,
    mirror: Option<ReplayDispatcher<'a>>,
    stats: RecordStats,
}

impl<'a> RecordMacroUseCase<'a> {
    /// Creates a recorder for `session`.
    ///
    /// `local` is the keyboard mapping of the display being recorded; it is
    /// used to name keys in the stream.
    pub fn new(
        session: CaptureSession,
        local: &'a dyn KeyboardMapping,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            session,
            local,
            namer: KeyTranslator::new(local),
            out,
            mirror: None,
            stats: RecordStats::default(),
        }
    }

    /// Replays every accepted raw event on another display while recording.
    pub fn with_mirror(mut self, mirror: ReplayDispatcher<'a>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn stats(&self) -> RecordStats {
        self.stats
    }

    /// Records raw events from a grab-based source until the quit key.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the stream cannot be written or the
    /// mirror fails.
    pub fn run_grab<I>(&mut self, events: I) -> Result<RecordStats, RecordError>
    where
        I: IntoIterator<Item = RawInputEvent>,
    {
        for raw in events {
            if self.handle_raw(raw)? == SessionState::Stopped {
                break;
            }
        }
        self.finish()
    }

    /// Records intercepted buffers until the quit key.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the stream cannot be written or the
    /// mirror fails.
    pub fn run_interception<I>(&mut self, records: I) -> Result<RecordStats, RecordError>
    where
        I: IntoIterator<Item = InterceptedRecord>,
    {
        for record in records {
            if self.handle_record(&record)? == SessionState::Stopped {
                break;
            }
        }
        self.finish()
    }

    /// Applies the capture policy to one raw event and writes the result.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the stream cannot be written or the
    /// mirror fails.
    pub fn handle_raw(&mut self, raw: RawInputEvent) -> Result<SessionState, RecordError> {
        self.stats.raw_events += 1;
        match self.session.process(raw) {
            Disposition::Accepted(events) => {
                for event in &events {
                    let event = self.name_keys(event);
                    write_event(&mut self.out, &event)?;
                    self.stats.written += 1;
                }
                if self.mirror.is_some() {
                    let event = mirror_event(self.local, raw);
                    if let Some(mirror) = self.mirror.as_mut() {
                        mirror.dispatch(&event)?;
                    }
                }
            }
            Disposition::Dropped(reason) => {
                debug!(?raw, ?reason, "event dropped");
                self.stats.dropped += 1;
            }
            Disposition::Stop => {
                info!(keycode = self.session.quit_key(), "quit key pressed");
            }
        }
        Ok(self.session.state())
    }

    /// Decodes one intercepted buffer and records the event it carries.
    ///
    /// Buffers that are not server events, arrive after the session
    /// stopped, or fail to decode are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the stream cannot be written or the
    /// mirror fails.
    pub fn handle_record(&mut self, record: &InterceptedRecord) -> Result<SessionState, RecordError> {
        match decode_record(record, self.session.is_running()) {
            Ok(Decoded::Event(raw)) => self.handle_raw(raw),
            Ok(Decoded::Skip(reason)) => {
                debug!(?reason, "record skipped");
                self.stats.skipped_records += 1;
                Ok(self.session.state())
            }
            Err(e) => {
                warn!("skipping intercepted record: {e}");
                self.stats.skipped_records += 1;
                Ok(self.session.state())
            }
        }
    }

    fn name_keys(&self, event: &InputEvent) -> InputEvent {
        match event {
            InputEvent::KeyPress(Key::Code(code)) => {
                InputEvent::KeyPress(self.namer.name_keycode(*code))
            }
            InputEvent::KeyRelease(Key::Code(code)) => {
                InputEvent::KeyRelease(self.namer.name_keycode(*code))
            }
            other => other.clone(),
        }
    }

    fn finish(&mut self) -> Result<RecordStats, RecordError> {
        self.out.flush()?;
        info!(
            raw = self.stats.raw_events,
            written = self.stats.written,
            dropped = self.stats.dropped,
            skipped = self.stats.skipped_records,
            "recording finished"
        );
        Ok(self.stats)
    }
}

/// The event replayed on the mirror for an accepted raw event.
///
/// Every motion sample is mirrored, buffered or not.  Keys travel by their
/// local keysym so the remote keyboard can place them.
fn mirror_event(local: &dyn KeyboardMapping, raw: RawInputEvent) -> InputEvent {
    match raw {
        RawInputEvent::Motion { x, y } => InputEvent::MotionNotify { x, y },
        RawInputEvent::ButtonPress { button } => InputEvent::ButtonPress(button),
        RawInputEvent::ButtonRelease { button } => InputEvent::ButtonRelease(button),
        RawInputEvent::KeyPress { keycode } => InputEvent::KeyPress(local_key(local, keycode)),
        RawInputEvent::KeyRelease { keycode } => InputEvent::KeyRelease(local_key(local, keycode)),
    }
}

fn local_key(local: &dyn KeyboardMapping, keycode: Keycode) -> Key {
    match local.keysyms_for_keycode(keycode).first() {
        Some(&sym) if sym != NO_SYMBOL => Key::Sym(sym),
        _ => Key::Code(keycode),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use xmacro_core::{MacroConfig, StaticKeymap};
    use xmacro_play::infrastructure::input_emulation::mock::{MockSyntheticInput, SyntheticCall};

    const QUIT: Keycode = 9;

    fn record(raws: &[RawInputEvent]) -> (String, RecordStats) {
        let keymap = StaticKeymap::us_basic();
        let mut out = Vec::new();
        let stats = {
            let mut recorder =
                RecordMacroUseCase::new(CaptureSession::new(QUIT), &keymap, &mut out);
            recorder.run_grab(raws.iter().copied()).unwrap()
        };
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn test_keys_are_written_by_local_name() {
        // Arrange
        let raws = [
            RawInputEvent::Motion { x: 4, y: 2 },
            RawInputEvent::KeyPress { keycode: 38 },
            RawInputEvent::KeyRelease { keycode: 38 },
        ];

        // Act
        let (text, stats) = record(&raws);

        // Assert
        assert_eq!(text, "MotionNotify 4 2\nKeyStrPress a\nKeyStrRelease a\n");
        assert_eq!(stats.written, 3);
    }

    #[test]
    fn test_keycode_without_symbol_is_written_raw() {
        let raws = [
            RawInputEvent::Motion { x: 0, y: 0 },
            RawInputEvent::KeyPress { keycode: 200 },
        ];

        let (text, _) = record(&raws);

        assert_eq!(text, "MotionNotify 0 0\nKeyCodePress 200\n");
    }

    #[test]
    fn test_recording_stops_at_quit_key() {
        // Arrange
        let raws = [
            RawInputEvent::Motion { x: 1, y: 1 },
            RawInputEvent::ButtonPress { button: 1 },
            RawInputEvent::KeyPress { keycode: QUIT },
            RawInputEvent::ButtonRelease { button: 1 },
        ];

        // Act
        let (text, stats) = record(&raws);

        // Assert
        assert_eq!(text, "MotionNotify 1 1\nButtonPress 1\n");
        assert_eq!(stats.raw_events, 3);
    }

    #[test]
    fn test_dropped_events_are_counted() {
        let raws = [
            RawInputEvent::KeyRelease { keycode: 36 },
            RawInputEvent::ButtonPress { button: 1 },
        ];

        let (text, stats) = record(&raws);

        assert_eq!(text, "");
        assert_eq!(stats.dropped, 2);
    }

    #[test]
    fn test_bad_record_is_skipped() {
        // Arrange
        let keymap = StaticKeymap::us_basic();
        let mut out = Vec::new();
        let mut recorder = RecordMacroUseCase::new(CaptureSession::new(QUIT), &keymap, &mut out);

        // Act
        let state = recorder
            .handle_record(&InterceptedRecord::from_server(vec![0; 7]))
            .unwrap();

        // Assert
        assert_eq!(state, SessionState::Running);
        assert_eq!(recorder.stats().skipped_records, 1);
        assert_eq!(recorder.stats().raw_events, 0);
    }

    #[test]
    fn test_mirror_replays_every_accepted_raw_event() {
        // Arrange
        let keymap = StaticKeymap::us_basic();
        let config = MacroConfig { delay_ms: 0, ..MacroConfig::default() };
        let remote = MockSyntheticInput::new();
        let mut echo = io::sink();
        let mut out = Vec::new();
        let mirror = ReplayDispatcher::new(&config, &remote, &keymap, &mut echo);
        let mut recorder = RecordMacroUseCase::new(CaptureSession::new(QUIT), &keymap, &mut out)
            .with_mirror(mirror);

        // Act
        recorder
            .run_grab([
                RawInputEvent::KeyRelease { keycode: 36 },
                RawInputEvent::Motion { x: 1, y: 1 },
                RawInputEvent::Motion { x: 2, y: 3 },
                RawInputEvent::KeyPress { keycode: 38 },
                RawInputEvent::KeyPress { keycode: QUIT },
            ])
            .unwrap();

        // Assert
        assert_eq!(
            remote.input_calls(),
            vec![
                SyntheticCall::Motion { x: 1, y: 1, delay_ms: 0 },
                SyntheticCall::Motion { x: 2, y: 3, delay_ms: 0 },
                SyntheticCall::Key { keycode: 38, pressed: true, delay_ms: 0 },
            ]
        );
    }
}
