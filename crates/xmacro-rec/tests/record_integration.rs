//! Integration tests for xmacro-rec.
//!
//! Drive `RecordMacroUseCase` through both capture strategies with
//! scripted sources and check the macro text it writes.  The local
//! keyboard is a `mockall` mock where the test needs a specific layout.

use mockall::{mock, predicate::eq};
use xmacro_core::protocol::{encode_wire_event, ByteOrder, RecordCategory, WireEvent};
use xmacro_core::{
    CaptureSession, EventStreamReader, InputEvent, InterceptedRecord, Key, KeyboardMapping,
    Keycode, Keysym, MacroConfig, RawInputEvent, StaticKeymap,
};
use xmacro_play::application::replay::ReplayDispatcher;
use xmacro_play::infrastructure::input_emulation::mock::{MockSyntheticInput, SyntheticCall};
use xmacro_rec::application::record_macro::RecordMacroUseCase;
use xmacro_rec::infrastructure::input_capture::mock::{server_record, ScriptedSource};

mock! {
    pub Keyboard {}

    impl KeyboardMapping for Keyboard {
        fn keycode_for_keysym(&self, sym: Keysym) -> Option<Keycode>;
        fn keysyms_for_keycode(&self, code: Keycode) -> Vec<Keysym>;
    }
}

const QUIT: Keycode = 9;

/// A realistic session: stale Return release, pointer travel, a click,
/// a typed letter, a drag, then the quit key and some trailing input.
fn session_input() -> Vec<RawInputEvent> {
    vec![
        RawInputEvent::KeyRelease { keycode: 36 },
        RawInputEvent::Motion { x: 10, y: 10 },
        RawInputEvent::Motion { x: 20, y: 15 },
        RawInputEvent::ButtonPress { button: 1 },
        RawInputEvent::ButtonRelease { button: 1 },
        RawInputEvent::KeyPress { keycode: 38 },
        RawInputEvent::KeyRelease { keycode: 38 },
        RawInputEvent::ButtonPress { button: 3 },
        RawInputEvent::Motion { x: 30, y: 40 },
        RawInputEvent::ButtonRelease { button: 3 },
        RawInputEvent::KeyPress { keycode: QUIT },
        RawInputEvent::KeyRelease { keycode: QUIT },
        RawInputEvent::Motion { x: 99, y: 99 },
    ]
}

const EXPECTED_MACRO: &str = "\
MotionNotify 20 15
ButtonPress 1
ButtonRelease 1
KeyStrPress a
KeyStrRelease a
ButtonPress 3
MotionNotify 30 40
ButtonRelease 3
";

fn recorder<'a>(
    keymap: &'a StaticKeymap,
    out: &'a mut Vec<u8>,
) -> RecordMacroUseCase<'a> {
    RecordMacroUseCase::new(CaptureSession::new(QUIT), keymap, out)
}

// ── Capture strategies ────────────────────────────────────────────────────────

#[test]
fn test_grab_strategy_writes_expected_macro() {
    // Arrange
    let keymap = StaticKeymap::us_basic();
    let mut out = Vec::new();
    let mut source = ScriptedSource::new(session_input());

    // Act
    let stats = recorder(&keymap, &mut out).run_grab(&mut source).unwrap();

    // Assert
    assert_eq!(String::from_utf8(out).unwrap(), EXPECTED_MACRO);
    assert_eq!(stats.written, 8);
    assert_eq!(source.remaining(), 2, "loop must stop pulling at the quit key");
}

#[test]
fn test_interception_strategy_writes_the_same_macro() {
    // Arrange
    let keymap = StaticKeymap::us_basic();
    let mut out = Vec::new();
    let mut source = ScriptedSource::intercepted(session_input());

    // Act
    recorder(&keymap, &mut out).run_interception(&mut source).unwrap();

    // Assert
    assert_eq!(String::from_utf8(out).unwrap(), EXPECTED_MACRO);
    assert_eq!(source.remaining(), 2);
}

#[test]
fn test_interception_skips_non_server_and_bad_records() {
    // Arrange
    let keymap = StaticKeymap::us_basic();
    let mut out = Vec::new();
    let records = vec![
        InterceptedRecord {
            category: RecordCategory::StartOfData,
            client_swapped: false,
            data: Vec::new(),
        },
        server_record(RawInputEvent::Motion { x: 5, y: 6 }),
        InterceptedRecord::from_server(vec![0; 40]),
        InterceptedRecord {
            category: RecordCategory::ClientDied,
            client_swapped: false,
            data: Vec::new(),
        },
        server_record(RawInputEvent::ButtonPress { button: 2 }),
    ];

    // Act
    let stats = recorder(&keymap, &mut out).run_interception(records).unwrap();

    // Assert
    assert_eq!(String::from_utf8(out).unwrap(), "MotionNotify 5 6\nButtonPress 2\n");
    assert_eq!(stats.skipped_records, 3);
}

#[test]
fn test_swapped_byte_order_record_is_decoded() {
    // Arrange – a client of the opposite endianness moved the pointer
    let keymap = StaticKeymap::us_basic();
    let mut out = Vec::new();
    let wire = WireEvent {
        type_code: 6,
        root_x: 300,
        root_y: 2,
        same_screen: true,
        ..WireEvent::default()
    };
    let swapped = InterceptedRecord {
        category: RecordCategory::FromServer,
        client_swapped: true,
        data: encode_wire_event(&wire, ByteOrder::native().swapped()).to_vec(),
    };

    // Act
    recorder(&keymap, &mut out)
        .run_interception([swapped, server_record(RawInputEvent::ButtonPress { button: 1 })])
        .unwrap();

    // Assert
    assert_eq!(String::from_utf8(out).unwrap(), "MotionNotify 300 2\nButtonPress 1\n");
}

#[test]
fn test_seeded_position_allows_immediate_key() {
    let keymap = StaticKeymap::us_basic();
    let mut out = Vec::new();
    let session = CaptureSession::new(QUIT).with_initial_position(640, 480);

    RecordMacroUseCase::new(session, &keymap, &mut out)
        .run_interception(ScriptedSource::intercepted([RawInputEvent::KeyPress { keycode: 65 }]))
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "MotionNotify 640 480\nKeyStrPress space\n");
}

// ── Key naming ────────────────────────────────────────────────────────────────

#[test]
fn test_keys_are_named_with_the_local_layout() {
    // Arrange – on a German layout keycode 29 carries 'z'
    let mut keyboard = MockKeyboard::new();
    keyboard
        .expect_keysyms_for_keycode()
        .with(eq(29))
        .returning(|_| vec![0x7A, 0x5A]);
    let mut out = Vec::new();
    let session = CaptureSession::new(QUIT).with_initial_position(0, 0);

    // Act
    RecordMacroUseCase::new(session, &keyboard, &mut out)
        .run_grab([RawInputEvent::KeyPress { keycode: 29 }])
        .unwrap();

    // Assert
    assert_eq!(String::from_utf8(out).unwrap(), "MotionNotify 0 0\nKeyStrPress z\n");
}

#[test]
fn test_recorded_macro_reads_back_as_events() {
    // Arrange
    let keymap = StaticKeymap::us_basic();
    let mut out = Vec::new();
    recorder(&keymap, &mut out).run_grab(session_input()).unwrap();

    // Act
    let events: Vec<InputEvent> = EventStreamReader::new(out.as_slice())
        .collect::<Result<_, _>>()
        .unwrap();

    // Assert
    assert_eq!(events.len(), 8);
    assert_eq!(events[3], InputEvent::KeyPress(Key::Name("a".into())));
}

// ── Live mirror ───────────────────────────────────────────────────────────────

#[test]
fn test_mirror_places_keys_on_the_remote_layout() {
    // Arrange – local US keyboard, remote keyboard with 'a' on keycode 24
    let local = StaticKeymap::us_basic();
    let mut remote_keyboard = MockKeyboard::new();
    remote_keyboard
        .expect_keycode_for_keysym()
        .with(eq(0x61))
        .return_const(Some(24u8));
    let remote = MockSyntheticInput::new();
    let config = MacroConfig { scale: 0.5, delay_ms: 7, ..MacroConfig::default() };
    let mut echo = Vec::new();
    let mut out = Vec::new();
    let mirror = ReplayDispatcher::new(&config, &remote, &remote_keyboard, &mut echo);

    // Act
    RecordMacroUseCase::new(CaptureSession::new(QUIT), &local, &mut out)
        .with_mirror(mirror)
        .run_grab([
            RawInputEvent::Motion { x: 101, y: 51 },
            RawInputEvent::KeyPress { keycode: 38 },
            RawInputEvent::KeyRelease { keycode: 38 },
            RawInputEvent::KeyPress { keycode: QUIT },
        ])
        .unwrap();

    // Assert
    assert_eq!(
        remote.input_calls(),
        vec![
            SyntheticCall::Motion { x: 50, y: 25, delay_ms: 0 },
            SyntheticCall::Key { keycode: 24, pressed: true, delay_ms: 7 },
            SyntheticCall::Key { keycode: 24, pressed: false, delay_ms: 7 },
        ]
    );
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "MotionNotify 101 51\nKeyStrPress a\nKeyStrRelease a\n"
    );
}
