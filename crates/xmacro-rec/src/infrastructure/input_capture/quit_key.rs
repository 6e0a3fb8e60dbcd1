//! Choosing the key that ends a recording.
//!
//! With `-k` (or `quit_key` in the config file) the keycode is fixed.
//! Otherwise the recorder grabs the keyboard and takes the first key the
//! user presses.

use xmacro_core::{Keycode, RawInputEvent};

/// Returns the keycode of the first key press in `events`.
pub fn first_key_press<I>(events: I) -> Option<Keycode>
where
    I: IntoIterator<Item = RawInputEvent>,
{
    events.into_iter().find_map(|raw| match raw {
        RawInputEvent::KeyPress { keycode } => Some(keycode),
        _ => None,
    })
}

/// Uses `configured`, or asks the user to press the quit key.
///
/// # Errors
///
/// Returns [`CaptureError`](super::CaptureError) if the keyboard cannot be
/// grabbed for the prompt.
#[cfg(target_os = "linux")]
pub fn resolve_quit_key(
    configured: Option<Keycode>,
    display: &xmacro_play::infrastructure::display::XDisplay,
) -> Result<Keycode, super::CaptureError> {
    use tracing::info;
    use xmacro_core::KeyTranslator;

    use super::grab::GrabSource;
    use super::CaptureError;

    let keycode = match configured {
        Some(keycode) => keycode,
        None => {
            info!(
                "press the key that should end the recording; \
                 pick one you will not need while recording (Escape is a good choice)"
            );
            let source = GrabSource::keyboard_only(display)?;
            first_key_press(source).ok_or(CaptureError::InputClosed)?
        }
    };
    let key = KeyTranslator::new(display).name_keycode(keycode);
    info!(keycode, ?key, "using quit key");
    Ok(keycode)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
