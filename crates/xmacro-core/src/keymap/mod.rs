//! Keysym handling and cross-keyboard key translation.
//!
//! - [`keysym`] – symbolic names and the Unicode keysym encoding.
//! - [`case`] – lower/upper case variants of a keysym.
//! - [`translate`] – the [`KeyTranslator`] that turns a key or character
//!   into keycodes of the target keyboard.

pub mod case;
pub mod keysym;
pub mod translate;

pub use case::convert_case;
pub use keysym::{keysym_from_name, keysym_to_name};
pub use translate::{
    char_to_keysym, CharStroke, KeyTranslator, KeyboardMapping, StaticKeymap, TranslateError,
};
