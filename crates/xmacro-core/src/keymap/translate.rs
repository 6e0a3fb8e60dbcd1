//! Translation of captured keys into keycodes of a target keyboard.
//!
//! Keycodes are only meaningful on the keyboard they came from, so the
//! player re-resolves every symbolic key against the target display's
//! mapping.  Raw text is typed one character at a time; for each character
//! the translator also decides whether Shift has to be held.
//!
//! # The shift rule (for beginners)
//!
//! A keycode carries a list of keysyms, one per shift level: on a US layout
//! the `a` key carries `[a, A]` and the `1` key carries `[1, exclam]`.
//! For a wanted keysym `ks` with case variants `(lower, upper)`:
//!
//! | Situation                                    | Example         | Shift? |
//! |----------------------------------------------|-----------------|--------|
//! | caseless and first symbol of its keycode     | `1` on `[1, !]` | no     |
//! | lower-case letter                            | `a` on `[a, A]` | no     |
//! | anything else (upper case, second symbol)    | `A`, `!`        | yes    |

use thiserror::Error;
use tracing::trace;

use super::case::convert_case;
use super::keysym::{
    self, unicode_keysym, XK_BACKSPACE, XK_DELETE, XK_ESCAPE, XK_RETURN, XK_SHIFT_L, XK_TAB,
};
use crate::domain::event::{Key, Keycode, Keysym};

/// Keysym slot value meaning "no symbol".
pub const NO_SYMBOL: Keysym = 0;

/// Errors raised while translating a key for the target keyboard.
///
/// All of them are recoverable: the affected event is skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("unknown key name '{0}'")]
    UnknownKeyName(String),

    #[error("no keycode on target keyboard for keysym 0x{keysym:04X}")]
    NoKeycode { keysym: Keysym },

    #[error("keycode {keycode} has no symbols on target keyboard")]
    NoSymbols { keycode: Keycode },

    #[error("no keycode on target keyboard for Shift_L")]
    NoShiftKeycode,

    #[error("character {0:?} has no keysym")]
    Unmappable(char),
}

/// Read access to a keyboard mapping.
///
/// Implemented by the X11 display backend and by in-memory tables.
pub trait KeyboardMapping {
    /// Returns a keycode that produces `sym`, if any.
    fn keycode_for_keysym(&self, sym: Keysym) -> Option<Keycode>;

    /// Returns the keysyms bound to `code`, one per shift level.
    fn keysyms_for_keycode(&self, code: Keycode) -> Vec<Keysym>;

    /// Resolves a symbolic key name.
    fn keysym_from_name(&self, name: &str) -> Option<Keysym> {
        keysym::keysym_from_name(name)
    }

    /// Returns the symbolic name of `sym`.
    fn keysym_name(&self, sym: Keysym) -> String {
        keysym::keysym_to_name(sym)
    }
}

/// Returns the keysym typed for a character of a `String` directive.
pub fn char_to_keysym(c: char) -> Option<Keysym> {
    match c {
        '\t' => Some(XK_TAB),
        '\n' | '\r' => Some(XK_RETURN),
        '\u{8}' => Some(XK_BACKSPACE),
        '\u{1b}' => Some(XK_ESCAPE),
        '\u{7f}' => Some(XK_DELETE),
        _ => unicode_keysym(c as u32),
    }
}

/// Keycodes needed to type one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharStroke {
    pub keycode: Keycode,
    /// Shift keycode to hold around the key, when the character needs it.
    pub shift: Option<Keycode>,
}

/// Resolves keys against a target [`KeyboardMapping`].
pub struct KeyTranslator<'m, M: ?Sized> {
    mapping: &'m M,
}

impl<'m, M: KeyboardMapping + ?Sized> KeyTranslator<'m, M> {
    pub fn new(mapping: &'m M) -> Self {
        Self { mapping }
    }

    /// Returns the target keycode for `key`.
    ///
    /// Raw keycodes pass through unchanged.
    pub fn resolve(&self, key: &Key) -> Result<Keycode, TranslateError> {
        let sym = match key {
            Key::Code(code) => return Ok(*code),
            Key::Sym(sym) => *sym,
            Key::Name(name) => self
                .mapping
                .keysym_from_name(name)
                .ok_or_else(|| TranslateError::UnknownKeyName(name.clone()))?,
        };
        self.keycode_for(sym)
    }

    /// Returns the keycode and shift requirement for typing `c`.
    pub fn resolve_char(&self, c: char) -> Result<CharStroke, TranslateError> {
        let sym = char_to_keysym(c).ok_or(TranslateError::Unmappable(c))?;
        let keycode = self.keycode_for(sym)?;

        let mut syms = self.mapping.keysyms_for_keycode(keycode);
        while syms.last() == Some(&NO_SYMBOL) {
            syms.pop();
        }
        let Some(&primary) = syms.first() else {
            return Err(TranslateError::NoSymbols { keycode });
        };

        let (lower, upper) = convert_case(sym);
        let caseless_primary = sym == primary && sym == lower && sym == upper;
        let unshifted_letter = sym == lower && sym != upper;
        trace!(?c, sym, lower, upper, ?syms, "shift decision");

        let shift = if caseless_primary || unshifted_letter {
            None
        } else {
            Some(self.keycode_for(XK_SHIFT_L).map_err(|_| TranslateError::NoShiftKeycode)?)
        };
        Ok(CharStroke { keycode, shift })
    }

    /// Names a local keycode by the keysym on its first shift level.
    ///
    /// Falls back to the raw keycode when the key has no symbol.
    pub fn name_keycode(&self, code: Keycode) -> Key {
        match self.mapping.keysyms_for_keycode(code).first() {
            Some(&sym) if sym != NO_SYMBOL => Key::Name(self.mapping.keysym_name(sym)),
            _ => Key::Code(code),
        }
    }

    fn keycode_for(&self, keysym: Keysym) -> Result<Keycode, TranslateError> {
        self.mapping
            .keycode_for_keysym(keysym)
            .ok_or(TranslateError::NoKeycode { keysym })
    }
}

// ── In-memory mapping ─────────────────────────────────────────────────────────

/// A keyboard mapping held in memory.
///
/// Used for tests and as a display-less stand-in.
#[derive(Debug, Clone, Default)]
pub struct StaticKeymap {
    keys: Vec<(Keycode, Vec<Keysym>)>,
}

impl StaticKeymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `syms` to `code`, replacing any previous binding.
    pub fn with_key(mut self, code: Keycode, syms: &[Keysym]) -> Self {
        self.keys.retain(|(c, _)| *c != code);
        self.keys.push((code, syms.to_vec()));
        self
    }

    /// A small US layout: letters, digits with their shifted symbols,
    /// space, Return, and both Shift keys.
    pub fn us_basic() -> Self {
        const ROWS: [(&str, Keycode); 3] = [("qwertyuiop", 24), ("asdfghjkl", 38), ("zxcvbnm", 52)];
        const DIGITS: [(Keysym, Keysym); 10] = [
            (0x31, 0x21),
            (0x32, 0x40),
            (0x33, 0x23),
            (0x34, 0x24),
            (0x35, 0x25),
            (0x36, 0x5E),
            (0x37, 0x26),
            (0x38, 0x2A),
            (0x39, 0x28),
            (0x30, 0x29),
        ];

        let mut map = Self::new();
        for (row, first) in ROWS {
            for (code, letter) in (first..).zip(row.bytes()) {
                let lower = Keysym::from(letter);
                map = map.with_key(code, &[lower, lower - 0x20]);
            }
        }
        for (code, (digit, shifted)) in (10..).zip(DIGITS) {
            map = map.with_key(code, &[digit, shifted]);
        }
        map.with_key(9, &[XK_ESCAPE])
            .with_key(36, &[XK_RETURN])
            .with_key(50, &[XK_SHIFT_L])
            .with_key(62, &[0xFFE2])
            .with_key(65, &[0x20])
    }
}

impl KeyboardMapping for StaticKeymap {
    fn keycode_for_keysym(&self, sym: Keysym) -> Option<Keycode> {
        self.keys
            .iter()
            .find(|(_, syms)| syms.contains(&sym))
            .map(|(code, _)| *code)
    }

    fn keysyms_for_keycode(&self, code: Keycode) -> Vec<Keysym> {
        self.keys
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, syms)| syms.clone())
            .unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn translator(map: &StaticKeymap) -> KeyTranslator<'_, StaticKeymap> {
        KeyTranslator::new(map)
    }

    // ── Symbolic path ─────────────────────────────────────────────────────────

    #[test]
    fn test_raw_keycode_passes_through() {
        let map = StaticKeymap::new();
        assert_eq!(translator(&map).resolve(&Key::Code(200)), Ok(200));
    }

    #[test]
    fn test_keysym_resolves_to_target_keycode() {
        let map = StaticKeymap::us_basic();
        assert_eq!(translator(&map).resolve(&Key::Sym(0x61)), Ok(38));
        assert_eq!(translator(&map).resolve(&Key::Sym(XK_RETURN)), Ok(36));
    }

    #[test]
    fn test_key_name_resolves_through_name_table() {
        let map = StaticKeymap::us_basic();
        assert_eq!(translator(&map).resolve(&Key::Name("Return".into())), Ok(36));
        assert_eq!(translator(&map).resolve(&Key::Name("exclam".into())), Ok(10));
    }

    #[test]
    fn test_missing_keycode_is_error() {
        let map = StaticKeymap::us_basic();
        assert_eq!(
            translator(&map).resolve(&Key::Sym(0xFFBE)),
            Err(TranslateError::NoKeycode { keysym: 0xFFBE })
        );
    }

    #[test]
    fn test_unknown_name_is_error() {
        let map = StaticKeymap::us_basic();
        assert_eq!(
            translator(&map).resolve(&Key::Name("Bogus".into())),
            Err(TranslateError::UnknownKeyName("Bogus".into()))
        );
    }

    // ── Character path ────────────────────────────────────────────────────────

    #[test]
    fn test_lowercase_letter_needs_no_shift() {
        let map = StaticKeymap::us_basic();
        let stroke = translator(&map).resolve_char('a').unwrap();
        assert_eq!(stroke, CharStroke { keycode: 38, shift: None });
    }

    #[test]
    fn test_uppercase_letter_needs_shift() {
        let map = StaticKeymap::us_basic();
        let stroke = translator(&map).resolve_char('A').unwrap();
        assert_eq!(stroke, CharStroke { keycode: 38, shift: Some(50) });
    }

    #[test]
    fn test_caseless_primary_symbol_needs_no_shift() {
        let map = StaticKeymap::us_basic();
        assert_eq!(translator(&map).resolve_char('1').unwrap().shift, None);
        assert_eq!(translator(&map).resolve_char(' ').unwrap().shift, None);
    }

    #[test]
    fn test_caseless_secondary_symbol_needs_shift() {
        let map = StaticKeymap::us_basic();
        let stroke = translator(&map).resolve_char('!').unwrap();
        assert_eq!(stroke, CharStroke { keycode: 10, shift: Some(50) });
    }

    #[test]
    fn test_newline_types_return() {
        let map = StaticKeymap::us_basic();
        assert_eq!(
            translator(&map).resolve_char('\n').unwrap(),
            CharStroke { keycode: 36, shift: None }
        );
    }

    #[test]
    fn test_trailing_no_symbols_are_ignored() {
        // Arrange – "1" is the first symbol once the trailing NoSymbol is dropped
        let map = StaticKeymap::new().with_key(10, &[0x31, NO_SYMBOL, NO_SYMBOL]);

        // Act
        let stroke = translator(&map).resolve_char('1').unwrap();

        // Assert
        assert_eq!(stroke.shift, None);
    }

    #[test]
    fn test_rebinding_a_keycode_replaces_its_symbols() {
        let map = StaticKeymap::new().with_key(10, &[0x31]).with_key(10, &[0x32]);
        let t = translator(&map);

        assert_eq!(t.resolve(&Key::Sym(0x32)), Ok(10));
        assert_eq!(t.resolve(&Key::Sym(0x31)), Err(TranslateError::NoKeycode { keysym: 0x31 }));
    }

    #[test]
    fn test_missing_shift_only_fails_when_shift_needed() {
        let map = StaticKeymap::new().with_key(38, &[0x61, 0x41]);
        let t = translator(&map);

        assert_eq!(t.resolve_char('a').unwrap().shift, None);
        assert_eq!(t.resolve_char('A'), Err(TranslateError::NoShiftKeycode));
    }

    #[test]
    fn test_unicode_character_resolves_by_unicode_keysym() {
        let map = StaticKeymap::us_basic().with_key(47, &[0x0100_0436, 0x0100_0416]);
        let t = translator(&map);

        assert_eq!(t.resolve_char('ж').unwrap(), CharStroke { keycode: 47, shift: None });
        assert_eq!(t.resolve_char('Ж').unwrap(), CharStroke { keycode: 47, shift: Some(50) });
    }

    #[test]
    fn test_control_character_is_unmappable() {
        let map = StaticKeymap::us_basic();
        assert_eq!(
            translator(&map).resolve_char('\u{1}'),
            Err(TranslateError::Unmappable('\u{1}'))
        );
    }

    #[test]
    fn test_keycode_with_only_no_symbol_entries_is_error() {
        // Arrange – 'x' is found on keycode 53 but the mapping reports nothing there
        struct Hollow;
        impl KeyboardMapping for Hollow {
            fn keycode_for_keysym(&self, _: Keysym) -> Option<Keycode> {
                Some(53)
            }
            fn keysyms_for_keycode(&self, _: Keycode) -> Vec<Keysym> {
                vec![NO_SYMBOL, NO_SYMBOL]
            }
        }

        // Act
        let result = KeyTranslator::new(&Hollow).resolve_char('x');

        // Assert
        assert_eq!(result, Err(TranslateError::NoSymbols { keycode: 53 }));
    }

    // ── Naming ────────────────────────────────────────────────────────────────

    #[test]
    fn test_name_keycode_uses_first_level_symbol() {
        let map = StaticKeymap::us_basic();
        let t = translator(&map);
        assert_eq!(t.name_keycode(38), Key::Name("a".into()));
        assert_eq!(t.name_keycode(36), Key::Name("Return".into()));
    }

    #[test]
    fn test_name_keycode_falls_back_to_code() {
        let map = StaticKeymap::us_basic();
        assert_eq!(translator(&map).name_keycode(250), Key::Code(250));
    }
}
