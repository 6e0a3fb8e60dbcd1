//! Lower/upper case variants of a keysym.
//!
//! Covers ASCII, Latin-1, and Unicode keysyms.  Keysyms from the other
//! legacy sets (Latin-2, Cyrillic, Greek, ...) are treated as caseless.

use super::keysym::UNICODE_OFFSET;
use crate::domain::event::Keysym;

/// Keysym of GREEK CAPITAL LETTER MU, the upper case of MICRO SIGN.
const XK_GREEK_MU: Keysym = 0x07CC;
/// Keysym of LATIN CAPITAL LETTER Y WITH DIAERESIS.
const XK_YDIAERESIS_UPPER: Keysym = 0x13BE;

/// Returns `(lower, upper)` for `sym`.
///
/// Both are `sym` itself when it has no case.
pub fn convert_case(sym: Keysym) -> (Keysym, Keysym) {
    if sym & 0xFF00_0000 == UNICODE_OFFSET {
        return unicode_case(sym);
    }
    if sym >> 8 == 0 {
        return latin1_case(sym);
    }
    (sym, sym)
}

fn latin1_case(sym: Keysym) -> (Keysym, Keysym) {
    match sym {
        0x41..=0x5A => (sym + 0x20, sym),
        0x61..=0x7A => (sym, sym - 0x20),
        // × and ÷ sit inside the letter blocks but have no case
        0xD7 | 0xF7 => (sym, sym),
        0xC0..=0xDE => (sym + 0x20, sym),
        0xE0..=0xFE => (sym, sym - 0x20),
        0xB5 => (sym, XK_GREEK_MU),
        0xFF => (sym, XK_YDIAERESIS_UPPER),
        _ => (sym, sym),
    }
}

fn unicode_case(sym: Keysym) -> (Keysym, Keysym) {
    let Some(c) = char::from_u32(sym & 0x00FF_FFFF) else {
        return (sym, sym);
    };
    let lower = single(c.to_lowercase()).unwrap_or(c);
    let upper = single(c.to_uppercase()).unwrap_or(c);
    (UNICODE_OFFSET | lower as u32, UNICODE_OFFSET | upper as u32)
}

/// The only char of a case mapping, or `None` when it expands.
fn single(mut mapped: impl Iterator<Item = char>) -> Option<char> {
    let first = mapped.next()?;
    mapped.next().is_none().then_some(first)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_letters_have_both_cases() {
        assert_eq!(convert_case(0x61), (0x61, 0x41)); // a
        assert_eq!(convert_case(0x41), (0x61, 0x41)); // A
        assert_eq!(convert_case(0x7A), (0x7A, 0x5A)); // z
    }

    #[test]
    fn test_digits_and_punctuation_are_caseless() {
        assert_eq!(convert_case(0x31), (0x31, 0x31));
        assert_eq!(convert_case(0x21), (0x21, 0x21));
        assert_eq!(convert_case(0x20), (0x20, 0x20));
    }

    #[test]
    fn test_latin1_letters_have_both_cases() {
        assert_eq!(convert_case(0xE9), (0xE9, 0xC9)); // é
        assert_eq!(convert_case(0xC4), (0xE4, 0xC4)); // Ä
    }

    #[test]
    fn test_multiply_and_divide_are_caseless() {
        assert_eq!(convert_case(0xD7), (0xD7, 0xD7));
        assert_eq!(convert_case(0xF7), (0xF7, 0xF7));
    }

    #[test]
    fn test_latin1_special_uppercases() {
        assert_eq!(convert_case(0xB5), (0xB5, XK_GREEK_MU));
        assert_eq!(convert_case(0xFF), (0xFF, XK_YDIAERESIS_UPPER));
    }

    #[test]
    fn test_function_keysyms_are_caseless() {
        assert_eq!(convert_case(0xFF0D), (0xFF0D, 0xFF0D));
    }

    #[test]
    fn test_unicode_keysyms_use_unicode_case() {
        // Cyrillic zhe
        assert_eq!(convert_case(0x0100_0436), (0x0100_0436, 0x0100_0416));
        assert_eq!(convert_case(0x0100_0416), (0x0100_0436, 0x0100_0416));
    }

    #[test]
    fn test_unicode_expanding_mapping_keeps_symbol() {
        // U+0149 uppercases to two chars
        assert_eq!(convert_case(0x0100_0149), (0x0100_0149, 0x0100_0149));
    }

    #[test]
    fn test_invalid_unicode_keysym_is_caseless() {
        assert_eq!(convert_case(0x0100_D800), (0x0100_D800, 0x0100_D800));
    }
}
