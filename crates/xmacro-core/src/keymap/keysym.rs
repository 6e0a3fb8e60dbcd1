//! Keysym names and values used by xmacro.
//!
//! X11 keysym values are defined in X11/keysymdef.h.
//! Reference: https://gitlab.freedesktop.org/xorg/proto/xorgproto/-/blob/master/include/X11/keysymdef.h
//!
//! # Naming rules (for beginners)
//!
//! | Name form   | Example      | Keysym                         |
//! |-------------|--------------|--------------------------------|
//! | letter/digit| `a`, `7`     | the ASCII value (0x61, 0x37)   |
//! | table name  | `Return`     | 0xFF0D                         |
//! | `U<hex>`    | `U20AC`      | 0x010020AC (Unicode keysym)    |
//! | `0x<hex>`   | `0xff0d`     | the number itself              |
//!
//! Names are case-sensitive: `a` and `A` are different keysyms.
//!
//! The display server has its own name database; this table is the
//! fallback used when no display is involved.

use crate::domain::event::Keysym;

pub const XK_BACKSPACE: Keysym = 0xFF08;
pub const XK_TAB: Keysym = 0xFF09;
pub const XK_RETURN: Keysym = 0xFF0D;
pub const XK_ESCAPE: Keysym = 0xFF1B;
pub const XK_DELETE: Keysym = 0xFFFF;
pub const XK_SHIFT_L: Keysym = 0xFFE1;

/// Offset applied to a Unicode code point to form its keysym.
pub const UNICODE_OFFSET: Keysym = 0x0100_0000;

/// Largest code point expressible as a Unicode keysym.
const UNICODE_MAX: u32 = 0x10_FFFF;

/// Named keysyms.  Letters and digits are handled separately.
static KEYSYM_NAMES: &[(&str, Keysym)] = &[
    // ASCII punctuation
    ("space", 0x0020),
    ("exclam", 0x0021),
    ("quotedbl", 0x0022),
    ("numbersign", 0x0023),
    ("dollar", 0x0024),
    ("percent", 0x0025),
    ("ampersand", 0x0026),
    ("apostrophe", 0x0027),
    ("parenleft", 0x0028),
    ("parenright", 0x0029),
    ("asterisk", 0x002A),
    ("plus", 0x002B),
    ("comma", 0x002C),
    ("minus", 0x002D),
    ("period", 0x002E),
    ("slash", 0x002F),
    ("colon", 0x003A),
    ("semicolon", 0x003B),
    ("less", 0x003C),
    ("equal", 0x003D),
    ("greater", 0x003E),
    ("question", 0x003F),
    ("at", 0x0040),
    ("bracketleft", 0x005B),
    ("backslash", 0x005C),
    ("bracketright", 0x005D),
    ("asciicircum", 0x005E),
    ("underscore", 0x005F),
    ("grave", 0x0060),
    ("braceleft", 0x007B),
    ("bar", 0x007C),
    ("braceright", 0x007D),
    ("asciitilde", 0x007E),
    // Latin-1
    ("nobreakspace", 0x00A0),
    ("sterling", 0x00A3),
    ("section", 0x00A7),
    ("degree", 0x00B0),
    ("mu", 0x00B5),
    ("Agrave", 0x00C0),
    ("Adiaeresis", 0x00C4),
    ("Ccedilla", 0x00C7),
    ("Egrave", 0x00C8),
    ("Eacute", 0x00C9),
    ("Odiaeresis", 0x00D6),
    ("Udiaeresis", 0x00DC),
    ("ssharp", 0x00DF),
    ("agrave", 0x00E0),
    ("adiaeresis", 0x00E4),
    ("ccedilla", 0x00E7),
    ("egrave", 0x00E8),
    ("eacute", 0x00E9),
    ("odiaeresis", 0x00F6),
    ("udiaeresis", 0x00FC),
    ("ydiaeresis", 0x00FF),
    // TTY function keys
    ("BackSpace", XK_BACKSPACE),
    ("Tab", XK_TAB),
    ("Linefeed", 0xFF0A),
    ("Clear", 0xFF0B),
    ("Return", XK_RETURN),
    ("Pause", 0xFF13),
    ("Scroll_Lock", 0xFF14),
    ("Sys_Req", 0xFF15),
    ("Escape", XK_ESCAPE),
    ("Delete", XK_DELETE),
    // Cursor control
    ("Home", 0xFF50),
    ("Left", 0xFF51),
    ("Up", 0xFF52),
    ("Right", 0xFF53),
    ("Down", 0xFF54),
    ("Prior", 0xFF55),
    ("Page_Up", 0xFF55),
    ("Next", 0xFF56),
    ("Page_Down", 0xFF56),
    ("End", 0xFF57),
    ("Begin", 0xFF58),
    // Misc functions
    ("Print", 0xFF61),
    ("Insert", 0xFF63),
    ("Menu", 0xFF67),
    ("Num_Lock", 0xFF7F),
    // Keypad
    ("KP_Enter", 0xFF8D),
    ("KP_Multiply", 0xFFAA),
    ("KP_Add", 0xFFAB),
    ("KP_Subtract", 0xFFAD),
    ("KP_Decimal", 0xFFAE),
    ("KP_Divide", 0xFFAF),
    ("KP_0", 0xFFB0),
    ("KP_1", 0xFFB1),
    ("KP_2", 0xFFB2),
    ("KP_3", 0xFFB3),
    ("KP_4", 0xFFB4),
    ("KP_5", 0xFFB5),
    ("KP_6", 0xFFB6),
    ("KP_7", 0xFFB7),
    ("KP_8", 0xFFB8),
    ("KP_9", 0xFFB9),
    // Function keys
    ("F1", 0xFFBE),
    ("F2", 0xFFBF),
    ("F3", 0xFFC0),
    ("F4", 0xFFC1),
    ("F5", 0xFFC2),
    ("F6", 0xFFC3),
    ("F7", 0xFFC4),
    ("F8", 0xFFC5),
    ("F9", 0xFFC6),
    ("F10", 0xFFC7),
    ("F11", 0xFFC8),
    ("F12", 0xFFC9),
    // Modifiers
    ("Shift_L", XK_SHIFT_L),
    ("Shift_R", 0xFFE2),
    ("Control_L", 0xFFE3),
    ("Control_R", 0xFFE4),
    ("Caps_Lock", 0xFFE5),
    ("Meta_L", 0xFFE7),
    ("Meta_R", 0xFFE8),
    ("Alt_L", 0xFFE9),
    ("Alt_R", 0xFFEA),
    ("Super_L", 0xFFEB),
    ("Super_R", 0xFFEC),
    ("ISO_Level3_Shift", 0xFE03),
    ("EuroSign", 0x20AC),
];

/// Looks up the keysym for a symbolic name.
///
/// Returns `None` for names this table does not know.
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return Some(c as Keysym);
        }
    }

    if let Some(&(_, sym)) = KEYSYM_NAMES.iter().find(|(n, _)| *n == name) {
        return Some(sym);
    }

    if let Some(hex) = name.strip_prefix("0x") {
        return parse_hex(hex);
    }

    let hex = name.strip_prefix('U')?;
    if hex.len() > 8 {
        return None;
    }
    unicode_keysym(parse_hex(hex)?)
}

/// Parses bare hex digits.  Unlike `from_str_radix`, a sign is rejected.
pub(crate) fn parse_hex(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Returns the keysym for a Unicode code point.
///
/// Printable Latin-1 code points are their own keysym; everything else up
/// to U+10FFFF is offset into the Unicode keysym range.
pub fn unicode_keysym(cp: u32) -> Option<Keysym> {
    match cp {
        0x20..=0x7E | 0xA0..=0xFF => Some(cp),
        0x100..=UNICODE_MAX => Some(UNICODE_OFFSET | cp),
        _ => None,
    }
}

/// Returns a name that [`keysym_from_name`] maps back to `sym`.
pub fn keysym_to_name(sym: Keysym) -> String {
    if let Some(c) = char::from_u32(sym).filter(char::is_ascii_alphanumeric) {
        return c.to_string();
    }
    if let Some((name, _)) = KEYSYM_NAMES.iter().find(|(_, s)| *s == sym) {
        return (*name).to_string();
    }
    match sym.checked_sub(UNICODE_OFFSET) {
        Some(cp) if (0x100..=UNICODE_MAX).contains(&cp) => format!("U{cp:04X}"),
        _ => format!("0x{sym:x}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
