//! The line-oriented macro text format.
//!
//! Recorders write one directive per line; the player reads them back.
//! Keywords are matched case-insensitively and fields are separated by
//! whitespace:
//!
//! | Directive                      | Event                              |
//! |--------------------------------|------------------------------------|
//! | `# text`                       | `Comment`                          |
//! | `Delay <ms>`                   | `Delay`                            |
//! | `ButtonPress <n>`              | `ButtonPress`                      |
//! | `ButtonRelease <n>`            | `ButtonRelease`                    |
//! | `MotionNotify <x> <y>`         | `MotionNotify`                     |
//! | `KeyCode <kc>`                 | `KeyStroke(Key::Code)`             |
//! | `KeyCodePress/Release <kc>`    | `KeyPress/KeyRelease(Key::Code)`   |
//! | `KeySym <ks>`                  | `KeyStroke(Key::Sym)`              |
//! | `KeySymPress/Release <ks>`     | `KeyPress/KeyRelease(Key::Sym)`    |
//! | `KeyStr <name>`                | `KeyStroke(Key::Name)`             |
//! | `KeyStrPress/Release <name>`   | `KeyPress/KeyRelease(Key::Name)`   |
//! | `String <raw text>`            | `Text`                             |
//! | anything else                  | `Unknown` (whole line)             |
//!
//! Keysyms may be written in decimal or as `0x`-prefixed hex; the encoder
//! always writes decimal.
//!
//! # Escapes
//!
//! Every event must fit on one line and read back unchanged, so the
//! free-form fields carry backslash escapes:
//!
//! | Escape   | Meaning              | Where                         |
//! |----------|----------------------|-------------------------------|
//! | `\\`     | backslash            | key names, `String`, comments |
//! | `\n`     | line feed            | key names, `String`, comments |
//! | `\r`     | carriage return      | key names, `String`, comments |
//! | `\s`     | space                | key names                     |
//! | `\t`     | tab                  | key names                     |
//! | `\u{hex}`| any other whitespace | key names                     |
//! | `\e`     | nothing (empty name) | key names                     |
//!
//! A backslash followed by anything else is kept as written, so
//! hand-written paths such as `String C:\temp` still read as typed.

use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::event::{InputEvent, Key, Keycode, Keysym};
use crate::keymap::keysym::parse_hex;

/// Longest `String` payload kept, in bytes.
pub const MAX_TEXT_LEN: usize = 1023;

/// Errors produced while reading a macro stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The underlying reader failed.  The stream ends after this error.
    #[error("I/O error reading macro stream: {0}")]
    Io(#[from] io::Error),

    /// A directive is missing one of its arguments.
    #[error("line {line}: {directive} is missing an argument")]
    MissingArgument { line: usize, directive: &'static str },

    /// A directive argument does not parse as the expected number.
    #[error("line {line}: invalid argument {value:?} for {directive}")]
    InvalidArgument {
        line: usize,
        directive: &'static str,
        value: String,
    },
}

impl StreamError {
    /// Returns `true` when the reader cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StreamError::Io(_))
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes one event as a single directive line, without the newline.
pub fn encode_event(event: &InputEvent) -> String {
    match event {
        InputEvent::KeyPress(key) => encode_key(key, "Press"),
        InputEvent::KeyRelease(key) => encode_key(key, "Release"),
        InputEvent::KeyStroke(key) => encode_key(key, ""),
        InputEvent::ButtonPress(button) => format!("ButtonPress {button}"),
        InputEvent::ButtonRelease(button) => format!("ButtonRelease {button}"),
        InputEvent::MotionNotify { x, y } => format!("MotionNotify {x} {y}"),
        InputEvent::Delay(ms) => format!("Delay {ms}"),
        InputEvent::Text(text) => format!("String {}", escape(text, Field::Line)),
        InputEvent::Comment(text) => format!("#{}", escape(text, Field::Line)),
        InputEvent::Unknown(raw) => raw.clone(),
    }
}

fn encode_key(key: &Key, suffix: &str) -> String {
    match key {
        Key::Code(code) => format!("KeyCode{suffix} {code}"),
        Key::Sym(sym) => format!("KeySym{suffix} {sym}"),
        Key::Name(name) => format!("KeyStr{suffix} {}", escape(name, Field::Word)),
    }
}

/// Which escapes a free-form field uses.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    /// The rest of the line: only line breaks and backslashes are escaped.
    Line,
    /// A single whitespace-delimited token.
    Word,
}

fn escape(raw: &str, field: Field) -> String {
    if field == Field::Word && raw.is_empty() {
        return "\\e".to_string();
    }
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ if field == Field::Line => out.push(c),
            ' ' => out.push_str("\\s"),
            '\t' => out.push_str("\\t"),
            c if c.is_whitespace() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn unescape(encoded: &str, field: Field) -> String {
    let mut out = String::with_capacity(encoded.len());
    let mut rest = encoded;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let (decoded, used) = match (tail.chars().next(), field) {
            (Some('\\'), _) => (Some('\\'), 1),
            (Some('n'), _) => (Some('\n'), 1),
            (Some('r'), _) => (Some('\r'), 1),
            (Some('s'), Field::Word) => (Some(' '), 1),
            (Some('t'), Field::Word) => (Some('\t'), 1),
            (Some('e'), Field::Word) => (None, 1),
            (Some('u'), Field::Word) => match unicode_escape(tail) {
                Some((c, used)) => (Some(c), used),
                None => {
                    out.push('\\');
                    rest = tail;
                    continue;
                }
            },
            _ => {
                out.push('\\');
                rest = tail;
                continue;
            }
        };
        out.extend(decoded);
        rest = &tail[used..];
    }
    out.push_str(rest);
    out
}

/// Decodes `u{hex}` at the start of `tail`; returns the char and bytes used.
fn unicode_escape(tail: &str) -> Option<(char, usize)> {
    let body = tail.strip_prefix("u{")?;
    let end = body.find('}')?;
    let c = char::from_u32(parse_hex(&body[..end])?)?;
    Some((c, end + 3))
}

/// Writes one event followed by a newline, then flushes `out`.
///
/// Flushing per event keeps a downstream player in a pipeline in step
/// with the recorder.
pub fn write_event<W: Write>(out: &mut W, event: &InputEvent) -> io::Result<()> {
    writeln!(out, "{}", encode_event(event))?;
    out.flush()
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Parses one directive line.
///
/// Returns `Ok(None)` for blank lines.  `line_no` is only used in errors.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<InputEvent>, StreamError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let body = line.trim_start();
    if body.is_empty() {
        return Ok(None);
    }
    if let Some(comment) = body.strip_prefix('#') {
        return Ok(Some(InputEvent::Comment(unescape(comment, Field::Line))));
    }

    let (keyword, rest) = split_token(body);
    let keyword = keyword.to_ascii_lowercase();

    // `String` takes the raw remainder, so it must not be tokenised.
    if keyword == "string" {
        return Ok(Some(InputEvent::Text(read_text(rest))));
    }

    let mut args = Args::new(rest, line_no);
    let event = match keyword.as_str() {
        "delay" => InputEvent::Delay(args.number("Delay")?),
        "buttonpress" => InputEvent::ButtonPress(args.number("ButtonPress")?),
        "buttonrelease" => InputEvent::ButtonRelease(args.number("ButtonRelease")?),
        "motionnotify" => {
            let x = args.number("MotionNotify")?;
            let y = args.number("MotionNotify")?;
            InputEvent::MotionNotify { x, y }
        }
        "keycode" => InputEvent::KeyStroke(Key::Code(args.keycode("KeyCode")?)),
        "keycodepress" => InputEvent::KeyPress(Key::Code(args.keycode("KeyCodePress")?)),
        "keycoderelease" => InputEvent::KeyRelease(Key::Code(args.keycode("KeyCodeRelease")?)),
        "keysym" => InputEvent::KeyStroke(Key::Sym(args.keysym("KeySym")?)),
        "keysympress" => InputEvent::KeyPress(Key::Sym(args.keysym("KeySymPress")?)),
        "keysymrelease" => InputEvent::KeyRelease(Key::Sym(args.keysym("KeySymRelease")?)),
        "keystr" => InputEvent::KeyStroke(Key::Name(args.name("KeyStr")?)),
        "keystrpress" => InputEvent::KeyPress(Key::Name(args.name("KeyStrPress")?)),
        "keystrrelease" => InputEvent::KeyRelease(Key::Name(args.name("KeyStrRelease")?)),
        _ => return Ok(Some(InputEvent::Unknown(body.trim_end().to_string()))),
    };

    let extra = args.remainder();
    if !extra.is_empty() {
        debug!(line = line_no, extra, "ignoring trailing tokens");
    }
    Ok(Some(event))
}

/// Drops the single delimiter after `String` and bounds the payload.
fn read_text(rest: &str) -> String {
    let mut chars = rest.chars();
    let raw = match chars.next() {
        Some(c) if c.is_whitespace() => chars.as_str(),
        _ => rest,
    };
    let mut text = unescape(raw, Field::Line);
    if text.len() > MAX_TEXT_LEN {
        let mut end = MAX_TEXT_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        warn!(len = text.len(), kept = end, "String directive truncated");
        text.truncate(end);
    }
    text
}

fn split_token(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s, ""),
    }
}

/// Cursor over the whitespace-separated arguments of one directive.
struct Args<'a> {
    rest: &'a str,
    line: usize,
}

impl<'a> Args<'a> {
    fn new(rest: &'a str, line: usize) -> Self {
        Self { rest, line }
    }

    fn word_ref(&mut self, directive: &'static str) -> Result<&'a str, StreamError> {
        let (token, rest) = split_token(self.rest.trim_start());
        if token.is_empty() {
            return Err(StreamError::MissingArgument {
                line: self.line,
                directive,
            });
        }
        self.rest = rest;
        Ok(token)
    }

    fn name(&mut self, directive: &'static str) -> Result<String, StreamError> {
        self.word_ref(directive).map(|token| unescape(token, Field::Word))
    }

    fn number<T: std::str::FromStr>(&mut self, directive: &'static str) -> Result<T, StreamError> {
        let token = self.word_ref(directive)?;
        token.parse().map_err(|_| self.invalid(directive, token))
    }

    fn keycode(&mut self, directive: &'static str) -> Result<Keycode, StreamError> {
        self.number(directive)
    }

    fn keysym(&mut self, directive: &'static str) -> Result<Keysym, StreamError> {
        let token = self.word_ref(directive)?;
        let parsed = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
            Some(hex) => parse_hex(hex),
            None => token.parse().ok(),
        };
        parsed.ok_or_else(|| self.invalid(directive, token))
    }

    fn invalid(&self, directive: &'static str, value: &str) -> StreamError {
        StreamError::InvalidArgument {
            line: self.line,
            directive,
            value: value.to_string(),
        }
    }

    fn remainder(&self) -> &'a str {
        self.rest.trim()
    }
}

// ── Stream reader ─────────────────────────────────────────────────────────────

/// Reads [`InputEvent`]s from a text stream, one directive per line.
///
/// Blank lines are skipped.  Malformed directives yield an error item and
/// reading continues with the next line; an I/O error ends the stream.
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
pub struct EventStreamReader<R> {
    reader: R,
    line_no: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> EventStreamReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: Vec::with_capacity(256),
            done: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for EventStreamReader<R> {
    type Item = Result<InputEvent, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_no += 1;
                    let line = String::from_utf8_lossy(&self.buf);
                    match parse_line(&line, self.line_no) {
                        Ok(Some(event)) => return Some(Ok(event)),
                        Ok(None) => continue,
                        Err(e) => return Some(Err(e)),
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(StreamError::Io(e)));
                }
            }
        }
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
