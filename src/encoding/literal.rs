//! List-of-strings cells
//!
//! Lists are stored as list literal text (`['a', 'b']`), the form existing
//! tables already contain. Formatting follows the usual repr rules: single
//! quotes unless the string contains a single quote and no double quote.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{BigcellError, Result};

/// Render strings as a list literal
pub fn format_str_list<S: AsRef<str>>(items: &[S]) -> String {
    let rendered: Vec<String> = items.iter().map(|s| quote(s.as_ref())).collect();
    format!("[{}]", rendered.join(", "))
}

fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

/// Parse a list literal of quoted strings
pub fn parse_str_list(text: &str) -> Result<Vec<String>> {
    let mut chars = text.chars().peekable();
    let mut items = Vec::new();

    skip_ws(&mut chars);
    expect(&mut chars, '[')?;

    loop {
        skip_ws(&mut chars);
        match chars.peek() {
            Some(']') => {
                chars.next();
                break;
            }
            Some('\'') | Some('"') => {
                items.push(parse_string(&mut chars)?);
                skip_ws(&mut chars);
                match chars.next() {
                    Some(',') => continue,
                    Some(']') => break,
                    other => return Err(unexpected(other, "',' or ']'")),
                }
            }
            _ => return Err(unexpected(chars.next(), "a quoted string or ']'")),
        }
    }

    skip_ws(&mut chars);
    if let Some(c) = chars.next() {
        return Err(BigcellError::Codec(format!(
            "trailing input after list literal: {:?}",
            c
        )));
    }
    Ok(items)
}

fn skip_ws(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().map_or(false, |c| c.is_whitespace()) {
        chars.next();
    }
}

fn expect(chars: &mut Peekable<Chars<'_>>, wanted: char) -> Result<()> {
    match chars.next() {
        Some(c) if c == wanted => Ok(()),
        other => Err(unexpected(other, &format!("{:?}", wanted))),
    }
}

fn unexpected(found: Option<char>, wanted: &str) -> BigcellError {
    match found {
        Some(c) => BigcellError::Codec(format!("list literal: expected {}, found {:?}", wanted, c)),
        None => BigcellError::Codec(format!("list literal: expected {}, found end of input", wanted)),
    }
}

fn parse_string(chars: &mut Peekable<Chars<'_>>) -> Result<String> {
    let delim = chars
        .next()
        .ok_or_else(|| unexpected(None, "a quote"))?;
    let mut out = String::new();

    loop {
        match chars.next() {
            None => return Err(unexpected(None, "closing quote")),
            Some(c) if c == delim => return Ok(out),
            Some('\\') => match chars.next() {
                None => return Err(unexpected(None, "escape character")),
                Some('\n') => {}
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('0') => out.push('\0'),
                Some('x') => out.push(parse_hex_escape(chars, 2)?),
                Some('u') => out.push(parse_hex_escape(chars, 4)?),
                Some('U') => out.push(parse_hex_escape(chars, 8)?),
                // Unknown escapes are kept verbatim
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
            },
            Some(c) => out.push(c),
        }
    }
}

fn parse_hex_escape(chars: &mut Peekable<Chars<'_>>, digits: usize) -> Result<char> {
    let mut code = 0u32;
    for _ in 0..digits {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| BigcellError::Codec("list literal: malformed hex escape".to_string()))?;
        code = code * 16 + digit;
    }
    char::from_u32(code).ok_or_else(|| {
        BigcellError::Codec(format!("list literal: invalid code point U+{:X}", code))
    })
}
