//! Parsing of function-call templates such as `jsonb_set({0}, {1}, {2})`.
//!
//! `{n}` with `n` a decimal index is a slot. Text inside single-quoted string
//! literals (including `E'…'` strings with backslash escapes) and double-quoted
//! identifiers is copied verbatim, so `'{name}'` in a template stays a literal.
//! Any other brace text is left as it is.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Slot(usize),
}

pub(crate) fn parse(template: &str) -> Vec<Segment<'_>> {
    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(end) = quoted_end(bytes, i) {
            i = end;
            continue;
        }
        match bytes[i] {
            b'{' => match slot_at(template, i) {
                Some((index, end)) => {
                    if text_start < i {
                        segments.push(Segment::Text(&template[text_start..i]));
                    }
                    segments.push(Segment::Slot(index));
                    i = end;
                    text_start = end;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    if text_start < bytes.len() {
        segments.push(Segment::Text(&template[text_start..]));
    }
    segments
}

/// Slot index starting at the `{` at `open`, and the position just past its `}`.
fn slot_at(template: &str, open: usize) -> Option<(usize, usize)> {
    let rest = &template[open + 1..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || rest.as_bytes().get(digits) != Some(&b'}') {
        return None;
    }
    let index = rest[..digits].parse().ok()?;
    Some((index, open + 1 + digits + 1))
}

/// Whether the template text has a `?` outside quoted text.
pub(crate) fn has_bare_question_mark(template: &str) -> bool {
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = quoted_end(bytes, i) {
            i = end;
            continue;
        }
        if bytes[i] == b'?' {
            return true;
        }
        i += 1;
    }
    false
}

/// End of the quoted run opening at `i`, if a quote opens there.
fn quoted_end(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes[i] {
        b'\'' => Some(skip_quoted(bytes, i, escape_string_at(bytes, i))),
        b'"' => Some(skip_quoted(bytes, i, false)),
        _ => None,
    }
}

/// `E'…'`: the quote follows a standalone `E` or `e`.
fn escape_string_at(bytes: &[u8], quote: usize) -> bool {
    let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    quote >= 1
        && matches!(bytes[quote - 1], b'e' | b'E')
        && (quote < 2 || !is_ident(bytes[quote - 2]))
}

/// Position just past the quote closing the one at `open`. Doubled quotes
/// escape, and so does a backslash inside an `E'…'` string.
fn skip_quoted(bytes: &[u8], open: usize, backslash_escapes: bool) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        if backslash_escapes && bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}
