// Crawlcheck is an open source robots.txt parser and matcher.
// Copyright (C) 2024 Crawlcheck ApS
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Byte-level tokenizer for robots.txt bodies.
//!
//! The tokenizer walks the raw bytes, splits them into lines under the
//! REP line-termination rules and extracts one `key: value` directive per
//! line, which it hands to a [`ParseHandler`]. It never fails: malformed
//! lines are skipped with a diagnostic and parsing continues. No encoding
//! is assumed; extracted values are turned into text by reading the bytes
//! as UTF-8, lossily.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::combinator::{eof, opt};
use nom::IResult;

/// Directive keys recognized in a robots.txt body. Only `UserAgent`,
/// `Allow` and `Disallow` influence verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveType {
    UserAgent,
    Allow,
    Disallow,
    Sitemap,
    Unknown,
}

/// Receives the directive stream produced by [`parse_robotstxt`].
///
/// `start` is called once before the first directive and `end` once after
/// the last; `line` is the 1-based number of the physical line the
/// directive was found on.
pub trait ParseHandler {
    fn start(&mut self);
    fn directive(&mut self, line: u32, kind: DirectiveType, value: &str);
    fn end(&mut self);
}

/// Longest directive value kept, in bytes. Two bytes of the reference
/// limit (2083) are reserved for a replacement character at the cut.
pub(crate) const MAX_VALUE_BYTES: usize = 2083 - 2;

/// Misspellings of `disallow` that webmasters produce often enough for
/// the reference parser to honor them.
const DISALLOW_TYPOS: [&[u8]; 5] = [
    b"dissallow",
    b"dissalow",
    b"disalow",
    b"diasllow",
    b"disallaw",
];

fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Strips a leading UTF-8 byte-order mark. A truncated mark (`EF` or
/// `EF BB`) is stripped too, matching the reference parser's byte-at-a-time
/// consumption of the preamble.
fn bom(input: &[u8]) -> IResult<&[u8], Option<&[u8]>> {
    opt(alt((
        tag(&b"\xef\xbb\xbf"[..]),
        tag(&b"\xef\xbb"[..]),
        tag(&b"\xef"[..]),
    )))(input)
}

/// One physical line: everything up to `\r`, `\n` or end-of-input. A
/// `\r\n` pair terminates a single line; any other sequence of `\r` and
/// `\n` terminates one line per byte.
fn line(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, content) = take_while(|b: u8| b != b'\n' && b != b'\r')(input)?;
    let (input, _) = alt((tag(&b"\r\n"[..]), tag(&b"\r"[..]), tag(&b"\n"[..]), eof))(input)?;
    Ok((input, content))
}

/// Walks `body` and emits every directive found to `handler`, bracketed
/// by `start`/`end` calls. Tolerates any byte input.
pub fn parse_robotstxt<H: ParseHandler>(body: &[u8], handler: &mut H) {
    handler.start();

    let mut input = match bom(body) {
        Ok((rest, _)) => rest,
        Err(_) => body,
    };

    let mut line_number = 0u32;
    while !input.is_empty() {
        let Ok((rest, raw)) = line(input) else {
            break;
        };
        input = rest;
        line_number += 1;
        if let Some((kind, value)) = parse_line(raw, line_number) {
            handler.directive(line_number, kind, &value);
        }
    }

    handler.end();
}

/// Extracts the `key: value` directive from one line, or `None` when the
/// line carries none.
fn parse_line(raw: &[u8], line_number: u32) -> Option<(DirectiveType, String)> {
    // A '#' starts a comment that runs to the end of the line.
    let limit = raw.iter().position(|&b| b == b'#').unwrap_or(raw.len());
    let content = &raw[..limit];

    let separator = match content.iter().position(|&b| b == b':') {
        Some(pos) => pos,
        None => match implicit_separator(content) {
            Some(pos) => pos,
            None => {
                // The '#' itself counts as content, so a pure comment line
                // still warns, as in the reference parser.
                let had_content = raw[..raw.len().min(limit + 1)]
                    .iter()
                    .any(|&b| !is_space(b));
                if had_content {
                    tracing::warn!(line = line_number, "no separator found");
                }
                return None;
            }
        },
    };

    let key = trim(&content[..separator]);
    if key.is_empty() {
        tracing::warn!(line = line_number, "no key found");
        return None;
    }

    let value = trim(&content[separator + 1..]);
    if value.is_empty() {
        tracing::warn!(line = line_number, "no value found");
        return None;
    }
    let value = truncate_at_sequence_boundary(value, MAX_VALUE_BYTES);

    let kind = classify_key(key, line_number);
    Some((kind, String::from_utf8_lossy(value).into_owned()))
}

/// Google leniency: `disallow /foo` (whitespace but no colon) still
/// parses. The first whitespace byte after the leading non-whitespace run
/// acts as the separator, provided more non-whitespace follows it.
fn implicit_separator(content: &[u8]) -> Option<usize> {
    let key_start = content.iter().position(|&b| !is_space(b))?;
    let sep = content[key_start..].iter().position(|&b| is_space(b))? + key_start;
    content[sep..].iter().any(|&b| !is_space(b)).then_some(sep)
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| !is_space(b))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| !is_space(b))
        .map_or(start, |pos| pos + 1);
    &bytes[start..end]
}

/// Truncates to at most `max` bytes without cutting a UTF-8 sequence in
/// half.
fn truncate_at_sequence_boundary(bytes: &[u8], max: usize) -> &[u8] {
    if bytes.len() <= max {
        return bytes;
    }
    let mut end = max;
    while end > 0 && bytes[end] & 0xc0 == 0x80 {
        end -= 1;
    }
    &bytes[..end]
}

fn classify_key(key: &[u8], line_number: u32) -> DirectiveType {
    if key.eq_ignore_ascii_case(b"user-agent") {
        DirectiveType::UserAgent
    } else if key.eq_ignore_ascii_case(b"allow") {
        DirectiveType::Allow
    } else if key.eq_ignore_ascii_case(b"disallow") {
        DirectiveType::Disallow
    } else if key.eq_ignore_ascii_case(b"sitemap") {
        DirectiveType::Sitemap
    } else if DISALLOW_TYPOS
        .iter()
        .any(|typo| key.eq_ignore_ascii_case(typo))
    {
        tracing::info!(
            line = line_number,
            key = %String::from_utf8_lossy(key),
            "accepting misspelled disallow"
        );
        DirectiveType::Disallow
    } else {
        tracing::warn!(
            line = line_number,
            key = %String::from_utf8_lossy(key),
            "unknown key"
        );
        DirectiveType::Unknown
    }
}
