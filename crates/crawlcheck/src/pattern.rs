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

//! Rule pattern matching.
//!
//! A pattern is matched byte-wise against the URL path: `*` matches any
//! (possibly empty) run of bytes and `$` anchors the match to the end of
//! the path, but only as the final pattern byte. Everywhere else `$` is a
//! literal. Without a trailing `$` a pattern only has to consume a prefix
//! of the path.

use percent_encoding::percent_encode_byte;

/// Priority reported when a pattern does not match at all. Strictly lower
/// than the priority of an empty pattern, which matches with priority 0.
pub(crate) const NO_MATCH: i32 = -1;

/// Returns whether `path` matches `pattern`.
///
/// `ends[..num]` holds, in ascending order, the end index of every prefix
/// of `path` that the pattern bytes processed so far can consume. The
/// pattern matches if the candidate list survives to the end of the
/// pattern; a trailing `$` additionally requires the longest candidate to
/// cover the whole path.
pub(crate) fn matches(path: &str, pattern: &str) -> bool {
    let path = path.as_bytes();
    let pattern = pattern.as_bytes();

    let mut ends = vec![0usize; path.len() + 1];
    let mut num = 1;

    for (i, &ch) in pattern.iter().enumerate() {
        if ch == b'$' && i + 1 == pattern.len() {
            return ends[num - 1] == path.len();
        }

        if ch == b'*' {
            // Everything from the shortest candidate onward is reachable.
            num = path.len() - ends[0] + 1;
            for j in 1..num {
                ends[j] = ends[j - 1] + 1;
            }
        } else {
            let mut kept = 0;
            for j in 0..num {
                if ends[j] < path.len() && path[ends[j]] == ch {
                    ends[kept] = ends[j] + 1;
                    kept += 1;
                }
            }
            if kept == 0 {
                return false;
            }
            num = kept;
        }
    }

    true
}

/// Byte length of the pattern when it matches, [`NO_MATCH`] otherwise.
/// Longer patterns outrank shorter ones when allow and disallow rules
/// collide.
pub(crate) fn match_priority(path: &str, pattern: &str) -> i32 {
    if matches(path, pattern) {
        pattern.len() as i32
    } else {
        NO_MATCH
    }
}

/// Canonicalizes a rule pattern: bytes outside ASCII are percent-encoded
/// with uppercase hex and already-encoded `%xx` sequences have their hex
/// digits uppercased. Everything else, including `*`, `$` and a `%` that
/// does not start a hex escape, passes through untouched.
///
/// `/SanJoséSellers` becomes `/SanJos%C3%A9Sellers` and `%aa` becomes
/// `%AA`. Applying the function to its own output is the identity.
pub(crate) fn canonicalize(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.push('%');
            out.push(bytes[i + 1].to_ascii_uppercase() as char);
            out.push(bytes[i + 2].to_ascii_uppercase() as char);
            i += 3;
        } else if b >= 0x80 {
            out.push_str(percent_encode_byte(b));
            i += 1;
        } else {
            out.push(b as char);
            i += 1;
        }
    }

    out
}
