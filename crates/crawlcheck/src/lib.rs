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

//! A robots.txt parser and matcher that agrees verdict-for-verdict with
//! [Google's production parser](https://github.com/google/robotstxt),
//! including its error recovery, its `*`/`$` pattern language under the
//! longest-match rule, and its Google-specific lenience (accepted typos,
//! missing colons, `index.html` directory folding).
//!
//! ```
//! let document = crawlcheck::parse(b"user-agent: FooBot\ndisallow: /\n");
//! let matcher = document.matcher();
//! assert!(!matcher.allowed_single("FooBot", "http://foo.bar/x/y").unwrap());
//! assert!(matcher.allowed_single("BarBot", "http://foo.bar/x/y").unwrap());
//! ```

mod document;
mod matcher;
mod parser;
mod pattern;

pub use document::{Document, Group, Rule};
pub use matcher::{is_valid_user_agent, Matcher};
pub use parser::{parse_robotstxt, DirectiveType, ParseHandler};

use document::DocumentBuilder;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("url cannot be broken into a path")]
    MalformedUrl(#[from] url::ParseError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Parses a robots.txt body into a sealed [`Document`]. Never fails:
/// malformed lines are skipped under the REP error-recovery rules.
pub fn parse(body: &[u8]) -> Document {
    let mut builder = DocumentBuilder::default();
    parser::parse_robotstxt(body, &mut builder);
    builder.into_document()
}
