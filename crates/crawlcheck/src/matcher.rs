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

//! Verdict engine: decides whether a set of user-agents may fetch a URL
//! under a parsed [`Document`].
//!
//! Longest match wins. Allow and disallow priorities are accumulated
//! separately for groups that name one of the queried agents and for
//! wildcard (`*`) groups; as soon as any group names an agent, the
//! wildcard contributions are discarded entirely.

use url::Url;

use crate::document::Document;
use crate::parser::DirectiveType;
use crate::pattern;
use crate::Result;

/// Highest match priorities seen so far, split by rule provenance.
#[derive(Debug, Default, Clone, Copy)]
struct MatchPriorities {
    specific: i32,
    global: i32,
}

impl MatchPriorities {
    fn update_specific(&mut self, priority: i32) {
        self.specific = self.specific.max(priority);
    }

    fn update_global(&mut self, priority: i32) {
        self.global = self.global.max(priority);
    }

    fn reset_global(&mut self) {
        self.global = 0;
    }
}

/// Read-only handle over a [`Document`] answering allow/disallow queries.
///
/// The handle is `Copy`; any number of them may query the same document
/// concurrently.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    document: &'a Document,
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// True when the rules applying to `agents` permit fetching `url`.
    /// Fails only when the URL cannot be broken into a path.
    pub fn allowed<S: AsRef<str>>(&self, agents: &[S], url: &str) -> Result<bool> {
        let path = query_path(url)?;
        let (allow, disallow) = self.match_priorities(agents, &path, false);
        Ok(allow_verdict(allow, disallow))
    }

    /// [`Matcher::allowed`] for a single agent.
    pub fn allowed_single(&self, agent: &str, url: &str) -> Result<bool> {
        self.allowed(&[agent], url)
    }

    /// As [`Matcher::allowed`], but wildcard (`*`) groups never
    /// contribute, even when no group names any of `agents`.
    pub fn allowed_ignore_global<S: AsRef<str>>(&self, agents: &[S], url: &str) -> Result<bool> {
        let path = query_path(url)?;
        let (allow, disallow) = self.match_priorities(agents, &path, true);
        Ok(allow_verdict(allow, disallow))
    }

    fn match_priorities<S: AsRef<str>>(
        &self,
        agents: &[S],
        path: &str,
        ignore_global: bool,
    ) -> (MatchPriorities, MatchPriorities) {
        let mut allow = MatchPriorities::default();
        let mut disallow = MatchPriorities::default();
        let mut found_specific = false;

        for group in self.document.groups() {
            let specific = agents
                .iter()
                .any(|agent| group.matches_agent(agent.as_ref()));
            found_specific |= specific;
            if !specific && (ignore_global || !group.is_global()) {
                continue;
            }

            for rule in group.rules() {
                let priorities = match rule.kind() {
                    DirectiveType::Allow => &mut allow,
                    DirectiveType::Disallow => &mut disallow,
                    _ => continue,
                };
                let priority = pattern::match_priority(path, rule.value());
                if specific {
                    priorities.update_specific(priority);
                }
                if !ignore_global && group.is_global() {
                    priorities.update_global(priority);
                }
            }
        }

        // A group naming one of the agents shadows the wildcard groups
        // entirely.
        if found_specific {
            allow.reset_global();
            disallow.reset_global();
        }

        (allow, disallow)
    }
}

fn allow_verdict(allow: MatchPriorities, disallow: MatchPriorities) -> bool {
    if allow.specific > 0 || disallow.specific > 0 {
        return allow.specific >= disallow.specific;
    }

    if allow.global > 0 || disallow.global > 0 {
        return allow.global >= disallow.global;
    }

    true
}

/// Extracts the match target from an absolute URL: the percent-encoded
/// path plus the query when present. The fragment is dropped and an
/// `index.htm(l)` file name is folded into its directory.
fn query_path(url: &str) -> Result<String> {
    let url = Url::parse(url)?;

    let mut path = url.path().to_string();
    if path.is_empty() {
        path.push('/');
    }

    if let Some(slash) = path.rfind('/') {
        let file = &path[slash + 1..];
        if file == "index.htm" || file == "index.html" {
            tracing::info!(%path, "omitting index page");
            path.truncate(slash + 1);
        }
    }

    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    Ok(path)
}

/// True when `agent` is a token robots.txt groups can name: non-empty and
/// built only from ASCII letters, `-` and `_`.
pub fn is_valid_user_agent(agent: &str) -> bool {
    !agent.is_empty()
        && agent
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '-' || c == '_')
}
