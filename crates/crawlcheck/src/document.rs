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

//! Parsed robots.txt representation: an ordered list of groups, each
//! binding a set of user-agents (or the `*` wildcard) to a list of rules.
//! [`DocumentBuilder`] assembles it from the directive stream.

use crate::parser::{DirectiveType, ParseHandler};
use crate::pattern;

/// One `(directive, value)` pair inside a group. For allow/disallow rules
/// the value is the canonicalized pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    kind: DirectiveType,
    value: String,
}

impl Rule {
    fn new(kind: DirectiveType, value: String) -> Self {
        Self { kind, value }
    }

    pub fn kind(&self) -> DirectiveType {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A cluster of rules shared by one or more user-agents. Tokens and rules
/// keep their parse order but exact repeats are stored once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    user_agents: Vec<String>,
    rules: Vec<Rule>,
    global: bool,
}

impl Group {
    pub fn user_agents(&self) -> &[String] {
        &self.user_agents
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// True when the group was introduced by a `*` user-agent line. A
    /// group can be global and still name concrete agents.
    pub fn is_global(&self) -> bool {
        self.global
    }

    pub(crate) fn matches_agent(&self, agent: &str) -> bool {
        self.user_agents
            .iter()
            .any(|token| token.eq_ignore_ascii_case(agent))
    }

    fn add_user_agent(&mut self, value: &str) {
        // A '*' followed by whitespace and more text still counts as the
        // global wildcard.
        if let Some(rest) = value.strip_prefix('*') {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                if !rest.is_empty() {
                    tracing::info!(agent = value, "assuming wildcard user-agent");
                }
                self.global = true;
                return;
            }
        }

        // `Googlebot/2.1` names the agent `Googlebot`: the token stops at
        // the first character outside [a-zA-Z-_].
        let end = value
            .find(|c: char| !(c.is_ascii_alphabetic() || c == '-' || c == '_'))
            .unwrap_or(value.len());
        let token = &value[..end];
        if !token.is_empty() && !self.user_agents.iter().any(|existing| existing == token) {
            self.user_agents.push(token.to_string());
        }
    }

    fn add_rule(&mut self, kind: DirectiveType, value: String) {
        let rule = Rule::new(kind, value);
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    fn has_owner(&self) -> bool {
        self.global || !self.user_agents.is_empty()
    }
}

/// Sealed result of parsing a robots.txt body. Immutable once built, so
/// any number of threads may run verdict queries against it in parallel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    groups: Vec<Group>,
}

impl Document {
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Cheap read-only handle for running verdict queries.
    pub fn matcher(&self) -> crate::Matcher<'_> {
        crate::Matcher::new(self)
    }
}

/// Accumulates directive events into a [`Document`].
///
/// A user-agent line only opens a new group once the current group has
/// seen a non-user-agent directive; until then consecutive user-agent
/// lines pile their tokens into the same group.
#[derive(Default)]
pub(crate) struct DocumentBuilder {
    document: Document,
    group: Group,
    group_has_content: bool,
}

impl DocumentBuilder {
    pub(crate) fn into_document(self) -> Document {
        self.document
    }

    fn handle_user_agent(&mut self, value: &str) {
        if self.group_has_content {
            let group = std::mem::take(&mut self.group);
            self.document.groups.push(group);
            self.group_has_content = false;
        }
        self.group.add_user_agent(value);
    }

    fn handle_rule(&mut self, kind: DirectiveType, value: &str) {
        self.group_has_content = true;
        if !self.group.has_owner() {
            // No user-agent line has introduced this group: the rule has
            // no owner and is dropped.
            return;
        }

        let value = pattern::canonicalize(value);
        let anchored = (kind == DirectiveType::Allow)
            .then(|| index_page_anchor(&value))
            .flatten();
        self.group.add_rule(kind, value);
        if let Some(anchored) = anchored {
            self.group.add_rule(DirectiveType::Allow, anchored);
        }
    }
}

impl ParseHandler for DocumentBuilder {
    fn start(&mut self) {
        self.document = Document::default();
        self.group = Group::default();
        self.group_has_content = false;
    }

    fn directive(&mut self, _line: u32, kind: DirectiveType, value: &str) {
        match kind {
            DirectiveType::UserAgent => self.handle_user_agent(value),
            DirectiveType::Allow | DirectiveType::Disallow => self.handle_rule(kind, value),
            // Recognized but carrying no verdict semantics. They still
            // close the current group's directive run.
            DirectiveType::Sitemap | DirectiveType::Unknown => {
                self.group_has_content = true;
            }
        }
    }

    fn end(&mut self) {
        let group = std::mem::take(&mut self.group);
        self.document.groups.push(group);
    }
}

/// An allow rule for `/foo/index.html` is meant to cover the bare
/// directory too; returns the extra anchored pattern `/foo/$` for it.
fn index_page_anchor(value: &str) -> Option<String> {
    if !value.ends_with("/index.htm") && !value.ends_with("/index.html") {
        return None;
    }
    let slash = value.rfind('/')?;
    let anchored = format!("{}$", &value[..=slash]);
    tracing::info!(from = value, to = %anchored, "expanding index page rule");
    Some(anchored)
}
