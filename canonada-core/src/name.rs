// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Name Space
//!
//! Every input or output name a [`crate::entities::Node`] declares is a
//! plain `String`, but it is drawn from one of three disjoint namespaces.
//! [`Name::parse`] is the single place that recognizes which one, so the
//! planner, the executor, and the catalog facade never re-derive the rule.

const PARAM_PREFIX: &str = "params:";

/// Which of the three namespaces a declared name belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// `params:<dotted.path>` — a global, read-only parameter value.
    Param(String),
    /// A name that is registered in the catalog at plan time.
    Dataset(String),
    /// An intermediate binding produced by one node and consumed by another.
    Free(String),
}

impl Name {
    /// Parses a raw declared name. Catalog membership can't be decided by
    /// shape alone, so this only distinguishes `params:*` from everything
    /// else; callers cross-reference the catalog's dataset list themselves
    /// to tell `Dataset` from `Free` (see [`crate::planner::Planner::plan`]).
    pub fn parse(raw: &str) -> ParsedName {
        match raw.strip_prefix(PARAM_PREFIX) {
            Some(path) => ParsedName::Param(path.to_string()),
            None => ParsedName::Other(raw.to_string()),
        }
    }

    pub fn is_param(raw: &str) -> bool {
        raw.starts_with(PARAM_PREFIX)
    }

    pub fn param_key(raw: &str) -> Option<&str> {
        raw.strip_prefix(PARAM_PREFIX)
    }

    pub fn param(path: impl Into<String>) -> String {
        format!("{PARAM_PREFIX}{}", path.into())
    }
}

/// Result of a raw-name parse: either a parameter path, or some other name
/// whose dataset/free classification depends on the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedName {
    Param(String),
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_param_prefix() {
        assert!(Name::is_param("params:model.lr"));
        assert!(!Name::is_param("raw_events"));
        assert_eq!(Name::param_key("params:model.lr"), Some("model.lr"));
        assert_eq!(Name::param_key("raw_events"), None);
    }

    #[test]
    fn parse_splits_param_from_other() {
        assert_eq!(Name::parse("params:a.b"), ParsedName::Param("a.b".to_string()));
        assert_eq!(Name::parse("raw_events"), ParsedName::Other("raw_events".to_string()));
    }

    #[test]
    fn param_builds_the_prefixed_form() {
        assert_eq!(Name::param("a.b"), "params:a.b");
    }
}
