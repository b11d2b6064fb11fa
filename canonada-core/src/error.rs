// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Core Error Taxonomy
//!
//! [`CoreError`] covers the failures the planner and the catalog ports can
//! raise on their own. It deliberately does *not* cover the three per-item
//! outcomes a node can signal (skip / stop / generic error) — those are
//! [`crate::entities::NodeFailure`], because they are resolved against a
//! pipeline's `error_tolerant` policy rather than surfaced immediately.

use thiserror::Error;

/// Errors raised outside of node execution: bad configuration, an
/// unsatisfiable or cyclic node graph, or a missing catalog entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Duplicate output, output/parameter collision, output/input collision,
    /// unsatisfiable inputs, a cycle, or a duplicate name in a registry.
    #[error("configuration error: {0}")]
    Config(String),

    /// `DatasetHandler::get` found no item for the given key.
    #[error("not found: {0}")]
    NotFound(String),

    /// A node's normalized return arity did not match its declared output
    /// arity (and the declared arity was greater than one).
    #[error("arity mismatch: {0}")]
    ArityMismatch(String),

    /// Catch-all for infrastructure failures surfaced through the domain
    /// ports (I/O, serialization, a poisoned lock, ...).
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn arity_mismatch(msg: impl Into<String>) -> Self {
        Self::ArityMismatch(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(format!("I/O error: {e}"))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("serialization error: {e}"))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
