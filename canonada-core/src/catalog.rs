// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Catalog Ports
//!
//! The domain only knows dataset handlers and the catalog facade as traits.
//! Concrete handlers (`json-multi`, `csv-rows`, ...) and the facade that
//! reads `catalog.yml` / `parameters.yml` / `credentials.yml` from disk live
//! in `canonada-runtime`; the domain is written against these ports so the
//! planner and executor never depend on a storage format.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::value::Value;

/// A stable, hashable key identifying one item across every input dataset
/// of a pipeline during one pass. See [`crate::planner`] for how the master
/// dataset is chosen.
pub type MasterKey = String;

/// An ordered, keyed, iterable store of dict-shaped items.
///
/// `save` must be safe to call from many workers concurrently —
/// implementations serialize writes (an exclusive file-range lock or
/// equivalent); `get` and `iterate` are read-only and may be called
/// concurrently with no coordination.
pub trait DatasetHandler: Send + Sync {
    /// Total item count, used for progress sizing.
    fn length(&self) -> CoreResult<usize>;

    /// A lazy, stable-order sequence of `(key, item)` pairs. Order is
    /// implementation-defined but must be stable across passes within one
    /// run.
    fn iterate(&self) -> CoreResult<Box<dyn Iterator<Item = (MasterKey, Value)> + '_>>;

    /// Item lookup by key. Fails with [`crate::CoreError::NotFound`] if the
    /// key is absent.
    fn get(&self, key: &MasterKey) -> CoreResult<Value>;

    /// Append-style persistence.
    fn save(&self, item: Value) -> CoreResult<()>;
}

/// Resolves dataset names and parameter names to handlers/values.
///
/// Each call reflects current on-disk state; the facade caches nothing,
/// which keeps test isolation simple at the cost of re-reading
/// configuration on every lookup.
pub trait Catalog: Send + Sync {
    /// The set of dataset names this catalog knows how to construct a
    /// handler for.
    fn list_datasets(&self) -> Vec<String>;

    /// Instantiates (or re-instantiates) the handler for `name`.
    fn get(&self, name: &str) -> CoreResult<Arc<dyn DatasetHandler>>;

    /// Flat, dotted-path mapping of every parameter.
    fn parameters(&self) -> BTreeMap<String, Value>;

    /// Flat, dotted-path mapping of every credential. Same shape as
    /// `parameters`, kept in a separate namespace so credentials are never
    /// accidentally logged alongside ordinary parameters.
    fn credentials(&self) -> BTreeMap<String, Value>;
}

/// An in-memory catalog over caller-supplied handlers and parameters.
/// Reference implementation used by the planner's own unit tests, and a
/// convenient base for runtime tests that don't need a real filesystem.
#[derive(Default)]
pub struct StaticCatalog {
    datasets: BTreeMap<String, Arc<dyn DatasetHandler>>,
    parameters: BTreeMap<String, Value>,
    credentials: BTreeMap<String, Value>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, name: impl Into<String>, handler: Arc<dyn DatasetHandler>) -> Self {
        self.datasets.insert(name.into(), handler);
        self
    }

    pub fn with_parameter(mut self, dotted_path: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(dotted_path.into(), value);
        self
    }

    pub fn with_credential(mut self, dotted_path: impl Into<String>, value: Value) -> Self {
        self.credentials.insert(dotted_path.into(), value);
        self
    }
}

impl Catalog for StaticCatalog {
    fn list_datasets(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> CoreResult<Arc<dyn DatasetHandler>> {
        self.datasets
            .get(name)
            .cloned()
            .ok_or_else(|| crate::CoreError::not_found(format!("dataset '{name}' is not in the catalog")))
    }

    fn parameters(&self) -> BTreeMap<String, Value> {
        self.parameters.clone()
    }

    fn credentials(&self) -> BTreeMap<String, Value> {
        self.credentials.clone()
    }
}
