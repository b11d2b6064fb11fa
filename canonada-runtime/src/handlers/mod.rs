// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Built-In Dataset Handlers
//!
//! Two handler types ship with canonada, registered under their type tags:
//! [`json_multi`] (`canonada.json_multi`, one JSON file per item) and
//! [`csv_rows`] (`canonada.csv_rows`, one delimited file, one row per item).
//! [`HandlerRegistry`] maps a type tag to a constructor; user-defined tags
//! register into the same table.

pub mod csv_rows;
pub mod json_multi;

use std::collections::HashMap;
use std::sync::Arc;

use canonada_core::catalog::DatasetHandler;
use canonada_core::error::{CoreError, CoreResult};
use canonada_core::value::Value;

pub const JSON_MULTI_TAG: &str = "canonada.json_multi";
pub const CSV_ROWS_TAG: &str = "canonada.csv_rows";

/// Per-dataset configuration as read from `catalog.yml`: a type tag, the
/// composite-key field list (empty means "handler picks its own key"), and
/// whatever other options the handler type needs.
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    pub tag: String,
    pub keys: Vec<String>,
    pub options: Value,
}

type Constructor = Arc<dyn Fn(&DatasetSpec) -> CoreResult<Arc<dyn DatasetHandler>> + Send + Sync>;

/// Maps a handler type tag to a constructor closure. Seeded with the two
/// built-in types; `register` lets a host application add its own.
pub struct HandlerRegistry {
    constructors: HashMap<String, Constructor>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        let mut registry = Self { constructors: HashMap::new() };
        registry.register(JSON_MULTI_TAG, |spec| json_multi::JsonMultiHandler::from_spec(spec).map(|h| Arc::new(h) as _));
        registry.register(CSV_ROWS_TAG, |spec| csv_rows::CsvRowsHandler::from_spec(spec).map(|h| Arc::new(h) as _));
        registry
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, tag: impl Into<String>, ctor: F)
    where
        F: Fn(&DatasetSpec) -> CoreResult<Arc<dyn DatasetHandler>> + Send + Sync + 'static,
    {
        self.constructors.insert(tag.into(), Arc::new(ctor));
    }

    pub fn build(&self, spec: &DatasetSpec) -> CoreResult<Arc<dyn DatasetHandler>> {
        let ctor = self
            .constructors
            .get(&spec.tag)
            .ok_or_else(|| CoreError::config(format!("no dataset handler registered for tag '{}'", spec.tag)))?;
        ctor(spec)
    }
}

/// Builds the composite key for an item from `keys` (dotted top-level field
/// names only, matching the JSON-object shape these handlers deal in).
/// Missing fields become `null` and push a warning string onto `warnings`.
pub(crate) fn composite_key(item: &Value, keys: &[String], warnings: &mut Vec<String>) -> String {
    let parts: Vec<String> = keys
        .iter()
        .map(|field| match item.get(field) {
            Some(v) => value_to_key_part(v),
            None => {
                warnings.push(format!("item is missing key field '{field}'; treated as null"));
                "null".to_string()
            }
        })
        .collect();
    parts.join("\u{1f}")
}

fn value_to_key_part(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
