// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File-Backed Catalog Facade
//!
//! Reads `catalog.yml`, `parameters.yml`, and `credentials.yml` from a
//! project root and implements [`canonada_core::catalog::Catalog`] over
//! them. Nothing is cached: every call re-reads its file, which keeps test
//! isolation simple at the cost of re-parsing YAML on every lookup — a
//! deliberate trade per the facade's design.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use canonada_core::catalog::{Catalog, DatasetHandler};
use canonada_core::error::{CoreError, CoreResult};
use canonada_core::value::Value;

use crate::handlers::{DatasetSpec, HandlerRegistry};

const CATALOG_FILE: &str = "catalog.yml";
const PARAMETERS_FILE: &str = "parameters.yml";
const CREDENTIALS_FILE: &str = "credentials.yml";

/// A catalog rooted at a project directory, resolving dataset and parameter
/// names from its three configuration files.
pub struct FileCatalog {
    root: PathBuf,
    handlers: HandlerRegistry,
}

impl FileCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), handlers: HandlerRegistry::new() }
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    fn catalog_entries(&self) -> CoreResult<BTreeMap<String, DatasetSpec>> {
        let raw = read_yaml_or_empty(&self.root.join(CATALOG_FILE))?;
        let Value::Object(map) = raw else {
            return Ok(BTreeMap::new());
        };
        let mut specs = BTreeMap::new();
        for (name, def) in map {
            let tag = def
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| CoreError::config(format!("dataset '{name}' is missing a 'type' tag")))?
                .to_string();
            let keys = def
                .get("keys")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(ToString::to_string)).collect())
                .unwrap_or_default();
            specs.insert(name, DatasetSpec { tag, keys, options: def });
        }
        Ok(specs)
    }
}

impl Catalog for FileCatalog {
    fn list_datasets(&self) -> Vec<String> {
        self.catalog_entries().map(|m| m.into_keys().collect()).unwrap_or_default()
    }

    fn get(&self, name: &str) -> CoreResult<Arc<dyn DatasetHandler>> {
        let specs = self.catalog_entries()?;
        let spec = specs.get(name).ok_or_else(|| CoreError::not_found(format!("dataset '{name}' is not in the catalog")))?;
        self.handlers.build(spec)
    }

    fn parameters(&self) -> BTreeMap<String, Value> {
        read_yaml_or_empty(&self.root.join(PARAMETERS_FILE)).map(|v| flatten(&v)).unwrap_or_default()
    }

    fn credentials(&self) -> BTreeMap<String, Value> {
        read_yaml_or_empty(&self.root.join(CREDENTIALS_FILE)).map(|v| flatten(&v)).unwrap_or_default()
    }
}

fn read_yaml_or_empty(path: &Path) -> CoreResult<Value> {
    if !path.exists() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    let text = std::fs::read_to_string(path)?;
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&text).map_err(|e| CoreError::config(format!("failed to parse '{}': {e}", path.display())))?;
    serde_json::to_value(yaml).map_err(CoreError::from)
}

/// Flattens a nested mapping with `.` as separator. A leaf (anything that
/// isn't itself an object) keeps its original scalar/sequence type. A key
/// containing a literal `.` is preserved verbatim — the separator is only
/// applied when descending into a nested object, never by splitting an
/// existing key.
fn flatten(value: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into("", value, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                flatten_into(&path, nested, out);
            }
        }
        other => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), other.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_nested_maps_with_dot_separator() {
        let value = json!({"model": {"lr": 0.1, "layers": [1, 2]}, "seed": 7});
        let flat = flatten(&value);
        assert_eq!(flat.get("model.lr"), Some(&json!(0.1)));
        assert_eq!(flat.get("model.layers"), Some(&json!([1, 2])));
        assert_eq!(flat.get("seed"), Some(&json!(7)));
    }

    #[test]
    fn literal_dot_in_a_key_is_preserved() {
        let value = json!({"a.b": {"c": 1}});
        let flat = flatten(&value);
        assert_eq!(flat.get("a.b.c"), Some(&json!(1)));
    }

    #[test]
    fn missing_files_flatten_to_an_empty_map() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let catalog = FileCatalog::new(dir.path());
        assert!(catalog.parameters().is_empty());
        assert!(catalog.credentials().is_empty());
        assert!(catalog.list_datasets().is_empty());
    }

    #[test]
    fn reads_catalog_yml_dataset_definitions() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        std::fs::write(
            dir.path().join(CATALOG_FILE),
            "raw_events:\n  type: canonada.json_multi\n  path: data/raw\n  keys: [id]\n",
        )
        .unwrap_or_else(|e| panic!("{e}"));
        let catalog = FileCatalog::new(dir.path());
        assert_eq!(catalog.list_datasets(), vec!["raw_events".to_string()]);
        let handler = catalog.get("raw_events").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(handler.length().unwrap_or_else(|e| panic!("{e}")), 0);
    }
}
