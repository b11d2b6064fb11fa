// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `canonada.json_multi`
//!
//! A directory of JSON files, one item per file. With an empty key-spec the
//! filename stem is the master key; with a non-empty key-spec the key is
//! the composite of the named top-level fields read from each file.
//! `save` writes a fresh file per item, so concurrent writers never contend
//! on the same path — no file lock needed, unlike [`super::csv_rows`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use canonada_core::catalog::{DatasetHandler, MasterKey};
use canonada_core::error::{CoreError, CoreResult};
use canonada_core::value::Value;
use tracing::warn;
use uuid::Uuid;

use super::{composite_key, DatasetSpec};

pub struct JsonMultiHandler {
    dir: PathBuf,
    keys: Vec<String>,
    index: Mutex<Option<Vec<(MasterKey, PathBuf)>>>,
}

impl JsonMultiHandler {
    pub fn from_spec(spec: &DatasetSpec) -> CoreResult<Self> {
        let path = spec
            .options
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::config("canonada.json_multi requires a string 'path' option"))?;
        Ok(Self::new(path, spec.keys.clone()))
    }

    pub fn new(dir: impl Into<PathBuf>, keys: Vec<String>) -> Self {
        Self { dir: dir.into(), keys, index: Mutex::new(None) }
    }

    fn build_index(&self) -> CoreResult<Vec<(MasterKey, PathBuf)>> {
        fs::create_dir_all(&self.dir)?;
        let mut warnings = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut entries = Vec::new();
        for entry in walkdir::WalkDir::new(&self.dir).min_depth(1).max_depth(1).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let key = if self.keys.is_empty() {
                path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string()
            } else {
                let item: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
                composite_key(&item, &self.keys, &mut warnings)
            };
            if !seen.insert(key.clone()) {
                warnings.push(format!("duplicate key '{key}' in '{}'; first occurrence wins", self.dir.display()));
                continue;
            }
            entries.push((key, path.to_path_buf()));
        }
        for w in warnings {
            warn!("{w}");
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    fn index(&self) -> CoreResult<Vec<(MasterKey, PathBuf)>> {
        let mut guard = self.index.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.is_none() {
            *guard = Some(self.build_index()?);
        }
        Ok(guard.clone().unwrap_or_default())
    }

    fn read(path: &Path) -> CoreResult<Value> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

impl DatasetHandler for JsonMultiHandler {
    fn length(&self) -> CoreResult<usize> {
        Ok(self.index()?.len())
    }

    fn iterate(&self) -> CoreResult<Box<dyn Iterator<Item = (MasterKey, Value)> + '_>> {
        let index = self.index()?;
        Ok(Box::new(index.into_iter().filter_map(|(key, path)| Self::read(&path).ok().map(|item| (key, item)))))
    }

    fn get(&self, key: &MasterKey) -> CoreResult<Value> {
        let index = self.index()?;
        let path = index
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| CoreError::not_found(format!("no item for key '{key}' in '{}'", self.dir.display())))?;
        Self::read(&path)
    }

    fn save(&self, item: Value) -> CoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        let filename = item
            .get("filename")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let path = self.dir.join(format!("{filename}.json"));
        fs::write(&path, serde_json::to_vec_pretty(&item)?)?;
        // The on-disk index becomes stale the moment a new file lands; the
        // next fresh handler instance (one per dispatch pass) rebuilds it.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_keys_uses_filename_stem() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        fs::write(dir.path().join("item-1.json"), r#"{"v": 1}"#).unwrap_or_else(|e| panic!("{e}"));
        let handler = JsonMultiHandler::new(dir.path(), vec![]);
        assert_eq!(handler.length().unwrap_or_else(|e| panic!("{e}")), 1);
        let item = handler.get(&"item-1".to_string()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(item, json!({"v": 1}));
    }

    #[test]
    fn composite_key_from_named_fields() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        fs::write(dir.path().join("a.json"), r#"{"id": "k1", "v": 3}"#).unwrap_or_else(|e| panic!("{e}"));
        let handler = JsonMultiHandler::new(dir.path(), vec!["id".to_string()]);
        let item = handler.get(&"k1".to_string()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(item["v"], json!(3));
    }

    #[test]
    fn missing_key_lookup_is_not_found() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let handler = JsonMultiHandler::new(dir.path(), vec![]);
        let err = handler.get(&"nope".to_string()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn save_writes_a_new_file_with_a_generated_name() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let handler = JsonMultiHandler::new(dir.path(), vec![]);
        handler.save(json!({"v": 42})).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(handler.length().unwrap_or_else(|e| panic!("{e}")), 1);
    }
}
