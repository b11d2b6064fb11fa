// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `canonada.csv_rows`
//!
//! A single delimited file; the header row names the fields. With an empty
//! key-spec the integer row index (0-based, header excluded) is the master
//! key; with a non-empty key-spec the key is the composite of the named
//! fields. `save` appends one row under an exclusive whole-file lock
//! (`fs2`), since every worker shares the same underlying file unlike
//! [`super::json_multi`]'s one-file-per-item layout.

use std::fs::OpenOptions;
use std::io::{BufReader, Write as _};
use std::path::PathBuf;
use std::sync::Mutex;

use canonada_core::catalog::{DatasetHandler, MasterKey};
use canonada_core::error::{CoreError, CoreResult};
use canonada_core::value::Value;
use fs2::FileExt;
use tracing::warn;

use super::{composite_key, DatasetSpec};

pub struct CsvRowsHandler {
    path: PathBuf,
    keys: Vec<String>,
    headers: Option<Vec<String>>,
    write_lock: Mutex<()>,
}

impl CsvRowsHandler {
    pub fn from_spec(spec: &DatasetSpec) -> CoreResult<Self> {
        let path = spec
            .options
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::config("canonada.csv_rows requires a string 'path' option"))?;
        let headers = spec.options.get("headers").and_then(Value::as_array).map(|arr| {
            arr.iter().filter_map(|v| v.as_str().map(ToString::to_string)).collect::<Vec<_>>()
        });
        Ok(Self::new(path, spec.keys.clone(), headers))
    }

    pub fn new(path: impl Into<PathBuf>, keys: Vec<String>, headers: Option<Vec<String>>) -> Self {
        Self { path: path.into(), keys, headers, write_lock: Mutex::new(()) }
    }

    fn ensure_file(&self) -> CoreResult<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).write(true).truncate(false).open(&self.path)?;
        if let Some(headers) = &self.headers {
            let mut writer = csv::Writer::from_writer(&mut file);
            writer.write_record(headers).map_err(|e| CoreError::internal(format!("failed to seed headers: {e}")))?;
            writer.flush()?;
        }
        Ok(())
    }

    fn read_all(&self) -> CoreResult<(Vec<String>, Vec<Vec<String>>)> {
        self.ensure_file()?;
        let file = std::fs::File::open(&self.path)?;
        let mut reader = csv::Reader::from_reader(BufReader::new(file));
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| CoreError::internal(format!("failed to read CSV header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| CoreError::internal(format!("failed to read CSV row: {e}")))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok((headers, rows))
    }

    fn row_to_item(headers: &[String], row: &[String]) -> Value {
        let mut map = serde_json::Map::new();
        for (field, value) in headers.iter().zip(row) {
            map.insert(field.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }

    fn row_key(headers: &[String], row: &[String], keys: &[String], index: usize, warnings: &mut Vec<String>) -> String {
        if keys.is_empty() {
            return index.to_string();
        }
        let item = Self::row_to_item(headers, row);
        composite_key(&item, keys, warnings)
    }
}

impl DatasetHandler for CsvRowsHandler {
    fn length(&self) -> CoreResult<usize> {
        let (_, rows) = self.read_all()?;
        Ok(rows.len())
    }

    fn iterate(&self) -> CoreResult<Box<dyn Iterator<Item = (MasterKey, Value)> + '_>> {
        let (headers, rows) = self.read_all()?;
        let mut warnings = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let key = Self::row_key(&headers, row, &self.keys, i, &mut warnings);
            if !seen.insert(key.clone()) {
                warnings.push(format!("duplicate key '{key}' in '{}'; first occurrence wins", self.path.display()));
                continue;
            }
            out.push((key, Self::row_to_item(&headers, row)));
        }
        for w in warnings {
            warn!("{w}");
        }
        Ok(Box::new(out.into_iter()))
    }

    fn get(&self, key: &MasterKey) -> CoreResult<Value> {
        self.iterate()?
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| CoreError::not_found(format!("no row for key '{key}' in '{}'", self.path.display())))
    }

    fn save(&self, item: Value) -> CoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.ensure_file()?;
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.lock_exclusive()?;
        let result = (|| -> CoreResult<()> {
            let (headers, _) = self.read_all()?;
            let row: Vec<String> = headers
                .iter()
                .map(|field| match item.get(field) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                })
                .collect();
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(&mut file);
            writer.write_record(&row).map_err(|e| CoreError::internal(format!("failed to append CSV row: {e}")))?;
            writer.flush()?;
            Ok(())
        })();
        file.unlock()?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_keys_uses_row_index() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "a,b\n1,2\n3,4\n").unwrap_or_else(|e| panic!("{e}"));
        let handler = CsvRowsHandler::new(&path, vec![], None);
        assert_eq!(handler.length().unwrap_or_else(|e| panic!("{e}")), 2);
        let item = handler.get(&"1".to_string()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(item["a"], json!("3"));
    }

    #[test]
    fn composite_key_from_named_fields() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "id,v\nk1,3\n").unwrap_or_else(|e| panic!("{e}"));
        let handler = CsvRowsHandler::new(&path, vec!["id".to_string()], None);
        let item = handler.get(&"k1".to_string()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(item["v"], json!("3"));
    }

    #[test]
    fn save_appends_a_row_matching_the_header_order() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("rows.csv");
        let handler =
            CsvRowsHandler::new(&path, vec![], Some(vec!["a".to_string(), "b".to_string()]));
        handler.save(json!({"a": "1", "b": "2"})).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(handler.length().unwrap_or_else(|e| panic!("{e}")), 1);
    }
}
