//! `canonada catalog {list|params}` — read-only introspection of a
//! project's catalog facade. Neither command instantiates a dataset
//! handler; `list` only needs the names `catalog.yml` declares.

use canonada_core::catalog::Catalog;
use canonada_runtime::catalog::FileCatalog;

use crate::config::ProjectConfig;

pub fn list(config: &ProjectConfig) -> anyhow::Result<()> {
    let catalog = FileCatalog::new(config.root());
    let mut names = catalog.list_datasets();
    names.sort();
    if names.is_empty() {
        println!("(no datasets declared in catalog.yml)");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

pub fn params(config: &ProjectConfig) -> anyhow::Result<()> {
    let catalog = FileCatalog::new(config.root());
    let params = catalog.parameters();
    if params.is_empty() {
        println!("(no parameters declared in parameters.yml)");
    }
    for (key, value) in params {
        println!("{key} = {value}");
    }
    Ok(())
}
