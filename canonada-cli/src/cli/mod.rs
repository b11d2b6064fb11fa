// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parsing
//!
//! The subcommand surface named in the external-interfaces section: `new`,
//! `catalog {list|params}`, `registry {pipelines|systems}`,
//! `run {pipelines|systems} <names…>`, `view {pipelines|systems} <names…>`,
//! `version`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// canonada's top-level argument structure.
#[derive(Parser, Debug)]
#[command(name = "canonada")]
#[command(about = concat!("canonada pipeline CLI v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Project root directory (defaults to the current directory).
    #[arg(short = 'd', long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Force debug-level logging regardless of `project.yml`.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Internal: run as an isolated-process worker for the named pipeline.
    /// Set by the isolated-process dispatch engine when it re-invokes this
    /// executable; never intended to be passed by a user.
    #[arg(long, hide = true)]
    pub isolated_worker: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold a new project directory.
    New {
        /// Directory to create; must not already exist.
        project: String,
    },
    /// Inspect the catalog facade.
    Catalog {
        #[command(subcommand)]
        what: CatalogTarget,
    },
    /// List the definition environment's registered pipelines or systems.
    Registry {
        #[command(subcommand)]
        what: RegistryTarget,
    },
    /// Execute one or more pipelines or systems.
    Run {
        #[command(subcommand)]
        what: RunTarget,
    },
    /// Plan, without executing, one or more pipelines or systems.
    View {
        #[command(subcommand)]
        what: ViewTarget,
    },
    /// Print the CLI version.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum CatalogTarget {
    /// List every dataset name the catalog can build a handler for.
    List,
    /// Print every flattened parameter.
    Params,
}

#[derive(Subcommand, Debug)]
pub enum RegistryTarget {
    Pipelines,
    Systems,
}

#[derive(Subcommand, Debug)]
pub enum RunTarget {
    Pipelines {
        #[arg(required = true)]
        names: Vec<String>,
    },
    Systems {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ViewTarget {
    Pipelines {
        #[arg(required = true)]
        names: Vec<String>,
    },
    Systems {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// Parses `std::env::args`, exiting the process with clap's own usage
/// message on a parse error.
pub fn parse_cli() -> Cli {
    Cli::parse()
}
