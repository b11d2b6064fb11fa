// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Definition Environment
//!
//! An explicit value threaded through the CLI, preferred here over a
//! `static` registry: a project populates one of these (typically from a
//! single `register` function it defines) and hands it to [`crate::run_cli`]
//! instead of canonada-cli reaching for process-wide globals.

use canonada_core::entities::{Node, Pipeline, System};
use canonada_core::registry::Registry;

/// One project's complete set of registered nodes, pipelines, and systems.
#[derive(Default)]
pub struct ProjectRegistries {
    pub nodes: Registry<Node>,
    pub pipelines: Registry<Pipeline>,
    pub systems: Registry<System>,
}

impl ProjectRegistries {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The shape of a project's own registration entry point, e.g.
/// `fn register(registries: &mut ProjectRegistries) { ... }`.
pub type ProjectDefiner = fn(&mut ProjectRegistries);
