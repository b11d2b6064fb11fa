// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Entity
//!
//! A `Pipeline` is a named, ordered node set plus the dispatch configuration
//! that governs how it runs: how many workers, which [`Engine`], and
//! whether per-item errors are tolerated. Planning (see [`crate::planner`])
//! is performed before the first run and is idempotent — calling
//! [`Pipeline::plan`] again discards and rebuilds the derived state.

use std::num::NonZeroUsize;

use super::node::Node;
use crate::catalog::Catalog;
use crate::error::{CoreError, CoreResult};
use crate::planner::{Plan, Planner};

/// How many workers a pipeline's dispatch engine should run concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxWorkers {
    /// A specific worker count; `Fixed(1)` selects the sequential engine.
    Fixed(NonZeroUsize),
    /// Resolves to the available logical processor count at dispatch time.
    Auto,
}

impl MaxWorkers {
    pub fn fixed(n: usize) -> CoreResult<Self> {
        NonZeroUsize::new(n)
            .map(MaxWorkers::Fixed)
            .ok_or_else(|| CoreError::config("max_workers must be a positive integer or \"auto\""))
    }
}

/// Which dispatch engine drives one pass over the master dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// One worker, inline, no isolation beyond the per-item binding map.
    #[default]
    Sequential,
    /// A bounded pool of workers sharing this process's address space.
    SharedMemoryParallel,
    /// A bounded pool of workers, each in its own process.
    IsolatedProcessParallel,
}

/// Dispatch configuration for a [`Pipeline`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub max_workers: MaxWorkers,
    pub engine: Engine,
    pub error_tolerant: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { max_workers: MaxWorkers::Auto, engine: Engine::Sequential, error_tolerant: false }
    }
}

/// A named, ordered set of nodes with its planning state.
pub struct Pipeline {
    name: String,
    description: Option<String>,
    nodes: Vec<Node>,
    config: PipelineConfig,
    plan: Option<Plan>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, nodes: Vec<Node>, config: PipelineConfig) -> CoreResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::config("pipeline name must not be empty"));
        }
        if let MaxWorkers::Fixed(n) = config.max_workers {
            if n.get() == 0 {
                return Err(CoreError::config("max_workers must be >= 1"));
            }
        }
        Ok(Self { name, description: None, nodes, config, plan: None })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// The most recent planning result, if [`Pipeline::plan`] has been
    /// called successfully at least once.
    pub fn plan_result(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Validates the node set against `catalog` and computes the execution
    /// order. Idempotent: each call resets and rebuilds `exec_order`,
    /// `input_handlers`, and `output_handlers` from scratch, so re-planning
    /// after a catalog change is always safe.
    pub fn plan(&mut self, catalog: &dyn Catalog) -> CoreResult<&Plan> {
        self.plan_with_pre_known(catalog, &Default::default())
    }

    /// Same as [`Pipeline::plan`], but seeds the known-bindings set with
    /// `pre_known` — names a caller has already resolved, used for
    /// single-shot runs of a subset of the pipeline.
    pub fn plan_with_pre_known(
        &mut self,
        catalog: &dyn Catalog,
        pre_known: &std::collections::HashSet<String>,
    ) -> CoreResult<&Plan> {
        let plan = Planner::plan(&self.nodes, catalog, pre_known, true)?;
        self.plan = Some(plan);
        match self.plan.as_ref() {
            Some(p) => Ok(p),
            None => Err(CoreError::internal("plan vanished immediately after being set")),
        }
    }
}
