// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dispatch Engines
//!
//! A dispatch engine owns the master-key iterator and decides how many items
//! run concurrently and what isolation they have. All three engines
//! ([`sequential`], [`shared_memory`], [`isolated_process`]) are driven
//! through [`Dispatcher::run`] so `canonada-cli` never has to branch on
//! [`canonada_core::Engine`] itself.

pub mod isolated_process;
pub mod sequential;
pub mod shared_memory;

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use canonada_core::catalog::{Catalog, DatasetHandler};
use canonada_core::entities::{Engine, MaxWorkers, Node, Pipeline};
use canonada_core::error::{CoreError, CoreResult};
use canonada_core::planner::Plan;
use canonada_core::value::Value;

use crate::progress::Progress;
use isolated_process::WorkerSpawner;

/// What a dispatch pass ended up doing, reported back to the caller for the
/// CLI's exit-code mapping and summary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    /// Every item completed (skipped items count toward this too).
    Completed { items: usize, skipped: usize },
    /// A node signalled `StopPipeline`.
    Stopped { at_item: usize, message: Option<String> },
}

/// Picks the master dataset per the dispatch design: the first input of the
/// first node in `exec_order` that is in `input_handlers`, falling back to
/// any entry. `None` means a one-shot, handler-less pipeline.
/// Shared by every engine's per-item loop alongside its own internal
/// "a node asked to stop" flag: set from outside the dispatch pass (see
/// `canonada-cli`'s `signals` module), it lets an OS shutdown signal stop a
/// run between items without killing anything mid-write.
pub type CancelToken = Arc<AtomicBool>;

/// The message every engine reports when a run ends because `CancelToken`
/// was set rather than because a node itself asked to stop.
pub(crate) const CANCELLED_MESSAGE: &str = "interrupted by a shutdown signal; stopping after the current item";

pub fn master_dataset<'a>(nodes: &[Node], plan: &'a Plan) -> Option<&'a str> {
    for &idx in &plan.exec_order {
        for input in nodes[idx].inputs() {
            if let Some((name, _)) = plan.input_handlers.get_key_value(input.as_str()) {
                return Some(name.as_str());
            }
        }
    }
    plan.input_handlers.keys().next().map(String::as_str)
}

/// Resolves a pipeline's configured [`Engine`] and `max_workers` against the
/// catalog, then runs the full master-key pass.
pub struct Dispatcher<'a> {
    pipeline: &'a Pipeline,
    catalog: &'a dyn Catalog,
    isolated_spawner: Option<WorkerSpawner>,
    cancel: Option<CancelToken>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(pipeline: &'a Pipeline, catalog: &'a dyn Catalog) -> Self {
        Self { pipeline, catalog, isolated_spawner: None, cancel: None }
    }

    /// Supplies the child-process factory the isolated-process engine needs
    /// to materialize real workers. `canonada-cli` is the one collaborator
    /// that knows its own executable path and how to ask it to run as a
    /// worker; without this, the isolated-process engine degrades to an
    /// in-process worker loop (still protocol-correct, just not isolated).
    pub fn with_isolated_spawner(mut self, spawner: WorkerSpawner) -> Self {
        self.isolated_spawner = Some(spawner);
        self
    }

    /// Supplies an external [`CancelToken`]: every engine polls it between
    /// items the same way it polls its own "a node asked to stop" flag, so
    /// setting it from a signal handler ends the run as a normal `Stopped`
    /// report instead of an abrupt kill.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Runs one full pass over the master dataset, reporting progress
    /// through `progress` as items complete.
    pub fn run(&self, progress: &dyn Progress) -> CoreResult<RunReport> {
        let plan = self
            .pipeline
            .plan_result()
            .ok_or_else(|| CoreError::internal("dispatch requested before the pipeline was planned"))?;

        let params = self.catalog.parameters();
        let nodes = self.pipeline.nodes();
        let config = self.pipeline.config();

        match config.engine {
            Engine::Sequential => {
                sequential::run(nodes, plan, &params, progress, config.error_tolerant, self.cancel.clone())
            }
            Engine::SharedMemoryParallel => shared_memory::run(nodes, plan, &params, progress, config, self.cancel.clone()),
            Engine::IsolatedProcessParallel => isolated_process::run(
                nodes,
                plan,
                &params,
                progress,
                config,
                self.isolated_spawner.clone(),
                self.cancel.clone(),
            ),
        }
    }
}

/// Worker-level outcome vocabulary shared by the two parallel engines.
#[derive(Debug)]
pub enum WorkerOutcome {
    Ok,
    Skip,
    Stop { message: Option<String> },
    Err(CoreError),
}

pub(crate) fn resolve_worker_count(max_workers: MaxWorkers) -> usize {
    match max_workers {
        MaxWorkers::Fixed(n) => n.get(),
        MaxWorkers::Auto => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
    }
}

pub(crate) type Bindings = BTreeMap<String, Value>;
pub(crate) type Handlers = BTreeMap<String, Arc<dyn DatasetHandler>>;
