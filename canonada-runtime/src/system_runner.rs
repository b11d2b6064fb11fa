// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # System Runner
//!
//! Runs a [`System`]'s pipelines strictly sequentially, aborting on the
//! first pipeline that stops or fails. A pipeline's dispatch loop is
//! synchronous, blocking work (disk I/O, CPU-bound node bodies); rather
//! than have that block the async executor's cooperative scheduler for the
//! whole pass, it runs inside [`tokio::task::block_in_place`], and every
//! entry/exit is logged the way a supervised task is: no pipeline outcome
//! — success or failure — goes unlogged.

use std::sync::Arc;

use canonada_core::catalog::Catalog;
use canonada_core::entities::System;
use canonada_core::error::CoreResult;
use tracing::{debug, error};

use crate::dispatch::{CancelToken, Dispatcher, RunReport};
use crate::progress::Progress;

/// One pipeline's result within a system run, alongside its name for
/// reporting.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub pipeline: String,
    pub report: RunReport,
}

/// Runs every pipeline in `system` in order, planning each one against
/// `catalog` immediately before it runs (so an earlier pipeline's output
/// datasets are visible to a later pipeline's planning pass). Stops at the
/// first pipeline that returns `RunReport::Stopped` or errors.
pub async fn run_system(
    system: &mut System,
    catalog: Arc<dyn Catalog>,
    progress: Arc<dyn Progress>,
    cancel: Option<CancelToken>,
) -> CoreResult<Vec<PipelineRun>> {
    let mut results = Vec::new();
    for pipeline in system.pipelines_mut() {
        pipeline.plan(catalog.as_ref())?;
        let name = pipeline.name().to_string();

        debug!(pipeline = %name, "pipeline starting");
        let catalog = Arc::clone(&catalog);
        let progress = Arc::clone(&progress);
        let cancel = cancel.clone();
        let report = tokio::task::block_in_place(|| {
            let mut dispatcher = Dispatcher::new(pipeline, catalog.as_ref());
            if let Some(token) = cancel {
                dispatcher = dispatcher.with_cancel_token(token);
            }
            dispatcher.run(progress.as_ref())
        });

        let report = match report {
            Ok(report) => {
                debug!(pipeline = %name, "pipeline completed successfully");
                report
            }
            Err(e) => {
                error!(pipeline = %name, error = %e, "pipeline failed");
                return Err(e);
            }
        };

        let stopped = matches!(report, RunReport::Stopped { .. });
        results.push(PipelineRun { pipeline: name, report });
        if stopped {
            break;
        }
    }
    Ok(results)
}
