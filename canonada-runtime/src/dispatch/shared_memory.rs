// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shared-Memory Parallel Engine
//!
//! A bounded pool of up to `max_workers` worker threads sharing this
//! process's address space. A crossbeam channel hands out master keys
//! lazily; workers push typed outcomes back on a second channel. The
//! dispatcher stops handing out new keys on `Stop` or a non-tolerated
//! `Err`, then drains whatever is already in flight before surfacing the
//! first such signal observed — first-failure-wins, per the ordering
//! guarantees in the concurrency model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use canonada_core::entities::{Node, PipelineConfig};
use canonada_core::error::CoreResult;
use canonada_core::planner::Plan;
use crossbeam::channel;
use tracing::warn;

use super::{master_dataset, resolve_worker_count, Bindings, CancelToken, RunReport, WorkerOutcome, CANCELLED_MESSAGE};
use crate::executor::{run_item, Outcome};
use crate::progress::Progress;

pub fn run(
    nodes: &[Node],
    plan: &Plan,
    params: &Bindings,
    progress: &dyn Progress,
    config: PipelineConfig,
    cancel: Option<CancelToken>,
) -> CoreResult<RunReport> {
    // A handler-less (one-shot) pipeline has no keys to fan out over; the
    // sequential engine's one-shot path covers it identically.
    let Some(master) = master_dataset(nodes, plan) else {
        return super::sequential::run(nodes, plan, params, progress, config.error_tolerant, cancel);
    };
    let Some(handler) = plan.input_handlers.get(master) else {
        return super::sequential::run(nodes, plan, params, progress, config.error_tolerant, cancel);
    };

    let total = handler.length().ok();
    progress.start(total);

    let worker_count = resolve_worker_count(config.max_workers).max(1);
    let (key_tx, key_rx) = channel::unbounded::<canonada_core::catalog::MasterKey>();
    let (result_tx, result_rx) = channel::unbounded::<WorkerOutcome>();
    let stop = Arc::new(AtomicBool::new(false));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .build()
        .map_err(|e| canonada_core::CoreError::internal(format!("failed to start worker pool: {e}")))?;

    pool.scope(|scope| -> CoreResult<()> {
        for key in handler.iterate()?.map(|(k, _)| k) {
            if stop.load(Ordering::Acquire) || cancel.as_ref().is_some_and(|c| c.load(Ordering::Acquire)) {
                break;
            }
            let _ = key_tx.send(key);
        }
        drop(key_tx);

        for _ in 0..worker_count {
            let key_rx = key_rx.clone();
            let result_tx = result_tx.clone();
            let stop = Arc::clone(&stop);
            scope.spawn(move |_| {
                while let Ok(key) = key_rx.recv() {
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    let outcome = match run_item(
                        nodes,
                        &plan.exec_order,
                        &plan.input_handlers,
                        &plan.output_handlers,
                        params,
                        &key,
                    ) {
                        Ok(Outcome::Done) => WorkerOutcome::Ok,
                        Ok(Outcome::Skipped) => WorkerOutcome::Skip,
                        Ok(Outcome::Stopped(message)) => {
                            stop.store(true, Ordering::Release);
                            WorkerOutcome::Stop { message }
                        }
                        Err(e) => {
                            if !config.error_tolerant {
                                stop.store(true, Ordering::Release);
                            }
                            WorkerOutcome::Err(e)
                        }
                    };
                    let _ = result_tx.send(outcome);
                }
            });
        }
        drop(result_tx);
        Ok(())
    })?;

    let mut items = 0usize;
    let mut skipped = 0usize;
    let mut first_signal: Option<RunReport> = None;
    let mut first_error: Option<canonada_core::CoreError> = None;

    for outcome in result_rx {
        match outcome {
            WorkerOutcome::Ok => {
                items += 1;
                progress.tick();
            }
            WorkerOutcome::Skip => {
                items += 1;
                skipped += 1;
                progress.tick();
            }
            WorkerOutcome::Stop { message } => {
                if first_signal.is_none() && first_error.is_none() {
                    first_signal = Some(RunReport::Stopped { at_item: items, message });
                }
            }
            WorkerOutcome::Err(e) => {
                if config.error_tolerant {
                    warn!(error = %e, "tolerated item failure");
                    items += 1;
                    progress.tick();
                } else if first_error.is_none() && first_signal.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_error {
        progress.abandon();
        return Err(e);
    }
    if let Some(report) = first_signal {
        progress.abandon();
        return Ok(report);
    }
    if cancel.as_ref().is_some_and(|c| c.load(Ordering::Acquire)) {
        progress.abandon();
        return Ok(RunReport::Stopped { at_item: items, message: Some(CANCELLED_MESSAGE.to_string()) });
    }
    progress.finish();
    Ok(RunReport::Completed { items, skipped })
}
