// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Isolated-Process Parallel Engine
//!
//! Same control structure as [`super::shared_memory`]: a bounded pool of up
//! to `max_workers` workers, fed lazily and collected through channels, the
//! dispatcher stopping on `Stop` or a non-tolerated `Err`. Here a worker is
//! a long-lived child process instead of a thread. A node function can't be
//! shipped across a process boundary, so instead of sending closures, the
//! dispatcher spawns `worker_count` children up front and hands each one a
//! dedicated OS thread that owns its stdin/stdout: the thread pulls master
//! keys off a shared channel, writes one [`WorkerRequest`] per key, blocks
//! on the matching [`WorkerResponse`], and loops — so `worker_count`
//! requests are genuinely in flight at once, one per child, the same way
//! [`super::shared_memory`] keeps `worker_count` threads busy. The child
//! re-resolves the pipeline by name from its own copy of the registry (see
//! [`WorkerProgram`]) and re-opens its dataset handlers locally. On a fatal,
//! non-tolerated error the dispatcher kills every still-running child
//! before propagating.

use std::io::{BufRead, BufReader, Write as _};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use canonada_core::catalog::MasterKey;
use canonada_core::entities::{Node, PipelineConfig};
use canonada_core::error::{CoreError, CoreResult};
use canonada_core::planner::Plan;
use crossbeam::channel;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{master_dataset, resolve_worker_count, Bindings, CancelToken, RunReport, WorkerOutcome, CANCELLED_MESSAGE};
use crate::executor::{run_item, Outcome};
use crate::progress::Progress;

/// One unit of work sent down a child's stdin, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub master_key: MasterKey,
    pub params: Bindings,
}

/// A child's reply to one [`WorkerRequest`], one JSON object per line on
/// stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkerResponse {
    Ok,
    Skip,
    Stop { message: Option<String> },
    Err { message: String },
}

/// Implemented by the child-process entry point (in `canonada-cli`): knows
/// how to run one item of a named, already-registered pipeline given a
/// request. `canonada-runtime` owns the wire protocol; the host binary owns
/// pipeline resolution.
pub trait WorkerProgram {
    fn handle(&self, request: WorkerRequest) -> WorkerResponse;
}

/// The child-process main loop: reads one [`WorkerRequest`] per line from
/// `stdin`, dispatches to `program`, writes one [`WorkerResponse`] per line
/// to `stdout`. Returns once stdin closes.
pub fn run_worker_loop(program: &dyn WorkerProgram, stdin: impl std::io::BufRead, mut stdout: impl std::io::Write) -> CoreResult<()> {
    for line in stdin.lines() {
        let line = line.map_err(CoreError::from)?;
        if line.trim().is_empty() {
            continue;
        }
        let request: WorkerRequest = serde_json::from_str(&line).map_err(CoreError::from)?;
        let response = program.handle(request);
        let encoded = serde_json::to_string(&response).map_err(CoreError::from)?;
        writeln!(stdout, "{encoded}").map_err(CoreError::from)?;
        stdout.flush().map_err(CoreError::from)?;
    }
    Ok(())
}

/// In-process equivalent of a spawned worker, used by the parent dispatcher
/// here when it is itself the designated child entry point (the common
/// case: `canonada-cli` invokes itself with a hidden `--isolated-worker`
/// flag, which just calls [`run_worker_loop`] with this).
pub struct InProcessWorkerProgram<'a> {
    pub nodes: &'a [Node],
    pub plan: &'a Plan,
}

impl WorkerProgram for InProcessWorkerProgram<'_> {
    fn handle(&self, request: WorkerRequest) -> WorkerResponse {
        match run_item(
            self.nodes,
            &self.plan.exec_order,
            &self.plan.input_handlers,
            &self.plan.output_handlers,
            &request.params,
            &request.master_key,
        ) {
            Ok(Outcome::Done) => WorkerResponse::Ok,
            Ok(Outcome::Skipped) => WorkerResponse::Skip,
            Ok(Outcome::Stopped(message)) => WorkerResponse::Stop { message },
            Err(e) => WorkerResponse::Err { message: e.to_string() },
        }
    }
}

/// Builds the `Command` used to spawn one isolated worker. `canonada-cli`
/// supplies this (it knows its own executable path and how to name the
/// pipeline being run); `canonada-runtime` only knows the resulting process
/// speaks the [`WorkerRequest`]/[`WorkerResponse`] protocol on stdio.
pub type WorkerSpawner = Arc<dyn Fn() -> Command + Send + Sync>;

pub fn run(
    nodes: &[Node],
    plan: &Plan,
    params: &Bindings,
    progress: &dyn Progress,
    config: PipelineConfig,
    spawner: Option<WorkerSpawner>,
    cancel: Option<CancelToken>,
) -> CoreResult<RunReport> {
    let Some(master) = master_dataset(nodes, plan) else {
        return super::sequential::run(nodes, plan, params, progress, config.error_tolerant, cancel);
    };
    let Some(handler) = plan.input_handlers.get(master) else {
        return super::sequential::run(nodes, plan, params, progress, config.error_tolerant, cancel);
    };

    if spawner.is_none() {
        warn!("isolated-process engine selected without a worker spawner; falling back to in-process workers");
    }
    run_with_spawner(nodes, plan, params, progress, config, spawner, handler.as_ref(), cancel)
}

fn run_with_spawner(
    nodes: &[Node],
    plan: &Plan,
    params: &Bindings,
    progress: &dyn Progress,
    config: PipelineConfig,
    spawner: Option<WorkerSpawner>,
    handler: &dyn canonada_core::catalog::DatasetHandler,
    cancel: Option<CancelToken>,
) -> CoreResult<RunReport> {
    let total = handler.length().ok();
    progress.start(total);

    let Some(spawn) = spawner else {
        return run_in_process(nodes, plan, params, progress, config, handler, cancel);
    };

    let worker_count = resolve_worker_count(config.max_workers).max(1);
    let children = spawn_children(&spawn, worker_count)?;

    let (key_tx, key_rx) = channel::unbounded::<MasterKey>();
    let (result_tx, result_rx) = channel::unbounded::<WorkerOutcome>();
    let stop = Arc::new(AtomicBool::new(false));

    // Handed out lazily on an unbounded channel, same as shared_memory's
    // key feed; `handler.iterate()` borrows `handler` so it has to stay on
    // this stack frame rather than a spawned thread, but that's fine —
    // sending a key is cheap and doesn't block on any worker.
    for (key, _item) in handler.iterate()? {
        if stop.load(Ordering::Acquire) || cancel.as_ref().is_some_and(|c| c.load(Ordering::Acquire)) {
            break;
        }
        let _ = key_tx.send(key);
    }
    drop(key_tx);

    let worker_threads: Vec<_> = children
        .into_iter()
        .map(|mut child| {
            let key_rx = key_rx.clone();
            let result_tx = result_tx.clone();
            let stop = Arc::clone(&stop);
            let params = params.clone();
            std::thread::spawn(move || {
                let stdin = child.stdin.take();
                let stdout = child.stdout.take().map(BufReader::new);
                run_child_worker(&mut child, stdin, stdout, &key_rx, &result_tx, &stop, &params);
                let _ = child.kill();
                let _ = child.wait();
            })
        })
        .collect();
    drop(result_tx);
    drop(key_rx);

    let mut items = 0usize;
    let mut skipped = 0usize;
    let mut first_signal: Option<RunReport> = None;
    let mut first_error: Option<CoreError> = None;

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

    for handle in worker_threads {
        let _ = handle.join();
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

/// The in-process fallback used when the host gave no [`WorkerSpawner`]
/// (see the warning in [`run`]): runs every item on this thread through
/// [`InProcessWorkerProgram`] instead of a pool of children.
fn run_in_process(
    nodes: &[Node],
    plan: &Plan,
    params: &Bindings,
    progress: &dyn Progress,
    config: PipelineConfig,
    handler: &dyn canonada_core::catalog::DatasetHandler,
    cancel: Option<CancelToken>,
) -> CoreResult<RunReport> {
    let in_process = InProcessWorkerProgram { nodes, plan };
    let mut items = 0usize;
    let mut skipped = 0usize;

    for (key, _item) in handler.iterate()? {
        if cancel.as_ref().is_some_and(|c| c.load(Ordering::Acquire)) {
            progress.abandon();
            return Ok(RunReport::Stopped { at_item: items, message: Some(CANCELLED_MESSAGE.to_string()) });
        }
        let request = WorkerRequest { master_key: key.clone(), params: params.clone() };
        match in_process.handle(request) {
            WorkerResponse::Ok => {
                items += 1;
                progress.tick();
            }
            WorkerResponse::Skip => {
                items += 1;
                skipped += 1;
                progress.tick();
            }
            WorkerResponse::Stop { message } => {
                progress.abandon();
                return Ok(RunReport::Stopped { at_item: items, message });
            }
            WorkerResponse::Err { message } => {
                if config.error_tolerant {
                    warn!(error = %message, key = %key, "tolerated item failure");
                    items += 1;
                    progress.tick();
                } else {
                    progress.abandon();
                    return Err(CoreError::internal(message));
                }
            }
        }
    }

    progress.finish();
    Ok(RunReport::Completed { items, skipped })
}

fn spawn_children(spawn: &WorkerSpawner, worker_count: usize) -> CoreResult<Vec<Child>> {
    (0..worker_count)
        .map(|_| {
            spawn()
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .spawn()
                .map_err(|e| CoreError::internal(format!("failed to spawn isolated worker: {e}")))
        })
        .collect()
}

/// Runs on a dedicated OS thread, one per live child: pulls master keys off
/// `key_rx` until it's empty or `stop` is set, round-tripping each one
/// through this child's own stdin/stdout before asking for the next. With
/// `worker_count` of these threads running at once, `worker_count` requests
/// are genuinely in flight concurrently, one per child process.
fn run_child_worker(
    child: &mut Child,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    key_rx: &channel::Receiver<MasterKey>,
    result_tx: &channel::Sender<WorkerOutcome>,
    stop: &AtomicBool,
    params: &Bindings,
) {
    let (Some(mut stdin), Some(mut stdout)) = (stdin, stdout) else {
        let _ = result_tx.send(WorkerOutcome::Err(CoreError::internal("isolated worker has no stdin/stdout pipe")));
        return;
    };
    while let Ok(key) = key_rx.recv() {
        if stop.load(Ordering::Acquire) {
            break;
        }
        let request = WorkerRequest { master_key: key, params: params.clone() };
        let outcome = match round_trip(&mut stdin, &mut stdout, &request) {
            Ok(WorkerOutcome::Stop { message }) => {
                stop.store(true, Ordering::Release);
                WorkerOutcome::Stop { message }
            }
            Ok(WorkerOutcome::Err(e)) => {
                stop.store(true, Ordering::Release);
                WorkerOutcome::Err(e)
            }
            Ok(other) => other,
            Err(e) => {
                stop.store(true, Ordering::Release);
                WorkerOutcome::Err(e)
            }
        };
        let halt = matches!(outcome, WorkerOutcome::Stop { .. } | WorkerOutcome::Err(_));
        let _ = result_tx.send(outcome);
        if halt {
            break;
        }
    }
    let _ = child.wait();
}

/// Writes one [`WorkerRequest`] to `stdin` and blocks for the matching
/// [`WorkerResponse`] on `stdout`. A closed pipe or malformed line is
/// reported as a [`WorkerOutcome::Err`]; the caller treats it the same as
/// any other non-tolerated item failure.
fn round_trip(stdin: &mut ChildStdin, stdout: &mut BufReader<ChildStdout>, request: &WorkerRequest) -> CoreResult<WorkerOutcome> {
    let encoded = serde_json::to_string(request).map_err(CoreError::from)?;
    writeln!(stdin, "{encoded}").map_err(CoreError::from)?;
    stdin.flush().map_err(CoreError::from)?;

    let mut line = String::new();
    let read = stdout.read_line(&mut line).map_err(CoreError::from)?;
    if read == 0 {
        return Err(CoreError::internal("isolated worker closed its stdout unexpectedly"));
    }
    let response: WorkerResponse = serde_json::from_str(line.trim())
        .map_err(|e| CoreError::internal(format!("malformed isolated worker response: {e}")))?;
    Ok(match response {
        WorkerResponse::Ok => WorkerOutcome::Ok,
        WorkerResponse::Skip => WorkerOutcome::Skip,
        WorkerResponse::Stop { message } => WorkerOutcome::Stop { message },
        WorkerResponse::Err { message } => WorkerOutcome::Err(CoreError::internal(message)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonada_core::entities::MaxWorkers;
    use std::io::Cursor;

    struct EchoProgram;
    impl WorkerProgram for EchoProgram {
        fn handle(&self, request: WorkerRequest) -> WorkerResponse {
            if request.master_key == "stop-me" {
                WorkerResponse::Stop { message: Some("done".to_string()) }
            } else {
                WorkerResponse::Ok
            }
        }
    }

    #[test]
    fn worker_loop_echoes_one_response_per_request() {
        let input = "{\"master_key\":\"k1\",\"params\":{}}\n{\"master_key\":\"stop-me\",\"params\":{}}\n";
        let mut output = Vec::new();
        run_worker_loop(&EchoProgram, Cursor::new(input), &mut output).unwrap_or_else(|e| panic!("{e}"));
        let text = String::from_utf8(output).unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("Stop"));
    }

    struct FixedKeys(Vec<&'static str>);

    impl canonada_core::catalog::DatasetHandler for FixedKeys {
        fn length(&self) -> CoreResult<usize> {
            Ok(self.0.len())
        }
        fn iterate(&self) -> CoreResult<Box<dyn Iterator<Item = (MasterKey, canonada_core::value::Value)> + '_>> {
            Ok(Box::new(self.0.iter().map(|k| (k.to_string(), canonada_core::value::Value::Null))))
        }
        fn get(&self, key: &MasterKey) -> CoreResult<canonada_core::value::Value> {
            Err(CoreError::not_found(key.clone()))
        }
        fn save(&self, _item: canonada_core::value::Value) -> CoreResult<()> {
            Ok(())
        }
    }

    /// A real `sh` child standing in for a worker binary: replies `"Ok"` to
    /// every line it reads, one per line, until its stdin closes. With
    /// `max_workers` below the key count this only completes if several
    /// children are actually live and answering at once, not one spawned
    /// and drained per key.
    fn echo_ok_spawner() -> WorkerSpawner {
        Arc::new(|| {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg("while IFS= read -r _line; do printf '\"Ok\"\\n'; done");
            cmd
        })
    }

    #[test]
    fn pooled_children_drain_more_keys_than_worker_count() {
        let handler: Arc<dyn canonada_core::catalog::DatasetHandler> =
            Arc::new(FixedKeys(vec!["a", "b", "c", "d", "e", "f"]));
        let mut input_handlers = std::collections::BTreeMap::new();
        input_handlers.insert("items".to_string(), handler);
        let plan = Plan {
            exec_order: Vec::new(),
            catalog_inputs: Vec::new(),
            catalog_outputs: Vec::new(),
            input_handlers,
            output_handlers: std::collections::BTreeMap::new(),
            warnings: Vec::new(),
        };
        let config = PipelineConfig {
            max_workers: MaxWorkers::fixed(2).unwrap_or_else(|e| panic!("{e}")),
            engine: canonada_core::entities::Engine::IsolatedProcessParallel,
            error_tolerant: false,
        };

        let report =
            run(&[], &plan, &Bindings::new(), &crate::progress::NullProgress, config, Some(echo_ok_spawner()), None)
                .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(report, RunReport::Completed { items: 6, skipped: 0 });
    }

    #[test]
    fn a_worker_stop_signal_halts_the_pool() {
        let handler: Arc<dyn canonada_core::catalog::DatasetHandler> = Arc::new(FixedKeys(vec!["a", "b", "c"]));
        let mut input_handlers = std::collections::BTreeMap::new();
        input_handlers.insert("items".to_string(), handler);
        let plan = Plan {
            exec_order: Vec::new(),
            catalog_inputs: Vec::new(),
            catalog_outputs: Vec::new(),
            input_handlers,
            output_handlers: std::collections::BTreeMap::new(),
            warnings: Vec::new(),
        };
        let config = PipelineConfig {
            max_workers: MaxWorkers::fixed(1).unwrap_or_else(|e| panic!("{e}")),
            engine: canonada_core::entities::Engine::IsolatedProcessParallel,
            error_tolerant: false,
        };
        let spawner: WorkerSpawner = Arc::new(|| {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg("read -r _line; printf '{\"Stop\":{\"message\":\"enough\"}}\\n'");
            cmd
        });

        let report = run(&[], &plan, &Bindings::new(), &crate::progress::NullProgress, config, Some(spawner), None)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(report, RunReport::Stopped { at_item: 0, message: Some("enough".to_string()) });
    }
}
