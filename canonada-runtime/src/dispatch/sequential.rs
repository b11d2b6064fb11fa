// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sequential Engine
//!
//! One worker, inline, no isolation beyond the per-item binding map. This is
//! also the "one-shot pipeline" path: when a pipeline has no input handlers
//! at all, it runs the executor exactly once against an empty key.

use std::sync::atomic::Ordering;

use canonada_core::entities::Node;
use canonada_core::error::{CoreError, CoreResult};
use canonada_core::planner::Plan;
use tracing::warn;

use super::{master_dataset, Bindings, CancelToken, RunReport, CANCELLED_MESSAGE};
use crate::executor::{run_item, Outcome};
use crate::progress::Progress;

pub fn run(
    nodes: &[Node],
    plan: &Plan,
    params: &Bindings,
    progress: &dyn Progress,
    error_tolerant: bool,
    cancel: Option<CancelToken>,
) -> CoreResult<RunReport> {
    let Some(master) = master_dataset(nodes, plan) else {
        return run_one_shot(nodes, plan, params, progress);
    };
    let handler = plan
        .input_handlers
        .get(master)
        .ok_or_else(|| CoreError::internal(format!("master dataset '{master}' has no handler")))?;

    let total = handler.length().ok();
    progress.start(total);

    let mut items = 0usize;
    let mut skipped = 0usize;
    for (key, _item) in handler.iterate()? {
        if cancel.as_ref().is_some_and(|c| c.load(Ordering::Acquire)) {
            progress.abandon();
            return Ok(RunReport::Stopped { at_item: items, message: Some(CANCELLED_MESSAGE.to_string()) });
        }
        match run_item(nodes, &plan.exec_order, &plan.input_handlers, &plan.output_handlers, params, &key) {
            Ok(Outcome::Done) => {
                items += 1;
                progress.tick();
            }
            Ok(Outcome::Skipped) => {
                items += 1;
                skipped += 1;
                progress.tick();
            }
            Ok(Outcome::Stopped(message)) => {
                progress.finish();
                return Ok(RunReport::Stopped { at_item: items, message });
            }
            Err(e) => {
                if error_tolerant {
                    warn!(error = %e, key = %key, "tolerated item failure");
                    items += 1;
                    progress.tick();
                } else {
                    progress.abandon();
                    return Err(e);
                }
            }
        }
    }
    progress.finish();
    Ok(RunReport::Completed { items, skipped })
}

fn run_one_shot(
    nodes: &[Node],
    plan: &Plan,
    params: &Bindings,
    progress: &dyn Progress,
) -> CoreResult<RunReport> {
    progress.start(Some(1));
    let empty_key = String::new();
    let outcome = run_item(nodes, &plan.exec_order, &plan.input_handlers, &plan.output_handlers, params, &empty_key)?;
    progress.finish();
    match outcome {
        Outcome::Done => Ok(RunReport::Completed { items: 1, skipped: 0 }),
        Outcome::Skipped => Ok(RunReport::Completed { items: 1, skipped: 1 }),
        Outcome::Stopped(message) => Ok(RunReport::Stopped { at_item: 0, message }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonada_core::catalog::{DatasetHandler, MasterKey};
    use canonada_core::value::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    struct FixedKeys(Vec<&'static str>);

    impl DatasetHandler for FixedKeys {
        fn length(&self) -> CoreResult<usize> {
            Ok(self.0.len())
        }
        fn iterate(&self) -> CoreResult<Box<dyn Iterator<Item = (MasterKey, Value)> + '_>> {
            Ok(Box::new(self.0.iter().map(|k| (k.to_string(), Value::Null))))
        }
        fn get(&self, key: &MasterKey) -> CoreResult<Value> {
            Err(CoreError::not_found(key.clone()))
        }
        fn save(&self, _item: Value) -> CoreResult<()> {
            Ok(())
        }
    }

    #[test]
    fn a_cancelled_token_stops_the_run_before_the_next_item() {
        let handler: Arc<dyn DatasetHandler> = Arc::new(FixedKeys(vec!["a", "b", "c"]));
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
        let cancel: CancelToken = Arc::new(AtomicBool::new(true));

        let report = run(&[], &plan, &Bindings::new(), &crate::progress::NullProgress, false, Some(cancel))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(report, RunReport::Stopped { at_item: 0, message: Some(CANCELLED_MESSAGE.to_string()) });
    }
}

