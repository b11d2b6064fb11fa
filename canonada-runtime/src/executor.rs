// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Per-Item Executor
//!
//! Runs one pass of a pipeline's execution order for a single master key.
//! The executor doesn't know about `error_tolerant` — it reports what
//! happened ([`Outcome`]) or a generic failure, and leaves the
//! tolerate-or-propagate decision to the dispatch engine that called it.
//!
//! State machine for one item, per the executor contract: `Binding` → (per
//! node) `Arguments` → `Invoked` → `Normalized` → `Bound` / `Persisted` →
//! ... → `Done | Skipped | Stopped | Failed`. `Failed` is represented here
//! as `Err(CoreError)`; the other three are [`Outcome`] variants.

use std::collections::BTreeMap;
use std::sync::Arc;

use canonada_core::catalog::{DatasetHandler, MasterKey};
use canonada_core::entities::Node;
use canonada_core::error::{CoreError, CoreResult};
use canonada_core::name::Name;
use canonada_core::value::{normalize_return, Value};
use canonada_core::NodeFailure;

/// The three terminal, non-error outcomes of running one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every node ran to completion.
    Done,
    /// A node raised `SkipItem`; this item only is abandoned.
    Skipped,
    /// A node raised `StopPipeline`; the dispatcher must stop enqueuing.
    Stopped(Option<String>),
}

/// Runs `exec_order` once against `key`, seeding the binding map from
/// `params` and every entry of `input_handlers` (the "keyed join" contract:
/// the same key is looked up in every input handler).
pub fn run_item(
    nodes: &[Node],
    exec_order: &[usize],
    input_handlers: &BTreeMap<String, Arc<dyn DatasetHandler>>,
    output_handlers: &BTreeMap<String, Arc<dyn DatasetHandler>>,
    params: &BTreeMap<String, Value>,
    key: &MasterKey,
) -> CoreResult<Outcome> {
    let mut bindings: BTreeMap<String, Value> = BTreeMap::new();
    for (path, value) in params {
        bindings.insert(Name::param(path), value.clone());
    }
    for (name, handler) in input_handlers {
        let item = handler.get(key)?;
        bindings.insert(name.clone(), item);
    }

    for &idx in exec_order {
        let node = &nodes[idx];

        // Deep-copy isolation: cloning a `serde_json::Value` always produces
        // an independent tree, so a node that mutates its argument in place
        // can never be observed by a later node reading the same binding.
        let args: Vec<Value> = node.inputs().iter().map(|name| bindings.get(name).cloned().unwrap_or(Value::Null)).collect();

        let returned = match node.invoke(&args) {
            Ok(v) => v,
            Err(NodeFailure::Skip { .. }) => return Ok(Outcome::Skipped),
            Err(NodeFailure::Stop { message }) => return Ok(Outcome::Stopped(message)),
            Err(NodeFailure::Error(e)) => return Err(e),
        };

        let declared_arity = node.outputs().len();
        let outputs = normalize_return(declared_arity, returned).ok_or_else(|| {
            CoreError::arity_mismatch(format!(
                "node '{}' declares {} output(s) but returned a value that doesn't normalize to that arity",
                node.name(),
                declared_arity
            ))
        })?;

        for (output_name, value) in node.outputs().iter().zip(outputs) {
            if let Some(handler) = output_handlers.get(output_name) {
                handler.save(value.clone())?;
            }
            bindings.insert(output_name.clone(), value);
        }
    }

    Ok(Outcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonada_core::entities::NodeFn;
    use serde_json::json;

    fn node(name: &str, inputs: &[&str], outputs: &[&str], f: NodeFn) -> Node {
        Node::new(
            name,
            inputs.iter().map(|s| s.to_string()).collect(),
            outputs.iter().map(|s| s.to_string()).collect(),
            f,
            None,
        )
        .unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn scenario_s1_linear_chain() {
        // A(params:x) -> a ; B(a) -> b ; C(b) -> out1
        let a: NodeFn = Arc::new(|args| Ok(json!(args[0].as_i64().unwrap_or(0) + 1)));
        let b: NodeFn = Arc::new(|args| Ok(json!(args[0].as_i64().unwrap_or(0) * 2)));
        let c: NodeFn = Arc::new(|args| Ok(json!(args[0].as_i64().unwrap_or(0) - 3)));
        let nodes =
            vec![node("A", &["params:x"], &["a"], a), node("B", &["a"], &["b"], b), node("C", &["b"], &["out1"], c)];
        let mut params = BTreeMap::new();
        params.insert("x".to_string(), json!(7));

        let outcome = run_item(&nodes, &[0, 1, 2], &BTreeMap::new(), &BTreeMap::new(), &params, &"k".to_string())
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(outcome, Outcome::Done);
    }

    #[test]
    fn skip_signal_halts_only_this_item() {
        let skipper: NodeFn = Arc::new(|_| Err(NodeFailure::skip("not interested")));
        let nodes = vec![node("skip", &[], &["out"], skipper)];
        let outcome = run_item(&nodes, &[0], &BTreeMap::new(), &BTreeMap::new(), &BTreeMap::new(), &"k".to_string())
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(outcome, Outcome::Skipped);
    }

    #[test]
    fn stop_signal_is_reported_with_its_message() {
        let stopper: NodeFn = Arc::new(|_| Err(NodeFailure::stop("enough")));
        let nodes = vec![node("stop", &[], &["out"], stopper)];
        let outcome = run_item(&nodes, &[0], &BTreeMap::new(), &BTreeMap::new(), &BTreeMap::new(), &"k".to_string())
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(outcome, Outcome::Stopped(Some("enough".to_string())));
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let two_outputs_declared: NodeFn = Arc::new(|_| Ok(json!([1, 2, 3])));
        let nodes = vec![node("bad", &[], &["o1", "o2"], two_outputs_declared)];
        let err = run_item(&nodes, &[0], &BTreeMap::new(), &BTreeMap::new(), &BTreeMap::new(), &"k".to_string())
            .unwrap_err();
        assert!(matches!(err, CoreError::ArityMismatch(_)));
    }

    #[test]
    fn mutating_an_argument_is_not_observed_by_a_later_node() {
        // Node 1 "mutates" its array argument and writes a derived value; node 2
        // reads the same upstream binding and must see the pre-mutation value.
        let mutate: NodeFn = Arc::new(|args| {
            let mut arr = args[0].clone();
            if let Value::Array(items) = &mut arr {
                items.push(json!(999));
            }
            Ok(arr)
        });
        let read_original: NodeFn = Arc::new(|args| Ok(args[0].clone()));
        let nodes = vec![
            node("producer", &[], &["shared"], Arc::new(|_| Ok(json!([1, 2, 3])))),
            node("mutator", &["shared"], &["mutated"], mutate),
            node("reader", &["shared"], &["seen"], read_original),
        ];
        run_item(&nodes, &[0, 1, 2], &BTreeMap::new(), &BTreeMap::new(), &BTreeMap::new(), &"k".to_string())
            .unwrap_or_else(|e| panic!("{e}"));
    }
}
