// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Planner
//!
//! The planner is pure static analysis: given a node set and a catalog, it
//! validates the declared dataflow and computes a deterministic topological
//! execution order. It never touches an item — that is
//! [`crate::entities::Pipeline`] paired with `canonada-runtime`'s executor.
//!
//! ## Algorithm
//!
//! 1. Reject duplicate output names across the node set.
//! 2. `catalog_outputs = outputs ∩ catalog_datasets`.
//! 3. Reject any output that is also a `params:*` name.
//! 4. `inputs_from_catalog = inputs ∩ catalog_datasets`; reject if it
//!    overlaps `outputs` (a node may never read a dataset another node
//!    writes).
//! 5. Seed `known = pre_known ∪ inputs_from_catalog ∪ {params:* for every
//!    known parameter}`.
//! 6. Instantiate input/output handlers (unless the caller opted out).
//! 7. Repeatedly scan the remaining nodes in declaration order, placing any
//!    node whose inputs are already a subset of `known`; after each full
//!    scan, add the newly produced outputs to `known`. Ties are broken by
//!    declaration order. A scan that places nothing means the remaining
//!    nodes are unsatisfiable (including the case where they form a cycle).
//! 8. Warn (non-fatally) about outputs that are neither persisted nor
//!    consumed by any node. The conventional "unused" output name `_` is
//!    exempt from this warning.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::catalog::{Catalog, DatasetHandler};
use crate::entities::Node;
use crate::error::{CoreError, CoreResult};
use crate::name::Name;

/// The conventional "intentionally unused" output name; exempt from the
/// never-consumed warning, the same way Rust itself treats `_` bindings.
pub const UNUSED_OUTPUT: &str = "_";

/// The result of a successful planning pass.
#[derive(Clone, Default)]
pub struct Plan {
    /// Node indices (into the slice passed to [`Planner::plan`]) in
    /// execution order.
    pub exec_order: Vec<usize>,
    /// Dataset names consumed as inputs, sorted for determinism.
    pub catalog_inputs: Vec<String>,
    /// Dataset names produced as outputs, sorted for determinism.
    pub catalog_outputs: Vec<String>,
    /// Instantiated input handlers, keyed by dataset name. Empty if the
    /// caller opted out of handler initialization.
    pub input_handlers: BTreeMap<String, Arc<dyn DatasetHandler>>,
    /// Instantiated output handlers, keyed by dataset name. Empty if the
    /// caller opted out of handler initialization.
    pub output_handlers: BTreeMap<String, Arc<dyn DatasetHandler>>,
    /// Non-fatal advisories (currently: outputs nobody reads).
    pub warnings: Vec<String>,
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("exec_order", &self.exec_order)
            .field("catalog_inputs", &self.catalog_inputs)
            .field("catalog_outputs", &self.catalog_outputs)
            .field(
                "input_handlers",
                &self.input_handlers.keys().collect::<Vec<_>>(),
            )
            .field(
                "output_handlers",
                &self.output_handlers.keys().collect::<Vec<_>>(),
            )
            .field("warnings", &self.warnings)
            .finish()
    }
}

pub struct Planner;

impl Planner {
    /// Plans `nodes` against `catalog`. `pre_known` seeds the known-bindings
    /// set for single-shot runs where some names are already resolved by
    /// the caller; pass an empty set for a full run. `init_handlers` controls
    /// whether dataset handlers are actually constructed (callers that only
    /// want validation, e.g. `canonada view`, can skip the I/O).
    pub fn plan(
        nodes: &[Node],
        catalog: &dyn Catalog,
        pre_known: &HashSet<String>,
        init_handlers: bool,
    ) -> CoreResult<Plan> {
        let catalog_datasets: HashSet<String> = catalog.list_datasets().into_iter().collect();

        // Step 1: duplicate output names across the whole node set.
        let mut all_outputs: HashSet<&str> = HashSet::new();
        for node in nodes {
            for output in node.outputs() {
                if !all_outputs.insert(output.as_str()) {
                    return Err(CoreError::config(format!(
                        "output '{output}' is produced by more than one node"
                    )));
                }
            }
        }
        let outputs: HashSet<String> = all_outputs.iter().map(|s| s.to_string()).collect();

        // Step 2: catalog-backed outputs.
        let catalog_outputs: HashSet<String> = outputs.intersection(&catalog_datasets).cloned().collect();

        // Step 3: no output may also be a parameter name.
        if let Some(bad) = outputs.iter().find(|o| Name::is_param(o)) {
            return Err(CoreError::config(format!("output '{bad}' collides with the params namespace")));
        }

        // Step 4: catalog-backed inputs must not overlap outputs.
        let mut inputs_from_catalog: HashSet<String> = HashSet::new();
        for node in nodes {
            for input in node.inputs() {
                if catalog_datasets.contains(input) {
                    inputs_from_catalog.insert(input.clone());
                }
            }
        }
        if let Some(bad) = inputs_from_catalog.intersection(&outputs).next() {
            return Err(CoreError::config(format!(
                "dataset '{bad}' is read by one node and written by another in the same pipeline"
            )));
        }

        // Step 5: seed known bindings.
        let mut known: HashSet<String> = pre_known.clone();
        known.extend(inputs_from_catalog.iter().cloned());
        for param_path in catalog.parameters().keys() {
            known.insert(Name::param(param_path));
        }

        // Step 6: instantiate handlers.
        let mut input_handlers = BTreeMap::new();
        let mut output_handlers = BTreeMap::new();
        if init_handlers {
            for name in &inputs_from_catalog {
                input_handlers.insert(name.clone(), catalog.get(name)?);
            }
            for name in &catalog_outputs {
                output_handlers.insert(name.clone(), catalog.get(name)?);
            }
        }

        // Step 7: topological placement, ties broken by declaration order.
        let mut remaining: Vec<usize> = (0..nodes.len()).collect();
        let mut exec_order = Vec::with_capacity(nodes.len());
        for _ in 0..=nodes.len() {
            if remaining.is_empty() {
                break;
            }
            let mut placed_this_scan = Vec::new();
            let mut still_remaining = Vec::new();
            for &idx in &remaining {
                let node = &nodes[idx];
                if node.inputs().iter().all(|i| known.contains(i)) {
                    placed_this_scan.push(idx);
                } else {
                    still_remaining.push(idx);
                }
            }
            if placed_this_scan.is_empty() {
                let names: Vec<&str> = still_remaining.iter().map(|&i| nodes[i].name()).collect();
                return Err(CoreError::config(format!(
                    "unsatisfiable inputs (or a cycle) among nodes: {}",
                    names.join(", ")
                )));
            }
            for &idx in &placed_this_scan {
                for output in nodes[idx].outputs() {
                    known.insert(output.clone());
                }
            }
            exec_order.extend(placed_this_scan);
            remaining = still_remaining;
        }
        if !remaining.is_empty() {
            let names: Vec<&str> = remaining.iter().map(|&i| nodes[i].name()).collect();
            return Err(CoreError::config(format!("cycle detected among nodes: {}", names.join(", "))));
        }

        // Step 8: advisory warnings for outputs nobody reads.
        let consumed: HashSet<&str> =
            nodes.iter().flat_map(|n| n.inputs().iter().map(String::as_str)).collect();
        let mut warnings = Vec::new();
        for output in &outputs {
            if output == UNUSED_OUTPUT {
                continue;
            }
            if !catalog_outputs.contains(output) && !consumed.contains(output.as_str()) {
                warnings.push(format!("output '{output}' is never persisted nor consumed"));
            }
        }

        let mut catalog_inputs: Vec<String> = inputs_from_catalog.into_iter().collect();
        catalog_inputs.sort();
        let mut catalog_outputs: Vec<String> = catalog_outputs.into_iter().collect();
        catalog_outputs.sort();

        Ok(Plan { exec_order, catalog_inputs, catalog_outputs, input_handlers, output_handlers, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use serde_json::json;
    use std::sync::Arc;

    fn node(name: &str, inputs: &[&str], outputs: &[&str]) -> Node {
        Node::new(
            name,
            inputs.iter().map(|s| s.to_string()).collect(),
            outputs.iter().map(|s| s.to_string()).collect(),
            Arc::new(|_| Ok(json!(null))),
            None,
        )
        .unwrap_or_else(|e| panic!("bad test node: {e}"))
    }

    #[test]
    fn linear_chain_plans_in_declaration_order() {
        let nodes = vec![node("A", &["params:x"], &["a"]), node("B", &["a"], &["b"]), node("C", &["b"], &["out1"])];
        let catalog = StaticCatalog::new().with_parameter("x", json!(7));
        let plan = Planner::plan(&nodes, &catalog, &Default::default(), true).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(plan.exec_order, vec![0, 1, 2]);
    }

    #[test]
    fn fan_out_fan_in_respects_dependencies() {
        // F -> p,q ; G(p) -> r ; H(q) -> s ; J(r,s) -> final
        let nodes = vec![
            node("F", &["params:k"], &["p", "q"]),
            node("G", &["p"], &["r"]),
            node("H", &["q"], &["s"]),
            node("J", &["r", "s"], &["final"]),
        ];
        let catalog = StaticCatalog::new().with_parameter("k", json!(2));
        let plan = Planner::plan(&nodes, &catalog, &Default::default(), true).unwrap_or_else(|e| panic!("{e}"));
        let pos = |name: &str| plan.exec_order.iter().position(|&i| nodes[i].name() == name).unwrap_or(usize::MAX);
        assert!(pos("F") < pos("G"));
        assert!(pos("F") < pos("H"));
        assert!(pos("G") < pos("J"));
        assert!(pos("H") < pos("J"));
    }

    #[test]
    fn cycle_is_rejected() {
        let nodes = vec![node("X", &["y"], &["z"]), node("Y", &["z"], &["y"])];
        let catalog = StaticCatalog::new();
        let err = Planner::plan(&nodes, &catalog, &Default::default(), true).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn duplicate_outputs_are_rejected() {
        let nodes = vec![node("A", &[], &["x"]), node("B", &[], &["x"])];
        let catalog = StaticCatalog::new();
        let err = Planner::plan(&nodes, &catalog, &Default::default(), true).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn output_colliding_with_a_parameter_name_is_rejected() {
        let nodes = vec![node("A", &[], &["params:x"])];
        let catalog = StaticCatalog::new().with_parameter("x", json!(1));
        let err = Planner::plan(&nodes, &catalog, &Default::default(), true).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn reading_a_dataset_another_node_writes_is_rejected() {
        let nodes = vec![node("writer", &[], &["d"]), node("reader", &["d"], &["out"])];
        let catalog = StaticCatalog::new().with_dataset("d", fake_handler());
        let err = Planner::plan(&nodes, &catalog, &Default::default(), true).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn unused_output_marker_is_exempt_from_the_unused_warning() {
        let nodes = vec![node("A", &[], &["_"])];
        let catalog = StaticCatalog::new();
        let plan = Planner::plan(&nodes, &catalog, &Default::default(), true).unwrap_or_else(|e| panic!("{e}"));
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn genuinely_unused_output_is_warned_about() {
        let nodes = vec![node("A", &[], &["unused_name"])];
        let catalog = StaticCatalog::new();
        let plan = Planner::plan(&nodes, &catalog, &Default::default(), true).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(plan.warnings.len(), 1);
    }

    #[test]
    fn planning_is_deterministic_across_repeated_invocations() {
        let nodes = vec![node("A", &["params:x"], &["a"]), node("B", &["a"], &["b"])];
        let catalog = StaticCatalog::new().with_parameter("x", json!(1));
        let p1 = Planner::plan(&nodes, &catalog, &Default::default(), true).unwrap_or_else(|e| panic!("{e}"));
        let p2 = Planner::plan(&nodes, &catalog, &Default::default(), true).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(p1.exec_order, p2.exec_order);
    }

    fn fake_handler() -> Arc<dyn DatasetHandler> {
        use crate::catalog::MasterKey;
        struct Empty;
        impl DatasetHandler for Empty {
            fn length(&self) -> CoreResult<usize> {
                Ok(0)
            }
            fn iterate(&self) -> CoreResult<Box<dyn Iterator<Item = (MasterKey, crate::value::Value)> + '_>> {
                Ok(Box::new(std::iter::empty()))
            }
            fn get(&self, key: &MasterKey) -> CoreResult<crate::value::Value> {
                Err(CoreError::not_found(key.clone()))
            }
            fn save(&self, _item: crate::value::Value) -> CoreResult<()> {
                Ok(())
            }
        }
        Arc::new(Empty)
    }
}
