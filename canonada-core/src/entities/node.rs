// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Node Entity
//!
//! A `Node` is the unit of computation in a pipeline: a name, an ordered
//! list of declared input names, an ordered list of declared output names,
//! and a callable of exactly `inputs.len()` arity. Nodes are created once at
//! pipeline definition time and are immutable thereafter — there is no
//! setter on this type.
//!
//! User functions have varying arities that only the declaring code knows,
//! so rather than generate a family of `Fn(A) -> B`, `Fn(A, B) -> C`, ...
//! trait bounds, a `Node` stores a boxed closure over the dynamically-typed
//! [`crate::value::Value`] positional argument slice: a tagged function
//! record carrying its own runtime arity, the natural shape for a
//! statically-typed host of a dynamic-arity dataflow language.

use std::fmt;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::value::Value;

/// The three per-item outcomes a node body may signal instead of returning
/// normally, mirroring the Skip / Stop / Error taxonomy from the error
/// handling design.
#[derive(Debug, Clone)]
pub enum NodeFailure {
    /// Drop this item only; no error is logged, the pipeline continues.
    Skip { message: Option<String> },
    /// Terminate the whole pipeline after this item.
    Stop { message: Option<String> },
    /// A generic failure; tolerated or propagated depending on the owning
    /// pipeline's `error_tolerant` flag.
    Error(CoreError),
}

impl NodeFailure {
    pub fn skip(message: impl Into<String>) -> Self {
        Self::Skip { message: Some(message.into()) }
    }

    pub fn stop(message: impl Into<String>) -> Self {
        Self::Stop { message: Some(message.into()) }
    }
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip { message } => write!(f, "skip item{}", suffix(message)),
            Self::Stop { message } => write!(f, "stop pipeline{}", suffix(message)),
            Self::Error(e) => write!(f, "{e}"),
        }
    }
}

fn suffix(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}

/// A node body: takes the positional, already-deep-copied argument slice and
/// returns the normalized outputs, or a [`NodeFailure`].
pub type NodeFn = Arc<dyn Fn(&[Value]) -> Result<Value, NodeFailure> + Send + Sync>;

/// An immutable, named unit of computation.
#[derive(Clone)]
pub struct Node {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    description: Option<String>,
    func: NodeFn,
}

impl Node {
    /// Builds a node, rejecting an empty name or a duplicate name within
    /// either the input list or the output list. Cross-node invariants
    /// (output uniqueness across the whole pipeline, reachability, cycles)
    /// are the planner's job, not this constructor's.
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
        func: NodeFn,
        description: Option<String>,
    ) -> CoreResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::config("node name must not be empty"));
        }
        if let Some(dup) = first_duplicate(&inputs) {
            return Err(CoreError::config(format!("node '{name}' declares input '{dup}' twice")));
        }
        if let Some(dup) = first_duplicate(&outputs) {
            return Err(CoreError::config(format!("node '{name}' declares output '{dup}' twice")));
        }
        Ok(Self { name, inputs, outputs, description, func })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Invokes the node body with the positional arguments already resolved
    /// from the binding map.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, NodeFailure> {
        (self.func)(args)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

fn first_duplicate(names: &[String]) -> Option<&String> {
    for (i, n) in names.iter().enumerate() {
        if names[..i].contains(n) {
            return Some(n);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop_fn() -> NodeFn {
        Arc::new(|_args| Ok(json!(null)))
    }

    #[test]
    fn rejects_empty_name() {
        let err = Node::new("", vec![], vec![], noop_fn(), None).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn rejects_duplicate_inputs() {
        let err = Node::new("n", vec!["a".into(), "a".into()], vec![], noop_fn(), None).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn rejects_duplicate_outputs() {
        let err = Node::new("n", vec![], vec!["o".into(), "o".into()], noop_fn(), None).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn invokes_the_body_with_given_arguments() {
        let f: NodeFn = Arc::new(|args| Ok(json!(args[0].as_i64().unwrap_or(0) + 1)));
        let node = Node::new("inc", vec!["x".into()], vec!["y".into()], f, None).unwrap();
        let out = node.invoke(&[json!(41)]).unwrap();
        assert_eq!(out, json!(42));
    }
}
