// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Binding Value
//!
//! A node's arity is only known at runtime (it is whatever the user wrote),
//! so the binding map cannot hold a single static Rust type. We reuse
//! `serde_json::Value` as that heterogeneous representation rather than
//! invent a parallel scalar/sequence/mapping enum: it already has the right
//! shape (null, bool, number, string, array, object), it is `Clone` (which
//! gives the executor its per-item isolation for free: cloning a bound
//! value before handing it to a node means later nodes never observe an
//! earlier node's in-place mutations), and it is the same type the
//! isolated process engine needs to serialize across a pipe.

/// The value type flowing through a pipeline's binding map.
pub type Value = serde_json::Value;

/// Applies the "wrap a single return as a tuple" rule from the node-return
/// normalization contract.
///
/// - A declared arity of 1 accepts any single value verbatim, even if that
///   value happens to be a JSON array.
/// - A declared arity greater than 1 requires the return value to already be
///   a JSON array of exactly that length.
///
/// Returns the normalized positional outputs, or `None` if the arity cannot
/// be reconciled (arity > 1 and the return isn't a same-length array).
pub fn normalize_return(declared_arity: usize, returned: Value) -> Option<Vec<Value>> {
    match declared_arity {
        // A node declaring no outputs runs purely for side effects; whatever
        // it returns is discarded.
        0 => Some(Vec::new()),
        1 => Some(vec![returned]),
        n => match returned {
            Value::Array(items) if items.len() == n => Some(items),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_output_accepts_any_value_verbatim() {
        assert_eq!(normalize_return(1, json!([1, 2, 3])), Some(vec![json!([1, 2, 3])]));
        assert_eq!(normalize_return(1, json!(42)), Some(vec![json!(42)]));
    }

    #[test]
    fn multi_output_requires_exact_length_array() {
        assert_eq!(normalize_return(2, json!([1, 2])), Some(vec![json!(1), json!(2)]));
        assert_eq!(normalize_return(2, json!([1, 2, 3])), None);
        assert_eq!(normalize_return(2, json!(1)), None);
    }
}
