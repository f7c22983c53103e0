//! Capability-based exchange sort
//!
//! The canonical consumer of structural satisfaction: a sort written purely
//! against the `{ len, out_of_order, swap }` capability, usable by any type
//! whose resolved method set covers it. The algorithm never inspects element
//! types and never calls anything outside the binding.
//!
//! `out_of_order(i, j)` answers "should element i come after element j"; the
//! source material named this predicate "Less" while comparing with `>`, so
//! the operation is renamed here and the literal comparison behavior is
//! pinned by tests instead.

use marten_types::{InterfaceSpec, Signature, TypeRegistry};

use crate::bind::InterfaceValue;
use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::Runtime;
use crate::value::Value;

/// The three-operation collection capability
pub fn sortable_spec(types: &TypeRegistry) -> InterfaceSpec {
    let int = types.int_type();
    let boolean = types.bool_type();
    InterfaceSpec::new("Sortable")
        .method("len", Signature::new(vec![], Some(int)))
        .method("out_of_order", Signature::new(vec![int, int], Some(boolean)))
        .method("swap", Signature::new(vec![int, int], None))
}

/// Adjacent-exchange sort over a capability binding
///
/// `len - 1` passes of adjacent scanning, swapping whenever
/// `out_of_order(i, i + 1)` reports a misordered pair. O(n²) by design;
/// correctness, not efficiency, is the property under test. On return,
/// `out_of_order(i, i + 1)` is false for every adjacent pair.
pub fn exchange_sort(rt: &Runtime, seq: &InterfaceValue) -> RuntimeResult<()> {
    let len = expect_int(seq.call(rt, "len", &[])?)?;
    for pass in 1..len {
        for i in 0..(len - pass) {
            let misordered = seq.call(rt, "out_of_order", &[Value::Int(i), Value::Int(i + 1)])?;
            if expect_bool(misordered)? {
                seq.call(rt, "swap", &[Value::Int(i), Value::Int(i + 1)])?;
            }
        }
    }
    Ok(())
}

fn expect_int(value: Value) -> RuntimeResult<i64> {
    value.as_int().ok_or_else(|| RuntimeError::TypeMismatch {
        expected: "int".to_string(),
        actual: value.kind_name().to_string(),
    })
}

fn expect_bool(value: Value) -> RuntimeResult<bool> {
    value.as_bool().ok_or_else(|| RuntimeError::TypeMismatch {
        expected: "bool".to_string(),
        actual: value.kind_name().to_string(),
    })
}
