//! Reflection value handles
//!
//! A `ValueHandle` is a non-owning view into boxed storage: a root cell plus
//! a path of field/element steps. Handles created from a plain value are
//! non-addressable copies; only `elem()` on a reference yields an addressable
//! view, and there is no way back from non-addressable to addressable without
//! re-boxing a reference. Crossing an unexported field marks the handle
//! read-only, and the mark propagates to every child.

use std::cell::RefCell;
use std::rc::Rc;

use marten_types::TypeId;

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::Value;

/// Non-owning view of a boxed value
#[derive(Debug, Clone)]
pub struct ValueHandle {
    root: Rc<RefCell<Value>>,
    path: Vec<usize>,
    ty: TypeId,
    addressable: bool,
    read_only: bool,
}

impl ValueHandle {
    pub(crate) fn rooted(
        root: Rc<RefCell<Value>>,
        ty: TypeId,
        addressable: bool,
        read_only: bool,
    ) -> Self {
        ValueHandle {
            root,
            path: Vec::new(),
            ty,
            addressable,
            read_only,
        }
    }

    pub(crate) fn child(&self, step: usize, ty: TypeId, read_only: bool) -> Self {
        let mut path = self.path.clone();
        path.push(step);
        ValueHandle {
            root: Rc::clone(&self.root),
            path,
            ty,
            addressable: self.addressable,
            read_only,
        }
    }

    /// Static type of the viewed value
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// Whether the underlying storage has a knowable address
    pub fn is_addressable(&self) -> bool {
        self.addressable
    }

    /// Whether the view crossed an unexported field
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// True only when the handle is addressable and externally visible
    pub fn can_set(&self) -> bool {
        self.addressable && !self.read_only
    }

    /// Read the viewed value without cloning
    pub(crate) fn read<R>(&self, f: impl FnOnce(&Value) -> R) -> RuntimeResult<R> {
        let root = self.root.borrow();
        let mut current: &Value = &root;
        for &step in &self.path {
            current = child_of(current, step).ok_or(RuntimeError::InvalidHandle)?;
        }
        Ok(f(current))
    }

    /// Snapshot of the viewed value
    pub fn get(&self) -> RuntimeResult<Value> {
        self.read(Value::clone)
    }

    /// Replace the viewed value in place
    ///
    /// Fails `NotAddressable` on a copy, `NotSettable` through an unexported
    /// field, and `TypeMismatch` when the replacement has a different shape.
    pub fn set(&self, value: Value) -> RuntimeResult<()> {
        self.update(|slot| {
            if !slot.same_shape(&value) {
                return Err(RuntimeError::TypeMismatch {
                    expected: slot.kind_name().to_string(),
                    actual: value.kind_name().to_string(),
                });
            }
            *slot = value;
            Ok(())
        })?
    }

    /// Mutate the viewed value through a closure
    ///
    /// The escape hatch for pointer-receiver method implementations; subject
    /// to the same addressability and visibility checks as `set`. The closure
    /// must preserve the value's shape.
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> RuntimeResult<R> {
        if !self.addressable {
            return Err(RuntimeError::NotAddressable);
        }
        if self.read_only {
            return Err(RuntimeError::NotSettable);
        }
        let mut root = self.root.borrow_mut();
        let mut current: &mut Value = &mut root;
        for &step in &self.path {
            current = child_of_mut(current, step).ok_or(RuntimeError::InvalidHandle)?;
        }
        Ok(f(current))
    }
}

fn child_of(value: &Value, step: usize) -> Option<&Value> {
    match value {
        Value::Struct(s) => s.fields.get(step),
        Value::Seq(s) => s.elems.get(step),
        _ => None,
    }
}

fn child_of_mut(value: &mut Value, step: usize) -> Option<&mut Value> {
    match value {
        Value::Struct(s) => s.fields.get_mut(step),
        Value::Seq(s) => s.elems.get_mut(step),
        _ => None,
    }
}
