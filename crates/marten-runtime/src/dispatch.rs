//! Dynamic method dispatch
//!
//! Looks methods up through the same resolver static access would use, so
//! positional reflection can never bypass shadowing, ambiguity, or the
//! receiver-mode rules. A call site first asks whether the access is
//! addressable, then dispatches against the matching resolved set.

use marten_types::{AccessMode, MethodId, PromotedMethod, ReceiverKind, TypeError};

use crate::error::{RuntimeError, RuntimeResult};
use crate::handle::ValueHandle;
use crate::runtime::Runtime;
use crate::value::Value;

/// A method resolved against a concrete receiver, ready to invoke
#[derive(Debug, Clone)]
pub struct BoundMethod {
    recv: ValueHandle,
    name: String,
    promoted: PromotedMethod,
}

impl BoundMethod {
    /// Resolved method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the resolved declaration
    pub fn method(&self) -> MethodId {
        self.promoted.method
    }

    /// Invoke the method with positional arguments
    ///
    /// Navigates the promotion path (dereferencing pointer embeddings in
    /// passing), enforces the receiver-mode rule, checks arguments against
    /// the declared signature, and runs the native implementation.
    pub fn call(&self, rt: &Runtime, args: &[Value]) -> RuntimeResult<Value> {
        let desc = rt
            .types()
            .method_by_id(self.promoted.method)
            .ok_or_else(|| RuntimeError::MissingImpl {
                method: self.name.clone(),
            })?;

        let mut target = self.recv.clone();
        for &step in &self.promoted.path {
            target = rt.auto_deref(target)?;
            target = rt.field(&target, step)?;
        }
        target = rt.auto_deref(target)?;

        let receiver = match desc.receiver {
            ReceiverKind::Pointer => {
                if !target.is_addressable() {
                    return Err(TypeError::InvalidReceiverAccess {
                        ty: rt.types().name_of(desc.owner),
                        method: self.name.clone(),
                    }
                    .into());
                }
                target
            }
            // Value receivers operate on a boxed copy; mutations never reach
            // the caller's storage.
            ReceiverKind::Value => rt.value_of(target.get()?),
        };

        if args.len() != desc.sig.arity() {
            return Err(RuntimeError::ArityMismatch {
                method: self.name.clone(),
                expected: desc.sig.arity(),
                actual: args.len(),
            });
        }
        for (arg, &param) in args.iter().zip(&desc.sig.params) {
            let actual = rt.dyn_type(arg);
            if actual != param {
                return Err(RuntimeError::TypeMismatch {
                    expected: rt.types().name_of(param),
                    actual: rt.types().name_of(actual),
                });
            }
        }

        let native = rt
            .native(self.promoted.method)
            .ok_or_else(|| RuntimeError::MissingImpl {
                method: self.name.clone(),
            })?;
        let result = native(rt, &receiver, args)?;

        match &desc.sig.ret {
            Some(ret) => {
                let actual = rt.dyn_type(&result);
                if actual != *ret {
                    return Err(RuntimeError::TypeMismatch {
                        expected: rt.types().name_of(*ret),
                        actual: rt.types().name_of(actual),
                    });
                }
            }
            None => {
                if !matches!(result, Value::Nil) {
                    return Err(RuntimeError::TypeMismatch {
                        expected: "nil".to_string(),
                        actual: result.kind_name().to_string(),
                    });
                }
            }
        }
        Ok(result)
    }
}

impl Runtime {
    /// Bind the method at lexicographic position `index` of the handle's
    /// visible set
    pub fn method(&self, handle: &ValueHandle, index: usize) -> RuntimeResult<BoundMethod> {
        let set = self.methods(handle)?;
        let Some((name, _)) = set.entry_at(index) else {
            return Err(RuntimeError::IndexOutOfBounds {
                index,
                len: set.len(),
            });
        };
        let name = name.to_string();
        let promoted = set.get(&name)?.clone();
        Ok(BoundMethod {
            recv: handle.clone(),
            name,
            promoted,
        })
    }

    /// Bind a method by name
    ///
    /// A pointer-receiver method reached through a non-addressable value is
    /// `InvalidReceiverAccess`, not `UnknownMethod`: the name is visible, the
    /// access mode is what fails.
    pub fn method_by_name(&self, handle: &ValueHandle, name: &str) -> RuntimeResult<BoundMethod> {
        let full = self
            .method_sets()
            .resolve(self.types(), handle.ty(), AccessMode::ByPointer)?;
        let promoted = full.get(name)?.clone();
        if self.access_mode(handle)? == AccessMode::ByValue && !promoted.callable_by_value() {
            return Err(TypeError::InvalidReceiverAccess {
                ty: self.types().name_of(handle.ty()),
                method: name.to_string(),
            }
            .into());
        }
        Ok(BoundMethod {
            recv: handle.clone(),
            name: name.to_string(),
            promoted,
        })
    }

    /// Resolve and invoke a method by name in one step
    pub fn call_method(
        &self,
        handle: &ValueHandle,
        name: &str,
        args: &[Value],
    ) -> RuntimeResult<Value> {
        self.method_by_name(handle, name)?.call(self, args)
    }
}
