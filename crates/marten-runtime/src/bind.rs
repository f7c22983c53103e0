//! Interface-typed bindings
//!
//! Binding a value to an interface-typed slot is where structural
//! satisfaction is enforced: the check runs once at bind time, and the
//! resulting `InterfaceValue` only dispatches names the interface requires.

use marten_types::{InterfaceSpec, TypeError};

use crate::error::RuntimeResult;
use crate::handle::ValueHandle;
use crate::runtime::Runtime;
use crate::value::Value;

/// A value bound to an interface-typed slot
#[derive(Debug, Clone)]
pub struct InterfaceValue {
    handle: ValueHandle,
    iface: marten_types::FlatInterface,
}

impl InterfaceValue {
    /// Name of the bound interface
    pub fn interface_name(&self) -> &str {
        self.iface.name()
    }

    /// The bound value's handle
    pub fn handle(&self) -> &ValueHandle {
        &self.handle
    }

    /// Invoke a required operation
    ///
    /// Names outside the interface are unreachable through the binding even
    /// when the concrete type declares them.
    pub fn call(&self, rt: &Runtime, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        if !self.iface.requires(name) {
            return Err(TypeError::UnknownMethod {
                ty: self.iface.name().to_string(),
                method: name.to_string(),
            }
            .into());
        }
        rt.call_method(&self.handle, name, args)
    }
}

impl Runtime {
    /// Bind a value to an interface-typed slot
    ///
    /// Flattens the spec and checks structural satisfaction for the handle's
    /// access mode; an unsatisfied requirement fails here, at bind time, not
    /// at the first call.
    pub fn bind(&self, handle: &ValueHandle, spec: &InterfaceSpec) -> RuntimeResult<InterfaceValue> {
        let iface = spec.flatten()?;
        let mode = self.access_mode(handle)?;
        self.method_sets()
            .check_satisfies(self.types(), handle.ty(), mode, &iface)?;
        Ok(InterfaceValue {
            handle: handle.clone(),
            iface,
        })
    }
}
