//! Reflection runtime
//!
//! Hosts the descriptor store, the method-set resolver, and the native
//! implementation table. Every reflective operation — boxing, navigation,
//! enumeration, dispatch — goes through here, so reflection can never bypass
//! the resolver's visibility and ambiguity rules.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use marten_types::{
    AccessMode, FieldDescriptor, MethodDef, MethodId, MethodSets, Primitive, ResolvedMethodSet,
    TypeDescriptor, TypeId, TypeKind, TypeRegistry,
};

use crate::error::{RuntimeError, RuntimeResult};
use crate::handle::ValueHandle;
use crate::value::{ScalarValue, SeqValue, StructValue, Value};

/// Native implementation of a declared method
///
/// Receives the runtime, the receiver (a boxed copy for value receivers, an
/// addressable view for pointer receivers), and arguments already checked
/// against the declared signature.
pub type NativeMethod = Box<dyn Fn(&Runtime, &ValueHandle, &[Value]) -> RuntimeResult<Value>>;

/// Reflection runtime: descriptor store, resolver, and native method table
///
/// Declare all types and methods before reflecting values; resolved method
/// sets are cached per (type, mode) and never invalidated.
pub struct Runtime {
    types: TypeRegistry,
    method_sets: MethodSets,
    natives: FxHashMap<MethodId, NativeMethod>,
}

impl Runtime {
    /// Create a runtime over a populated (or still-growing) registry
    pub fn new(types: TypeRegistry) -> Self {
        Runtime {
            types,
            method_sets: MethodSets::new(),
            natives: FxHashMap::default(),
        }
    }

    /// The descriptor store
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Mutable descriptor store, for the registration phase
    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// The method-set resolver
    pub fn method_sets(&self) -> &MethodSets {
        &self.method_sets
    }

    /// Declare a method and attach its native implementation in one step
    pub fn register_native(
        &mut self,
        owner: TypeId,
        def: MethodDef,
        implementation: NativeMethod,
    ) -> RuntimeResult<MethodId> {
        let id = self.types.register_method(owner, def)?;
        self.natives.insert(id, implementation);
        Ok(id)
    }

    pub(crate) fn native(&self, id: MethodId) -> Option<&NativeMethod> {
        self.natives.get(&id)
    }

    /// Dynamic type of a value; references report their pointee's type
    pub fn dyn_type(&self, value: &Value) -> TypeId {
        match value {
            Value::Nil => self.types.unit_type(),
            Value::Bool(_) => self.types.bool_type(),
            Value::Int(_) => self.types.int_type(),
            Value::Float(_) => self.types.float_type(),
            Value::Str(_) => self.types.string_type(),
            Value::Scalar(s) => s.ty,
            Value::Seq(s) => s.ty,
            Value::Struct(s) => s.ty,
            Value::Ref(r) => self.dyn_type(&r.borrow()),
        }
    }

    /// Descriptor of a value's dynamic type
    pub fn type_of(&self, value: &Value) -> RuntimeResult<&TypeDescriptor> {
        let id = self.dyn_type(value);
        Ok(self.types.descriptor(id)?)
    }

    /// Box a value into a non-addressable handle (a copy)
    pub fn value_of(&self, value: Value) -> ValueHandle {
        let ty = self.dyn_type(&value);
        ValueHandle::rooted(Rc::new(RefCell::new(value)), ty, false, false)
    }

    /// Dereference a reference value into an addressable handle
    pub fn elem(&self, handle: &ValueHandle) -> RuntimeResult<ValueHandle> {
        let target = handle.read(|value| match value {
            Value::Ref(r) => Ok(Rc::clone(&r.0)),
            Value::Nil => Err(RuntimeError::NilDeref),
            other => Err(RuntimeError::NotAReference {
                actual: other.kind_name().to_string(),
            }),
        })??;
        let ty = self.dyn_type(&target.borrow());
        Ok(ValueHandle::rooted(target, ty, true, handle.is_read_only()))
    }

    /// Follow reference values until a non-reference is in view
    pub(crate) fn auto_deref(&self, handle: ValueHandle) -> RuntimeResult<ValueHandle> {
        let mut current = handle;
        while current.read(Value::is_ref)? {
            current = self.elem(&current)?;
        }
        Ok(current)
    }

    /// Access mode a value would be dispatched under
    ///
    /// References and addressable handles reach the full method set; a plain
    /// copy only reaches value-receiver methods.
    pub fn access_mode(&self, handle: &ValueHandle) -> RuntimeResult<AccessMode> {
        if handle.is_addressable() || handle.read(Value::is_ref)? {
            Ok(AccessMode::ByPointer)
        } else {
            Ok(AccessMode::ByValue)
        }
    }

    /// Selector-style base: a reference is dereferenced before field or
    /// element access, so pointer embeddings read transparently.
    fn deref_base(&self, handle: &ValueHandle) -> RuntimeResult<ValueHandle> {
        if handle.read(Value::is_ref)? {
            self.auto_deref(handle.clone())
        } else {
            Ok(handle.clone())
        }
    }

    fn struct_descriptor(&self, handle: &ValueHandle) -> RuntimeResult<&TypeDescriptor> {
        let desc = self.types.descriptor(handle.ty())?;
        if !desc.is_struct() {
            return Err(RuntimeError::NotAStruct {
                actual: desc.name.clone(),
            });
        }
        Ok(desc)
    }

    /// Number of declared fields (embedded entries included)
    pub fn num_fields(&self, handle: &ValueHandle) -> RuntimeResult<usize> {
        Ok(self.struct_descriptor(handle)?.fields.len())
    }

    /// Descriptor of the field at declaration position `index`
    pub fn field_descriptor(
        &self,
        handle: &ValueHandle,
        index: usize,
    ) -> RuntimeResult<&FieldDescriptor> {
        let desc = self.struct_descriptor(handle)?;
        desc.fields
            .get(index)
            .ok_or(RuntimeError::IndexOutOfBounds {
                index,
                len: desc.fields.len(),
            })
    }

    /// Handle on the field at declaration position `index`
    ///
    /// Inherits addressability from the parent; crossing an unexported field
    /// marks the child read-only.
    pub fn field(&self, handle: &ValueHandle, index: usize) -> RuntimeResult<ValueHandle> {
        let base = self.deref_base(handle)?;
        let field = self.field_descriptor(&base, index)?;
        let read_only = base.is_read_only() || !field.exported;
        Ok(base.child(index, field.ty, read_only))
    }

    /// Handle on a possibly-promoted field, resolved by name
    ///
    /// Applies the resolver's shallowest-wins and equal-depth-ambiguity
    /// rules; pointer embeddings on the path are dereferenced in passing.
    pub fn field_by_name(&self, handle: &ValueHandle, name: &str) -> RuntimeResult<ValueHandle> {
        let promoted = self
            .method_sets
            .resolve_field(&self.types, handle.ty(), name)?;
        let mut current = handle.clone();
        for &step in &promoted.path {
            current = self.auto_deref(current)?;
            current = self.field(&current, step)?;
        }
        Ok(current)
    }

    /// Opaque tag of the field at declaration position `index`
    ///
    /// Available for inspection only; nothing in resolution or satisfaction
    /// reads it.
    pub fn tag(&self, handle: &ValueHandle, index: usize) -> RuntimeResult<Option<&str>> {
        Ok(self.field_descriptor(handle, index)?.tag.as_deref())
    }

    /// Length of a sequence value
    pub fn seq_len(&self, handle: &ValueHandle) -> RuntimeResult<usize> {
        let base = self.deref_base(handle)?;
        base.read(|value| match value {
            Value::Seq(s) => Ok(s.elems.len()),
            other => Err(RuntimeError::NotASequence {
                actual: other.kind_name().to_string(),
            }),
        })?
    }

    /// Handle on the sequence element at `index`
    pub fn index(&self, handle: &ValueHandle, index: usize) -> RuntimeResult<ValueHandle> {
        let base = self.deref_base(handle)?;
        let desc = self.types.descriptor(base.ty())?;
        let TypeKind::Sequence { elem } = &desc.kind else {
            return Err(RuntimeError::NotASequence {
                actual: desc.name.clone(),
            });
        };
        let elem = *elem;
        let len = self.seq_len(&base)?;
        if index >= len {
            return Err(RuntimeError::IndexOutOfBounds { index, len });
        }
        Ok(base.child(index, elem, base.is_read_only()))
    }

    /// Resolved method set for a handle's type under its access mode
    pub fn methods(&self, handle: &ValueHandle) -> RuntimeResult<Arc<ResolvedMethodSet>> {
        let mode = self.access_mode(handle)?;
        Ok(self.method_sets.resolve(&self.types, handle.ty(), mode)?)
    }

    /// Number of methods visible on a handle
    pub fn num_methods(&self, handle: &ValueHandle) -> RuntimeResult<usize> {
        Ok(self.methods(handle)?.len())
    }

    /// Construct a struct value, validating arity and field shapes
    ///
    /// `Nil` is accepted in any position as the zero value for
    /// reference-shaped fields.
    pub fn new_struct(&self, ty: TypeId, fields: Vec<Value>) -> RuntimeResult<Value> {
        let desc = self.types.descriptor(ty)?;
        if !desc.is_struct() {
            return Err(RuntimeError::NotAStruct {
                actual: desc.name.clone(),
            });
        }
        if fields.len() != desc.fields.len() {
            return Err(RuntimeError::FieldCount {
                ty: desc.name.clone(),
                expected: desc.fields.len(),
                actual: fields.len(),
            });
        }
        for (value, field) in fields.iter().zip(&desc.fields) {
            if matches!(value, Value::Nil) {
                continue;
            }
            let actual = self.dyn_type(value);
            if actual != field.ty {
                return Err(RuntimeError::TypeMismatch {
                    expected: self.types.name_of(field.ty),
                    actual: self.types.name_of(actual),
                });
            }
        }
        Ok(Value::Struct(StructValue { ty, fields }))
    }

    /// Construct a sequence value, validating element shapes
    pub fn new_seq(&self, ty: TypeId, elems: Vec<Value>) -> RuntimeResult<Value> {
        let desc = self.types.descriptor(ty)?;
        let TypeKind::Sequence { elem } = &desc.kind else {
            return Err(RuntimeError::NotASequence {
                actual: desc.name.clone(),
            });
        };
        let elem = *elem;
        for value in &elems {
            let actual = self.dyn_type(value);
            if actual != elem {
                return Err(RuntimeError::TypeMismatch {
                    expected: self.types.name_of(elem),
                    actual: self.types.name_of(actual),
                });
            }
        }
        Ok(Value::Seq(SeqValue { ty, elems }))
    }

    /// Construct a value of a named primitive alias
    pub fn new_scalar(&self, ty: TypeId, data: Value) -> RuntimeResult<Value> {
        let desc = self.types.descriptor(ty)?;
        let TypeKind::Primitive(prim) = &desc.kind else {
            return Err(RuntimeError::TypeMismatch {
                expected: "primitive alias".to_string(),
                actual: desc.name.clone(),
            });
        };
        let prim = *prim;
        let matches = matches!(
            (prim, &data),
            (Primitive::Int, Value::Int(_))
                | (Primitive::Float, Value::Float(_))
                | (Primitive::Bool, Value::Bool(_))
                | (Primitive::Str, Value::Str(_))
        );
        if !matches {
            return Err(RuntimeError::TypeMismatch {
                expected: format!("{}", prim),
                actual: data.kind_name().to_string(),
            });
        }
        Ok(Value::Scalar(ScalarValue {
            ty,
            data: Box::new(data),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marten_types::FieldDef;

    use crate::value::Var;

    fn person_runtime() -> (Runtime, TypeId) {
        let mut types = TypeRegistry::new();
        let string = types.string_type();
        let int = types.int_type();
        let person = types
            .register_struct(
                "Person",
                vec![
                    FieldDef::new("Name", string).with_tag("json:\"name\""),
                    FieldDef::new("age", int),
                ],
            )
            .unwrap();
        (Runtime::new(types), person)
    }

    #[test]
    fn test_type_of_and_boxing() {
        let (rt, person) = person_runtime();
        let value = rt
            .new_struct(person, vec![Value::string("a"), Value::Int(28)])
            .unwrap();
        assert_eq!(rt.type_of(&value).unwrap().name, "Person");

        let handle = rt.value_of(value);
        assert_eq!(handle.ty(), person);
        assert!(!handle.is_addressable());
    }

    #[test]
    fn test_field_enumeration_in_declaration_order() {
        let (rt, person) = person_runtime();
        let value = rt
            .new_struct(person, vec![Value::string("a"), Value::Int(28)])
            .unwrap();
        let handle = rt.value_of(value);

        assert_eq!(rt.num_fields(&handle).unwrap(), 2);
        let name = rt.field(&handle, 0).unwrap();
        let age = rt.field(&handle, 1).unwrap();
        assert_eq!(name.get().unwrap(), Value::string("a"));
        assert_eq!(age.get().unwrap(), Value::Int(28));
    }

    #[test]
    fn test_tag_is_readable_and_opaque() {
        let (rt, person) = person_runtime();
        let value = rt
            .new_struct(person, vec![Value::string("a"), Value::Int(28)])
            .unwrap();
        let handle = rt.value_of(value);
        assert_eq!(rt.tag(&handle, 0).unwrap(), Some("json:\"name\""));
        assert_eq!(rt.tag(&handle, 1).unwrap(), None);
    }

    #[test]
    fn test_elem_makes_addressable() {
        let (rt, person) = person_runtime();
        let var = Var::new(
            rt.new_struct(person, vec![Value::string("a"), Value::Int(28)])
                .unwrap(),
        );
        let boxed = rt.value_of(var.value_ref());
        assert!(!boxed.is_addressable());
        let elem = rt.elem(&boxed).unwrap();
        assert!(elem.is_addressable());
        assert_eq!(elem.ty(), person);
    }

    #[test]
    fn test_elem_on_non_reference_fails() {
        let (rt, _) = person_runtime();
        let handle = rt.value_of(Value::Int(1));
        assert!(matches!(
            rt.elem(&handle),
            Err(RuntimeError::NotAReference { .. })
        ));
    }

    #[test]
    fn test_unexported_field_is_read_only() {
        let (rt, person) = person_runtime();
        let var = Var::new(
            rt.new_struct(person, vec![Value::string("a"), Value::Int(28)])
                .unwrap(),
        );
        let elem = rt.elem(&rt.value_of(var.value_ref())).unwrap();
        let name = rt.field(&elem, 0).unwrap();
        let age = rt.field(&elem, 1).unwrap();
        assert!(name.can_set());
        assert!(!age.can_set());
        assert_eq!(age.set(Value::Int(1)), Err(RuntimeError::NotSettable));
    }

    #[test]
    fn test_new_struct_validates() {
        let (rt, person) = person_runtime();
        assert!(matches!(
            rt.new_struct(person, vec![Value::string("a")]),
            Err(RuntimeError::FieldCount { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            rt.new_struct(person, vec![Value::Int(1), Value::Int(2)]),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_sequence_indexing() {
        let mut types = TypeRegistry::new();
        let ints = types.register_sequence("Ints", types.int_type()).unwrap();
        let rt = Runtime::new(types);
        let seq = rt
            .new_seq(ints, vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        let handle = rt.value_of(seq);
        assert_eq!(rt.seq_len(&handle).unwrap(), 3);
        assert_eq!(rt.index(&handle, 1).unwrap().get().unwrap(), Value::Int(2));
        assert!(matches!(
            rt.index(&handle, 3),
            Err(RuntimeError::IndexOutOfBounds { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_new_scalar_validates_shape() {
        let mut types = TypeRegistry::new();
        let day = types
            .register_scalar_alias("Day", Primitive::Int)
            .unwrap();
        let rt = Runtime::new(types);
        let value = rt.new_scalar(day, Value::Int(1)).unwrap();
        assert_eq!(rt.dyn_type(&value), day);
        assert!(matches!(
            rt.new_scalar(day, Value::string("no")),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }
}
