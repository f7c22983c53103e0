//! Type Descriptor Store
//!
//! Single source of truth for named types, their fields, and their declared
//! methods. Descriptors are immutable once registered; everything downstream
//! (method-set resolution, interface satisfaction, reflection) only reads
//! from here.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::TypeError;
use crate::ty::{
    FieldDescriptor, MethodDescriptor, MethodId, Primitive, ReceiverKind, Signature,
    TypeDescriptor, TypeId, TypeKind,
};

/// Field declaration passed to struct registration
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name; `None` for embedded (anonymous) fields
    pub name: Option<String>,
    /// Declared field type
    pub ty: TypeId,
    /// Opaque tag string
    pub tag: Option<String>,
    /// True for embedded fields
    pub embedded: bool,
    /// True when embedding through a pointer
    pub via_pointer: bool,
}

impl FieldDef {
    /// A named field
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        FieldDef {
            name: Some(name.into()),
            ty,
            tag: None,
            embedded: false,
            via_pointer: false,
        }
    }

    /// An embedded (anonymous) field of the given type
    pub fn embed(ty: TypeId) -> Self {
        FieldDef {
            name: None,
            ty,
            tag: None,
            embedded: true,
            via_pointer: false,
        }
    }

    /// An embedded field held through a pointer
    pub fn embed_ptr(ty: TypeId) -> Self {
        FieldDef {
            name: None,
            ty,
            tag: None,
            embedded: true,
            via_pointer: true,
        }
    }

    /// Attach an opaque tag string
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Method declaration passed to method registration
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Receiver kind
    pub receiver: ReceiverKind,
    /// Parameter and return shape
    pub sig: Signature,
}

impl MethodDef {
    /// Create a new method declaration
    pub fn new(name: impl Into<String>, receiver: ReceiverKind, sig: Signature) -> Self {
        MethodDef {
            name: name.into(),
            receiver,
            sig,
        }
    }
}

/// Central catalogue of named types
///
/// Builtin primitives are interned at construction; user types are appended
/// through the `register_*` methods. A type can only embed types registered
/// before it, so the embedding graph is always acyclic.
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_name: FxHashMap<String, TypeId>,
    /// MethodId -> (owning type, index into its method list)
    method_index: Vec<(TypeId, usize)>,
    int: TypeId,
    float: TypeId,
    boolean: TypeId,
    string: TypeId,
    unit: TypeId,
}

impl TypeRegistry {
    /// Create a registry with the builtin primitives interned
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            types: Vec::new(),
            by_name: FxHashMap::default(),
            method_index: Vec::new(),
            int: TypeId(0),
            float: TypeId(0),
            boolean: TypeId(0),
            string: TypeId(0),
            unit: TypeId(0),
        };

        registry.int = registry.intern_builtin("int", Primitive::Int);
        registry.float = registry.intern_builtin("float", Primitive::Float);
        registry.boolean = registry.intern_builtin("bool", Primitive::Bool);
        registry.string = registry.intern_builtin("string", Primitive::Str);
        registry.unit = registry.intern_builtin("unit", Primitive::Unit);
        registry
    }

    fn intern_builtin(&mut self, name: &str, prim: Primitive) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeDescriptor {
            id,
            name: name.to_string(),
            kind: TypeKind::Primitive(prim),
            fields: Vec::new(),
            methods: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// The builtin `int` type
    pub fn int_type(&self) -> TypeId {
        self.int
    }

    /// The builtin `float` type
    pub fn float_type(&self) -> TypeId {
        self.float
    }

    /// The builtin `bool` type
    pub fn bool_type(&self) -> TypeId {
        self.boolean
    }

    /// The builtin `string` type
    pub fn string_type(&self) -> TypeId {
        self.string
    }

    /// The builtin `unit` type
    pub fn unit_type(&self) -> TypeId {
        self.unit
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if no types are registered (never the case after `new`)
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Get a descriptor by id
    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.types.get(id.0 as usize)
    }

    /// Look up a type id by name
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Get a descriptor by id, failing with `UnknownType`
    pub fn descriptor(&self, id: TypeId) -> Result<&TypeDescriptor, TypeError> {
        self.get(id).ok_or_else(|| TypeError::UnknownType {
            name: format!("{}", id),
        })
    }

    /// Name of a type id, for diagnostics; formats the raw id when unknown
    pub fn name_of(&self, id: TypeId) -> String {
        match self.get(id) {
            Some(desc) => desc.name.clone(),
            None => format!("{}", id),
        }
    }

    /// Get a method descriptor by stable id
    pub fn method_by_id(&self, id: MethodId) -> Option<&MethodDescriptor> {
        let (owner, index) = *self.method_index.get(id.0 as usize)?;
        self.get(owner)?.methods.get(index)
    }

    fn claim_name(&mut self, name: &str) -> Result<TypeId, TypeError> {
        if self.by_name.contains_key(name) {
            return Err(TypeError::DuplicateType {
                name: name.to_string(),
            });
        }
        let id = TypeId(self.types.len() as u32);
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register a struct type
    ///
    /// Fields appear in declaration order; embedded entries take the embedded
    /// type's name. Rejects duplicate field names and duplicate embeddings of
    /// the same underlying type.
    pub fn register_struct(
        &mut self,
        name: &str,
        fields: Vec<FieldDef>,
    ) -> Result<TypeId, TypeError> {
        let mut descriptors = Vec::with_capacity(fields.len());
        let mut seen_names: FxHashSet<String> = FxHashSet::default();
        let mut seen_embeds: FxHashSet<TypeId> = FxHashSet::default();

        for def in fields {
            let field_name = match (&def.name, def.embedded) {
                (Some(field_name), _) => field_name.clone(),
                (None, true) => self.descriptor(def.ty)?.name.clone(),
                (None, false) => {
                    return Err(TypeError::UnknownField {
                        ty: name.to_string(),
                        field: "<unnamed>".to_string(),
                    })
                }
            };
            if def.embedded && !seen_embeds.insert(def.ty) {
                return Err(TypeError::DuplicateEmbedding {
                    ty: name.to_string(),
                    embedded: self.name_of(def.ty),
                });
            }
            if !seen_names.insert(field_name.clone()) {
                return Err(TypeError::DuplicateField {
                    ty: name.to_string(),
                    field: field_name,
                });
            }
            // Embedded fields must reference an already-registered type.
            self.descriptor(def.ty)?;
            descriptors.push(FieldDescriptor {
                exported: is_exported(&field_name),
                name: field_name,
                ty: def.ty,
                tag: def.tag,
                embedded: def.embedded,
                via_pointer: def.via_pointer,
            });
        }

        let id = self.claim_name(name)?;
        self.types.push(TypeDescriptor {
            id,
            name: name.to_string(),
            kind: TypeKind::Struct,
            fields: descriptors,
            methods: Vec::new(),
        });
        Ok(id)
    }

    /// Register a named sequence type over an element type
    pub fn register_sequence(&mut self, name: &str, elem: TypeId) -> Result<TypeId, TypeError> {
        self.descriptor(elem)?;
        let id = self.claim_name(name)?;
        self.types.push(TypeDescriptor {
            id,
            name: name.to_string(),
            kind: TypeKind::Sequence { elem },
            fields: Vec::new(),
            methods: Vec::new(),
        });
        Ok(id)
    }

    /// Register a named alias of a primitive shape
    ///
    /// The alias is a distinct type with an empty initial method set; it never
    /// inherits methods declared on the underlying primitive.
    pub fn register_scalar_alias(
        &mut self,
        name: &str,
        prim: Primitive,
    ) -> Result<TypeId, TypeError> {
        let id = self.claim_name(name)?;
        self.types.push(TypeDescriptor {
            id,
            name: name.to_string(),
            kind: TypeKind::Primitive(prim),
            fields: Vec::new(),
            methods: Vec::new(),
        });
        Ok(id)
    }

    /// Register a named function shape
    pub fn register_function_alias(
        &mut self,
        name: &str,
        sig: Signature,
    ) -> Result<TypeId, TypeError> {
        let id = self.claim_name(name)?;
        self.types.push(TypeDescriptor {
            id,
            name: name.to_string(),
            kind: TypeKind::Function { sig },
            fields: Vec::new(),
            methods: Vec::new(),
        });
        Ok(id)
    }

    /// Declare a method on a registered type
    ///
    /// One method per name per owning type; there is no overloading by
    /// signature. Methods must be declared before the owner's method set is
    /// resolved.
    pub fn register_method(
        &mut self,
        owner: TypeId,
        def: MethodDef,
    ) -> Result<MethodId, TypeError> {
        let owner_name = self.descriptor(owner)?.name.clone();
        let desc = self
            .types
            .get_mut(owner.0 as usize)
            .ok_or(TypeError::UnknownType {
                name: format!("{}", owner),
            })?;
        if desc.methods.iter().any(|method| method.name == def.name) {
            return Err(TypeError::DuplicateMethod {
                ty: owner_name,
                method: def.name,
            });
        }
        let id = MethodId(self.method_index.len() as u32);
        self.method_index.push((owner, desc.methods.len()));
        desc.methods.push(MethodDescriptor {
            id,
            name: def.name,
            sig: def.sig,
            receiver: def.receiver,
            owner,
        });
        Ok(id)
    }

    /// Human-readable description of a type, with names resolved
    ///
    /// This is the console-output collaborator surface; correctness of the
    /// core never depends on it.
    pub fn describe(&self, id: TypeId) -> String {
        let Some(desc) = self.get(id) else {
            return format!("<unknown {}>", id);
        };
        match &desc.kind {
            TypeKind::Primitive(p) => format!("type {} {}", desc.name, p),
            TypeKind::Sequence { elem } => {
                format!("type {} []{}", desc.name, self.name_of(*elem))
            }
            TypeKind::Function { sig } => format!("type {} fn{}", desc.name, self.describe_sig(sig)),
            TypeKind::Struct => {
                let mut out = format!("struct {} {{", desc.name);
                for (i, field) in desc.fields.iter().enumerate() {
                    if i > 0 {
                        out.push(';');
                    }
                    if field.embedded {
                        out.push_str(&format!(
                            " {}{}",
                            if field.via_pointer { "*" } else { "" },
                            field.name
                        ));
                    } else {
                        out.push_str(&format!(" {} {}", field.name, self.name_of(field.ty)));
                    }
                    if let Some(tag) = &field.tag {
                        out.push_str(&format!(" `{}`", tag));
                    }
                }
                out.push_str(" }");
                out
            }
        }
    }

    /// Render a signature with type names resolved
    pub fn describe_sig(&self, sig: &Signature) -> String {
        let params: Vec<String> = sig.params.iter().map(|p| self.name_of(*p)).collect();
        match &sig.ret {
            Some(ret) => format!("({}) -> {}", params.join(", "), self.name_of(*ret)),
            None => format!("({})", params.join(", ")),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Leading-uppercase naming convention for external visibility
fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_interned() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.lookup("int"), Some(registry.int_type()));
        assert_eq!(registry.lookup("string"), Some(registry.string_type()));
        assert_eq!(registry.name_of(registry.bool_type()), "bool");
    }

    #[test]
    fn test_register_struct_with_fields() {
        let mut registry = TypeRegistry::new();
        let string = registry.string_type();
        let id = registry
            .register_struct(
                "Person",
                vec![
                    FieldDef::new("Name", string).with_tag("json:\"name\""),
                    FieldDef::new("age", registry.int_type()),
                ],
            )
            .unwrap();

        let desc = registry.get(id).unwrap();
        assert!(desc.is_struct());
        assert_eq!(desc.fields.len(), 2);
        assert!(desc.fields[0].exported);
        assert!(!desc.fields[1].exported);
        assert_eq!(desc.fields[0].tag.as_deref(), Some("json:\"name\""));
    }

    #[test]
    fn test_embedded_field_takes_type_name() {
        let mut registry = TypeRegistry::new();
        let engine = registry.register_struct("Engine", vec![]).unwrap();
        let car = registry
            .register_struct("Car", vec![FieldDef::embed(engine)])
            .unwrap();

        let desc = registry.get(car).unwrap();
        assert_eq!(desc.fields[0].name, "Engine");
        assert!(desc.fields[0].embedded);
        assert!(desc.fields[0].exported);
    }

    #[test]
    fn test_duplicate_embedding_rejected() {
        let mut registry = TypeRegistry::new();
        let engine = registry.register_struct("Engine", vec![]).unwrap();
        let err = registry
            .register_struct("Car", vec![FieldDef::embed(engine), FieldDef::embed_ptr(engine)])
            .unwrap_err();
        assert!(matches!(err, TypeError::DuplicateEmbedding { .. }));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut registry = TypeRegistry::new();
        let int = registry.int_type();
        let err = registry
            .register_struct("P", vec![FieldDef::new("x", int), FieldDef::new("x", int)])
            .unwrap_err();
        assert!(matches!(err, TypeError::DuplicateField { .. }));
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let mut registry = TypeRegistry::new();
        let id = registry.register_struct("P", vec![]).unwrap();
        let sig = Signature::new(vec![], None);
        registry
            .register_method(id, MethodDef::new("run", ReceiverKind::Value, sig.clone()))
            .unwrap();
        let err = registry
            .register_method(id, MethodDef::new("run", ReceiverKind::Pointer, sig))
            .unwrap_err();
        assert!(matches!(err, TypeError::DuplicateMethod { .. }));
    }

    #[test]
    fn test_method_by_id_roundtrip() {
        let mut registry = TypeRegistry::new();
        let id = registry.register_struct("P", vec![]).unwrap();
        let method = registry
            .register_method(
                id,
                MethodDef::new("run", ReceiverKind::Value, Signature::new(vec![], None)),
            )
            .unwrap();
        let desc = registry.method_by_id(method).unwrap();
        assert_eq!(desc.name, "run");
        assert_eq!(desc.owner, id);
    }

    #[test]
    fn test_scalar_alias_has_no_inherited_methods() {
        let mut registry = TypeRegistry::new();
        let day = registry.register_scalar_alias("Day", Primitive::Int).unwrap();
        assert!(registry.get(day).unwrap().methods.is_empty());
        assert_ne!(day, registry.int_type());
    }

    #[test]
    fn test_function_alias() {
        let mut registry = TypeRegistry::new();
        let int = registry.int_type();
        let binop = registry
            .register_function_alias("BinOp", Signature::new(vec![int, int], Some(int)))
            .unwrap();
        let desc = registry.get(binop).unwrap();
        assert!(matches!(desc.kind, TypeKind::Function { .. }));
        assert_eq!(registry.describe(binop), "type BinOp fn(int, int) -> int");
    }

    #[test]
    fn test_describe_struct() {
        let mut registry = TypeRegistry::new();
        let log = registry
            .register_struct("Log", vec![FieldDef::new("msg", registry.string_type())])
            .unwrap();
        let customer = registry
            .register_struct(
                "Customer",
                vec![
                    FieldDef::new("Name", registry.string_type()),
                    FieldDef::embed(log),
                ],
            )
            .unwrap();
        assert_eq!(
            registry.describe(customer),
            "struct Customer { Name string; Log }"
        );
    }
}
