//! Core descriptor definitions for the Marten object model

use std::fmt;

/// Unique identifier for a named type in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Raw registry index of this type
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Unique identifier for a declared method
///
/// Assigned at registration time and stable for the process lifetime; the
/// runtime keys its native implementation table by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub(crate) u32);

impl MethodId {
    /// Raw table index of this method
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodId({})", self.0)
    }
}

/// Builtin primitive shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// 64-bit signed integer
    Int,
    /// IEEE 754 double precision float
    Float,
    /// Boolean
    Bool,
    /// UTF-8 string
    Str,
    /// Unit (no value)
    Unit,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Int => write!(f, "int"),
            Primitive::Float => write!(f, "float"),
            Primitive::Bool => write!(f, "bool"),
            Primitive::Str => write!(f, "string"),
            Primitive::Unit => write!(f, "unit"),
        }
    }
}

/// Receiver kind of a declared method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverKind {
    /// The method operates on a copy of the receiver
    Value,
    /// The method operates through an addressable reference and may mutate
    Pointer,
}

/// Parameter and return shape of a method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Parameter types in positional order
    pub params: Vec<TypeId>,
    /// Return type, if any
    pub ret: Option<TypeId>,
}

impl Signature {
    /// Create a new signature
    pub fn new(params: Vec<TypeId>, ret: Option<TypeId>) -> Self {
        Signature { params, ret }
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")?;
        if let Some(ret) = &self.ret {
            write!(f, " -> {}", ret)?;
        }
        Ok(())
    }
}

/// Field declared on a struct type
///
/// Embedded types are fields too: an embedding is an anonymous field whose
/// name is the embedded type's name and whose `embedded` flag is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name (the type name for embedded fields)
    pub name: String,
    /// Declared type of the field
    pub ty: TypeId,
    /// Externally visible, derived from the leading-uppercase convention
    pub exported: bool,
    /// Opaque tag string, never interpreted by the engine
    pub tag: Option<String>,
    /// True for anonymous (embedded) fields
    pub embedded: bool,
    /// True when the embedding is through a pointer to the type
    pub via_pointer: bool,
}

/// Method declared on a named type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Stable method identifier
    pub id: MethodId,
    /// Method name
    pub name: String,
    /// Parameter and return shape
    pub sig: Signature,
    /// Receiver kind the method was declared with
    pub receiver: ReceiverKind,
    /// Type the method is declared on
    pub owner: TypeId,
}

/// Shape of a named type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Named alias of a primitive shape
    Primitive(Primitive),
    /// Struct with fields and embeddings
    Struct,
    /// Named sequence of a single element type
    Sequence {
        /// Element type
        elem: TypeId,
    },
    /// Named function shape
    Function {
        /// The aliased function signature
        sig: Signature,
    },
}

/// A named type: identity, shape, fields, and declared methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Registry identity
    pub id: TypeId,
    /// Type name
    pub name: String,
    /// Underlying shape
    pub kind: TypeKind,
    /// Fields in declaration order (structs only; embedded entries included)
    pub fields: Vec<FieldDescriptor>,
    /// Methods declared directly on this type, in registration order
    pub methods: Vec<MethodDescriptor>,
}

impl TypeDescriptor {
    /// Check if this type is a struct
    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct)
    }

    /// Check if this type is a sequence alias
    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, TypeKind::Sequence { .. })
    }

    /// Look up a declared field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Look up a directly declared method by name
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Iterate over embedded fields with their declaration index
    pub fn embedded(&self) -> impl Iterator<Item = (usize, &FieldDescriptor)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.embedded)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Primitive(p) => write!(f, "type {} {}", self.name, p),
            TypeKind::Struct => write!(f, "struct {}", self.name),
            TypeKind::Sequence { elem } => write!(f, "type {} []{}", self.name, elem),
            TypeKind::Function { sig } => write!(f, "type {} fn{}", self.name, sig),
        }
    }
}
