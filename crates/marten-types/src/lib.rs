//! Marten object model
//!
//! Descriptor store, method-set resolution, and structural interface
//! satisfaction. This crate is pure type information: it never touches a
//! live value (that is `marten-runtime`'s job).

#![warn(missing_docs)]

pub mod error;
pub mod interface;
pub mod method_set;
pub mod registry;
pub mod ty;

pub use error::TypeError;
pub use interface::{FlatInterface, InterfaceSpec, MethodRequirement};
pub use method_set::{
    AccessMode, MethodEntry, MethodSets, PromotedField, PromotedMethod, ResolvedMethodSet,
};
pub use registry::{FieldDef, MethodDef, TypeRegistry};
pub use ty::{
    FieldDescriptor, MethodDescriptor, MethodId, Primitive, ReceiverKind, Signature,
    TypeDescriptor, TypeId, TypeKind,
};
