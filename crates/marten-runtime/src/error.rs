//! Runtime reflection errors

use marten_types::TypeError;
use thiserror::Error;

/// Errors from value boxing, reflection, and dynamic dispatch
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    /// A resolution or satisfaction failure from the descriptor layer
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Mutation attempted through a non-addressable handle
    #[error("Value is not addressable")]
    NotAddressable,

    /// Mutation attempted on a field that is not externally visible
    #[error("Value is not settable: obtained through an unexported field")]
    NotSettable,

    /// A value did not have the expected type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type or shape name
        expected: String,
        /// Actual type or shape name
        actual: String,
    },

    /// Wrong number of arguments in a dynamic call
    #[error("Arity mismatch calling {method}: expected {expected} arguments, got {actual}")]
    ArityMismatch {
        /// Method being called
        method: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// Wrong number of field values constructing a struct
    #[error("Struct {ty} has {expected} fields, got {actual} values")]
    FieldCount {
        /// Struct type name
        ty: String,
        /// Declared field count
        expected: usize,
        /// Supplied value count
        actual: usize,
    },

    /// Positional access past the end of a field list, sequence, or method set
    #[error("Index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Available length
        len: usize,
    },

    /// Struct operation on a non-struct value
    #[error("Expected a struct value, got {actual}")]
    NotAStruct {
        /// Actual shape name
        actual: String,
    },

    /// Sequence operation on a non-sequence value
    #[error("Expected a sequence value, got {actual}")]
    NotASequence {
        /// Actual shape name
        actual: String,
    },

    /// `elem` on a value that is not a reference
    #[error("Expected a reference value, got {actual}")]
    NotAReference {
        /// Actual shape name
        actual: String,
    },

    /// Dereference of a nil reference
    #[error("Nil reference dereference")]
    NilDeref,

    /// A declared method has no native implementation registered
    #[error("No native implementation registered for method {method}")]
    MissingImpl {
        /// Method name
        method: String,
    },

    /// A handle's path no longer matches the underlying storage
    #[error("Handle no longer matches the underlying storage")]
    InvalidHandle,
}

/// Runtime operation result
pub type RuntimeResult<T> = Result<T, RuntimeError>;
