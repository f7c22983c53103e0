//! Object-model errors

use thiserror::Error;

/// Errors from type registration, method-set resolution, and interface
/// satisfaction checking
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// Reference to a type that was never registered
    #[error("Unknown type: {name}")]
    UnknownType {
        /// Type name (or formatted id) that was not found
        name: String,
    },

    /// A type name was registered twice
    #[error("Duplicate type definition: {name}")]
    DuplicateType {
        /// Name of the colliding type
        name: String,
    },

    /// Two fields (or embeddings) with the same name on one struct
    #[error("Duplicate field {field} on type {ty}")]
    DuplicateField {
        /// Declaring type name
        ty: String,
        /// Colliding field name
        field: String,
    },

    /// The same underlying type embedded twice at one nesting level
    #[error("Duplicate embedding of {embedded} in {ty}")]
    DuplicateEmbedding {
        /// Declaring type name
        ty: String,
        /// Embedded type name
        embedded: String,
    },

    /// Two methods of the same name on one receiver-owning type
    #[error("Duplicate method {method} on type {ty}")]
    DuplicateMethod {
        /// Owning type name
        ty: String,
        /// Colliding method name
        method: String,
    },

    /// Two embedding branches promote the same method name at equal depth
    #[error("Ambiguous method {method} on type {ty}: {count} promotions at depth {depth}")]
    AmbiguousMethod {
        /// Type the access was attempted on
        ty: String,
        /// Ambiguous method name
        method: String,
        /// Embedding depth of the collision
        depth: usize,
        /// Number of colliding promotions
        count: usize,
    },

    /// Two embedding branches promote the same field name at equal depth
    #[error("Ambiguous field {field} on type {ty}: {count} promotions at depth {depth}")]
    AmbiguousField {
        /// Type the access was attempted on
        ty: String,
        /// Ambiguous field name
        field: String,
        /// Embedding depth of the collision
        depth: usize,
        /// Number of colliding promotions
        count: usize,
    },

    /// Method name not present anywhere in the resolved set
    #[error("Unknown method {method} on type {ty}")]
    UnknownMethod {
        /// Type the access was attempted on
        ty: String,
        /// Missing method name
        method: String,
    },

    /// Field name not present anywhere in the embedding graph
    #[error("Unknown field {field} on type {ty}")]
    UnknownField {
        /// Type the access was attempted on
        ty: String,
        /// Missing field name
        field: String,
    },

    /// Pointer-receiver method invoked through a non-addressable value
    #[error("Method {method} on type {ty} requires an addressable receiver")]
    InvalidReceiverAccess {
        /// Receiver type name
        ty: String,
        /// Method that was invoked
        method: String,
    },

    /// A value was bound to an interface its method set does not satisfy
    #[error("Type {ty} does not satisfy interface {interface}: {}", .missing.join(", "))]
    UnsatisfiedInterface {
        /// Bound type name
        ty: String,
        /// Interface name
        interface: String,
        /// Missing or mismatched requirements, one entry per name
        missing: Vec<String>,
    },

    /// Composed interfaces require the same name with different signatures
    #[error("Interface {interface} requires {method} with conflicting signatures")]
    ConflictingSignature {
        /// Flattened interface name
        interface: String,
        /// Conflicting requirement name
        method: String,
    },
}
