//! Method-set resolution
//!
//! Computes the effective callable set for a (type, access mode) pair by a
//! breadth-first walk over the embedding graph: the shallowest declaration of
//! a name wins, equal-depth declarations from distinct branches are marked
//! ambiguous, and `ByValue` access drops pointer-receiver methods that have no
//! addressable path. Registration order makes the embedding graph acyclic (a
//! struct can only embed already-registered types), so the walk terminates
//! without a visited set.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::TypeError;
use crate::registry::TypeRegistry;
use crate::ty::{MethodId, ReceiverKind, TypeId};

/// How a value is accessed when its method set is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Access through a plain value with no knowable address
    ByValue,
    /// Access through a pointer or an independently addressable value
    ByPointer,
}

/// A method made visible on an outer type, possibly through embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotedMethod {
    /// The declared method
    pub method: MethodId,
    /// Receiver kind of the declaration
    pub receiver: ReceiverKind,
    /// Embedding depth (0 = declared directly on the type)
    pub depth: usize,
    /// Field indices walked from the outer type to the owning type
    pub path: Vec<usize>,
    /// True when any hop on the path embeds through a pointer
    pub via_pointer_path: bool,
}

impl PromotedMethod {
    /// Whether this method is callable through a value with no address
    ///
    /// Pointer-receiver methods need addressable storage; a pointer hop on
    /// the promotion path provides it even when the outer value is a copy.
    pub fn callable_by_value(&self) -> bool {
        self.receiver == ReceiverKind::Value || self.via_pointer_path
    }
}

/// Resolution outcome for one method name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodEntry {
    /// Exactly one declaration at the minimal depth
    Unique(PromotedMethod),
    /// Two or more declarations collided at the same minimal depth
    Ambiguous {
        /// Depth of the collision
        depth: usize,
        /// The colliding declarations
        candidates: Vec<MethodId>,
    },
}

/// Effective method set of a (type, access mode) pair
///
/// Iteration and indexing follow lexicographic name order, so positional
/// method access is stable across registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMethodSet {
    ty: TypeId,
    ty_name: String,
    mode: AccessMode,
    entries: FxHashMap<String, MethodEntry>,
    names: Vec<String>,
}

impl ResolvedMethodSet {
    /// The type this set was resolved for
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// The access mode this set was resolved for
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Number of visible method names (ambiguous entries included)
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no methods are visible
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Visible method names in lexicographic order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether a name is visible (possibly ambiguous)
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Raw entry for a name
    pub fn entry(&self, name: &str) -> Option<&MethodEntry> {
        self.entries.get(name)
    }

    /// Entry by lexicographic position
    pub fn entry_at(&self, index: usize) -> Option<(&str, &MethodEntry)> {
        let name = self.names.get(index)?;
        Some((name.as_str(), self.entries.get(name)?))
    }

    /// The unique promotion for a name
    ///
    /// Ambiguous names fail with `AmbiguousMethod` rather than picking a
    /// branch; absent names fail with `UnknownMethod`.
    pub fn get(&self, name: &str) -> Result<&PromotedMethod, TypeError> {
        match self.entries.get(name) {
            Some(MethodEntry::Unique(promoted)) => Ok(promoted),
            Some(MethodEntry::Ambiguous { depth, candidates }) => {
                Err(TypeError::AmbiguousMethod {
                    ty: self.ty_name.clone(),
                    method: name.to_string(),
                    depth: *depth,
                    count: candidates.len(),
                })
            }
            None => Err(TypeError::UnknownMethod {
                ty: self.ty_name.clone(),
                method: name.to_string(),
            }),
        }
    }
}

/// A field made visible on an outer type through embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotedField {
    /// Type the field is declared on
    pub owner: TypeId,
    /// Index of the field within the owner's declaration order
    pub index: usize,
    /// Embedding depth (0 = declared directly)
    pub depth: usize,
    /// Field indices walked from the outer type, ending at the field itself
    pub path: Vec<usize>,
}

/// One hop of the breadth-first embedding walk
#[derive(Debug, Clone)]
struct Hop {
    ty: TypeId,
    path: Vec<usize>,
    via_pointer: bool,
}

/// Method-set resolver with an append-only (type, mode) cache
///
/// Resolution for a given pair is invariant once the registry is fully
/// populated, so cached sets are never invalidated; declare all methods
/// before resolving.
#[derive(Debug, Default)]
pub struct MethodSets {
    cache: RwLock<FxHashMap<(TypeId, AccessMode), Arc<ResolvedMethodSet>>>,
}

impl MethodSets {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the effective method set of `ty` under `mode`
    pub fn resolve(
        &self,
        types: &TypeRegistry,
        ty: TypeId,
        mode: AccessMode,
    ) -> Result<Arc<ResolvedMethodSet>, TypeError> {
        if let Some(hit) = self.cache.read().get(&(ty, mode)) {
            return Ok(Arc::clone(hit));
        }

        let full = resolve_uncached(types, ty)?;
        let set = match mode {
            AccessMode::ByPointer => full,
            AccessMode::ByValue => filter_by_value(full),
        };
        let set = Arc::new(set);
        let mut cache = self.cache.write();
        Ok(Arc::clone(
            cache.entry((ty, mode)).or_insert_with(|| set),
        ))
    }

    /// Resolve a possibly-promoted field by name
    ///
    /// Applies the same shallowest-wins and equal-depth-ambiguity rules as
    /// method resolution.
    pub fn resolve_field(
        &self,
        types: &TypeRegistry,
        ty: TypeId,
        name: &str,
    ) -> Result<PromotedField, TypeError> {
        let ty_name = types.descriptor(ty)?.name.clone();
        let mut level = vec![Hop {
            ty,
            path: Vec::new(),
            via_pointer: false,
        }];
        let mut depth = 0usize;

        while !level.is_empty() {
            let mut matches: Vec<PromotedField> = Vec::new();
            for hop in &level {
                let desc = types.descriptor(hop.ty)?;
                for (index, field) in desc.fields.iter().enumerate() {
                    if field.name == name {
                        let mut path = hop.path.clone();
                        path.push(index);
                        matches.push(PromotedField {
                            owner: hop.ty,
                            index,
                            depth,
                            path,
                        });
                    }
                }
            }
            match matches.len() {
                0 => {}
                1 => return Ok(matches.remove(0)),
                count => {
                    return Err(TypeError::AmbiguousField {
                        ty: ty_name,
                        field: name.to_string(),
                        depth,
                        count,
                    })
                }
            }
            level = expand(types, level)?;
            depth += 1;
        }

        Err(TypeError::UnknownField {
            ty: ty_name,
            field: name.to_string(),
        })
    }
}

/// Full (ByPointer) resolution: every non-shadowed declaration in the graph
fn resolve_uncached(types: &TypeRegistry, ty: TypeId) -> Result<ResolvedMethodSet, TypeError> {
    let ty_name = types.descriptor(ty)?.name.clone();

    struct Candidate {
        depth: usize,
        promotions: Vec<PromotedMethod>,
    }

    let mut chosen: FxHashMap<String, Candidate> = FxHashMap::default();
    let mut level = vec![Hop {
        ty,
        path: Vec::new(),
        via_pointer: false,
    }];
    let mut depth = 0usize;

    while !level.is_empty() {
        for hop in &level {
            let desc = types.descriptor(hop.ty)?;
            for method in &desc.methods {
                let promoted = PromotedMethod {
                    method: method.id,
                    receiver: method.receiver,
                    depth,
                    path: hop.path.clone(),
                    via_pointer_path: hop.via_pointer,
                };
                match chosen.get_mut(&method.name) {
                    // A shallower declaration shadows this one, whatever its
                    // receiver kind.
                    Some(candidate) if candidate.depth < depth => {}
                    Some(candidate) => candidate.promotions.push(promoted),
                    None => {
                        chosen.insert(
                            method.name.clone(),
                            Candidate {
                                depth,
                                promotions: vec![promoted],
                            },
                        );
                    }
                }
            }
        }
        level = expand(types, level)?;
        depth += 1;
    }

    let mut entries: FxHashMap<String, MethodEntry> = FxHashMap::default();
    let mut names: Vec<String> = Vec::with_capacity(chosen.len());
    for (name, mut candidate) in chosen {
        let entry = if candidate.promotions.len() == 1 {
            MethodEntry::Unique(candidate.promotions.remove(0))
        } else {
            MethodEntry::Ambiguous {
                depth: candidate.depth,
                candidates: candidate.promotions.iter().map(|p| p.method).collect(),
            }
        };
        names.push(name.clone());
        entries.insert(name, entry);
    }
    names.sort();

    Ok(ResolvedMethodSet {
        ty,
        ty_name,
        mode: AccessMode::ByPointer,
        entries,
        names,
    })
}

/// Drop pointer-receiver methods that have no addressable path
///
/// Ambiguous entries stay visible in both modes so the ambiguity surfaces on
/// access instead of silently disappearing.
fn filter_by_value(full: ResolvedMethodSet) -> ResolvedMethodSet {
    let entries: FxHashMap<String, MethodEntry> = full
        .entries
        .into_iter()
        .filter(|(_, entry)| match entry {
            MethodEntry::Unique(promoted) => promoted.callable_by_value(),
            MethodEntry::Ambiguous { .. } => true,
        })
        .collect();
    let mut names: Vec<String> = entries.keys().cloned().collect();
    names.sort();
    ResolvedMethodSet {
        ty: full.ty,
        ty_name: full.ty_name,
        mode: AccessMode::ByValue,
        entries,
        names,
    }
}

/// Next breadth-first level: every embedded field of the current level
fn expand(types: &TypeRegistry, level: Vec<Hop>) -> Result<Vec<Hop>, TypeError> {
    let mut next = Vec::new();
    for hop in level {
        let desc = types.descriptor(hop.ty)?;
        for (index, field) in desc.embedded() {
            let mut path = hop.path.clone();
            path.push(index);
            next.push(Hop {
                ty: field.ty,
                path,
                via_pointer: hop.via_pointer || field.via_pointer,
            });
        }
    }
    Ok(next)
}
