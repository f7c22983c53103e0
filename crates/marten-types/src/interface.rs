//! Interface specifications and structural satisfaction
//!
//! An interface is a named set of required operations, possibly composed from
//! nested interfaces. Satisfaction is purely structural: a type conforms when
//! its resolved method set covers every flattened requirement with an exactly
//! matching signature, with no declared link between type and interface.

use rustc_hash::FxHashMap;

use crate::error::TypeError;
use crate::method_set::{AccessMode, MethodEntry, MethodSets};
use crate::registry::TypeRegistry;
use crate::ty::{Signature, TypeId};

/// One required operation of an interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRequirement {
    /// Required method name
    pub name: String,
    /// Required signature, matched exactly
    pub sig: Signature,
}

/// A named set of required operations, possibly composed from nested specs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    name: String,
    methods: Vec<MethodRequirement>,
    embeds: Vec<InterfaceSpec>,
}

impl InterfaceSpec {
    /// Create an empty interface
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceSpec {
            name: name.into(),
            methods: Vec::new(),
            embeds: Vec::new(),
        }
    }

    /// Add a required operation
    pub fn method(mut self, name: impl Into<String>, sig: Signature) -> Self {
        self.methods.push(MethodRequirement {
            name: name.into(),
            sig,
        });
        self
    }

    /// Compose another interface's requirements into this one
    pub fn embed(mut self, spec: InterfaceSpec) -> Self {
        self.embeds.push(spec);
        self
    }

    /// Interface name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flatten into a single deduplicated requirement set
    ///
    /// Identical nested requirements collapse; the same name required with
    /// two different signatures is a definition-time `ConflictingSignature`.
    pub fn flatten(&self) -> Result<FlatInterface, TypeError> {
        let mut required: FxHashMap<String, Signature> = FxHashMap::default();
        self.collect(&self.name, &mut required)?;
        let mut names: Vec<String> = required.keys().cloned().collect();
        names.sort();
        Ok(FlatInterface {
            name: self.name.clone(),
            required,
            names,
        })
    }

    fn collect(
        &self,
        root: &str,
        required: &mut FxHashMap<String, Signature>,
    ) -> Result<(), TypeError> {
        for req in &self.methods {
            match required.get(&req.name) {
                Some(existing) if *existing != req.sig => {
                    return Err(TypeError::ConflictingSignature {
                        interface: root.to_string(),
                        method: req.name.clone(),
                    })
                }
                Some(_) => {}
                None => {
                    required.insert(req.name.clone(), req.sig.clone());
                }
            }
        }
        for embed in &self.embeds {
            embed.collect(root, required)?;
        }
        Ok(())
    }
}

/// Flattened, deduplicated requirement set of an interface
#[derive(Debug, Clone, PartialEq)]
pub struct FlatInterface {
    name: String,
    required: FxHashMap<String, Signature>,
    names: Vec<String>,
}

impl FlatInterface {
    /// Interface name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of distinct requirements
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when the interface requires nothing (the empty interface)
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Required names in lexicographic order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Required signature for a name
    pub fn get(&self, name: &str) -> Option<&Signature> {
        self.required.get(name)
    }

    /// Whether a name is required
    pub fn requires(&self, name: &str) -> bool {
        self.required.contains_key(name)
    }
}

impl MethodSets {
    /// Structural satisfaction predicate
    ///
    /// True iff every flattened requirement is present in the resolved set
    /// for `mode` with an exactly matching signature. Ambiguous names never
    /// satisfy a requirement.
    pub fn satisfies(
        &self,
        types: &TypeRegistry,
        ty: TypeId,
        mode: AccessMode,
        iface: &FlatInterface,
    ) -> Result<bool, TypeError> {
        Ok(self.unsatisfied(types, ty, mode, iface)?.is_empty())
    }

    /// Satisfaction check with per-requirement diagnostics
    ///
    /// Performed wherever a value is bound to an interface-typed slot; a
    /// failure is `UnsatisfiedInterface` naming every missing, mismatched,
    /// or ambiguous requirement.
    pub fn check_satisfies(
        &self,
        types: &TypeRegistry,
        ty: TypeId,
        mode: AccessMode,
        iface: &FlatInterface,
    ) -> Result<(), TypeError> {
        let missing = self.unsatisfied(types, ty, mode, iface)?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TypeError::UnsatisfiedInterface {
                ty: types.descriptor(ty)?.name.clone(),
                interface: iface.name.clone(),
                missing,
            })
        }
    }

    fn unsatisfied(
        &self,
        types: &TypeRegistry,
        ty: TypeId,
        mode: AccessMode,
        iface: &FlatInterface,
    ) -> Result<Vec<String>, TypeError> {
        let set = self.resolve(types, ty, mode)?;
        let mut missing = Vec::new();
        for name in iface.names() {
            let required = &iface.required[name];
            match set.entry(name) {
                Some(MethodEntry::Unique(promoted)) => {
                    let declared = types.method_by_id(promoted.method).ok_or_else(|| {
                        TypeError::UnknownMethod {
                            ty: types.name_of(ty),
                            method: name.clone(),
                        }
                    })?;
                    if declared.sig != *required {
                        missing.push(format!("{} (signature mismatch)", name));
                    }
                }
                Some(MethodEntry::Ambiguous { .. }) => {
                    missing.push(format!("{} (ambiguous)", name));
                }
                None => missing.push(name.clone()),
            }
        }
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MethodDef;
    use crate::ty::ReceiverKind;

    fn shaper(types: &TypeRegistry) -> FlatInterface {
        InterfaceSpec::new("Shaper")
            .method("area", Signature::new(vec![], Some(types.float_type())))
            .flatten()
            .unwrap()
    }

    #[test]
    fn test_flatten_dedupes_identical_requirements() {
        let types = TypeRegistry::new();
        let sig = Signature::new(vec![], Some(types.float_type()));
        let nested = InterfaceSpec::new("Inner").method("area", sig.clone());
        let outer = InterfaceSpec::new("Outer")
            .method("area", sig)
            .embed(nested);
        let flat = outer.flatten().unwrap();
        assert_eq!(flat.len(), 1);
        assert!(flat.requires("area"));
    }

    #[test]
    fn test_flatten_rejects_conflicting_signatures() {
        let types = TypeRegistry::new();
        let a = InterfaceSpec::new("A").method("area", Signature::new(vec![], Some(types.float_type())));
        let b = InterfaceSpec::new("B").method("area", Signature::new(vec![], Some(types.int_type())));
        let err = InterfaceSpec::new("AB").embed(a).embed(b).flatten().unwrap_err();
        assert!(matches!(err, TypeError::ConflictingSignature { .. }));
    }

    #[test]
    fn test_nested_composition_unions_requirements() {
        let types = TypeRegistry::new();
        let unit_sig = Signature::new(vec![], None);
        let read_write = InterfaceSpec::new("ReadWrite")
            .method("read", Signature::new(vec![], Some(types.bool_type())))
            .method("write", Signature::new(vec![], Some(types.bool_type())));
        let lock = InterfaceSpec::new("Lock")
            .method("lock", unit_sig.clone())
            .method("unlock", unit_sig.clone());
        let file = InterfaceSpec::new("File")
            .embed(read_write)
            .embed(lock)
            .method("close", unit_sig);
        let flat = file.flatten().unwrap();
        assert_eq!(flat.names(), ["close", "lock", "read", "unlock", "write"]);
    }

    #[test]
    fn test_structural_satisfaction() {
        let mut types = TypeRegistry::new();
        let square = types.register_struct("Square", vec![]).unwrap();
        types
            .register_method(
                square,
                MethodDef::new(
                    "area",
                    ReceiverKind::Pointer,
                    Signature::new(vec![], Some(types.float_type())),
                ),
            )
            .unwrap();

        let sets = MethodSets::new();
        let iface = shaper(&types);
        // Pointer-receiver area: satisfied through a pointer, not by value.
        assert!(sets
            .satisfies(&types, square, AccessMode::ByPointer, &iface)
            .unwrap());
        assert!(!sets
            .satisfies(&types, square, AccessMode::ByValue, &iface)
            .unwrap());
    }

    #[test]
    fn test_name_match_alone_is_insufficient() {
        let mut types = TypeRegistry::new();
        let square = types.register_struct("Square", vec![]).unwrap();
        types
            .register_method(
                square,
                MethodDef::new(
                    "area",
                    ReceiverKind::Value,
                    Signature::new(vec![], Some(types.int_type())),
                ),
            )
            .unwrap();

        let sets = MethodSets::new();
        let iface = shaper(&types);
        assert!(!sets
            .satisfies(&types, square, AccessMode::ByValue, &iface)
            .unwrap());
        let err = sets
            .check_satisfies(&types, square, AccessMode::ByValue, &iface)
            .unwrap_err();
        assert!(matches!(err, TypeError::UnsatisfiedInterface { missing, .. }
            if missing == vec!["area (signature mismatch)".to_string()]));
    }

    #[test]
    fn test_promoted_method_satisfies() {
        let mut types = TypeRegistry::new();
        let engine = types.register_struct("Engine", vec![]).unwrap();
        types
            .register_method(
                engine,
                MethodDef::new("start", ReceiverKind::Value, Signature::new(vec![], None)),
            )
            .unwrap();
        let car = types
            .register_struct("Car", vec![crate::registry::FieldDef::embed(engine)])
            .unwrap();

        let starter = InterfaceSpec::new("Starter")
            .method("start", Signature::new(vec![], None))
            .flatten()
            .unwrap();
        let sets = MethodSets::new();
        assert!(sets
            .satisfies(&types, car, AccessMode::ByValue, &starter)
            .unwrap());
    }

    #[test]
    fn test_ambiguous_requirement_does_not_satisfy() {
        let mut types = TypeRegistry::new();
        let sig = Signature::new(vec![], None);
        let a = types.register_struct("A", vec![]).unwrap();
        types
            .register_method(a, MethodDef::new("run", ReceiverKind::Value, sig.clone()))
            .unwrap();
        let b = types.register_struct("B", vec![]).unwrap();
        types
            .register_method(b, MethodDef::new("run", ReceiverKind::Value, sig.clone()))
            .unwrap();
        let c = types
            .register_struct(
                "C",
                vec![
                    crate::registry::FieldDef::embed(a),
                    crate::registry::FieldDef::embed(b),
                ],
            )
            .unwrap();

        let runner = InterfaceSpec::new("Runner").method("run", sig).flatten().unwrap();
        let sets = MethodSets::new();
        let err = sets
            .check_satisfies(&types, c, AccessMode::ByValue, &runner)
            .unwrap_err();
        assert!(matches!(err, TypeError::UnsatisfiedInterface { missing, .. }
            if missing == vec!["run (ambiguous)".to_string()]));
    }
}
