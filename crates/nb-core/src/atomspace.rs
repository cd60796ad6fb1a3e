//! Hypergraph store of atoms and links.
//!
//! Atoms and links share one id space. Ids come from a monotonically
//! increasing counter and are never reused, so a link always has a larger
//! id than everything in its outgoing set.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::atom_type::{AtomType, TypeKind, TypeRegistry};
use crate::attention::AttentionValue;
use crate::error::{NanoBrainError, Result};
use crate::truth::{RevisionRule, TruthValue, TruthValueEngine};

/// Identity of an atom or link within one `AtomSpace`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u64);

impl Handle {
    /// Rebuild a handle from a raw id previously obtained via `value()`.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom_{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub id: Handle,
    pub atom_type: AtomType,
    pub name: String,
    pub truth: TruthValue,
    pub attention: AttentionValue,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: Handle,
    pub link_type: AtomType,
    /// Argument order is significant.
    pub outgoing: Vec<Handle>,
    pub truth: TruthValue,
}

impl Link {
    pub fn arity(&self) -> usize {
        self.outgoing.len()
    }
}

/// Owns every atom and link plus the secondary indexes over them.
#[derive(Clone, Debug, Default)]
pub struct AtomSpace {
    types: TypeRegistry,
    atoms: BTreeMap<Handle, Atom>,
    links: BTreeMap<Handle, Link>,
    type_index: HashMap<AtomType, BTreeSet<Handle>>,
    name_index: HashMap<String, BTreeSet<Handle>>,
    incoming: HashMap<Handle, BTreeSet<Handle>>,
    next_id: u64,
    revision: TruthValueEngine,
}

impl AtomSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revision_rule(rule: RevisionRule) -> Self {
        Self {
            revision: TruthValueEngine::new(rule),
            ..Self::default()
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn register_type(&mut self, name: &str, kind: TypeKind) -> AtomType {
        self.types.register(name, kind)
    }

    /// Resolve a type name for the given kind, registering an extension only
    /// once the kind is known to match.
    pub fn resolve_type(&mut self, type_name: &str, expected: TypeKind) -> Result<AtomType> {
        if self.types.kind_of_name(type_name) != expected {
            return Err(NanoBrainError::TypeKindMismatch {
                type_name: type_name.to_string(),
                expected: expected.as_str(),
            });
        }
        Ok(self.types.intern(type_name))
    }

    fn check_kind(&self, t: &AtomType, expected: TypeKind) -> Result<()> {
        if self.types.kind(t) != expected {
            return Err(NanoBrainError::TypeKindMismatch {
                type_name: self.types.name(t).to_string(),
                expected: expected.as_str(),
            });
        }
        Ok(())
    }

    fn allocate(&mut self) -> Handle {
        let id = Handle(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a node. Attention starts at zero.
    pub fn create_atom(&mut self, atom_type: AtomType, name: &str, truth: TruthValue) -> Result<Handle> {
        self.check_kind(&atom_type, TypeKind::Node)?;
        let id = self.allocate();
        self.type_index.entry(atom_type).or_default().insert(id);
        self.name_index
            .entry(name.to_string())
            .or_default()
            .insert(id);
        self.atoms.insert(
            id,
            Atom {
                id,
                atom_type,
                name: name.to_string(),
                truth,
                attention: AttentionValue::default(),
            },
        );
        Ok(id)
    }

    /// Insert a hyperedge. Every outgoing id must already exist.
    pub fn create_link(
        &mut self,
        link_type: AtomType,
        outgoing: Vec<Handle>,
        truth: TruthValue,
    ) -> Result<Handle> {
        self.check_kind(&link_type, TypeKind::Link)?;
        if let Some(missing) = outgoing.iter().find(|h| !self.contains(**h)) {
            return Err(NanoBrainError::UnknownAtom(*missing));
        }
        let id = self.allocate();
        for target in &outgoing {
            self.incoming.entry(*target).or_default().insert(id);
        }
        self.type_index.entry(link_type).or_default().insert(id);
        self.links.insert(
            id,
            Link {
                id,
                link_type,
                outgoing,
                truth,
            },
        );
        Ok(id)
    }

    pub fn contains(&self, id: Handle) -> bool {
        self.atoms.contains_key(&id) || self.links.contains_key(&id)
    }

    pub fn get_atom(&self, id: Handle) -> Result<&Atom> {
        self.atoms.get(&id).ok_or(NanoBrainError::UnknownAtom(id))
    }

    pub fn get_link(&self, id: Handle) -> Result<&Link> {
        self.links.get(&id).ok_or(NanoBrainError::UnknownLink(id))
    }

    pub(crate) fn atom_mut(&mut self, id: Handle) -> Result<&mut Atom> {
        self.atoms.get_mut(&id).ok_or(NanoBrainError::UnknownAtom(id))
    }

    pub(crate) fn atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.atoms.values_mut()
    }

    /// Remove an atom or link. Refuses while any link still references it.
    ///
    /// Atoms and links share one id space and removal accepts either, so an
    /// id that names nothing (never allocated, or already removed) is
    /// reported as `UnknownAtom` whatever it once was.
    pub fn remove(&mut self, id: Handle) -> Result<()> {
        if !self.contains(id) {
            return Err(NanoBrainError::UnknownAtom(id));
        }
        let dependents = self.incoming.get(&id).map_or(0, |s| s.len());
        if dependents > 0 {
            return Err(NanoBrainError::HasDependents { id, dependents });
        }
        self.detach(id);
        Ok(())
    }

    /// Remove `id` together with every link that transitively references it.
    /// Returns the removed ids in removal order.
    pub fn remove_recursive(&mut self, id: Handle) -> Result<Vec<Handle>> {
        if !self.contains(id) {
            return Err(NanoBrainError::UnknownAtom(id));
        }
        let mut doomed = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if doomed.insert(next)
                && let Some(referrers) = self.incoming.get(&next)
            {
                stack.extend(referrers.iter().copied());
            }
        }
        // Referrers always have larger ids than their targets.
        let order: Vec<Handle> = doomed.into_iter().rev().collect();
        for h in &order {
            self.detach(*h);
        }
        Ok(order)
    }

    fn detach(&mut self, id: Handle) {
        self.incoming.remove(&id);
        if let Some(atom) = self.atoms.remove(&id) {
            remove_from_index(&mut self.type_index, &atom.atom_type, id);
            remove_from_index(&mut self.name_index, &atom.name, id);
        } else if let Some(link) = self.links.remove(&id) {
            remove_from_index(&mut self.type_index, &link.link_type, id);
            for target in &link.outgoing {
                remove_from_index(&mut self.incoming, target, id);
            }
        }
    }

    /// Merge new evidence into an atom's truth value.
    pub fn revise_atom(&mut self, id: Handle, evidence: &TruthValue) -> Result<TruthValue> {
        let engine = self.revision;
        let atom = self.atom_mut(id)?;
        atom.truth = engine.merge(&atom.truth, evidence);
        Ok(atom.truth)
    }

    pub fn revise_link(&mut self, id: Handle, evidence: &TruthValue) -> Result<TruthValue> {
        let engine = self.revision;
        let link = self
            .links
            .get_mut(&id)
            .ok_or(NanoBrainError::UnknownLink(id))?;
        link.truth = engine.merge(&link.truth, evidence);
        Ok(link.truth)
    }

    /// Atoms and links carrying the given type, ascending by id.
    pub fn atoms_of_type(&self, t: &AtomType) -> Vec<Handle> {
        self.type_index
            .get(t)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn atoms_named(&self, name: &str) -> Vec<Handle> {
        self.name_index
            .get(name)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Links whose outgoing set contains `id`.
    pub fn incoming(&self, id: Handle) -> Vec<Handle> {
        self.incoming
            .get(&id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn atom_ids(&self) -> Vec<Handle> {
        self.atoms.keys().copied().collect()
    }

    pub fn link_ids(&self) -> Vec<Handle> {
        self.links.keys().copied().collect()
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn type_name(&self, t: &AtomType) -> &str {
        self.types.name(t)
    }
}

fn remove_from_index<K>(index: &mut HashMap<K, BTreeSet<Handle>>, key: &K, id: Handle)
where
    K: std::hash::Hash + Eq,
{
    if let Some(set) = index.get_mut(key) {
        set.remove(&id);
        if set.is_empty() {
            index.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv(s: f64, c: f64) -> TruthValue {
        TruthValue::new(s, c).unwrap()
    }

    fn cat_animal(space: &mut AtomSpace) -> (Handle, Handle, Handle) {
        let cat = space.create_atom(AtomType::ConceptNode, "Cat", tv(0.9, 0.8)).unwrap();
        let animal = space.create_atom(AtomType::ConceptNode, "Animal", tv(0.95, 0.9)).unwrap();
        let link = space
            .create_link(AtomType::InheritanceLink, vec![cat, animal], tv(0.9, 0.7))
            .unwrap();
        (cat, animal, link)
    }

    #[test]
    fn test_create_and_get() {
        let mut space = AtomSpace::new();
        let id = space.create_atom(AtomType::ConceptNode, "Cat", tv(0.9, 0.8)).unwrap();
        let atom = space.get_atom(id).unwrap();
        assert_eq!(atom.name, "Cat");
        assert_eq!(atom.truth.strength(), 0.9);
        assert_eq!(atom.truth.count(), 1.0);
        assert_eq!(atom.attention, AttentionValue::default());
        assert_eq!(id.to_string(), "atom_0");
    }

    #[test]
    fn test_ids_never_reused() {
        let mut space = AtomSpace::new();
        let a = space.create_atom(AtomType::ConceptNode, "A", tv(1.0, 1.0)).unwrap();
        space.remove(a).unwrap();
        let b = space.create_atom(AtomType::ConceptNode, "A", tv(1.0, 1.0)).unwrap();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_link_requires_existing_targets() {
        let mut space = AtomSpace::new();
        let cat = space.create_atom(AtomType::ConceptNode, "Cat", tv(0.9, 0.8)).unwrap();
        let err = space
            .create_link(AtomType::ListLink, vec![cat, Handle(99)], tv(1.0, 1.0))
            .unwrap_err();
        assert_eq!(err, NanoBrainError::UnknownAtom(Handle(99)));
        assert_eq!(space.link_count(), 0);
        assert!(space.incoming(cat).is_empty(), "failed create must not touch indexes");
    }

    #[test]
    fn test_kind_mismatch() {
        let mut space = AtomSpace::new();
        assert!(matches!(
            space.create_atom(AtomType::ListLink, "x", tv(1.0, 1.0)),
            Err(NanoBrainError::TypeKindMismatch { .. })
        ));
        assert!(space.resolve_type("SimilarityLink", TypeKind::Node).is_err());
        assert!(space.resolve_type("MysteryLink", TypeKind::Node).is_err());
        assert_eq!(space.types().extension_count(), 0);
        assert!(space.resolve_type("MysteryNode", TypeKind::Node).is_ok());
        assert_eq!(space.types().extension_count(), 1);
    }

    #[test]
    fn test_links_can_nest() {
        let mut space = AtomSpace::new();
        let (cat, animal, link) = cat_animal(&mut space);
        let outer = space
            .create_link(AtomType::ContextLink, vec![link, cat], tv(0.5, 0.5))
            .unwrap();
        assert_eq!(space.get_link(outer).unwrap().outgoing, vec![link, cat]);
        assert_eq!(space.incoming(cat), vec![link, outer]);
        assert_eq!(space.incoming(animal), vec![link]);
    }

    #[test]
    fn test_remove_refuses_with_dependents() {
        let mut space = AtomSpace::new();
        let (cat, _, link) = cat_animal(&mut space);
        assert_eq!(
            space.remove(cat),
            Err(NanoBrainError::HasDependents { id: cat, dependents: 1 })
        );
        assert_eq!(space.atom_count(), 2);
        space.remove(link).unwrap();
        space.remove(cat).unwrap();
        assert!(space.get_atom(cat).is_err());
        assert!(space.atoms_named("Cat").is_empty());
    }

    #[test]
    fn test_remove_recursive_cascades() {
        let mut space = AtomSpace::new();
        let (cat, animal, link) = cat_animal(&mut space);
        let outer = space
            .create_link(AtomType::ContextLink, vec![link], tv(0.5, 0.5))
            .unwrap();
        let removed = space.remove_recursive(cat).unwrap();
        assert_eq!(removed, vec![outer, link, cat]);
        assert_eq!(space.link_count(), 0);
        assert_eq!(space.atom_ids(), vec![animal]);
        assert!(space.incoming(animal).is_empty());
    }

    #[test]
    fn test_remove_missing_id_is_unknown_atom_for_either_kind() {
        let mut space = AtomSpace::new();
        let (_, _, link) = cat_animal(&mut space);
        space.remove(link).unwrap();
        assert_eq!(space.remove(link), Err(NanoBrainError::UnknownAtom(link)));
        assert_eq!(space.get_link(link), Err(NanoBrainError::UnknownLink(link)));
        assert_eq!(
            space.remove_recursive(link),
            Err(NanoBrainError::UnknownAtom(link))
        );
    }

    #[test]
    fn test_unknown_ids() {
        let mut space = AtomSpace::new();
        assert_eq!(space.get_atom(Handle(3)), Err(NanoBrainError::UnknownAtom(Handle(3))));
        assert_eq!(space.get_link(Handle(3)), Err(NanoBrainError::UnknownLink(Handle(3))));
        assert!(space.remove(Handle(3)).is_err());
    }

    #[test]
    fn test_indexes() {
        let mut space = AtomSpace::new();
        let (cat, animal, link) = cat_animal(&mut space);
        let cat2 = space.create_atom(AtomType::PredicateNode, "Cat", tv(0.5, 0.5)).unwrap();
        assert_eq!(space.atoms_of_type(&AtomType::ConceptNode), vec![cat, animal]);
        assert_eq!(space.atoms_of_type(&AtomType::InheritanceLink), vec![link]);
        assert_eq!(space.atoms_named("Cat"), vec![cat, cat2]);
    }

    #[test]
    fn test_revise_atom() {
        let mut space = AtomSpace::new();
        let id = space.create_atom(AtomType::ConceptNode, "Cat", tv(1.0, 0.5)).unwrap();
        let revised = space.revise_atom(id, &tv(0.0, 0.5)).unwrap();
        assert!((revised.strength() - 0.5).abs() < 1e-12);
        assert!((revised.confidence() - 0.75).abs() < 1e-12);
        assert_eq!(revised.count(), 2.0);
    }
}
