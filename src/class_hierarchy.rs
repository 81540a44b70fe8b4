// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Class hierarchy and C3 linearization (C9). See
//! `original_source/pythonstan/analysis/pointer/kcfa/class_hierarchy.py`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::ids::ObjectId;
use crate::unknown_tracker::{UnknownKind, UnknownTracker};

#[derive(Debug)]
pub struct MroError {
    pub class_names: Vec<String>,
}

impl fmt::Display for MroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot create a consistent MRO for bases {}", self.class_names.join(", "))
    }
}

impl std::error::Error for MroError {}

/// Tracks declared bases, reverse subclass links, and a cache of computed
/// MROs, invalidated transitively whenever a class's bases change.
#[derive(Default)]
pub struct ClassHierarchyManager {
    bases: HashMap<ObjectId, Vec<ObjectId>>,
    subclasses: HashMap<ObjectId, HashSet<ObjectId>>,
    mro_cache: HashMap<ObjectId, Vec<ObjectId>>,
    classes_by_name: HashMap<String, HashSet<ObjectId>>,
}

impl ClassHierarchyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `class_obj` with `base_objects`, but only on first sight
    /// — matching `class_hierarchy.py`'s `add_class`, which leaves an
    /// already-known class's bases untouched (use `update_bases` to
    /// change them).
    pub fn add_class(&mut self, class_obj: ObjectId, name: Option<&str>, base_objects: &[ObjectId]) {
        if let Some(name) = name {
            self.classes_by_name.entry(name.to_string()).or_default().insert(class_obj);
        }
        if self.bases.contains_key(&class_obj) {
            return;
        }
        self.bases.insert(class_obj, base_objects.to_vec());
        for &base in base_objects {
            self.subclasses.entry(base).or_default().insert(class_obj);
        }
        self.invalidate_mro_cache(class_obj);
    }

    /// Replaces `class_obj`'s declared bases, unlinking it from its old
    /// bases' subclass sets first.
    pub fn update_bases(&mut self, class_obj: ObjectId, base_objects: Vec<ObjectId>) {
        if let Some(old_bases) = self.bases.get(&class_obj).cloned() {
            for old_base in old_bases {
                if let Some(subs) = self.subclasses.get_mut(&old_base) {
                    subs.remove(&class_obj);
                }
            }
        }
        self.bases.remove(&class_obj);
        self.add_class(class_obj, None, &base_objects);
    }

    fn invalidate_mro_cache(&mut self, class_obj: ObjectId) {
        let mut worklist = VecDeque::new();
        let mut visited = HashSet::new();
        worklist.push_back(class_obj);
        while let Some(c) = worklist.pop_front() {
            if !visited.insert(c) {
                continue;
            }
            self.mro_cache.remove(&c);
            if let Some(subs) = self.subclasses.get(&c) {
                for &sub in subs {
                    worklist.push_back(sub);
                }
            }
        }
    }

    pub fn get_bases(&self, class_obj: ObjectId) -> &[ObjectId] {
        self.bases.get(&class_obj).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_subclasses(&self, class_obj: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.subclasses.get(&class_obj).into_iter().flatten().copied()
    }

    pub fn has_class(&self, class_obj: ObjectId) -> bool {
        self.bases.contains_key(&class_obj)
    }

    pub fn lookup_class_by_name(&self, name: &str) -> impl Iterator<Item = ObjectId> + '_ {
        self.classes_by_name.get(name).into_iter().flatten().copied()
    }

    /// Best-effort reverse lookup for diagnostics only; a class interned
    /// with no name falls back to its raw id.
    fn name_for(&self, class_obj: ObjectId) -> String {
        self.classes_by_name
            .iter()
            .find(|(_, ids)| ids.contains(&class_obj))
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| format!("{class_obj:?}"))
    }

    /// Returns the cached MRO, computing and caching it on first request.
    pub fn get_mro(&mut self, class_obj: ObjectId, unknowns: &mut UnknownTracker) -> Vec<ObjectId> {
        if let Some(mro) = self.mro_cache.get(&class_obj) {
            return mro.clone();
        }
        let mro = self.compute_c3_mro(class_obj, unknowns);
        self.mro_cache.insert(class_obj, mro.clone());
        mro
    }

    /// C3 linearization with a per-recursion-level fallback: if no
    /// consistent merge exists for a class's bases, that class falls back
    /// to `[class] + first_base_mro` (or just `[class]` with no bases),
    /// and the fallback is applied independently at every level of the
    /// recursion, not just at the top (SPEC_FULL supplement #6).
    pub fn compute_c3_mro(&mut self, class_obj: ObjectId, unknowns: &mut UnknownTracker) -> Vec<ObjectId> {
        let mut in_progress = HashSet::new();
        let mro = self.compute_c3_mro_inner(class_obj, unknowns, &mut in_progress);
        // A base cycle (e.g. A's base is B, B's base is A) makes a class
        // both the linearization's head and, transitively, one of its own
        // bases; the `in_progress` guard below stops the recursion but
        // can't by itself stop that class's own id from being merged in
        // twice. Dedup here, once, rather than thread "have I already been
        // emitted on this chain" through every merge step.
        let mut seen = HashSet::new();
        mro.into_iter().filter(|&c| seen.insert(c)).collect()
    }

    /// `in_progress` guards against a class appearing in its own base
    /// chain (directly or through a cycle of two or more classes), which a
    /// malformed or adversarial `__bases__` assignment can produce at
    /// runtime (`update_bases`) even though `add_class`'s first-sight-only
    /// registration alone can't create one. A class seen while already
    /// being linearized is treated as having no bases of its own, the same
    /// fallback used for a class referenced before its own `add_class`.
    fn compute_c3_mro_inner(&mut self, class_obj: ObjectId, unknowns: &mut UnknownTracker, in_progress: &mut HashSet<ObjectId>) -> Vec<ObjectId> {
        let bases = self.bases.get(&class_obj).cloned().unwrap_or_default();
        if bases.is_empty() || !in_progress.insert(class_obj) {
            return vec![class_obj];
        }
        // Bases seen for the first time here (e.g. referenced before their
        // own `add_class`) are registered defensively with no bases of
        // their own, matching the Python fallback's `hierarchy.add_class`.
        for &base in &bases {
            if !self.bases.contains_key(&base) {
                self.add_class(base, None, &[]);
            }
        }
        let base_mros: Vec<Vec<ObjectId>> = bases.iter().map(|&b| self.compute_c3_mro_inner(b, unknowns, in_progress)).collect();
        in_progress.remove(&class_obj);
        let mut sequences: Vec<Vec<ObjectId>> = base_mros.clone();
        sequences.push(bases.clone());
        match Self::c3_merge(sequences) {
            Ok(mut merged) => {
                let mut result = vec![class_obj];
                result.append(&mut merged);
                result
            }
            Err(err) => {
                let class_name = self.name_for(class_obj);
                let base_names: Vec<String> = bases.iter().map(|&b| self.name_for(b)).collect();
                unknowns.record(
                    UnknownKind::MroMergeFailed,
                    format!("class {class_name}"),
                    format!(
                        "no consistent C3 linearization for bases [{}] ({err}); falling back to [{class_name}] + first base's MRO",
                        base_names.join(", ")
                    ),
                    None,
                );
                let mut result = vec![class_obj];
                if let Some(first) = base_mros.into_iter().next() {
                    result.extend(first);
                }
                result
            }
        }
    }

    fn c3_merge(mut sequences: Vec<Vec<ObjectId>>) -> Result<Vec<ObjectId>, MroError> {
        let mut result = Vec::new();
        loop {
            sequences.retain(|s| !s.is_empty());
            if sequences.is_empty() {
                return Ok(result);
            }
            let mut chosen = None;
            for seq in &sequences {
                let head = seq[0];
                let in_any_tail = sequences.iter().any(|s| s[1..].contains(&head));
                if !in_any_tail {
                    chosen = Some(head);
                    break;
                }
            }
            match chosen {
                Some(head) => {
                    result.push(head);
                    for seq in &mut sequences {
                        seq.retain(|&o| o != head);
                    }
                }
                None => {
                    return Err(MroError { class_names: sequences.iter().filter_map(|s| s.first()).map(|o| format!("{:?}", o)).collect() });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(n: usize) -> ObjectId {
        ObjectId::new(n)
    }

    #[test]
    fn linear_chain_mro_orders_child_before_parents() {
        let mut h = ClassHierarchyManager::new();
        let a = obj(0);
        let b = obj(1);
        let c = obj(2);
        h.add_class(a, Some("A"), &[]);
        h.add_class(b, Some("B"), &[a]);
        h.add_class(c, Some("C"), &[b]);
        let mut unknowns = UnknownTracker::new(true, false);
        assert_eq!(h.get_mro(c, &mut unknowns), vec![c, b, a]);
        assert!(unknowns.get_detailed_report().is_empty());
    }

    #[test]
    fn update_bases_invalidates_cached_mro_for_subclasses() {
        let mut h = ClassHierarchyManager::new();
        let a = obj(0);
        let b = obj(1);
        let c = obj(2);
        h.add_class(a, Some("A"), &[]);
        h.add_class(b, Some("B"), &[]);
        h.add_class(c, Some("C"), &[a]);
        let mut unknowns = UnknownTracker::new(true, false);
        assert_eq!(h.get_mro(c, &mut unknowns), vec![c, a]);

        h.update_bases(c, vec![b]);
        // The cache entry for `c` (and transitively any of its subclasses)
        // must be gone, or this would still see the stale `[c, a]` result.
        assert_eq!(h.get_mro(c, &mut unknowns), vec![c, b]);
        assert_eq!(h.get_bases(c), &[b]);
        assert!(h.get_subclasses(a).next().is_none());
    }

    #[test]
    fn inconsistent_bases_fall_back_and_record_an_unknown() {
        // A declares bases [X, Y]; B declares [Y, X] — merging a class
        // with both orderings has no consistent linearization.
        let mut h = ClassHierarchyManager::new();
        let x = obj(0);
        let y = obj(1);
        let a = obj(2);
        let b = obj(3);
        let child = obj(4);
        h.add_class(x, Some("X"), &[]);
        h.add_class(y, Some("Y"), &[]);
        h.add_class(a, Some("A"), &[x, y]);
        h.add_class(b, Some("B"), &[y, x]);
        h.add_class(child, Some("Child"), &[a, b]);
        let mut unknowns = UnknownTracker::new(true, false);
        let mro = h.get_mro(child, &mut unknowns);
        // No panic, no infinite loop: a result is still produced.
        assert_eq!(mro[0], child);
        assert!(unknowns.get_detailed_report().iter().any(|r| r.kind == UnknownKind::MroMergeFailed));
    }

    #[test]
    fn a_class_listed_as_its_own_base_does_not_recurse_forever() {
        let mut h = ClassHierarchyManager::new();
        let a = obj(0);
        h.add_class(a, Some("A"), &[]);
        // A malformed `__bases__` reassignment (update_bases) can make a
        // class its own base, directly or through a cycle.
        h.update_bases(a, vec![a]);
        let mut unknowns = UnknownTracker::new(true, false);
        let mro = h.get_mro(a, &mut unknowns);
        assert_eq!(mro, vec![a]);
    }

    #[test]
    fn a_two_class_base_cycle_does_not_recurse_forever() {
        let mut h = ClassHierarchyManager::new();
        let a = obj(0);
        let b = obj(1);
        h.add_class(a, Some("A"), &[]);
        h.add_class(b, Some("B"), &[a]);
        h.update_bases(a, vec![b]);
        let mut unknowns = UnknownTracker::new(true, false);
        let mro_a = h.get_mro(a, &mut unknowns);
        assert_eq!(mro_a[0], a);
        let mro_b = h.get_mro(b, &mut unknowns);
        assert_eq!(mro_b[0], b);
    }

    #[test]
    fn diamond_inheritance_linearizes_left_to_right() {
        let mut h = ClassHierarchyManager::new();
        let a = obj(0);
        let b = obj(1);
        let c = obj(2);
        let d = obj(3);
        h.add_class(a, Some("A"), &[]);
        h.add_class(b, Some("B"), &[a]);
        h.add_class(c, Some("C"), &[a]);
        h.add_class(d, Some("D"), &[b, c]);
        let mut unknowns = UnknownTracker::new(true, false);
        assert_eq!(h.get_mro(d, &mut unknowns), vec![d, b, c, a]);
    }
}
