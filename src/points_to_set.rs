// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Domain points-to set (C10 payload): objects partitioned into plain
//! objects, class methods, and instance methods, so that inheritance and
//! delivery transforms only touch the partition they apply to. See
//! `original_source/pythonstan/analysis/pointer/kcfa/points_to_set.py`.
//! Built atop the domain-agnostic [`crate::pts_set::points_to::HybridPointsToSet`].

use std::fmt;

use crate::ids::ObjectId;
use crate::object::{AbstractObject, ObjectFactory};
use crate::pts_set::points_to::{HybridPointsToSet, PointsToSet as _};

/// A points-to set, internally partitioned by method role. `singleton`
/// classifies a freshly-created object into the right partition based on
/// whether its *declared* function is a classmethod, not its current
/// binding state (SPEC_FULL supplement #8): a method object keeps its
/// classmethod-ness for its whole life even as `class_obj`/`instance_obj`
/// get rebound by inheritance/delivery.
#[derive(Clone)]
pub struct Pts {
    pub plain_objects: HybridPointsToSet<ObjectId>,
    pub class_methods: HybridPointsToSet<ObjectId>,
    pub instance_methods: HybridPointsToSet<ObjectId>,
}

impl Default for Pts {
    fn default() -> Self {
        Pts::empty()
    }
}

impl Pts {
    pub fn empty() -> Self {
        Pts {
            plain_objects: HybridPointsToSet::new(),
            class_methods: HybridPointsToSet::new(),
            instance_methods: HybridPointsToSet::new(),
        }
    }

    pub fn singleton(obj: ObjectId, factory: &ObjectFactory, is_class_method: bool) -> Self {
        let mut pts = Self::empty();
        pts.insert_classified(obj, factory, is_class_method);
        pts
    }

    fn insert_classified(&mut self, obj: ObjectId, factory: &ObjectFactory, is_class_method: bool) -> bool {
        match factory.get(obj) {
            AbstractObject::Method { .. } if is_class_method => self.class_methods.insert(obj),
            AbstractObject::Method { .. } => self.instance_methods.insert(obj),
            _ => self.plain_objects.insert(obj),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.plain_objects.is_empty() && self.class_methods.is_empty() && self.instance_methods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plain_objects.count() + self.class_methods.count() + self.instance_methods.count()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.plain_objects.iter().chain(self.class_methods.iter()).chain(self.instance_methods.iter())
    }

    pub fn contains(&self, obj: ObjectId) -> bool {
        self.plain_objects.contains(obj) || self.class_methods.contains(obj) || self.instance_methods.contains(obj)
    }

    /// Merges `other` in, returning `true` if anything new was added
    /// (used by the solver to detect growth).
    pub fn union_in_place(&mut self, other: &Pts) -> bool {
        let a = self.plain_objects.union(&other.plain_objects);
        let b = self.class_methods.union(&other.class_methods);
        let c = self.instance_methods.union(&other.instance_methods);
        a || b || c
    }

    pub fn intersection(&self, other: &Pts) -> Pts {
        let mut plain_objects = self.plain_objects.clone();
        plain_objects.intersect(&other.plain_objects);
        let mut class_methods = self.class_methods.clone();
        class_methods.intersect(&other.class_methods);
        let mut instance_methods = self.instance_methods.clone();
        instance_methods.intersect(&other.instance_methods);
        Pts { plain_objects, class_methods, instance_methods }
    }

    pub fn difference(&self, other: &Pts) -> Pts {
        let mut plain_objects = self.plain_objects.clone();
        plain_objects.subtract(&other.plain_objects);
        let mut class_methods = self.class_methods.clone();
        class_methods.subtract(&other.class_methods);
        let mut instance_methods = self.instance_methods.clone();
        instance_methods.subtract(&other.instance_methods);
        Pts { plain_objects, class_methods, instance_methods }
    }

    /// Rebinds every class-method to `new_cls`; plain objects and
    /// instance methods pass through unchanged (`points_to_set.py`'s
    /// `inherit_to`).
    pub fn inherit_to(&self, new_cls: ObjectId, factory: &mut ObjectFactory) -> Pts {
        let mut out = Pts { plain_objects: self.plain_objects.clone(), class_methods: HybridPointsToSet::new(), instance_methods: self.instance_methods.clone() };
        for m in self.class_methods.iter() {
            let rebound = factory.get(m).inherit_into(new_cls);
            let id = factory.intern(rebound);
            out.class_methods.insert(id);
        }
        out
    }

    /// Rebinds every instance-method to `new_inst`; other partitions pass
    /// through unchanged (`points_to_set.py`'s `deliver_into`).
    pub fn deliver_into(&self, new_inst: ObjectId, factory: &mut ObjectFactory) -> Pts {
        let mut out = Pts { plain_objects: self.plain_objects.clone(), class_methods: self.class_methods.clone(), instance_methods: HybridPointsToSet::new() };
        for m in self.instance_methods.iter() {
            let rebound = factory.get(m).deliver_into(new_inst);
            let id = factory.intern(rebound);
            out.instance_methods.insert(id);
        }
        out
    }
}

impl fmt::Debug for Pts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pts {{ plain: {}, class_methods: {}, instance_methods: {} }}",
            self.plain_objects.count(),
            self.class_methods.count(),
            self.instance_methods.count()
        )
    }
}
