// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Pointer flow graph (C10). See
//! `original_source/pythonstan/analysis/pointer/kcfa/pointer_flow_graph.py`.

use std::collections::{HashMap, HashSet};

use crate::ids::{ObjectId, PointerId};
use crate::object::ObjectFactory;
use crate::points_to_set::Pts;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum PointerFlowKind {
    Normal,
    /// Edge target is a class-object field access: rebinds class-methods
    /// in the propagated set onto the target class.
    Inherit { target_class: ObjectId },
    /// Edge target is an instance-object field access: rebinds
    /// instance-methods in the propagated set onto the source instance.
    Instance { source_instance: ObjectId },
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct PointerFlowEdge {
    pub source: PointerId,
    pub target: PointerId,
    pub kind: PointerFlowKind,
}

impl PointerFlowEdge {
    pub fn flow_through(&self, pts: &Pts, factory: &mut ObjectFactory) -> Pts {
        match self.kind {
            PointerFlowKind::Normal => pts.clone(),
            PointerFlowKind::Inherit { target_class } => pts.inherit_to(target_class, factory),
            PointerFlowKind::Instance { source_instance } => pts.deliver_into(source_instance, factory),
        }
    }
}

/// A predicate node: only objects satisfying `filter` pass through.
pub struct GuardNode {
    pub filter: Box<dyn Fn(ObjectId, &ObjectFactory) -> bool + Send + Sync>,
}

impl GuardNode {
    pub fn apply(&self, pts: &Pts, factory: &mut ObjectFactory) -> Pts {
        let mut out = Pts::empty();
        for obj in pts.iter() {
            if (self.filter)(obj, factory) {
                let is_cm = pts.class_methods.contains(obj);
                let is_im = pts.instance_methods.contains(obj);
                if is_cm {
                    out.class_methods.insert(obj);
                } else if is_im {
                    out.instance_methods.insert(obj);
                } else {
                    out.plain_objects.insert(obj);
                }
            }
        }
        out
    }
}

/// Gives deterministic priority among several incoming edges: only the
/// edge with the currently-least index forwards; a later edge at a
/// strictly greater index is dropped silently, ties are all forwarded
/// (`pointer_flow_graph.py`'s `SelectorNode`).
#[derive(Default)]
pub struct SelectorNode {
    edge_index: HashMap<PointerFlowEdge, usize>,
    least_index: Option<usize>,
}

impl SelectorNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, edge: PointerFlowEdge, index: usize) {
        self.edge_index.insert(edge, index);
        self.least_index = Some(match self.least_index {
            Some(cur) => cur.min(index),
            None => index,
        });
    }

    /// Returns `Some(pts)` if `edge` is at or before the current least
    /// index, else `None` (dropped).
    pub fn admit(&self, edge: &PointerFlowEdge, pts: Pts) -> Option<Pts> {
        let idx = *self.edge_index.get(edge)?;
        match self.least_index {
            Some(least) if idx <= least => Some(pts),
            _ => None,
        }
    }
}

/// The pointer flow graph: nodes identified by [`PointerId`] (a contextual
/// variable or field access), edges typed per [`PointerFlowKind`].
#[derive(Default)]
pub struct PointerFlowGraph {
    succs: HashMap<PointerId, HashSet<PointerFlowEdge>>,
    preds: HashMap<PointerId, HashSet<PointerFlowEdge>>,
    nodes: HashSet<PointerId>,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: PointerId) {
        self.nodes.insert(node);
    }

    /// Adds the edge if not already present; returns `true` if newly added.
    pub fn add_edge(&mut self, edge: PointerFlowEdge) -> bool {
        self.add_node(edge.source);
        self.add_node(edge.target);
        let added = self.succs.entry(edge.source).or_default().insert(edge);
        self.preds.entry(edge.target).or_default().insert(edge);
        added
    }

    pub fn get_succs(&self, node: PointerId) -> impl Iterator<Item = &PointerFlowEdge> {
        self.succs.get(&node).into_iter().flatten()
    }

    pub fn get_preds(&self, node: PointerId) -> impl Iterator<Item = &PointerFlowEdge> {
        self.preds.get(&node).into_iter().flatten()
    }

    pub fn nodes(&self) -> impl Iterator<Item = PointerId> + '_ {
        self.nodes.iter().copied()
    }

    /// Propagates `pts` out of `node` along every outgoing edge, applying
    /// each edge's transform. Returns `(target, transformed_pts)` pairs
    /// for edges whose transformed set is non-empty.
    pub fn propagate(&self, node: PointerId, pts: &Pts, factory: &mut ObjectFactory) -> Vec<(PointerId, Pts)> {
        let mut out = Vec::new();
        let edges: Vec<PointerFlowEdge> = self.get_succs(node).copied().collect();
        for edge in edges {
            let transformed = edge.flow_through(pts, factory);
            if !transformed.is_empty() {
                out.push((edge.target, transformed));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{AbstractObject, AllocSite};

    fn dummy_method(factory: &mut ObjectFactory, tag: &str, class_obj: Option<ObjectId>, instance_obj: Option<ObjectId>) -> ObjectId {
        let context = crate::ids::ContextId::new(0);
        let alloc_site = AllocSite::Builtin { qualname: tag.to_string(), kind: crate::object::AllocKind::Method };
        factory.intern(AbstractObject::Method {
            context,
            alloc_site,
            container_scope: crate::ids::IrScopeId::new(0),
            ir: crate::ids::IrScopeId::new(0),
            class_obj,
            instance_obj,
        })
    }

    #[test]
    fn normal_edge_passes_the_points_to_set_through_unchanged() {
        let mut factory = ObjectFactory::new();
        let obj = factory.intern(AbstractObject::Plain {
            context: crate::ids::ContextId::new(0),
            alloc_site: AllocSite::Builtin { qualname: "x".into(), kind: crate::object::AllocKind::Object },
        });
        let pts = Pts::singleton(obj, &factory, false);
        let edge = PointerFlowEdge { source: PointerId::new(0), target: PointerId::new(1), kind: PointerFlowKind::Normal };
        let out = edge.flow_through(&pts, &mut factory);
        assert_eq!(out.len(), 1);
        assert!(out.contains(obj));
    }

    #[test]
    fn inherit_edge_rebinds_class_methods_onto_the_target_class() {
        let mut factory = ObjectFactory::new();
        let method = dummy_method(&mut factory, "m", None, None);
        let pts = Pts::singleton(method, &factory, true);
        assert!(!pts.class_methods.is_empty());

        let target_class = crate::ids::ObjectId::new(99);
        let edge = PointerFlowEdge {
            source: PointerId::new(0),
            target: PointerId::new(1),
            kind: PointerFlowKind::Inherit { target_class },
        };
        let out = edge.flow_through(&pts, &mut factory);
        assert_eq!(out.len(), 1);
        let rebound = out.iter().next().unwrap();
        assert_ne!(rebound, method);
        match factory.get(rebound) {
            AbstractObject::Method { class_obj, .. } => assert_eq!(*class_obj, Some(target_class)),
            other => panic!("expected a rebound Method, got {other:?}"),
        }
    }

    #[test]
    fn instance_edge_rebinds_instance_methods_and_leaves_plain_objects_alone() {
        let mut factory = ObjectFactory::new();
        let method = dummy_method(&mut factory, "n", None, None);
        let plain = factory.intern(AbstractObject::Plain {
            context: crate::ids::ContextId::new(0),
            alloc_site: AllocSite::Builtin { qualname: "y".into(), kind: crate::object::AllocKind::Object },
        });
        let mut pts = Pts::singleton(method, &factory, false);
        pts.union_in_place(&Pts::singleton(plain, &factory, false));

        let source_instance = crate::ids::ObjectId::new(7);
        let edge = PointerFlowEdge {
            source: PointerId::new(0),
            target: PointerId::new(1),
            kind: PointerFlowKind::Instance { source_instance },
        };
        let out = edge.flow_through(&pts, &mut factory);
        assert_eq!(out.len(), 2);
        assert!(out.contains(plain));
        assert!(!out.contains(method));
    }

    #[test]
    fn propagate_skips_edges_whose_transformed_set_is_empty() {
        let mut factory = ObjectFactory::new();
        let mut graph = PointerFlowGraph::new();
        let source = PointerId::new(0);
        let target = PointerId::new(1);
        graph.add_edge(PointerFlowEdge { source, target, kind: PointerFlowKind::Normal });
        let out = graph.propagate(source, &Pts::empty(), &mut factory);
        assert!(out.is_empty());
    }

    #[test]
    fn selector_node_admits_only_the_least_index_edge() {
        let mut sel = SelectorNode::new();
        let source = PointerId::new(0);
        let target = PointerId::new(1);
        let e0 = PointerFlowEdge { source, target, kind: PointerFlowKind::Normal };
        let e1 = PointerFlowEdge { source: PointerId::new(2), target, kind: PointerFlowKind::Normal };
        sel.add_edge(e0, 0);
        sel.add_edge(e1, 1);
        assert!(sel.admit(&e0, Pts::empty()).is_some());
        assert!(sel.admit(&e1, Pts::empty()).is_none());
    }
}
