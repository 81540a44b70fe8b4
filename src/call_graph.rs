// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Call graph over scopes. Adapted from
//! `rustanlys-rupta/src/graph/call_graph.rs`'s `petgraph`-backed
//! structure; dropped the `dot_fmt`/graphviz export and the Rust-type
//! `CGFunction` trait bound, since scope identity here is just a
//! [`ScopeId`].

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::Graph;

use crate::ids::{CallSiteId, ScopeId};
use crate::util::chunked_queue::{self, ChunkedQueue};

pub type CgNodeId = NodeIndex<DefaultIx>;
pub type CgEdgeId = EdgeIndex<DefaultIx>;

#[derive(Debug)]
pub struct CallGraphNode {
    pub scope: ScopeId,
}

#[derive(Debug)]
pub struct CallGraphEdge {
    pub call_site: CallSiteId,
}

/// Call graph: nodes are analysis-time scopes, edges are call sites.
pub struct CallGraph {
    pub graph: Graph<CallGraphNode, CallGraphEdge>,
    pub scope_nodes: HashMap<ScopeId, CgNodeId>,
    pub callsite_to_edges: HashMap<CallSiteId, HashSet<CgEdgeId>>,
    reach_scopes: ChunkedQueue<ScopeId>,
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CallGraph {
    pub fn new() -> Self {
        CallGraph {
            graph: Graph::new(),
            scope_nodes: HashMap::new(),
            callsite_to_edges: HashMap::new(),
            reach_scopes: ChunkedQueue::new(),
        }
    }

    pub fn add_node(&mut self, scope: ScopeId) {
        if let Entry::Vacant(e) = self.scope_nodes.entry(scope) {
            let node_id = self.graph.add_node(CallGraphNode { scope });
            e.insert(node_id);
            self.reach_scopes.push(scope);
        }
    }

    fn get_or_insert_node(&mut self, scope: ScopeId) -> CgNodeId {
        match self.scope_nodes.entry(scope) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                self.reach_scopes.push(scope);
                let node_id = self.graph.add_node(CallGraphNode { scope });
                *v.insert(node_id)
            }
        }
    }

    pub fn get_callees(&self, call_site: CallSiteId) -> HashSet<ScopeId> {
        self.callsite_to_edges
            .get(&call_site)
            .into_iter()
            .flatten()
            .filter_map(|&edge_id| self.graph.edge_endpoints(edge_id))
            .filter_map(|(_, target)| self.graph.node_weight(target).map(|n| n.scope))
            .collect()
    }

    pub fn has_edge(&self, call_site: CallSiteId, callee: ScopeId) -> bool {
        self.get_callees(call_site).contains(&callee)
    }

    /// Adds a call edge `caller --call_site--> callee`. Returns `true` if
    /// this edge is new.
    pub fn add_edge(&mut self, call_site: CallSiteId, caller: ScopeId, callee: ScopeId) -> bool {
        let caller_node = self.get_or_insert_node(caller);
        let callee_node = self.get_or_insert_node(callee);
        if self.has_edge(call_site, callee) {
            return false;
        }
        let edge_id = self.graph.add_edge(caller_node, callee_node, CallGraphEdge { call_site });
        self.callsite_to_edges.entry(call_site).or_default().insert(edge_id);
        true
    }

    pub fn reach_scopes_iter(&self) -> chunked_queue::IterCopied<'_, ScopeId> {
        self.reach_scopes.iter_copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Scopes with no incoming call edge and no outgoing call edge either
    /// — candidates for "unreachable from any entry point" reporting.
    pub fn in_degree(&self, scope: ScopeId) -> usize {
        self.scope_nodes
            .get(&scope)
            .map(|&n| self.graph.neighbors_directed(n, petgraph::Direction::Incoming).count())
            .unwrap_or(0)
    }

    pub fn out_degree(&self, scope: ScopeId) -> usize {
        self.scope_nodes
            .get(&scope)
            .map(|&n| self.graph.neighbors_directed(n, petgraph::Direction::Outgoing).count())
            .unwrap_or(0)
    }
}
