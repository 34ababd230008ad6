//! Whole-graph indexing. Every reconciliation pass re-walks the live graph
//! (inactive nodes included) and builds five lookup tables the matcher
//! consults in cascade order. The walk is resumable so a large graph can be
//! indexed over several scheduler ticks.

use std::collections::HashMap;

use rebind_graph::SceneGraph;
use rebind_ids::{NodeId, item_id, path_id};

/// First-enumerated-wins lookup tables over one snapshot of the graph.
#[derive(Default)]
pub struct GraphIndex {
    pub by_full_path: HashMap<String, NodeId>,
    pub by_name: HashMap<String, Vec<NodeId>>,
    pub by_sibling_path: HashMap<String, NodeId>,
    pub by_path_id: HashMap<String, NodeId>,
    pub by_item_id: HashMap<String, NodeId>,
    nodes_indexed: usize,
}

impl GraphIndex {
    pub fn len(&self) -> usize {
        self.nodes_indexed
    }

    pub fn is_empty(&self) -> bool {
        self.nodes_indexed == 0
    }
}

struct Pending {
    node: NodeId,
    sibling_index: usize,
    parent_path: String,
    parent_sibling_path: String,
}

/// Resumable DFS index builder. `step` consumes a per-tick node budget;
/// `finish` yields the completed index.
pub struct IndexBuilder {
    scene: String,
    stack: Vec<Pending>,
    index: GraphIndex,
}

impl IndexBuilder {
    pub fn begin(graph: &dyn SceneGraph) -> Self {
        let scene = graph.scene_name();
        let mut stack = Vec::new();
        // Reverse push order so the DFS visits siblings in enumeration order.
        for (i, root) in graph.roots().into_iter().enumerate().rev() {
            stack.push(Pending {
                node: root,
                sibling_index: i,
                parent_path: String::new(),
                parent_sibling_path: String::new(),
            });
        }
        Self {
            scene,
            stack,
            index: GraphIndex::default(),
        }
    }

    /// Index up to `budget` nodes. Returns true when the walk is complete.
    pub fn step(&mut self, graph: &dyn SceneGraph, budget: usize) -> bool {
        let mut remaining = budget.max(1);
        while remaining > 0 {
            let Some(pending) = self.stack.pop() else {
                return true;
            };
            remaining -= 1;

            let Some(name) = graph.name(pending.node) else {
                continue; // vanished between snapshot and visit
            };

            let full_path = if pending.parent_path.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", pending.parent_path, name)
            };
            let sib_path = if pending.parent_sibling_path.is_empty() {
                pending.sibling_index.to_string()
            } else {
                format!("{}/{}", pending.parent_sibling_path, pending.sibling_index)
            };

            let pid = path_id(&full_path);
            let iid = item_id(&name, &self.scene, pending.sibling_index);

            self.index
                .by_full_path
                .entry(full_path.clone())
                .or_insert(pending.node);
            self.index
                .by_sibling_path
                .entry(sib_path.clone())
                .or_insert(pending.node);
            if !pid.is_empty() {
                self.index.by_path_id.entry(pid).or_insert(pending.node);
            }
            if !iid.is_empty() {
                self.index.by_item_id.entry(iid).or_insert(pending.node);
            }
            self.index
                .by_name
                .entry(name)
                .or_default()
                .push(pending.node);
            self.index.nodes_indexed += 1;

            for (i, child) in graph.children(pending.node).into_iter().enumerate().rev() {
                self.stack.push(Pending {
                    node: child,
                    sibling_index: i,
                    parent_path: full_path.clone(),
                    parent_sibling_path: sib_path.clone(),
                });
            }
        }
        self.stack.is_empty()
    }

    pub fn finish(self) -> GraphIndex {
        self.index
    }
}
