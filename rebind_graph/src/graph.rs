//! Host collaborator contracts. The host owns the scene graph; this crate
//! only reads it and pokes transforms/active flags back through these traits.
//! Optional capabilities (physics, animation, selection) default to "absent"
//! so a minimal host implements only the structural surface.

use log::warn;
use rebind_ids::NodeId;

use crate::transform::Transform;

/// Name suffix hosts append to nodes instantiated at runtime. The spawn
/// matcher strips it to recover the prefab base name.
pub const SPAWNED_NAME_SUFFIX: &str = "(Spawned)";

/// A live, mutable, host-owned scene graph. Children enumeration includes
/// inactive nodes; handles are only valid against the graph that issued them.
pub trait SceneGraph {
    fn scene_name(&self) -> String;
    fn roots(&self) -> Vec<NodeId>;
    fn contains(&self, node: NodeId) -> bool;
    fn name(&self, node: NodeId) -> Option<String>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn sibling_index(&self, node: NodeId) -> Option<usize>;
    fn transform(&self, node: NodeId) -> Option<Transform>;
    fn set_transform(&mut self, node: NodeId, transform: Transform) -> bool;
    fn is_active(&self, node: NodeId) -> bool;
    fn set_active(&mut self, node: NodeId, active: bool) -> bool;

    fn has_physics_body(&self, _node: NodeId) -> bool {
        false
    }

    fn is_kinematic(&self, _node: NodeId) -> bool {
        false
    }

    fn set_kinematic(&mut self, _node: NodeId, _kinematic: bool) {}

    fn has_animator(&self, _node: NodeId) -> bool {
        false
    }

    fn is_animator_enabled(&self, _node: NodeId) -> bool {
        false
    }

    fn set_animator_enabled(&mut self, _node: NodeId, _enabled: bool) {}

    /// The node the user currently has selected, when the host exposes an
    /// inspection mechanism. Absent gracefully otherwise.
    fn selected(&self) -> Option<NodeId> {
        None
    }

    /// Create a fresh root node. Hosts that only expose a read/patch surface
    /// leave the default, and instantiation degrades to a no-op.
    fn spawn_root(&mut self, _name: &str, _transform: Transform) -> Option<NodeId> {
        None
    }
}

/// Prefab/asset catalog: instantiate by reference path, or enumerate entries.
pub trait PrefabCatalog {
    fn instantiate(&mut self, graph: &mut dyn SceneGraph, prefab_path: &str) -> Option<NodeId>;
    fn list(&self, category: &str, search: &str) -> Vec<String>;
}

/// Null-object catalog for hosts without prefab support.
pub struct NullCatalog;

impl PrefabCatalog for NullCatalog {
    fn instantiate(&mut self, _graph: &mut dyn SceneGraph, prefab_path: &str) -> Option<NodeId> {
        warn!("no prefab catalog available, cannot instantiate `{prefab_path}`");
        None
    }

    fn list(&self, _category: &str, _search: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Full ancestor-name path, `"Root/Child/Leaf"`. `None` for an absent node.
pub fn full_name_path(graph: &dyn SceneGraph, node: NodeId) -> Option<String> {
    let mut segments = vec![graph.name(node)?];
    let mut current = node;
    while let Some(parent) = graph.parent(current) {
        segments.push(graph.name(parent)?);
        current = parent;
    }
    segments.reverse();
    Some(segments.join("/"))
}

/// Sibling-index path from the root, `"0/2/1"`. `None` for an absent node.
pub fn sibling_index_path(graph: &dyn SceneGraph, node: NodeId) -> Option<String> {
    let mut indices = vec![graph.sibling_index(node)?];
    let mut current = node;
    while let Some(parent) = graph.parent(current) {
        indices.push(graph.sibling_index(parent)?);
        current = parent;
    }
    indices.reverse();
    let parts: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
    Some(parts.join("/"))
}

/// Tree-walking path resolver: descend child-by-child matching segment names.
/// The root segment is matched against the graph's root nodes.
pub fn resolve_path(graph: &dyn SceneGraph, path: &str, case_insensitive: bool) -> Option<NodeId> {
    let mut segments = path.split('/');
    let root_name = segments.next()?;

    let mut current = pick_by_name(graph, &graph.roots(), root_name, case_insensitive)?;
    for segment in segments {
        current = pick_by_name(graph, &graph.children(current), segment, case_insensitive)?;
    }
    Some(current)
}

fn pick_by_name(
    graph: &dyn SceneGraph,
    candidates: &[NodeId],
    name: &str,
    case_insensitive: bool,
) -> Option<NodeId> {
    candidates.iter().copied().find(|&id| {
        graph.name(id).is_some_and(|n| {
            if case_insensitive {
                n.eq_ignore_ascii_case(name)
            } else {
                n == name
            }
        })
    })
}

/// DFS over `node` and every descendant, inactive nodes included.
pub fn collect_subtree(graph: &dyn SceneGraph, node: NodeId, out: &mut Vec<NodeId>) {
    if !graph.contains(node) {
        return;
    }
    out.push(node);
    for child in graph.children(node) {
        collect_subtree(graph, child, out);
    }
}
