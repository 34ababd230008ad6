//! Graph-aware identity derivation. Pure: reads the graph, never mutates it,
//! never panics. The baked-identity override is an injected capability so the
//! baking subsystem can feed precomputed ids back in without a dependency
//! cycle; `NoBakedIds` is the default for hosts that never bake.

use rebind_ids::{NodeId, UniqueId, item_id, path_id};

use crate::graph::{SceneGraph, full_name_path};

/// A precomputed identity override, keyed by scene + full path at bake time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakedIdentity {
    pub path_id: String,
    pub item_id: String,
    pub unique_id: String,
}

pub trait BakedLookup {
    fn baked_for_path(&self, scene: &str, path: &str) -> Option<BakedIdentity>;
}

/// Null object: no baked overrides.
pub struct NoBakedIds;

impl BakedLookup for NoBakedIds {
    fn baked_for_path(&self, _scene: &str, _path: &str) -> Option<BakedIdentity> {
        None
    }
}

/// Everything the identity generator can say about one live node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub unique_id: String,
    pub path_id: String,
    pub item_id: String,
    pub object_path: String,
    pub object_name: String,
}

/// Derive identity for `node`, consulting the baked override first and
/// falling back to structural derivation. `None` for an absent node.
pub fn identity_of(
    graph: &dyn SceneGraph,
    node: NodeId,
    baked: &dyn BakedLookup,
) -> Option<NodeIdentity> {
    let path = full_name_path(graph, node)?;
    let name = graph.name(node)?;
    let scene = graph.scene_name();

    if let Some(hit) = baked.baked_for_path(&scene, &path) {
        return Some(NodeIdentity {
            unique_id: hit.unique_id,
            path_id: hit.path_id,
            item_id: hit.item_id,
            object_path: path,
            object_name: name,
        });
    }

    structural_identity(graph, node, &scene, &path, &name)
}

/// Derive identity purely from graph structure, bypassing any baked override.
/// This is the write path used by the baker itself.
pub fn structural_identity(
    graph: &dyn SceneGraph,
    node: NodeId,
    scene: &str,
    path: &str,
    name: &str,
) -> Option<NodeIdentity> {
    let sibling = graph.sibling_index(node)?;
    let pid = path_id(path);
    let iid = item_id(name, scene, sibling);

    let unique = match UniqueId::compose(&pid, &iid) {
        Some(id) => id,
        None => {
            let pos = graph
                .transform(node)
                .map(|t| (t.position.x, t.position.y, t.position.z))
                .unwrap_or((0.0, 0.0, 0.0));
            UniqueId::legacy(scene, path, pos)
        }
    };

    Some(NodeIdentity {
        unique_id: unique,
        path_id: pid,
        item_id: iid,
        object_path: path.to_string(),
        object_name: name.to_string(),
    })
}

/// Structural identity for `node` with scene/path/name derived from the
/// graph. `None` for an absent node.
pub fn structural_identity_of(graph: &dyn SceneGraph, node: NodeId) -> Option<NodeIdentity> {
    let path = full_name_path(graph, node)?;
    let name = graph.name(node)?;
    let scene = graph.scene_name();
    structural_identity(graph, node, &scene, &path, &name)
}

/// UniqueId string for `node`; empty string for an absent node.
pub fn unique_id(graph: &dyn SceneGraph, node: NodeId, baked: &dyn BakedLookup) -> String {
    identity_of(graph, node, baked)
        .map(|i| i.unique_id)
        .unwrap_or_default()
}
