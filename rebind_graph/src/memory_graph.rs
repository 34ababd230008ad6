//! In-memory reference implementation of the host contracts. Backs every test
//! suite in the workspace and headless tooling; real hosts bridge their own
//! graph instead.

use rebind_ids::NodeId;

use crate::graph::{PrefabCatalog, SPAWNED_NAME_SUFFIX, SceneGraph};
use crate::transform::Transform;

struct MemoryNode {
    name: String,
    parent: NodeId,
    children: Vec<NodeId>,
    transform: Transform,
    active: bool,
    physics_body: bool,
    kinematic: bool,
    animator: bool,
    animator_enabled: bool,
}

struct Slot {
    generation: u32,
    node: Option<MemoryNode>,
}

/// Slot-arena scene graph. NodeIds carry index + generation; slot reuse bumps
/// the generation so stale handles stop resolving.
pub struct MemoryGraph {
    scene: String,
    slots: Vec<Slot>,
    roots: Vec<NodeId>,
    selected: Option<NodeId>,
}

impl MemoryGraph {
    pub fn new(scene: impl Into<String>) -> Self {
        Self {
            scene: scene.into(),
            slots: Vec::new(),
            roots: Vec::new(),
            selected: None,
        }
    }

    /// Insert a node. `parent` of `None` makes it a root, appended last so
    /// sibling ordering is stable under additive changes.
    pub fn add_node(&mut self, parent: Option<NodeId>, name: impl Into<String>) -> NodeId {
        let node = MemoryNode {
            name: name.into(),
            parent: parent.unwrap_or_else(NodeId::nil),
            children: Vec::new(),
            transform: Transform::IDENTITY,
            active: true,
            physics_body: false,
            kinematic: false,
            animator: false,
            animator_enabled: true,
        };

        let id = self.alloc(node);
        match parent {
            Some(p) if self.get(p).is_some() => {
                self.get_mut(p).unwrap().children.push(id);
            }
            _ => self.roots.push(id),
        }
        id
    }

    /// Remove a node and its whole subtree.
    pub fn remove_node(&mut self, node: NodeId) {
        let Some(n) = self.get(node) else { return };
        for child in n.children.clone() {
            self.remove_node(child);
        }
        if let Some(n) = self.free(node) {
            if n.parent.is_nil() {
                self.roots.retain(|&r| r != node);
            } else if let Some(p) = self.get_mut(n.parent) {
                p.children.retain(|&c| c != node);
            }
        }
    }

    pub fn set_physics_body(&mut self, node: NodeId, enabled: bool) {
        if let Some(n) = self.get_mut(node) {
            n.physics_body = enabled;
        }
    }

    pub fn set_animator(&mut self, node: NodeId, enabled: bool) {
        if let Some(n) = self.get_mut(node) {
            n.animator = enabled;
        }
    }

    pub fn set_selected(&mut self, node: Option<NodeId>) {
        self.selected = node;
    }

    fn alloc(&mut self, node: MemoryNode) -> NodeId {
        // Reuse the first free slot, bumping its generation.
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.is_none() {
                slot.generation = slot.generation.wrapping_add(1);
                slot.node = Some(node);
                return NodeId::from_parts((idx + 1) as u32, slot.generation);
            }
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::from_parts(self.slots.len() as u32, 0)
    }

    fn free(&mut self, id: NodeId) -> Option<MemoryNode> {
        let idx = self.slot_index(id)?;
        self.slots[idx].node.take()
    }

    fn slot_index(&self, id: NodeId) -> Option<usize> {
        if id.is_nil() {
            return None;
        }
        let idx = (id.index() as usize).checked_sub(1)?;
        let slot = self.slots.get(idx)?;
        if slot.generation != id.generation() || slot.node.is_none() {
            return None;
        }
        Some(idx)
    }

    fn get(&self, id: NodeId) -> Option<&MemoryNode> {
        let idx = self.slot_index(id)?;
        self.slots[idx].node.as_ref()
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut MemoryNode> {
        let idx = self.slot_index(id)?;
        self.slots[idx].node.as_mut()
    }
}

impl SceneGraph for MemoryGraph {
    fn scene_name(&self) -> String {
        self.scene.clone()
    }

    fn roots(&self) -> Vec<NodeId> {
        self.roots.clone()
    }

    fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    fn name(&self, node: NodeId) -> Option<String> {
        self.get(node).map(|n| n.name.clone())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.get(node)?.parent;
        if parent.is_nil() { None } else { Some(parent) }
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn sibling_index(&self, node: NodeId) -> Option<usize> {
        let n = self.get(node)?;
        let siblings = if n.parent.is_nil() {
            &self.roots
        } else {
            &self.get(n.parent)?.children
        };
        siblings.iter().position(|&s| s == node)
    }

    fn transform(&self, node: NodeId) -> Option<Transform> {
        self.get(node).map(|n| n.transform)
    }

    fn set_transform(&mut self, node: NodeId, transform: Transform) -> bool {
        match self.get_mut(node) {
            Some(n) => {
                n.transform = transform;
                true
            }
            None => false,
        }
    }

    fn is_active(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(|n| n.active)
    }

    fn set_active(&mut self, node: NodeId, active: bool) -> bool {
        match self.get_mut(node) {
            Some(n) => {
                n.active = active;
                true
            }
            None => false,
        }
    }

    fn has_physics_body(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(|n| n.physics_body)
    }

    fn is_kinematic(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(|n| n.kinematic)
    }

    fn set_kinematic(&mut self, node: NodeId, kinematic: bool) {
        if let Some(n) = self.get_mut(node) {
            n.kinematic = kinematic;
        }
    }

    fn has_animator(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(|n| n.animator)
    }

    fn is_animator_enabled(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(|n| n.animator_enabled)
    }

    fn set_animator_enabled(&mut self, node: NodeId, enabled: bool) {
        if let Some(n) = self.get_mut(node) {
            n.animator_enabled = enabled;
        }
    }

    fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    fn spawn_root(&mut self, name: &str, transform: Transform) -> Option<NodeId> {
        let id = self.add_node(None, name);
        self.set_transform(id, transform);
        Some(id)
    }
}

/// In-memory catalog: prefab path → base node name, with a category label.
pub struct MemoryCatalog {
    entries: Vec<CatalogEntry>,
    default_placement: Transform,
}

struct CatalogEntry {
    path: String,
    base_name: String,
    category: String,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            default_placement: Transform::IDENTITY,
        }
    }

    pub fn with_default_placement(mut self, placement: Transform) -> Self {
        self.default_placement = placement;
        self
    }

    pub fn register(
        &mut self,
        path: impl Into<String>,
        base_name: impl Into<String>,
        category: impl Into<String>,
    ) {
        self.entries.push(CatalogEntry {
            path: path.into(),
            base_name: base_name.into(),
            category: category.into(),
        });
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefabCatalog for MemoryCatalog {
    fn instantiate(&mut self, graph: &mut dyn SceneGraph, prefab_path: &str) -> Option<NodeId> {
        let entry = self.entries.iter().find(|e| e.path == prefab_path)?;
        let name = format!("{}{}", entry.base_name, SPAWNED_NAME_SUFFIX);
        let placement = self.default_placement;

        // Host-owned default placement: instantiated as a root at the
        // catalog's default transform.
        graph.spawn_root(&name, placement)
    }

    fn list(&self, category: &str, search: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| category.is_empty() || e.category == category)
            .filter(|e| search.is_empty() || e.base_name.contains(search) || e.path.contains(search))
            .map(|e| e.path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{collect_subtree, full_name_path, resolve_path, sibling_index_path};
    use crate::identity::{NoBakedIds, identity_of, unique_id};
    use glam::Vec3;

    fn sample_graph() -> (MemoryGraph, NodeId, NodeId, NodeId) {
        let mut g = MemoryGraph::new("Warehouse");
        let root = g.add_node(None, "Root");
        let shelf = g.add_node(Some(root), "Shelf");
        let crate_node = g.add_node(Some(shelf), "Crate");
        (g, root, shelf, crate_node)
    }

    #[test]
    fn test_paths() {
        let (g, root, _, crate_node) = sample_graph();
        assert_eq!(full_name_path(&g, root).as_deref(), Some("Root"));
        assert_eq!(
            full_name_path(&g, crate_node).as_deref(),
            Some("Root/Shelf/Crate")
        );
        assert_eq!(sibling_index_path(&g, crate_node).as_deref(), Some("0/0/0"));
    }

    #[test]
    fn test_resolve_path_case_modes() {
        let (g, _, _, crate_node) = sample_graph();
        assert_eq!(resolve_path(&g, "Root/Shelf/Crate", false), Some(crate_node));
        assert_eq!(resolve_path(&g, "root/shelf/CRATE", false), None);
        assert_eq!(
            resolve_path(&g, "root/shelf/CRATE", true),
            Some(crate_node)
        );
        assert_eq!(resolve_path(&g, "Root/Missing", false), None);
    }

    #[test]
    fn test_identity_is_shape_deterministic() {
        let (g1, _, _, c1) = sample_graph();
        let (g2, _, _, c2) = sample_graph();
        let a = unique_id(&g1, c1, &NoBakedIds);
        let b = unique_id(&g2, c2, &NoBakedIds);
        assert!(!a.is_empty());
        assert_eq!(a, b);
        assert!(a.contains('+'));
    }

    #[test]
    fn test_identity_absent_node_is_empty() {
        let (mut g, _, _, crate_node) = sample_graph();
        g.remove_node(crate_node);
        assert_eq!(unique_id(&g, crate_node, &NoBakedIds), "");
    }

    #[test]
    fn test_identity_fields() {
        let (g, _, _, crate_node) = sample_graph();
        let id = identity_of(&g, crate_node, &NoBakedIds).unwrap();
        assert_eq!(id.object_path, "Root/Shelf/Crate");
        assert_eq!(id.object_name, "Crate");
        assert!(id.path_id.starts_with('P'));
        assert!(id.item_id.starts_with('I'));
        assert_eq!(id.unique_id, format!("{}+{}", id.path_id, id.item_id));
    }

    #[test]
    fn test_slot_reuse_invalidates_stale_handles() {
        let mut g = MemoryGraph::new("Warehouse");
        let a = g.add_node(None, "A");
        g.remove_node(a);
        let b = g.add_node(None, "B");
        assert_eq!(a.index(), b.index());
        assert!(!g.contains(a));
        assert!(g.contains(b));
    }

    #[test]
    fn test_collect_subtree_includes_inactive() {
        let (mut g, root, shelf, crate_node) = sample_graph();
        g.set_active(shelf, false);
        let mut out = Vec::new();
        collect_subtree(&g, root, &mut out);
        assert_eq!(out, vec![root, shelf, crate_node]);
    }

    #[test]
    fn test_sibling_index_tracks_order() {
        let mut g = MemoryGraph::new("Warehouse");
        let root = g.add_node(None, "Root");
        let a = g.add_node(Some(root), "A");
        let b = g.add_node(Some(root), "B");
        assert_eq!(g.sibling_index(a), Some(0));
        assert_eq!(g.sibling_index(b), Some(1));
    }

    #[test]
    fn test_catalog_instantiate_and_list() {
        let mut g = MemoryGraph::new("Warehouse");
        let mut catalog = MemoryCatalog::new()
            .with_default_placement(Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        catalog.register("props/crate", "Crate", "props");
        catalog.register("props/barrel", "Barrel", "props");

        assert_eq!(catalog.list("props", "Crate"), vec!["props/crate"]);
        assert_eq!(catalog.list("", "").len(), 2);

        let id = catalog.instantiate(&mut g, "props/crate").unwrap();
        assert_eq!(g.name(id).as_deref(), Some("Crate(Spawned)"));
        assert_eq!(g.transform(id).unwrap().position.y, 1.0);
        assert!(catalog.instantiate(&mut g, "props/missing").is_none());
    }
}
