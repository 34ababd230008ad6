//! In-memory record of current-session edits, written through to the store
//! after every discrete mutation. Host-layer failures (a node vanishing
//! mid-operation) are logged and leave the store at its last consistent
//! state; nothing here propagates an error to the host.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, warn};
use rebind_graph::{
    PrefabCatalog, SceneGraph, collect_subtree, full_name_path, identity_of, unique_id,
};
use rebind_ids::NodeId;
use rebind_store::{PersistenceDb, TransformRecord};

use crate::guard::ApplyGuard;

/// Tracks tag/destroy/spawn edits for the current session. A node is
/// "tagged" iff a transform record exists for its unique id.
pub struct SessionTracker {
    /// Per-scene cache of object paths flagged destroyed this session.
    destroyed_paths: HashMap<String, HashSet<String>>,
    guard: ApplyGuard,
}

impl SessionTracker {
    pub fn new(guard: ApplyGuard) -> Self {
        Self {
            destroyed_paths: HashMap::new(),
            guard,
        }
    }

    pub fn guard(&self) -> &ApplyGuard {
        &self.guard
    }

    pub fn is_path_destroyed(&self, scene: &str, path: &str) -> bool {
        self.destroyed_paths
            .get(scene)
            .is_some_and(|set| set.contains(path))
    }

    /// Ensure `node` carries an identity record, clear any destroyed flag,
    /// and record its current transform. Returns the unique id on success.
    pub fn tag_node(
        &mut self,
        graph: &dyn SceneGraph,
        db: &mut PersistenceDb,
        node: NodeId,
    ) -> Option<String> {
        let Some(identity) = identity_of(graph, node, &db.baked) else {
            warn!("tag: node {node} is gone, nothing recorded");
            return None;
        };
        let Some(t) = graph.transform(node) else {
            warn!("tag: node {node} has no transform, nothing recorded");
            return None;
        };
        let scene = graph.scene_name();
        let parent_path = graph
            .parent(node)
            .and_then(|p| full_name_path(graph, p))
            .unwrap_or_default();

        let mut rec = db
            .transforms
            .get(&scene, &identity.unique_id)
            .cloned()
            .unwrap_or_else(|| TransformRecord::new(&identity, &scene, &parent_path, t));
        rec.is_destroyed = false;
        rec.object_path = identity.object_path.clone();
        rec.object_name = identity.object_name.clone();
        rec.parent_path = parent_path;
        rec.set_transform(t);
        rec.children = graph
            .children(node)
            .into_iter()
            .map(|c| unique_id(graph, c, &db.baked))
            .filter(|id| !id.is_empty())
            .collect();

        if let Some(set) = self.destroyed_paths.get_mut(&scene) {
            set.remove(&identity.object_path);
        }

        db.transforms
            .insert(&scene, identity.unique_id.clone(), rec);
        db.transforms.save_logged();
        Some(identity.unique_id)
    }

    /// Flag `node` and every descendant destroyed in the store, cache their
    /// paths, and deactivate the live subtree immediately. Idempotent.
    pub fn mark_destroyed(
        &mut self,
        graph: &mut dyn SceneGraph,
        db: &mut PersistenceDb,
        node: NodeId,
    ) {
        let mut subtree = Vec::new();
        collect_subtree(graph, node, &mut subtree);
        if subtree.is_empty() {
            warn!("destroy: node {node} is gone, nothing recorded");
            return;
        }

        let scene = graph.scene_name();
        for &n in &subtree {
            let Some(identity) = identity_of(graph, n, &db.baked) else {
                continue;
            };
            let t = graph.transform(n).unwrap_or_default();
            let parent_path = graph
                .parent(n)
                .and_then(|p| full_name_path(graph, p))
                .unwrap_or_default();

            let mut rec = db
                .transforms
                .get(&scene, &identity.unique_id)
                .cloned()
                .unwrap_or_else(|| TransformRecord::new(&identity, &scene, &parent_path, t));
            rec.is_destroyed = true;
            self.destroyed_paths
                .entry(scene.clone())
                .or_default()
                .insert(identity.object_path.clone());
            db.transforms.insert(&scene, identity.unique_id, rec);
        }

        // Whole-subtree, unconditional: hosts are not required to cascade the
        // active flag down, so every collected node is deactivated explicitly.
        for &n in &subtree {
            if !graph.set_active(n, false) {
                warn!("destroy: could not deactivate node {n}");
            }
        }
        db.transforms.save_logged();
    }

    /// Instantiate `prefab_path` through the catalog (host-owned default
    /// placement) and record it as spawned.
    pub fn spawn_node(
        &mut self,
        graph: &mut dyn SceneGraph,
        catalog: &mut dyn PrefabCatalog,
        db: &mut PersistenceDb,
        prefab_path: &str,
    ) -> Option<NodeId> {
        let Some(node) = catalog.instantiate(graph, prefab_path) else {
            warn!("spawn: catalog could not instantiate `{prefab_path}`");
            return None;
        };
        let Some(identity) = identity_of(graph, node, &db.baked) else {
            warn!("spawn: instantiated node {node} vanished before tagging");
            return None;
        };
        let scene = graph.scene_name();
        let t = graph.transform(node).unwrap_or_default();

        let mut rec = TransformRecord::new(&identity, &scene, "", t);
        rec.is_spawned = true;
        rec.prefab_path = prefab_path.to_string();
        db.transforms
            .insert(&scene, identity.unique_id.clone(), rec);
        db.transforms.save_logged();
        debug!("spawned `{prefab_path}` as {}", identity.unique_id);
        Some(node)
    }

    /// Re-serialize every tagged, non-destroyed live node's transform for the
    /// current scene, carrying forward destroyed records that no live tagged
    /// node represents.
    pub fn save_all_tagged(&mut self, graph: &dyn SceneGraph, db: &mut PersistenceDb) {
        let scene = graph.scene_name();
        let old = db
            .transforms
            .scene(&scene)
            .cloned()
            .unwrap_or_default();

        let mut fresh: BTreeMap<String, TransformRecord> = old
            .iter()
            .filter(|(_, rec)| rec.is_destroyed)
            .map(|(id, rec)| (id.clone(), rec.clone()))
            .collect();

        let mut live = Vec::new();
        for root in graph.roots() {
            collect_subtree(graph, root, &mut live);
        }
        for node in live {
            let Some(identity) = identity_of(graph, node, &db.baked) else {
                continue;
            };
            let Some(prev) = old.get(&identity.unique_id) else {
                continue; // untagged
            };
            if prev.is_destroyed {
                continue;
            }
            let Some(t) = graph.transform(node) else {
                continue;
            };
            let mut rec = prev.clone();
            rec.object_path = identity.object_path.clone();
            rec.object_name = identity.object_name.clone();
            rec.parent_path = graph
                .parent(node)
                .and_then(|p| full_name_path(graph, p))
                .unwrap_or_default();
            rec.set_transform(t);
            fresh.insert(identity.unique_id, rec);
        }

        *db.transforms.scene_mut(&scene) = fresh;
        db.transforms.save_logged();
    }

    /// Change-detection hook the host calls on every transform delta.
    /// Suppressed while the reconciler holds the apply guard; otherwise
    /// updates the node's record if it is tagged and not destroyed.
    pub fn on_transform_changed(
        &mut self,
        graph: &dyn SceneGraph,
        db: &mut PersistenceDb,
        node: NodeId,
    ) {
        if self.guard.is_held() {
            debug!("change-detect: apply guard held, skipping auto-save");
            return;
        }
        let scene = graph.scene_name();
        let id = unique_id(graph, node, &db.baked);
        if id.is_empty() {
            return;
        }
        let Some(t) = graph.transform(node) else {
            return;
        };
        let Some(rec) = db.transforms.get_mut(&scene, &id) else {
            return; // untagged nodes are not auto-saved
        };
        if rec.is_destroyed {
            return;
        }
        rec.set_transform(t);
        db.transforms.save_logged();
    }

    /// Export surface: all tagged, non-destroyed records for the current
    /// scene, in stored order.
    pub fn tagged_records(
        &self,
        graph: &dyn SceneGraph,
        db: &PersistenceDb,
    ) -> Vec<TransformRecord> {
        let scene = graph.scene_name();
        db.transforms
            .scene(&scene)
            .map(|records| {
                records
                    .values()
                    .filter(|r| !r.is_destroyed)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Export surface: the record of the host's currently selected node, when
    /// both the selection probe and the record exist.
    pub fn selected_record(
        &self,
        graph: &dyn SceneGraph,
        db: &PersistenceDb,
    ) -> Option<TransformRecord> {
        let node = graph.selected()?;
        let id = unique_id(graph, node, &db.baked);
        if id.is_empty() {
            return None;
        }
        db.transforms.get(&graph.scene_name(), &id).cloned()
    }
}
