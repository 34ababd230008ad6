//! Whole-scene identity baking. A bake walks every node once, derives its
//! structural identity (bypassing any existing baked override) and writes one
//! BakedIdentityRecord per node. Baked records freeze a node's identity at
//! its bake-time path, so later additive sibling changes do not shift it.
//!
//! The walk is cooperative: `start` snapshots the node list, then `tick`
//! processes a bounded budget per call from the host's scheduler.

use log::{debug, info, warn};
use rebind_graph::{SceneGraph, structural_identity_of};
use rebind_ids::NodeId;
use rebind_store::{BakedIdentityRecord, PersistenceDb};

/// True iff the baked store holds at least one record for `scene`.
pub fn is_scene_baked(db: &PersistenceDb, scene: &str) -> bool {
    db.baked.scene_len(scene) > 0
}

enum BakeState {
    Idle,
    Running {
        scene: String,
        pending: Vec<NodeId>,
        cursor: usize,
        baked: usize,
    },
    Done {
        scene: String,
        baked: usize,
    },
}

/// Cooperative scene baker. One bake at a time; `start` while running
/// restarts from scratch.
pub struct Baker {
    state: BakeState,
}

impl Baker {
    pub fn new() -> Self {
        Self {
            state: BakeState::Idle,
        }
    }

    /// Snapshot the graph's nodes for baking, skipping any subtree whose root
    /// name starts with `ignore_prefix` (empty prefix skips nothing).
    pub fn start(&mut self, graph: &dyn SceneGraph, ignore_prefix: &str) {
        let scene = graph.scene_name();
        let mut pending = Vec::new();
        for root in graph.roots() {
            collect_filtered(graph, root, ignore_prefix, &mut pending);
        }
        info!(
            "baking {} nodes in scene `{scene}` (ignore prefix: `{ignore_prefix}`)",
            pending.len()
        );
        self.state = BakeState::Running {
            scene,
            pending,
            cursor: 0,
            baked: 0,
        };
    }

    /// Process up to `budget` nodes. Returns true when the bake completed on
    /// this tick (the baked store is saved at that point).
    pub fn tick(&mut self, graph: &dyn SceneGraph, db: &mut PersistenceDb, budget: usize) -> bool {
        let BakeState::Running {
            scene,
            pending,
            cursor,
            baked,
        } = &mut self.state
        else {
            return false;
        };

        let end = (*cursor + budget.max(1)).min(pending.len());
        for &node in &pending[*cursor..end] {
            // Node may have vanished since the snapshot.
            let Some(identity) = structural_identity_of(graph, node) else {
                debug!("bake: node {node} vanished mid-bake, skipping");
                continue;
            };
            db.baked.insert(
                scene.as_str(),
                identity.unique_id.clone(),
                BakedIdentityRecord::new(&identity, scene),
            );
            *baked += 1;
        }
        *cursor = end;

        if *cursor < pending.len() {
            return false;
        }

        let scene = scene.clone();
        let baked = *baked;
        db.baked.save_logged();
        info!("baked {baked} identities for scene `{scene}`");
        self.state = BakeState::Done { scene, baked };
        true
    }

    pub fn is_baking(&self) -> bool {
        matches!(self.state, BakeState::Running { .. })
    }

    /// Fraction of the snapshot processed, in [0, 1].
    pub fn progress(&self) -> f32 {
        match &self.state {
            BakeState::Idle => 0.0,
            BakeState::Running {
                pending, cursor, ..
            } => {
                if pending.is_empty() {
                    1.0
                } else {
                    *cursor as f32 / pending.len() as f32
                }
            }
            BakeState::Done { .. } => 1.0,
        }
    }

    pub fn status(&self) -> String {
        match &self.state {
            BakeState::Idle => "idle".to_string(),
            BakeState::Running {
                scene,
                pending,
                cursor,
                ..
            } => format!("baking `{scene}`: {cursor}/{} nodes", pending.len()),
            BakeState::Done { scene, baked } => {
                format!("baked `{scene}`: {baked} identities")
            }
        }
    }
}

impl Default for Baker {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_filtered(
    graph: &dyn SceneGraph,
    node: NodeId,
    ignore_prefix: &str,
    out: &mut Vec<NodeId>,
) {
    if !ignore_prefix.is_empty() {
        match graph.name(node) {
            Some(name) if name.starts_with(ignore_prefix) => {
                debug!("bake: skipping subtree `{name}`");
                return;
            }
            None => {
                warn!("bake: unreadable node {node}, skipping subtree");
                return;
            }
            _ => {}
        }
    }
    out.push(node);
    for child in graph.children(node) {
        collect_filtered(graph, child, ignore_prefix, out);
    }
}
