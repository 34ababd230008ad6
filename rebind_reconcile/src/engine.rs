//! The reconciliation engine: a per-graph state machine driven by the host's
//! single-threaded scheduler tick. One pass = settle, index, match, apply,
//! verify; incomplete passes retry with backoff up to the configured limit,
//! then the destroy and spawn phases run exactly once and the engine returns
//! to idle. Long phases consume a bounded budget per tick so control returns
//! to the host mid-pass.

use std::mem;

use log::{debug, info, warn};
use rebind_graph::{
    ANGLE_TOLERANCE_DEG, POSITION_TOLERANCE, PrefabCatalog, SPAWNED_NAME_SUFFIX, SceneGraph,
    resolve_path,
};
use rebind_ids::NodeId;
use rebind_session::ApplyGuard;
use rebind_store::PersistenceDb;

use crate::config::ReconcileConfig;
use crate::index::{GraphIndex, IndexBuilder};
use crate::matcher::match_record;

const NODES_PER_TICK: usize = 256;
const RECORDS_PER_TICK: usize = 64;

/// Outcome of the most recent completed matching/applying cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub applied: usize,
    pub total: usize,
    pub attempts: u32,
}

pub enum Phase {
    Idle,
    Settle {
        remaining: f32,
        attempt: u32,
    },
    Indexing {
        builder: IndexBuilder,
        attempt: u32,
    },
    Matching {
        index: GraphIndex,
        pending: Vec<String>,
        cursor: usize,
        matches: Vec<(String, NodeId)>,
        attempt: u32,
    },
    Applying {
        matches: Vec<(String, NodeId)>,
        cursor: usize,
        applied: usize,
        total: usize,
        attempt: u32,
    },
    Backoff {
        remaining: f32,
        attempt: u32,
    },
    Destroying {
        pending: Vec<String>,
        cursor: usize,
    },
    Spawning {
        pending: Vec<String>,
        cursor: usize,
    },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Settle { .. } => "settle",
            Phase::Indexing { .. } => "indexing",
            Phase::Matching { .. } => "matching",
            Phase::Applying { .. } => "applying",
            Phase::Backoff { .. } => "backoff",
            Phase::Destroying { .. } => "destroying",
            Phase::Spawning { .. } => "spawning",
        }
    }
}

/// One reconciler per live graph. Non-reentrant by `&mut self`; dropping it
/// (or calling `reset`) cancels whatever pass is in flight.
pub struct Reconciler {
    config: ReconcileConfig,
    guard: ApplyGuard,
    phase: Phase,
    summary: Option<PassSummary>,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig, guard: ApplyGuard) -> Self {
        Self {
            config,
            guard,
            phase: Phase::Idle,
            summary: None,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn guard(&self) -> &ApplyGuard {
        &self.guard
    }

    pub fn phase_name(&self) -> &'static str {
        self.phase.name()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// Result of the last completed pass, if any finished since the last
    /// `on_graph_loaded`.
    pub fn summary(&self) -> Option<PassSummary> {
        self.summary
    }

    /// Explicit cancellation: abandon the in-flight pass.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Host signal: the graph was (re)built from scratch. Starts the settle
    /// timer; the pass proper begins once it elapses.
    pub fn on_graph_loaded(&mut self) {
        if !self.config.persistence_enabled {
            debug!("persistence disabled, ignoring graph load");
            self.phase = Phase::Idle;
            return;
        }
        self.summary = None;
        self.phase = Phase::Settle {
            remaining: self.config.settle_delay_secs,
            attempt: 1,
        };
    }

    /// Advance the state machine by one scheduler tick of `dt` seconds.
    pub fn tick(
        &mut self,
        graph: &mut dyn SceneGraph,
        catalog: &mut dyn PrefabCatalog,
        db: &mut PersistenceDb,
        dt: f32,
    ) {
        let phase = mem::replace(&mut self.phase, Phase::Idle);
        self.phase = match phase {
            Phase::Idle => Phase::Idle,

            Phase::Settle { remaining, attempt } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    Phase::Settle { remaining, attempt }
                } else {
                    debug!("settle elapsed, indexing graph (attempt {attempt})");
                    Phase::Indexing {
                        builder: IndexBuilder::begin(graph),
                        attempt,
                    }
                }
            }

            Phase::Indexing {
                mut builder,
                attempt,
            } => {
                if !builder.step(graph, NODES_PER_TICK) {
                    Phase::Indexing { builder, attempt }
                } else {
                    let index = builder.finish();
                    let scene = graph.scene_name();
                    let pending = matchable_ids(db, &scene);
                    debug!(
                        "indexed {} nodes, matching {} records in `{scene}`",
                        index.len(),
                        pending.len()
                    );
                    Phase::Matching {
                        index,
                        pending,
                        cursor: 0,
                        matches: Vec::new(),
                        attempt,
                    }
                }
            }

            Phase::Matching {
                index,
                pending,
                cursor,
                mut matches,
                attempt,
            } => {
                let scene = graph.scene_name();
                let end = (cursor + RECORDS_PER_TICK).min(pending.len());
                for id in &pending[cursor..end] {
                    let Some(rec) = db.transforms.get(&scene, id) else {
                        continue;
                    };
                    match match_record(graph, &index, &scene, rec) {
                        Some((node, method)) => {
                            debug!("matched {id} via {method:?}");
                            matches.push((id.clone(), node));
                        }
                        None => debug!("no live match for {id}"),
                    }
                }
                if end < pending.len() {
                    Phase::Matching {
                        index,
                        pending,
                        cursor: end,
                        matches,
                        attempt,
                    }
                } else {
                    Phase::Applying {
                        total: pending.len(),
                        matches,
                        cursor: 0,
                        applied: 0,
                        attempt,
                    }
                }
            }

            Phase::Applying {
                matches,
                cursor,
                mut applied,
                total,
                attempt,
            } => {
                let scene = graph.scene_name();
                let end = (cursor + RECORDS_PER_TICK).min(matches.len());
                {
                    // Suppress change-detection auto-save while we write the
                    // very transforms it would re-save.
                    let _hold = self.guard.hold();
                    for (id, node) in &matches[cursor..end] {
                        if apply_one(graph, db, &scene, id, *node) {
                            applied += 1;
                        }
                    }
                }
                if end < matches.len() {
                    Phase::Applying {
                        matches,
                        cursor: end,
                        applied,
                        total,
                        attempt,
                    }
                } else {
                    self.verify(db, &scene, applied, total, attempt)
                }
            }

            Phase::Backoff { remaining, attempt } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    Phase::Backoff { remaining, attempt }
                } else {
                    debug!("backoff elapsed, re-indexing (attempt {attempt})");
                    Phase::Indexing {
                        builder: IndexBuilder::begin(graph),
                        attempt,
                    }
                }
            }

            Phase::Destroying { pending, cursor } => {
                let scene = graph.scene_name();
                let end = (cursor + RECORDS_PER_TICK).min(pending.len());
                for id in &pending[cursor..end] {
                    destroy_one(graph, db, &scene, id);
                }
                if end < pending.len() {
                    Phase::Destroying {
                        pending,
                        cursor: end,
                    }
                } else {
                    db.transforms.save_logged();
                    let pending = respawnable_ids(db, &scene);
                    Phase::Spawning { pending, cursor: 0 }
                }
            }

            Phase::Spawning { pending, cursor } => {
                let scene = graph.scene_name();
                let end = (cursor + RECORDS_PER_TICK).min(pending.len());
                for id in &pending[cursor..end] {
                    spawn_one(graph, catalog, db, &self.guard, &scene, id);
                }
                if end < pending.len() {
                    Phase::Spawning {
                        pending,
                        cursor: end,
                    }
                } else {
                    db.transforms.save_logged();
                    info!("reconciliation pass complete for `{scene}`");
                    Phase::Idle
                }
            }
        };
    }

    fn verify(
        &mut self,
        db: &PersistenceDb,
        scene: &str,
        applied: usize,
        total: usize,
        attempt: u32,
    ) -> Phase {
        if applied == total {
            info!("applied {applied}/{total} records in `{scene}` (attempt {attempt})");
            self.summary = Some(PassSummary {
                applied,
                total,
                attempts: attempt,
            });
            return Phase::Destroying {
                pending: destroyed_ids(db, scene),
                cursor: 0,
            };
        }

        if attempt < self.config.max_retries {
            let backoff = self.config.retry_backoff_secs * attempt as f32;
            warn!(
                "applied {applied}/{total} records in `{scene}` (attempt {attempt}), \
                 retrying in {backoff:.2}s"
            );
            return Phase::Backoff {
                remaining: backoff,
                attempt: attempt + 1,
            };
        }

        warn!(
            "giving up on `{scene}` after {attempt} attempts with {applied}/{total} applied; \
             keeping partial results"
        );
        self.summary = Some(PassSummary {
            applied,
            total,
            attempts: attempt,
        });
        Phase::Destroying {
            pending: destroyed_ids(db, scene),
            cursor: 0,
        }
    }
}

/// Record ids eligible for matching: neither destroyed nor spawned.
fn matchable_ids(db: &PersistenceDb, scene: &str) -> Vec<String> {
    db.transforms
        .scene(scene)
        .map(|records| {
            records
                .iter()
                .filter(|(_, r)| !r.is_destroyed && !r.is_spawned)
                .map(|(id, _)| id.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn destroyed_ids(db: &PersistenceDb, scene: &str) -> Vec<String> {
    db.transforms
        .scene(scene)
        .map(|records| {
            records
                .iter()
                .filter(|(_, r)| r.is_destroyed)
                .map(|(id, _)| id.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Spawned and not destroyed: a spawned node the user later destroyed must
/// stay gone.
fn respawnable_ids(db: &PersistenceDb, scene: &str) -> Vec<String> {
    db.transforms
        .scene(scene)
        .map(|records| {
            records
                .iter()
                .filter(|(_, r)| r.is_spawned && !r.is_destroyed)
                .map(|(id, _)| id.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Write one record's transform onto its matched node and verify the
/// readback. Physics and animation drivers are suppressed around the write
/// and restored to their prior state.
fn apply_one(
    graph: &mut dyn SceneGraph,
    db: &PersistenceDb,
    scene: &str,
    id: &str,
    node: NodeId,
) -> bool {
    let Some(rec) = db.transforms.get(scene, id) else {
        return false;
    };
    let target = rec.transform();

    let physics = graph.has_physics_body(node);
    let was_kinematic = physics && graph.is_kinematic(node);
    let animated = graph.has_animator(node);
    let was_animating = animated && graph.is_animator_enabled(node);

    if physics {
        graph.set_kinematic(node, true);
    }
    if animated {
        graph.set_animator_enabled(node, false);
    }

    let wrote = graph.set_transform(node, target);

    if animated {
        graph.set_animator_enabled(node, was_animating);
    }
    if physics {
        graph.set_kinematic(node, was_kinematic);
    }

    if !wrote {
        warn!("apply: node for {id} vanished mid-write");
        return false;
    }

    // Applied only if the readback agrees on position, rotation and scale.
    graph
        .transform(node)
        .is_some_and(|t| t.approx_eq(&target, POSITION_TOLERANCE, ANGLE_TOLERANCE_DEG))
}

/// Destroyed records resolve through the full-path resolver only.
fn destroy_one(graph: &mut dyn SceneGraph, db: &PersistenceDb, scene: &str, id: &str) {
    let Some(rec) = db.transforms.get(scene, id) else {
        return;
    };
    if rec.object_path.is_empty() {
        return;
    }
    let node = resolve_path(graph, &rec.object_path, false)
        .or_else(|| resolve_path(graph, &rec.object_path, true));
    match node {
        Some(node) => {
            graph.set_active(node, false);
            debug!("hid destroyed node `{}`", rec.object_path);
        }
        None => debug!("destroyed node `{}` not present, nothing to hide", rec.object_path),
    }
}

/// Respawn one spawned record: stored prefab path first, then a catalog
/// search on the suffix-stripped base name, then an arbitrary catalog entry
/// as a last resort.
fn spawn_one(
    graph: &mut dyn SceneGraph,
    catalog: &mut dyn PrefabCatalog,
    db: &mut PersistenceDb,
    guard: &ApplyGuard,
    scene: &str,
    id: &str,
) {
    let Some(rec) = db.transforms.get(scene, id).cloned() else {
        return;
    };

    let mut node = if rec.prefab_path.is_empty() {
        None
    } else {
        catalog.instantiate(graph, &rec.prefab_path)
    };

    if node.is_none() {
        let base = rec
            .object_name
            .strip_suffix(SPAWNED_NAME_SUFFIX)
            .unwrap_or(&rec.object_name);
        if let Some(path) = catalog.list("", base).first() {
            node = catalog.instantiate(graph, path);
        }
    }

    if node.is_none()
        && let Some(path) = catalog.list("", "").first()
    {
        warn!(
            "respawn {id}: neither prefab path `{}` nor base name matched; \
             instantiating arbitrary catalog entry `{path}` as a stand-in",
            rec.prefab_path
        );
        node = catalog.instantiate(graph, path);
    }

    let Some(node) = node else {
        warn!("respawn {id}: catalog produced nothing, record left for next pass");
        return;
    };

    let _hold = guard.hold();
    graph.set_transform(node, rec.transform());
    debug!("respawned {id} as node {node}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rebind_graph::{
        MemoryCatalog, MemoryGraph, NoBakedIds, Transform, full_name_path, identity_of,
    };
    use rebind_store::TransformRecord;

    const DT: f32 = 0.1;

    fn fast_config() -> ReconcileConfig {
        ReconcileConfig {
            settle_delay_secs: 0.0,
            retry_backoff_secs: 0.0,
            ..ReconcileConfig::default()
        }
    }

    fn setup(config: ReconcileConfig) -> (tempfile::TempDir, PersistenceDb, Reconciler) {
        let dir = tempfile::tempdir().unwrap();
        let db = PersistenceDb::open(dir.path());
        let engine = Reconciler::new(config, ApplyGuard::new());
        (dir, db, engine)
    }

    fn record_for(graph: &MemoryGraph, node: NodeId, position: Vec3) -> TransformRecord {
        let identity = identity_of(graph, node, &NoBakedIds).unwrap();
        let parent_path = graph
            .parent(node)
            .and_then(|p| full_name_path(graph, p))
            .unwrap_or_default();
        TransformRecord::new(
            &identity,
            &graph.scene_name(),
            &parent_path,
            Transform::from_position(position),
        )
    }

    fn run_to_idle(
        engine: &mut Reconciler,
        graph: &mut MemoryGraph,
        catalog: &mut MemoryCatalog,
        db: &mut PersistenceDb,
    ) {
        for _ in 0..200 {
            if engine.is_idle() {
                return;
            }
            engine.tick(graph, catalog, db, DT);
        }
        panic!("engine did not go idle; stuck in `{}`", engine.phase_name());
    }

    #[test]
    fn test_direct_path_records_converge_in_one_pass() {
        let mut g = MemoryGraph::new("Warehouse");
        let root = g.add_node(None, "Root");
        for i in 0..10 {
            let n = g.add_node(Some(root), format!("Crate{i}"));
            let _ = n;
        }

        let (_dir, mut db, mut engine) = setup(fast_config());
        for child in g.children(root) {
            let rec = record_for(&g, child, Vec3::new(1.0, 0.0, 0.0));
            db.transforms.insert("Warehouse", rec.unique_id.clone(), rec);
        }

        let mut catalog = MemoryCatalog::new();
        engine.on_graph_loaded();
        run_to_idle(&mut engine, &mut g, &mut catalog, &mut db);

        let summary = engine.summary().unwrap();
        assert_eq!(summary.applied, 10);
        assert_eq!(summary.total, 10);
        assert_eq!(summary.attempts, 1);
    }

    #[test]
    fn test_recorded_position_reapplied_on_rebuilt_graph() {
        let mut g = MemoryGraph::new("Warehouse");
        let root = g.add_node(None, "Root");
        let crate_node = g.add_node(Some(root), "Crate");

        let (_dir, mut db, mut engine) = setup(fast_config());
        let rec = record_for(&g, crate_node, Vec3::new(1.0, 2.0, 3.0));
        db.transforms.insert("Warehouse", rec.unique_id.clone(), rec);

        assert_eq!(g.transform(crate_node).unwrap().position, Vec3::ZERO);

        let mut catalog = MemoryCatalog::new();
        engine.on_graph_loaded();
        run_to_idle(&mut engine, &mut g, &mut catalog, &mut db);

        let applied = g.transform(crate_node).unwrap();
        assert!((applied.position - Vec3::new(1.0, 2.0, 3.0)).length() < 0.01);
        assert_eq!(engine.summary().unwrap().applied, 1);
    }

    #[test]
    fn test_settle_delay_holds_off_indexing() {
        let mut g = MemoryGraph::new("Warehouse");
        g.add_node(None, "Root");
        let (_dir, mut db, mut engine) = setup(ReconcileConfig {
            settle_delay_secs: 1.0,
            ..fast_config()
        });
        let mut catalog = MemoryCatalog::new();

        engine.on_graph_loaded();
        assert_eq!(engine.phase_name(), "settle");
        for _ in 0..5 {
            engine.tick(&mut g, &mut catalog, &mut db, DT);
            assert_eq!(engine.phase_name(), "settle");
        }
        for _ in 0..5 {
            engine.tick(&mut g, &mut catalog, &mut db, DT);
        }
        assert_ne!(engine.phase_name(), "settle");
    }

    #[test]
    fn test_partial_graph_converges_on_second_attempt() {
        let mut g = MemoryGraph::new("Warehouse");
        let root = g.add_node(None, "Root");
        let shelf = g.add_node(Some(root), "Shelf");

        // Record for a node that will only exist once the host finishes
        // populating the graph.
        let mut staging = MemoryGraph::new("Warehouse");
        let s_root = staging.add_node(None, "Root");
        staging.add_node(Some(s_root), "Shelf");
        let late = staging.add_node(Some(s_root), "LateArrival");
        let late_rec = record_for(&staging, late, Vec3::new(4.0, 5.0, 6.0));

        let (_dir, mut db, mut engine) = setup(fast_config());
        let shelf_rec = record_for(&g, shelf, Vec3::new(1.0, 0.0, 0.0));
        db.transforms
            .insert("Warehouse", shelf_rec.unique_id.clone(), shelf_rec);
        db.transforms
            .insert("Warehouse", late_rec.unique_id.clone(), late_rec);

        let mut catalog = MemoryCatalog::new();
        engine.on_graph_loaded();
        for _ in 0..200 {
            if engine.phase_name() == "backoff" {
                break;
            }
            engine.tick(&mut g, &mut catalog, &mut db, DT);
        }
        assert_eq!(engine.phase_name(), "backoff");

        // Host finishes building the graph between attempts.
        let late_live = g.add_node(Some(root), "LateArrival");
        run_to_idle(&mut engine, &mut g, &mut catalog, &mut db);

        let summary = engine.summary().unwrap();
        assert_eq!(summary.applied, 2);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.attempts, 2);
        assert_eq!(
            g.transform(late_live).unwrap().position,
            Vec3::new(4.0, 5.0, 6.0)
        );
    }

    #[test]
    fn test_spawned_record_instantiated_once_across_retries() {
        let mut g = MemoryGraph::new("Warehouse");
        let root = g.add_node(None, "Root");

        // A record that only resolves once the host adds the node, forcing a
        // second attempt before the spawn phase runs.
        let mut staging = MemoryGraph::new("Warehouse");
        let s_root = staging.add_node(None, "Root");
        let late = staging.add_node(Some(s_root), "LateArrival");
        let late_rec = record_for(&staging, late, Vec3::new(1.0, 0.0, 0.0));

        let (_dir, mut db, mut engine) = setup(fast_config());
        db.transforms
            .insert("Warehouse", late_rec.unique_id.clone(), late_rec);
        let mut spawned_rec = TransformRecord::default();
        spawned_rec.unique_id = "P9+I9".to_string();
        spawned_rec.object_name = "Crate(Spawned)".to_string();
        spawned_rec.scene_name = "Warehouse".to_string();
        spawned_rec.is_spawned = true;
        spawned_rec.prefab_path = "props/crate".to_string();
        spawned_rec.scale = Vec3::ONE;
        db.transforms.insert("Warehouse", "P9+I9", spawned_rec);

        let mut catalog = MemoryCatalog::new();
        catalog.register("props/crate", "Crate", "props");
        engine.on_graph_loaded();
        for _ in 0..200 {
            if engine.phase_name() == "backoff" {
                break;
            }
            engine.tick(&mut g, &mut catalog, &mut db, DT);
        }
        assert_eq!(engine.phase_name(), "backoff");
        // No spawning before the pass converges.
        assert_eq!(g.roots().len(), 1);

        g.add_node(Some(root), "LateArrival");
        run_to_idle(&mut engine, &mut g, &mut catalog, &mut db);

        let summary = engine.summary().unwrap();
        assert_eq!(summary.attempts, 2);
        // The spawned record is excluded from matching and instantiated
        // exactly once, after the final attempt.
        assert_eq!(summary.total, 1);
        let spawned: Vec<NodeId> = g
            .roots()
            .into_iter()
            .filter(|&n| g.name(n).is_some_and(|name| name.ends_with("(Spawned)")))
            .collect();
        assert_eq!(spawned.len(), 1);
    }

    #[test]
    fn test_gives_up_with_partial_results() {
        let mut g = MemoryGraph::new("Warehouse");
        let root = g.add_node(None, "Root");
        let shelf = g.add_node(Some(root), "Shelf");

        let (_dir, mut db, mut engine) = setup(ReconcileConfig {
            max_retries: 2,
            ..fast_config()
        });
        let good = record_for(&g, shelf, Vec3::new(1.0, 0.0, 0.0));
        db.transforms.insert("Warehouse", good.unique_id.clone(), good);
        let mut ghost = TransformRecord::default();
        ghost.unique_id = "P404+I404".to_string();
        ghost.path_id = "P404".to_string();
        ghost.item_id = "I404".to_string();
        ghost.object_path = "Root/Nowhere".to_string();
        ghost.object_name = "Nowhere".to_string();
        ghost.scene_name = "Warehouse".to_string();
        db.transforms.insert("Warehouse", "P404+I404", ghost);

        let mut catalog = MemoryCatalog::new();
        engine.on_graph_loaded();
        run_to_idle(&mut engine, &mut g, &mut catalog, &mut db);

        let summary = engine.summary().unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.attempts, 2);
        // The resolvable record was still applied.
        assert_eq!(g.transform(shelf).unwrap().position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_destroyed_records_hide_nodes() {
        let mut g = MemoryGraph::new("Warehouse");
        let root = g.add_node(None, "Root");
        let shelf = g.add_node(Some(root), "Shelf");

        let (_dir, mut db, mut engine) = setup(fast_config());
        let mut rec = record_for(&g, shelf, Vec3::ZERO);
        rec.is_destroyed = true;
        db.transforms.insert("Warehouse", rec.unique_id.clone(), rec);

        let mut catalog = MemoryCatalog::new();
        engine.on_graph_loaded();
        run_to_idle(&mut engine, &mut g, &mut catalog, &mut db);

        assert!(!g.is_active(shelf));
        // Destroyed records are excluded from matching entirely.
        assert_eq!(engine.summary().unwrap().total, 0);
    }

    #[test]
    fn test_spawned_record_respawns_by_prefab_path() {
        let mut g = MemoryGraph::new("Warehouse");
        g.add_node(None, "Root");

        let (_dir, mut db, mut engine) = setup(fast_config());
        let mut rec = TransformRecord::default();
        rec.unique_id = "P7+I7".to_string();
        rec.object_name = "Crate(Spawned)".to_string();
        rec.scene_name = "Warehouse".to_string();
        rec.is_spawned = true;
        rec.prefab_path = "props/crate".to_string();
        rec.position = Vec3::new(2.0, 0.0, 2.0);
        rec.scale = Vec3::ONE;
        db.transforms.insert("Warehouse", "P7+I7", rec);

        let mut catalog = MemoryCatalog::new();
        catalog.register("props/crate", "Crate", "props");
        engine.on_graph_loaded();
        run_to_idle(&mut engine, &mut g, &mut catalog, &mut db);

        let spawned: Vec<NodeId> = g
            .roots()
            .into_iter()
            .filter(|&n| g.name(n).is_some_and(|name| name.ends_with("(Spawned)")))
            .collect();
        assert_eq!(spawned.len(), 1);
        assert_eq!(
            g.transform(spawned[0]).unwrap().position,
            Vec3::new(2.0, 0.0, 2.0)
        );
    }

    #[test]
    fn test_spawn_falls_back_to_base_name_then_arbitrary() {
        let mut g = MemoryGraph::new("Warehouse");
        g.add_node(None, "Root");

        let (_dir, mut db, mut engine) = setup(fast_config());
        // No prefab path; base name "Barrel" is in the catalog.
        let mut by_name = TransformRecord::default();
        by_name.unique_id = "P1+I1".to_string();
        by_name.object_name = "Barrel(Spawned)".to_string();
        by_name.scene_name = "Warehouse".to_string();
        by_name.is_spawned = true;
        by_name.scale = Vec3::ONE;
        db.transforms.insert("Warehouse", "P1+I1", by_name);
        // Nothing matches this one; it takes an arbitrary entry.
        let mut ghost = TransformRecord::default();
        ghost.unique_id = "P2+I2".to_string();
        ghost.object_name = "Ghost(Spawned)".to_string();
        ghost.scene_name = "Warehouse".to_string();
        ghost.is_spawned = true;
        ghost.scale = Vec3::ONE;
        db.transforms.insert("Warehouse", "P2+I2", ghost);

        let mut catalog = MemoryCatalog::new();
        catalog.register("props/barrel", "Barrel", "props");
        engine.on_graph_loaded();
        run_to_idle(&mut engine, &mut g, &mut catalog, &mut db);

        let spawned: Vec<String> = g
            .roots()
            .into_iter()
            .filter_map(|n| g.name(n))
            .filter(|name| name.ends_with("(Spawned)"))
            .collect();
        // Both records produced something; both resolved to the only entry.
        assert_eq!(spawned, vec!["Barrel(Spawned)", "Barrel(Spawned)"]);
    }

    #[test]
    fn test_spawned_then_destroyed_stays_gone() {
        let mut g = MemoryGraph::new("Warehouse");
        g.add_node(None, "Root");

        let (_dir, mut db, mut engine) = setup(fast_config());
        let mut rec = TransformRecord::default();
        rec.unique_id = "P7+I7".to_string();
        rec.object_name = "Crate(Spawned)".to_string();
        rec.scene_name = "Warehouse".to_string();
        rec.is_spawned = true;
        rec.is_destroyed = true;
        rec.prefab_path = "props/crate".to_string();
        db.transforms.insert("Warehouse", "P7+I7", rec);

        let mut catalog = MemoryCatalog::new();
        catalog.register("props/crate", "Crate", "props");
        engine.on_graph_loaded();
        run_to_idle(&mut engine, &mut g, &mut catalog, &mut db);

        assert!(
            !g.roots()
                .into_iter()
                .filter_map(|n| g.name(n))
                .any(|name| name.ends_with("(Spawned)"))
        );
    }

    #[test]
    fn test_physics_and_animation_suppression_is_restored() {
        let mut g = MemoryGraph::new("Warehouse");
        let root = g.add_node(None, "Root");
        let body = g.add_node(Some(root), "Body");
        g.set_physics_body(body, true);
        g.set_animator(body, true);
        assert!(!g.is_kinematic(body));
        assert!(g.is_animator_enabled(body));

        let (_dir, mut db, mut engine) = setup(fast_config());
        let rec = record_for(&g, body, Vec3::new(3.0, 0.0, 0.0));
        db.transforms.insert("Warehouse", rec.unique_id.clone(), rec);

        let mut catalog = MemoryCatalog::new();
        engine.on_graph_loaded();
        run_to_idle(&mut engine, &mut g, &mut catalog, &mut db);

        assert_eq!(g.transform(body).unwrap().position, Vec3::new(3.0, 0.0, 0.0));
        assert!(!g.is_kinematic(body));
        assert!(g.is_animator_enabled(body));
    }

    #[test]
    fn test_persistence_disabled_stays_idle() {
        let mut g = MemoryGraph::new("Warehouse");
        g.add_node(None, "Root");
        let (_dir, mut db, mut engine) = setup(ReconcileConfig {
            persistence_enabled: false,
            ..fast_config()
        });
        let mut catalog = MemoryCatalog::new();

        engine.on_graph_loaded();
        assert!(engine.is_idle());
        engine.tick(&mut g, &mut catalog, &mut db, DT);
        assert!(engine.is_idle());
        assert!(engine.summary().is_none());
    }

    #[test]
    fn test_reset_cancels_pass() {
        let mut g = MemoryGraph::new("Warehouse");
        g.add_node(None, "Root");
        let (_dir, mut db, mut engine) = setup(ReconcileConfig {
            settle_delay_secs: 10.0,
            ..fast_config()
        });
        let mut catalog = MemoryCatalog::new();

        engine.on_graph_loaded();
        engine.tick(&mut g, &mut catalog, &mut db, DT);
        assert_eq!(engine.phase_name(), "settle");
        engine.reset();
        assert!(engine.is_idle());
    }
}
