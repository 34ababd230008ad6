//! Configuration-driven baking. The host calls `maybe_start_bake` once per
//! graph load; the configured scene list and ignore prefix decide whether a
//! bake actually starts.

use log::debug;
use rebind_bake::{Baker, is_scene_baked};
use rebind_graph::SceneGraph;
use rebind_store::PersistenceDb;

use crate::config::ReconcileConfig;

/// Start a bake for the graph's scene when the configuration lists it and no
/// baked identities exist for it yet. Returns true when a bake was started.
pub fn maybe_start_bake(
    config: &ReconcileConfig,
    baker: &mut Baker,
    graph: &dyn SceneGraph,
    db: &PersistenceDb,
) -> bool {
    let scene = graph.scene_name();
    if !config.bake_scenes.iter().any(|s| s == &scene) {
        debug!("scene `{scene}` not configured for baking");
        return false;
    }
    if baker.is_baking() {
        debug!("bake already running, not restarting for `{scene}`");
        return false;
    }
    if is_scene_baked(db, &scene) {
        debug!("scene `{scene}` already baked");
        return false;
    }
    baker.start(graph, &config.bake_ignore_prefix);
    true
}
