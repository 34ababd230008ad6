//! Persisted record types. One record per UniqueId per scene; most recent
//! write wins. Destroyed records are retained permanently so deletions
//! survive any number of reloads.

use glam::Vec3;
use rebind_graph::{NodeIdentity, Transform};
use serde::{Deserialize, Serialize};

fn default_scale() -> Vec3 {
    Vec3::ONE
}

/// A saved per-node edit: transform override, destruction, or spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformRecord {
    pub unique_id: String,
    pub path_id: String,
    pub item_id: String,
    pub object_path: String,
    pub object_name: String,
    pub scene_name: String,
    pub position: Vec3,
    /// Euler angles in degrees.
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    pub parent_path: String,
    pub is_destroyed: bool,
    pub is_spawned: bool,
    pub prefab_path: String,
    /// Best-effort list of child unique ids at save time.
    pub children: Vec<String>,
}

impl Default for TransformRecord {
    fn default() -> Self {
        Self {
            unique_id: String::new(),
            path_id: String::new(),
            item_id: String::new(),
            object_path: String::new(),
            object_name: String::new(),
            scene_name: String::new(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            parent_path: String::new(),
            is_destroyed: false,
            is_spawned: false,
            prefab_path: String::new(),
            children: Vec::new(),
        }
    }
}

impl TransformRecord {
    pub fn new(identity: &NodeIdentity, scene: &str, parent_path: &str, t: Transform) -> Self {
        Self {
            unique_id: identity.unique_id.clone(),
            path_id: identity.path_id.clone(),
            item_id: identity.item_id.clone(),
            object_path: identity.object_path.clone(),
            object_name: identity.object_name.clone(),
            scene_name: scene.to_string(),
            position: t.position,
            rotation: t.rotation,
            scale: t.scale,
            parent_path: parent_path.to_string(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation, self.scale)
    }

    pub fn set_transform(&mut self, t: Transform) {
        self.position = t.position;
        self.rotation = t.rotation;
        self.scale = t.scale;
    }
}

/// Precomputed identity override produced by the baking pass. `item_path` is
/// the node's full path at bake time and is the lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BakedIdentityRecord {
    pub unique_id: String,
    pub path_id: String,
    pub item_id: String,
    pub object_name: String,
    pub scene_name: String,
    pub item_path: String,
}

impl BakedIdentityRecord {
    pub fn new(identity: &NodeIdentity, scene: &str) -> Self {
        Self {
            unique_id: identity.unique_id.clone(),
            path_id: identity.path_id.clone(),
            item_id: identity.item_id.clone(),
            object_name: identity.object_name.clone(),
            scene_name: scene.to_string(),
            item_path: identity.object_path.clone(),
        }
    }
}
