mod graph;
mod identity;
mod memory_graph;
mod transform;

pub use graph::{
    NullCatalog, PrefabCatalog, SPAWNED_NAME_SUFFIX, SceneGraph, collect_subtree, full_name_path,
    resolve_path, sibling_index_path,
};
pub use identity::{
    BakedIdentity, BakedLookup, NoBakedIds, NodeIdentity, identity_of, structural_identity_of,
    unique_id,
};
pub use memory_graph::{MemoryCatalog, MemoryGraph};
pub use transform::{ANGLE_TOLERANCE_DEG, POSITION_TOLERANCE, Transform};

pub use rebind_ids::NodeId;
