mod ids;
mod unique_id;

pub use ids::{HASH_VERSION, NodeId, stable_hash_64};
pub use unique_id::{LEGACY_SEPARATOR, UniqueId, item_id, path_id};
