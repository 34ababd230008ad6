mod records;
mod store;

pub use records::{BakedIdentityRecord, TransformRecord};
pub use store::{PersistenceDb, RecordStore, SceneMap, StoreError};
