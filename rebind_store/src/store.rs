//! Durable scene → (unique id → record) maps with tolerant loads and atomic
//! saves. Stores are explicitly constructed and passed by reference; there is
//! no process-wide singleton. The two stores (transforms, baked ids) are
//! independent files with independent lifetimes.

use std::collections::BTreeMap;
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, error, warn};
use rebind_graph::{BakedIdentity, BakedLookup};
use rebind_ids::HASH_VERSION;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::records::{BakedIdentityRecord, TransformRecord};

/// Nested persisted mapping: scene name → unique id → record.
/// BTreeMap keeps the on-disk order stable across saves.
pub type SceneMap<T> = BTreeMap<String, BTreeMap<String, T>>;

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serialize(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "store i/o error: {err}"),
            Self::Serialize(err) => write!(f, "store serialize error: {err}"),
        }
    }
}

impl Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err)
    }
}

#[derive(Serialize, serde::Deserialize)]
struct StoreFile<T> {
    version: u32,
    hash_version: u32,
    scenes: SceneMap<T>,
}

const FILE_VERSION: u32 = 1;

/// One durable map. Loading never fails: missing, empty, or malformed files
/// yield an empty map with a distinct log line each. Saving is atomic:
/// write `<file>.tmp`, best-effort copy the current file to `<file>.bak`,
/// remove the current file, rename the temp into place.
pub struct RecordStore<T> {
    path: PathBuf,
    scenes: SceneMap<T>,
}

impl<T: Serialize + DeserializeOwned + Clone> RecordStore<T> {
    /// Open a store at `path`, loading whatever is currently committed.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            scenes: SceneMap::new(),
        };
        store.load();
        store
    }

    /// (Re)load from disk, substituting an empty map for anything unreadable.
    pub fn load(&mut self) {
        self.scenes = match fs::read_to_string(&self.path) {
            Ok(content) => {
                if content.trim().is_empty() {
                    warn!("store file {} is empty, starting fresh", self.path.display());
                    SceneMap::new()
                } else {
                    match serde_json::from_str::<StoreFile<T>>(&content) {
                        Ok(file) => {
                            if file.hash_version != HASH_VERSION {
                                warn!(
                                    "store file {} was written with hash version {} (current {}), \
                                     identities may not re-bind",
                                    self.path.display(),
                                    file.hash_version,
                                    HASH_VERSION
                                );
                            }
                            file.scenes
                        }
                        Err(err) => {
                            warn!(
                                "store file {} is malformed ({err}), starting fresh",
                                self.path.display()
                            );
                            SceneMap::new()
                        }
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no store file at {}, starting fresh", self.path.display());
                SceneMap::new()
            }
            Err(err) => {
                warn!(
                    "could not read store file {} ({err}), starting fresh",
                    self.path.display()
                );
                SceneMap::new()
            }
        };
    }

    /// Persist atomically. On failure the in-memory map stays authoritative
    /// and the previously committed file is untouched.
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let file = StoreFile {
            version: FILE_VERSION,
            hash_version: HASH_VERSION,
            scenes: self.scenes.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let tmp = sibling_with_suffix(&self.path, ".tmp");
        let bak = sibling_with_suffix(&self.path, ".bak");
        fs::write(&tmp, json)?;

        if self.path.exists() {
            // Best-effort backup; a failed copy must not block the commit.
            if let Err(err) = fs::copy(&self.path, &bak) {
                warn!("could not write backup {} ({err})", bak.display());
            }
            if let Err(err) = fs::remove_file(&self.path) {
                warn!("could not remove old store {} ({err})", self.path.display());
            }
        }

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Save, logging instead of propagating. Used by write-through callers
    /// for whom memory remains authoritative on i/o failure.
    pub fn save_logged(&self) {
        if let Err(err) = self.save() {
            error!("failed to save {}: {err}", self.path.display());
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scene(&self, scene: &str) -> Option<&BTreeMap<String, T>> {
        self.scenes.get(scene)
    }

    pub fn scene_mut(&mut self, scene: &str) -> &mut BTreeMap<String, T> {
        self.scenes.entry(scene.to_string()).or_default()
    }

    pub fn get(&self, scene: &str, unique_id: &str) -> Option<&T> {
        self.scenes.get(scene)?.get(unique_id)
    }

    pub fn get_mut(&mut self, scene: &str, unique_id: &str) -> Option<&mut T> {
        self.scenes.get_mut(scene)?.get_mut(unique_id)
    }

    /// Last write wins: replaces any existing record for this id.
    pub fn insert(&mut self, scene: &str, unique_id: impl Into<String>, record: T) {
        self.scene_mut(scene).insert(unique_id.into(), record);
    }

    pub fn remove(&mut self, scene: &str, unique_id: &str) -> Option<T> {
        self.scenes.get_mut(scene)?.remove(unique_id)
    }

    pub fn scene_len(&self, scene: &str) -> usize {
        self.scenes.get(scene).map_or(0, |m| m.len())
    }

    pub fn scene_names(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }

    pub fn total_len(&self) -> usize {
        self.scenes.values().map(|m| m.len()).sum()
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

/// The two independent stores, bundled for callers that need both.
pub struct PersistenceDb {
    pub transforms: RecordStore<TransformRecord>,
    pub baked: RecordStore<BakedIdentityRecord>,
}

impl PersistenceDb {
    pub const TRANSFORMS_FILE: &'static str = "transforms.json";
    pub const BAKED_FILE: &'static str = "baked_ids.json";

    pub fn open(data_dir: &Path) -> Self {
        Self {
            transforms: RecordStore::open(data_dir.join(Self::TRANSFORMS_FILE)),
            baked: RecordStore::open(data_dir.join(Self::BAKED_FILE)),
        }
    }
}

impl BakedLookup for RecordStore<BakedIdentityRecord> {
    // Linear scan over the scene's baked records; scenes are small enough
    // that an extra path index has not been worth maintaining.
    fn baked_for_path(&self, scene: &str, path: &str) -> Option<BakedIdentity> {
        let records = self.scene(scene)?;
        records.values().find(|r| r.item_path == path).map(|r| BakedIdentity {
            path_id: r.path_id.clone(),
            item_id: r.item_id.clone(),
            unique_id: r.unique_id.clone(),
        })
    }
}

impl BakedLookup for PersistenceDb {
    fn baked_for_path(&self, scene: &str, path: &str) -> Option<BakedIdentity> {
        self.baked.baked_for_path(scene, path)
    }
}
