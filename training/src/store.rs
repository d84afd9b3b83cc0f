//! JSON-file persistence for the repertoire and its training state.
//!
//! Layout under the data directory:
//!
//! ```text
//! tree.json              node records of the current repertoire
//! profile.json           the training profile
//! exercises/<id>.json    one file per exercise
//! trainings/<id>.json    one file per position training
//! ```

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use repertoire::{NodeRecord, RepertoireTree, TreeError};
use serde::{de::DeserializeOwned, Serialize};

use crate::exercise::{generate_exercises, Exercise};
use crate::position::PositionTraining;
use crate::profile::{TrainingProfile, PROFILE_ID};

const TREE_FILE: &str = "tree.json";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid repertoire: {0}")]
    Tree(#[from] TreeError),
}

/// Records kept one file each, named after their id.
pub trait Storable: Serialize + DeserializeOwned {
    fn id(&self) -> &str;
}

impl Storable for Exercise {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Storable for PositionTraining {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Directory of JSON files, one per record.
pub struct JsonStore<T> {
    dir: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T: Storable> JsonStore<T> {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            _phantom: PhantomData,
        }
    }

    pub fn file_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn save(&self, data: &T) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        write_json(&self.file_path(data.id()), data)
    }

    /// `None` if there is no record with this id.
    pub fn load(&self, id: &str) -> Result<Option<T>, PersistenceError> {
        read_json(&self.file_path(id))
    }

    /// Every record, sorted by id. Unreadable files are skipped with a
    /// warning.
    pub fn load_all(&self) -> Result<Vec<T>, PersistenceError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut items = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_json::<T>(&path) {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
            }
        }
        items.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(items)
    }

    pub fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        let path = self.file_path(id);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Remove every record. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, PersistenceError> {
        let items = self.load_all()?;
        for item in &items {
            self.delete(item.id())?;
        }
        Ok(items.len())
    }
}

/// Write through a temporary file so a crash never leaves half a record.
fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// What an upload replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub nodes: usize,
    pub removed_exercises: usize,
    pub removed_trainings: usize,
    pub exercises: usize,
}

/// All persisted state of one data directory.
pub struct TrainingStore {
    dir: PathBuf,
    exercises: JsonStore<Exercise>,
    trainings: JsonStore<PositionTraining>,
}

impl TrainingStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            exercises: JsonStore::new(dir.join("exercises")),
            trainings: JsonStore::new(dir.join("trainings")),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exercises(&self) -> &JsonStore<Exercise> {
        &self.exercises
    }

    pub fn trainings(&self) -> &JsonStore<PositionTraining> {
        &self.trainings
    }

    /// The persisted repertoire, `None` before the first upload.
    pub fn load_tree(&self) -> Result<Option<RepertoireTree>, PersistenceError> {
        match read_json::<Vec<NodeRecord>>(&self.dir.join(TREE_FILE))? {
            Some(records) => Ok(Some(RepertoireTree::from_records(records)?)),
            None => Ok(None),
        }
    }

    fn save_tree(&self, tree: &RepertoireTree) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        write_json(&self.dir.join(TREE_FILE), &tree.to_records())
    }

    /// The stored profile, or a default one written on the spot.
    pub fn load_or_create_profile(&self) -> Result<TrainingProfile, PersistenceError> {
        let path = self.profile_path();
        if let Some(profile) = read_json(&path)? {
            return Ok(profile);
        }
        tracing::info!("Creating training profile at {:?}", path);
        let profile = TrainingProfile::default();
        self.save_profile(&profile)?;
        Ok(profile)
    }

    pub fn save_profile(&self, profile: &TrainingProfile) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        write_json(&self.profile_path(), profile)
    }

    fn profile_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", PROFILE_ID))
    }

    /// Replace the repertoire.
    ///
    /// The records are validated and the new exercises generated before
    /// anything is written, so a bad upload leaves the store untouched. All
    /// trainings and the exercises generated with them are then dropped and
    /// one exercise/training pair per pre-leaf node is stored. Exercises
    /// without a training were authored by hand and are kept.
    #[tracing::instrument(level = "info", skip_all, fields(records = records.len()))]
    pub fn upload(
        &self,
        records: Vec<NodeRecord>,
        span: u32,
        now: u64,
    ) -> Result<UploadSummary, PersistenceError> {
        let tree = RepertoireTree::from_records(records)?;
        let generated = generate_exercises(&tree, span, now)?;

        self.save_tree(&tree)?;
        let mut removed_exercises = 0;
        for training in self.trainings.load_all()? {
            if self.exercises.load(&training.id)?.is_some() {
                self.exercises.delete(&training.id)?;
                removed_exercises += 1;
            }
        }
        let removed_trainings = self.trainings.clear()?;
        for (exercise, training) in &generated {
            self.exercises.save(exercise)?;
            self.trainings.save(training)?;
        }

        let summary = UploadSummary {
            nodes: tree.len(),
            removed_exercises,
            removed_trainings,
            exercises: generated.len(),
        };
        tracing::info!(?summary, "Repertoire replaced");
        Ok(summary)
    }
}
