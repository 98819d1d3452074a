//! Local tree state store on sled, one JSON value per top-level ancestor.

use super::store::StateStore;
use super::{StateMap, TreeState};
use crate::error::{StorageError, TreeError};
use async_trait::async_trait;
use std::path::Path;

pub struct SledStateStore {
    tree: sled::Tree,
}

impl SledStateStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(&db)
    }

    pub fn from_db(db: &sled::Db) -> Result<Self, StorageError> {
        Ok(SledStateStore {
            tree: db.open_tree("tree_state")?,
        })
    }

    fn read_all(&self) -> Result<StateMap, StorageError> {
        let mut state = StateMap::new();
        for entry in self.tree.iter() {
            let (key, value) = entry?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| StorageError::InvalidState(format!("Non UTF-8 state key: {}", e)))?;
            let value: TreeState = serde_json::from_slice(&value)?;
            state.insert(key, value);
        }
        Ok(state)
    }

    fn write_all(&self, state: &StateMap) -> Result<(), StorageError> {
        self.tree.clear()?;
        for (key, value) in state {
            self.tree.insert(key.as_bytes(), serde_json::to_vec(value)?)?;
        }
        self.tree.flush()?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for SledStateStore {
    async fn save(&self, state: &StateMap) -> Result<(), TreeError> {
        Ok(self.write_all(state)?)
    }

    async fn fetch(&self) -> Result<StateMap, TreeError> {
        Ok(self.read_all()?)
    }

    async fn reset(&self) -> Result<(), TreeError> {
        self.tree.clear().map_err(StorageError::from)?;
        self.tree.flush().map_err(StorageError::from)?;
        Ok(())
    }
}
