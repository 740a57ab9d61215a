//! In-memory store - for tests and dry runs

use super::{PlaylistStore, StoreError};
use crate::model::{PlaylistInfo, PlaylistTransfer};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    playlists: Mutex<BTreeMap<i64, PlaylistTransfer>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored playlists
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<i64, PlaylistTransfer>> {
        self.playlists
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlaylistStore for MemoryStore {
    fn load_playlist(&self, id: i64) -> Result<PlaylistTransfer, StoreError> {
        self.lock().get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn save_playlist(&self, playlist: &PlaylistTransfer) -> Result<PlaylistTransfer, StoreError> {
        let mut playlists = self.lock();
        let mut saved = playlist.clone();
        if saved.id <= 0 {
            saved.id = playlists.keys().next_back().map_or(1, |max| max + 1);
        }
        playlists.insert(saved.id, saved.clone());
        Ok(saved)
    }

    fn list_playlists(&self) -> Result<Vec<PlaylistInfo>, StoreError> {
        Ok(self.lock().values().map(PlaylistTransfer::info).collect())
    }
}
