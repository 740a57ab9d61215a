//! One JSON file per playlist in a directory

use super::{PlaylistStore, StoreError};
use crate::model::{PlaylistInfo, PlaylistTransfer};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

const EXTENSION: &str = "json";

/// Store backed by `<dir>/<id>.json` files
#[derive(Debug)]
pub struct JsonDirStore {
    root: PathBuf,

    /// Serializes id allocation and writes
    write_lock: Mutex<()>,
}

impl JsonDirStore {
    /// Open (and create if needed) a store directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        log::debug!("Opened playlist store at {:?}", root);

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: i64) -> PathBuf {
        self.root.join(format!("{}.{}", id, EXTENSION))
    }

    /// Ids of every `<id>.json` file directly in the store directory
    fn stored_ids(&self) -> Result<Vec<i64>, StoreError> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(id) = id_from_path(entry.path()) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn read(&self, id: i64) -> Result<PlaylistTransfer, StoreError> {
        let content = match fs::read_to_string(self.path_for(id)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }
}

fn id_from_path(path: &Path) -> Option<i64> {
    if path.extension()?.to_str()? != EXTENSION {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok().filter(|id| *id > 0)
}

impl PlaylistStore for JsonDirStore {
    fn load_playlist(&self, id: i64) -> Result<PlaylistTransfer, StoreError> {
        let playlist = self.read(id)?;
        log::info!("Loaded playlist {} '{}' ({} entries)", id, playlist.name, playlist.len());
        Ok(playlist)
    }

    fn save_playlist(&self, playlist: &PlaylistTransfer) -> Result<PlaylistTransfer, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut saved = playlist.clone();
        if saved.id <= 0 {
            saved.id = self.stored_ids()?.last().map_or(1, |max| max + 1);
        }

        let content = serde_json::to_string_pretty(&saved)?;
        fs::write(self.path_for(saved.id), content)?;
        log::info!("Saved playlist {} '{}'", saved.id, saved.name);
        Ok(saved)
    }

    fn list_playlists(&self) -> Result<Vec<PlaylistInfo>, StoreError> {
        let mut infos = Vec::new();
        for id in self.stored_ids()? {
            match self.read(id) {
                Ok(playlist) => infos.push(PlaylistInfo {
                    id,
                    name: playlist.name,
                }),
                Err(StoreError::Json(e)) => log::warn!("Skipping unreadable playlist file {}: {}", id, e),
                Err(e) => return Err(e),
            }
        }
        Ok(infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Track;
    use tempfile::TempDir;

    #[test]
    fn test_save_assigns_increasing_ids() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();

        let first = store.save_playlist(&PlaylistTransfer::new("First")).unwrap();
        let second = store.save_playlist(&PlaylistTransfer::new("Second")).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(dir.path().join("2.json").exists());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();

        let mut playlist = PlaylistTransfer::new("Mix");
        playlist.add_track(&Track::new(3, "Three"));
        let saved = store.save_playlist(&playlist).unwrap();

        let loaded = store.load_playlist(saved.id).unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.track_ids(), vec![3]);
    }

    #[test]
    fn test_missing_playlist() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();

        assert!(matches!(store.load_playlist(7), Err(StoreError::NotFound(7))));
    }

    #[test]
    fn test_list_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        store.save_playlist(&PlaylistTransfer::new("Kept")).unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("5.json"), "not json").unwrap();

        let infos = store.list_playlists().unwrap();
        assert_eq!(
            infos,
            vec![PlaylistInfo {
                id: 1,
                name: "Kept".to_string()
            }]
        );
    }
}
