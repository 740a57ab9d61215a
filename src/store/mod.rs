//! Playlist persistence

pub mod exporter;
pub mod json;
pub mod memory;

pub use exporter::{Exporter, PendingSave};
pub use json::JsonDirStore;
pub use memory::MemoryStore;

use crate::model::{PlaylistInfo, PlaylistTransfer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("playlist {0} not found")]
    NotFound(i64),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid playlist json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to scan store directory: {0}")]
    Scan(#[from] walkdir::Error),

    #[error("background save was dropped before it finished")]
    Worker,
}

/// Persistence collaborator - allows swapping the JSON directory for an
/// in-memory stub
pub trait PlaylistStore: Send + Sync {
    /// Load one playlist with its nested playlists inline
    fn load_playlist(&self, id: i64) -> Result<PlaylistTransfer, StoreError>;

    /// Save a playlist; one without an id (`id <= 0`) gets a fresh one, which
    /// is set on the returned copy
    fn save_playlist(&self, playlist: &PlaylistTransfer) -> Result<PlaylistTransfer, StoreError>;

    /// Every stored playlist, ordered by id
    fn list_playlists(&self) -> Result<Vec<PlaylistInfo>, StoreError>;
}
