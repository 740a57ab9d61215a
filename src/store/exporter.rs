//! Background saving of playlist snapshots

use super::{PlaylistStore, StoreError};
use crate::model::PlaylistTransfer;
use crate::sequence::{PlaylistTree, SequenceError, SequenceKey};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

/// Saves snapshots of sequences on the rayon pool
///
/// The in-memory tree is never rolled back: a failed save is reported
/// through the [`PendingSave`] and logged, nothing else.
pub struct Exporter {
    store: Arc<dyn PlaylistStore>,
}

/// Handle to a save running in the background
#[derive(Debug)]
pub struct PendingSave {
    receiver: Receiver<Result<PlaylistTransfer, StoreError>>,
}

impl PendingSave {
    /// Block until the save finished and return the stored object
    pub fn wait(self) -> Result<PlaylistTransfer, StoreError> {
        self.receiver.recv().map_err(|_| StoreError::Worker)?
    }
}

impl Exporter {
    pub fn new(store: Arc<dyn PlaylistStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PlaylistStore> {
        &self.store
    }

    /// Snapshot `key` now and save the snapshot in the background
    pub fn export(&self, tree: &PlaylistTree, key: SequenceKey) -> Result<PendingSave, SequenceError> {
        let snapshot = tree.to_transfer(key)?;
        log::debug!("Exporting {} as playlist {}", key, snapshot.id);
        Ok(self.export_transfer(snapshot))
    }

    /// Save an already projected transfer object in the background
    pub fn export_transfer(&self, snapshot: PlaylistTransfer) -> PendingSave {
        let (sender, receiver) = mpsc::channel();
        let store = Arc::clone(&self.store);

        rayon::spawn(move || {
            let result = store.save_playlist(&snapshot);
            if let Err(ref e) = result {
                log::warn!("Saving playlist '{}' failed: {}", snapshot.name, e);
            }
            // nobody waiting is fine
            let _ = sender.send(result);
        });

        PendingSave { receiver }
    }
}
