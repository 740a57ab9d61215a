//! Playlist Engine - nested playlist core
//!
//! This library keeps playlists of songs and sub-playlists as one flattened,
//! navigable list with a playback cursor, and keeps every in-memory copy of
//! the same playlist in sync while it is edited.

pub mod model;
pub mod sequence;
pub mod store;
pub mod validation;

pub use model::{PlaylistTransfer, Track};
pub use sequence::{Element, PlaylistTree, SequenceError, SequenceKey, TreeConfig};
pub use store::{Exporter, JsonDirStore, MemoryStore, PlaylistStore, StoreError};
