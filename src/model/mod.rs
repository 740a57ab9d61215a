//! Data model shared with the outside world
//!
//! Tracks come from the catalog as flat records, playlists travel to and
//! from persistence as transfer objects. Neither type knows anything about
//! cursors or flattening; that lives in [`crate::sequence`].

mod playlist;
mod track;

pub use playlist::{PlaylistInfo, PlaylistTransfer, TransferElement, TransferKind, UNNAMED_PLAYLIST};
pub use track::{EntityRef, Track};
