//! Nested playlist core
//!
//! A [`PlaylistTree`] holds sequences of tracks that may embed other
//! sequences. Each sequence exposes a single flattened view with one cursor,
//! and every in-memory copy of the same playlist is kept in sync through the
//! [`SequenceRegistry`].

mod config;
mod cursor;
mod element;
mod error;
mod mutation;
mod registry;
mod tree;

pub use config::TreeConfig;
pub use element::{Edge, Element, Identity, Row, RowKind, SequenceKey};
pub use error::SequenceError;
pub use registry::{AncestorMap, SequenceRegistry};
pub use tree::{PlaylistTree, Result, Sequence, SubscriptionId};

pub(crate) use element::EntryKind;
