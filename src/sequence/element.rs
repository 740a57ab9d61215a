//! Element and key types for the flattened sequence view

use crate::model::Track;
use std::fmt;
use std::sync::Arc;

/// Stable handle of a sequence instance inside a [`super::PlaylistTree`]
///
/// Keys are allocated monotonically and never reused, so a stale key can be
/// detected instead of silently pointing at a different sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceKey(pub(crate) u64);

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Logical identity shared by every in-memory copy of one playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    /// Saved playlist, keyed by its persisted id (> 0)
    Persisted(i64),

    /// Unsaved playlist; clones inherit the number
    Transient(u64),
}

impl Identity {
    pub fn persisted_id(&self) -> Option<i64> {
        match self {
            Identity::Persisted(id) => Some(*id),
            Identity::Transient(_) => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Persisted(id) => write!(f, "playlist {}", id),
            Identity::Transient(n) => write!(f, "unsaved playlist ~{}", n),
        }
    }
}

/// Which boundary of an expanded sequence a marker stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// One row of a sequence's flattened view
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A song
    Track(Arc<Track>),

    /// An embedded sequence folded into a single row
    Sequence(SequenceKey),

    /// Boundary of an expanded embedded sequence
    Marker(Edge, SequenceKey),
}

impl Element {
    pub fn track(&self) -> Option<&Track> {
        match self {
            Element::Track(track) => Some(track),
            _ => None,
        }
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, Element::Marker(..))
    }

    /// Tracks and folded sequences can hold the cursor, markers cannot
    pub fn is_playable(&self) -> bool {
        !self.is_marker()
    }

    /// Sequence this element refers to, if any
    pub fn sequence(&self) -> Option<SequenceKey> {
        match self {
            Element::Track(_) => None,
            Element::Sequence(key) | Element::Marker(_, key) => Some(*key),
        }
    }
}

/// A direct child of a sequence, with its span in the flattened view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Entry {
    /// First flat index covered by the entry
    pub start: usize,

    /// Last flat index covered by the entry (inclusive)
    pub end: usize,

    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Track,
    Folded(SequenceKey),
    Expanded(SequenceKey),
}

impl Entry {
    pub fn child(&self) -> Option<SequenceKey> {
        match self.kind {
            EntryKind::Track => None,
            EntryKind::Folded(key) | EntryKind::Expanded(key) => Some(key),
        }
    }

    pub fn width(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }
}

/// Rendering projection of one flat-view row
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    /// Flat-view index of the row
    pub index: usize,

    /// Nesting depth (0 = directly in the viewed sequence)
    pub depth: usize,

    /// Whether the viewed sequence's cursor sits on this row
    pub current: bool,

    pub kind: RowKind<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowKind<'a> {
    Track(&'a Track),
    Folded {
        key: SequenceKey,
        name: &'a str,
        tracks: usize,
    },
    Start {
        key: SequenceKey,
        name: &'a str,
    },
    End {
        key: SequenceKey,
        name: &'a str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_span() {
        let entry = Entry {
            start: 3,
            end: 6,
            kind: EntryKind::Expanded(SequenceKey(2)),
        };
        assert_eq!(entry.width(), 4);
        assert!(entry.contains(3));
        assert!(entry.contains(6));
        assert!(!entry.contains(7));
        assert_eq!(entry.child(), Some(SequenceKey(2)));
    }

    #[test]
    fn test_marker_is_not_playable() {
        let marker = Element::Marker(Edge::Start, SequenceKey(1));
        let track = Element::Track(Arc::new(Track::new(1, "One")));
        assert!(!marker.is_playable());
        assert!(track.is_playable());
        assert_eq!(marker.sequence(), Some(SequenceKey(1)));
        assert_eq!(track.track().map(|t| t.id), Some(1));
    }
}
