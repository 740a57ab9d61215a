//! Cursor navigation
//!
//! Markers never hold the cursor. A folded sequence holds it as a single row
//! while its own cursor walks through its tracks, so stepping over a folded
//! sequence plays it track by track before moving on.

use super::tree::Result;
use super::{Element, PlaylistTree, SequenceError, SequenceKey};
use crate::model::Track;

/// Cursor assignments produced by one navigation step, outermost first
type CursorPath = Vec<(SequenceKey, usize)>;

impl PlaylistTree {
    /// Track under the cursor, following folded sequences down to a track
    pub fn current(&self, key: SequenceKey) -> Result<Option<&Track>> {
        self.node(key)?;
        Ok(self.resolve_current(key))
    }

    fn resolve_current(&self, key: SequenceKey) -> Option<&Track> {
        let node = self.node_ref(key);
        match node.elements.get(node.cursor?)? {
            Element::Track(track) => Some(track),
            Element::Sequence(child) | Element::Marker(_, child) => self.resolve_current(*child),
        }
    }

    /// Track that `select_next` would move to, without moving
    pub fn peek_next(&self, key: SequenceKey) -> Result<Option<&Track>> {
        self.peek(key, true)
    }

    /// Track that `select_previous` would move to, without moving
    pub fn peek_previous(&self, key: SequenceKey) -> Result<Option<&Track>> {
        self.peek(key, false)
    }

    /// Move the cursor to the next playable row
    ///
    /// Returns the new current track, or `None` when there is nothing after
    /// the cursor (and wrap-around is off); the cursor then stays put.
    pub fn select_next(&mut self, key: SequenceKey) -> Result<Option<&Track>> {
        self.step(key, true)
    }

    /// Move the cursor to the previous playable row
    pub fn select_previous(&mut self, key: SequenceKey) -> Result<Option<&Track>> {
        self.step(key, false)
    }

    /// Put the cursor on the row at `index`
    ///
    /// Selecting a marker does nothing and returns `Ok(None)`. Selecting a
    /// folded sequence resumes its own cursor, or starts it at its first track.
    pub fn select(&mut self, key: SequenceKey, index: usize) -> Result<Option<&Track>> {
        let len = self.node(key)?.elements.len();
        if index >= len {
            return Err(SequenceError::IndexOutOfRange { index, len });
        }

        let path = match self.node_ref(key).elements[index] {
            Element::Marker(..) => return Ok(None),
            Element::Track(_) => vec![(key, index)],
            Element::Sequence(child) => {
                let mut path = vec![(key, index)];
                if self.node_ref(child).cursor.is_none() {
                    if let Some(inner) = self.step_path(child, None, true) {
                        path.extend(inner);
                    }
                }
                path
            }
        };

        self.apply_path(&path);
        self.flush_notifications();
        Ok(self.resolve_current(key))
    }

    fn peek(&self, key: SequenceKey, forward: bool) -> Result<Option<&Track>> {
        self.node(key)?;
        Ok(self
            .plan_step(key, forward)
            .and_then(|path| self.track_at(&path)))
    }

    fn step(&mut self, key: SequenceKey, forward: bool) -> Result<Option<&Track>> {
        self.node(key)?;
        let Some(path) = self.plan_step(key, forward) else {
            log::trace!("No {} track in {}", if forward { "next" } else { "previous" }, key);
            return Ok(None);
        };

        self.apply_path(&path);
        self.flush_notifications();
        Ok(self.resolve_current(key))
    }

    fn plan_step(&self, key: SequenceKey, forward: bool) -> Option<CursorPath> {
        let cursor = self.node_ref(key).cursor;
        self.step_path(key, cursor, forward).or_else(|| {
            if self.config.wrap_around && cursor.is_some() {
                self.step_path(key, None, forward)
            } else {
                None
            }
        })
    }

    fn track_at(&self, path: &[(SequenceKey, usize)]) -> Option<&Track> {
        let &(key, index) = path.last()?;
        self.node_ref(key).elements.get(index)?.track()
    }

    /// Find the next track in `key` starting from `from`
    ///
    /// `from == None` means "before the first row" going forward and "after
    /// the last row" going backward. The path descends into folded sequences.
    pub(super) fn step_path(
        &self,
        key: SequenceKey,
        from: Option<usize>,
        forward: bool,
    ) -> Option<CursorPath> {
        let elements = &self.node_ref(key).elements;

        // Sitting on a folded sequence: keep walking inside it first
        if let Some(index) = from {
            if let Some(Element::Sequence(child)) = elements.get(index) {
                let inner_cursor = self.node_ref(*child).cursor;
                if inner_cursor.is_some() {
                    if let Some(mut inner) = self.step_path(*child, inner_cursor, forward) {
                        inner.insert(0, (key, index));
                        return Some(inner);
                    }
                }
            }
        }

        let advance = |i: usize| if forward { Some(i + 1) } else { i.checked_sub(1) };
        let mut candidate = match from {
            Some(i) => advance(i),
            None if forward => Some(0),
            None => elements.len().checked_sub(1),
        };

        while let Some(i) = candidate {
            match elements.get(i)? {
                Element::Track(_) => return Some(vec![(key, i)]),
                Element::Sequence(child) => {
                    if let Some(mut inner) = self.step_path(*child, None, forward) {
                        inner.insert(0, (key, i));
                        return Some(inner);
                    }
                }
                Element::Marker(..) => {}
            }
            candidate = advance(i);
        }

        None
    }

    /// Apply a navigation path and bring every affected cursor in line
    pub(super) fn apply_path(&mut self, path: &[(SequenceKey, usize)]) {
        for &(key, index) in path {
            self.set_cursor(key, Some(index));
            self.sync_down(key);
        }
        if let Some(&(key, _)) = path.first() {
            self.sync_up(key);
        }
    }
}
