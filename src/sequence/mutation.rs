//! Structural edits
//!
//! Every edit is addressed by an index into the flattened view of the
//! sequence it is called on. The index is first resolved to the sequence that
//! actually owns the row and the position of the row among that owner's
//! direct entries. The edit is then replayed on every instance of the owner's
//! identity group, and finally each ancestor of those instances re-copies the
//! changed span.

use super::element::EntryKind;
use super::tree::Result;
use super::{Edge, Element, PlaylistTree, SequenceError, SequenceKey};
use crate::model::{PlaylistTransfer, Track};
use std::sync::Arc;

/// A flat index resolved to its owning sequence
#[derive(Debug, Clone, Copy)]
struct Located {
    owner: SequenceKey,

    /// Position among the owner's direct entries
    entry: usize,

    /// Flat index of the owner's first row in the view it was resolved from
    offset: usize,
}

/// What was taken out of a sequence
enum Detached {
    Track(Arc<Track>),
    Sequence(SequenceKey),
}

impl PlaylistTree {
    /// Insert tracks so that the first one lands at flat `index`
    ///
    /// An index on a start marker inserts before the embedded sequence, an
    /// index inside it (up to and including its end marker) inserts into it.
    pub fn insert_tracks(&mut self, key: SequenceKey, index: usize, tracks: Vec<Track>) -> Result<()> {
        let target = self.locate_insert(key, index)?;
        if tracks.is_empty() {
            return Ok(());
        }

        let tracks: Vec<Arc<Track>> = tracks.into_iter().map(Arc::new).collect();
        let members = self.group_members(target.owner);
        for &member in &members {
            let block = tracks.iter().cloned().map(Element::Track).collect();
            self.splice_entry(member, target.entry, block);
        }
        self.finish_mutation(&members);

        log::debug!(
            "Inserted {} track(s) into {} ({} instance(s))",
            tracks.len(),
            target.owner,
            members.len()
        );
        Ok(())
    }

    /// Embed `sequence` at flat `index`, expanded
    ///
    /// A free root is adopted by the first instance of the owner; every other
    /// instance (and an already embedded `sequence`) gets a deep copy in the
    /// same identity group. Returns `false` and changes nothing when the
    /// insert would make a sequence contain itself.
    pub fn insert_sequence(&mut self, key: SequenceKey, index: usize, sequence: SequenceKey) -> Result<bool> {
        self.node(sequence)?;
        let target = self.locate_insert(key, index)?;

        if self.would_cycle(target.owner, sequence) {
            log::warn!(
                "Not inserting {} into {}: it would contain itself",
                sequence,
                target.owner
            );
            return Ok(false);
        }

        let adopt = self.node_ref(sequence).parent.is_none();
        let members = self.group_members(target.owner);
        for (n, &member) in members.iter().enumerate() {
            let instance = if n == 0 && adopt {
                sequence
            } else {
                self.clone_subtree(sequence)
            };
            self.embed(member, target.entry, instance);
        }
        self.finish_mutation(&members);

        log::debug!(
            "Embedded {} into {} ({} instance(s))",
            sequence,
            target.owner,
            members.len()
        );
        Ok(true)
    }

    /// Append tracks at the end of the sequence
    pub fn queue_tracks(&mut self, key: SequenceKey, tracks: Vec<Track>) -> Result<()> {
        let len = self.node(key)?.elements.len();
        self.insert_tracks(key, len, tracks)
    }

    /// Append an embedded sequence at the end
    pub fn queue_sequence(&mut self, key: SequenceKey, sequence: SequenceKey) -> Result<bool> {
        let len = self.node(key)?.elements.len();
        self.insert_sequence(key, len, sequence)
    }

    /// Insert tracks right after the cursor (at the end without one)
    pub fn play_next(&mut self, key: SequenceKey, tracks: Vec<Track>) -> Result<()> {
        let node = self.node(key)?;
        let index = match node.cursor {
            Some(cursor) => cursor + 1,
            None => node.elements.len(),
        };
        self.insert_tracks(key, index, tracks)
    }

    /// Embed a sequence right after the cursor (at the end without one)
    pub fn play_sequence_next(&mut self, key: SequenceKey, sequence: SequenceKey) -> Result<bool> {
        let node = self.node(key)?;
        let index = match node.cursor {
            Some(cursor) => cursor + 1,
            None => node.elements.len(),
        };
        self.insert_sequence(key, index, sequence)
    }

    /// Remove the track under the cursor
    ///
    /// A cursor resting on a folded sequence removes that sequence's current
    /// track. Returns `false` when there is no current track.
    pub fn remove_current(&mut self, key: SequenceKey) -> Result<bool> {
        let mut owner = key;
        let mut cursor = self.node(key)?.cursor;
        while let Some(index) = cursor {
            match self.node_ref(owner).elements.get(index) {
                Some(Element::Sequence(child)) => {
                    owner = *child;
                    cursor = self.node_ref(owner).cursor;
                }
                Some(Element::Track(_)) => {
                    self.remove(owner, index)?;
                    return Ok(true);
                }
                _ => return Ok(false),
            }
        }
        Ok(false)
    }

    /// Remove the row at flat `index`
    ///
    /// A marker removes the whole embedded sequence it belongs to. When the
    /// cursor was on the removed rows it moves to the previous playable row,
    /// else the next one, else nowhere.
    pub fn remove(&mut self, key: SequenceKey, index: usize) -> Result<()> {
        let target = self.locate_element(key, index)?;
        let span = self.entries(target.owner)[target.entry];
        let top_start = target.offset + span.start;
        let playing_removed = self
            .node_ref(key)
            .cursor
            .is_some_and(|c| (top_start..top_start + span.width()).contains(&c));
        let members = self.group_members(target.owner);

        let mut retired = Vec::new();
        for &member in &members {
            if let Detached::Sequence(child) = self.detach_entry(member, target.entry) {
                retired.push(child);
            }
        }
        for child in retired {
            self.retire(child);
        }
        self.refresh_ancestors(&members);

        // the owner retreated within itself; the viewed sequence retreats in its own rows
        if playing_removed {
            let cursor = self.fallback_cursor(key, top_start, top_start);
            self.set_cursor(key, cursor);
            self.sync_down(key);
            self.refresh_ancestors(&[key]);
        }
        self.flush_notifications();

        log::debug!(
            "Removed entry {} of {} ({} instance(s))",
            target.entry,
            target.owner,
            members.len()
        );
        Ok(())
    }

    /// Move the row at flat `index` so it lands before the row currently at
    /// `new_index`
    ///
    /// Rows can move between nesting levels. A cursor on the moved rows
    /// follows them. Returns `false` when the move is a no-op or would put a
    /// sequence inside itself.
    pub fn move_element(&mut self, key: SequenceKey, index: usize, new_index: usize) -> Result<bool> {
        let source = self.locate_element(key, index)?;
        let target = self.locate_insert(key, new_index)?;
        let span = self.entries(source.owner)[source.entry];

        if let Some(child) = span.child() {
            if self.would_cycle(target.owner, child) {
                log::debug!("Not moving {} into {}: it would contain itself", child, target.owner);
                return Ok(false);
            }
        }

        if self.node_ref(source.owner).identity == self.node_ref(target.owner).identity {
            if target.entry == source.entry || target.entry == source.entry + 1 {
                return Ok(false);
            }
            let members = self.group_members(source.owner);
            for &member in &members {
                self.shift_entry(member, source.entry, target.entry);
            }
            self.finish_mutation(&members);
            return Ok(true);
        }

        let top_start = source.offset + span.start;
        let follow = self
            .node_ref(key)
            .cursor
            .filter(|c| (top_start..top_start + span.width()).contains(c))
            .map(|c| c - top_start);

        let source_members = self.group_members(source.owner);
        let mut payload = None;
        for (n, &member) in source_members.iter().enumerate() {
            let detached = self.detach_entry(member, source.entry);
            if n == 0 {
                payload = Some(detached);
            } else if let Detached::Sequence(copy) = detached {
                self.retire(copy);
            }
        }
        self.refresh_ancestors(&source_members);

        let target_members = self.group_members(target.owner);
        match payload {
            Some(Detached::Track(track)) => {
                for &member in &target_members {
                    self.splice_entry(member, target.entry, vec![Element::Track(Arc::clone(&track))]);
                }
            }
            Some(Detached::Sequence(child)) => {
                for (n, &member) in target_members.iter().enumerate() {
                    let instance = if n == 0 { child } else { self.clone_subtree(child) };
                    self.embed(member, target.entry, instance);
                }
            }
            None => {}
        }
        self.refresh_ancestors(&target_members);

        if let Some(offset) = follow {
            let position = self.entry_start(target.owner, target.entry) + offset;
            self.set_cursor(target.owner, Some(position));
            self.sync_down(target.owner);
            self.sync_up(target.owner);
        }
        self.flush_notifications();

        log::debug!("Moved entry {} of {} into {}", source.entry, source.owner, target.owner);
        Ok(true)
    }

    /// Collapse the expanded sequence whose marker is at `index` into one row
    ///
    /// Fold state belongs to this view only and is not replayed on other
    /// instances. Returns `false` if `index` is not a marker.
    pub fn fold(&mut self, key: SequenceKey, index: usize) -> Result<bool> {
        let len = self.node(key)?.elements.len();
        if index >= len {
            return Err(SequenceError::IndexOutOfRange { index, len });
        }
        if !self.node_ref(key).elements[index].is_marker() {
            return Ok(false);
        }

        let target = self.locate_element(key, index)?;
        let span = self.entries(target.owner)[target.entry];
        let EntryKind::Expanded(child) = span.kind else {
            return Ok(false);
        };

        let node = self.node_mut(target.owner);
        node.elements.splice(span.start..=span.end, [Element::Sequence(child)]);
        let current = node.cursor;
        let cursor = current.map(|c| {
            if span.contains(c) {
                span.start
            } else if c > span.end {
                c - (span.width() - 1)
            } else {
                c
            }
        });

        self.set_cursor(target.owner, cursor);
        self.finish_mutation(&[target.owner]);
        Ok(true)
    }

    /// Expand the folded sequence at `index` back into its rows
    ///
    /// Returns `false` if `index` is not a folded sequence.
    pub fn unfold(&mut self, key: SequenceKey, index: usize) -> Result<bool> {
        let len = self.node(key)?.elements.len();
        if index >= len {
            return Err(SequenceError::IndexOutOfRange { index, len });
        }
        if !matches!(self.node_ref(key).elements[index], Element::Sequence(_)) {
            return Ok(false);
        }

        let target = self.locate_element(key, index)?;
        let span = self.entries(target.owner)[target.entry];
        let EntryKind::Folded(child) = span.kind else {
            return Ok(false);
        };

        let child_node = self.node_ref(child);
        let child_cursor = child_node.cursor;
        let mut block = Vec::with_capacity(child_node.elements.len() + 2);
        block.push(Element::Marker(Edge::Start, child));
        block.extend(child_node.elements.iter().cloned());
        block.push(Element::Marker(Edge::End, child));
        let width = block.len();

        let node = self.node_mut(target.owner);
        node.elements.splice(span.start..=span.start, block);
        let current = node.cursor;
        let cursor = match current {
            Some(c) if c == span.start => match child_cursor {
                Some(inner) => Some(span.start + 1 + inner),
                None => self.fallback_cursor(target.owner, span.start, span.start + width),
            },
            Some(c) if c > span.start => Some(c + width - 1),
            other => other,
        };

        self.set_cursor(target.owner, cursor);
        self.finish_mutation(&[target.owner]);
        Ok(true)
    }

    /// Give every instance of `key`'s playlist a persisted id
    pub fn assign_id(&mut self, key: SequenceKey, id: i64) -> Result<()> {
        self.node(key)?;
        let members = self.group_members(key);
        let identity = self.fresh_identity(id);

        for member in members {
            let old = {
                let node = self.node_mut(member);
                let old = node.identity;
                node.id = id;
                node.identity = identity;
                old
            };
            self.registry.unregister(old, member);
            self.registry.register(identity, member);
        }

        log::debug!("{} is now {}", key, identity);
        Ok(())
    }

    /// Pick up the id handed out by a store after saving
    ///
    /// Returns `true` when the sequence was unsaved and now carries the id.
    pub fn adopt_saved_id(&mut self, key: SequenceKey, saved: &PlaylistTransfer) -> Result<bool> {
        let node = self.node(key)?;
        if saved.id <= 0 || node.id == saved.id {
            return Ok(false);
        }
        self.assign_id(key, saved.id)?;
        Ok(true)
    }

    /// Rename every instance of `key`'s playlist
    pub fn rename(&mut self, key: SequenceKey, name: impl Into<String>) -> Result<()> {
        self.node(key)?;
        let name = name.into();
        for member in self.group_members(key) {
            self.node_mut(member).name = name.clone();
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Resolution
    // ---------------------------------------------------------------------

    /// Resolve an insertion point (`0..=len`)
    fn locate_insert(&self, key: SequenceKey, index: usize) -> Result<Located> {
        let len = self.node(key)?.elements.len();
        if index > len {
            return Err(SequenceError::IndexOutOfRange { index, len });
        }

        let (mut owner, mut local, mut offset) = (key, index, 0);
        'descend: loop {
            let entries = self.entries(owner);
            if local == self.node_ref(owner).elements.len() {
                return Ok(Located {
                    owner,
                    entry: entries.len(),
                    offset,
                });
            }

            for (n, entry) in entries.iter().enumerate() {
                if local == entry.start {
                    return Ok(Located { owner, entry: n, offset });
                }
                if let EntryKind::Expanded(child) = entry.kind {
                    if entry.start < local && local <= entry.end {
                        offset += entry.start + 1;
                        local -= entry.start + 1;
                        owner = child;
                        continue 'descend;
                    }
                }
            }

            unreachable!("flat index {} is not covered by the entries of {}", local, owner);
        }
    }

    /// Resolve an existing row (`0..len`); both markers address their sequence
    fn locate_element(&self, key: SequenceKey, index: usize) -> Result<Located> {
        let len = self.node(key)?.elements.len();
        if index >= len {
            return Err(SequenceError::IndexOutOfRange { index, len });
        }

        let (mut owner, mut local, mut offset) = (key, index, 0);
        'descend: loop {
            for (n, entry) in self.entries(owner).iter().enumerate() {
                if local == entry.start || local == entry.end {
                    return Ok(Located { owner, entry: n, offset });
                }
                if let EntryKind::Expanded(child) = entry.kind {
                    if entry.start < local && local < entry.end {
                        offset += entry.start + 1;
                        local -= entry.start + 1;
                        owner = child;
                        continue 'descend;
                    }
                }
            }

            unreachable!("flat index {} is not covered by the entries of {}", local, owner);
        }
    }

    /// Whether embedding `sequence` under `owner` would nest a playlist in
    /// itself, directly or through a copy
    fn would_cycle(&self, owner: SequenceKey, sequence: SequenceKey) -> bool {
        let mut guarded = Vec::new();
        let mut current = Some(owner);
        while let Some(key) = current {
            let node = self.node_ref(key);
            guarded.push(node.identity);
            current = node.parent;
        }

        self.subtree(sequence)
            .iter()
            .any(|key| guarded.contains(&self.node_ref(*key).identity))
    }

    // ---------------------------------------------------------------------
    // Per-instance edits
    // ---------------------------------------------------------------------

    /// Insert a block of rows before the entry at `entry`
    fn splice_entry(&mut self, member: SequenceKey, entry: usize, block: Vec<Element>) {
        let at = self.entry_start(member, entry);
        let count = block.len();

        let node = self.node_mut(member);
        let was_empty = node.elements.is_empty();
        node.elements.splice(at..at, block);
        let current = node.cursor;
        let cursor = match current {
            Some(c) if c >= at => Some(c + count),
            None if was_empty => node.elements.iter().position(|e| e.is_playable()),
            other => other,
        };

        self.set_cursor(member, cursor);
        self.sync_down(member);
    }

    fn embed(&mut self, member: SequenceKey, entry: usize, instance: SequenceKey) {
        let child = self.node_mut(instance);
        child.parent = Some(member);

        let mut block = Vec::with_capacity(child.elements.len() + 2);
        block.push(Element::Marker(Edge::Start, instance));
        block.extend(child.elements.iter().cloned());
        block.push(Element::Marker(Edge::End, instance));
        self.splice_entry(member, entry, block);
    }

    /// Take the entry at `entry` out of one instance
    fn detach_entry(&mut self, member: SequenceKey, entry: usize) -> Detached {
        let span = self.entries(member)[entry];

        let node = self.node_mut(member);
        let mut removed: Vec<Element> = node.elements.drain(span.start..=span.end).collect();
        let current = node.cursor;
        let cursor = match current {
            Some(c) if span.contains(c) => self.fallback_cursor(member, span.start, span.start),
            Some(c) if c > span.end => Some(c - span.width()),
            other => other,
        };

        self.set_cursor(member, cursor);
        self.sync_down(member);

        match span.kind {
            EntryKind::Track => match removed.swap_remove(0) {
                Element::Track(track) => Detached::Track(track),
                other => panic!("track entry of {} held {:?}", member, other),
            },
            EntryKind::Folded(child) | EntryKind::Expanded(child) => {
                self.node_mut(child).parent = None;
                Detached::Sequence(child)
            }
        }
    }

    /// Move the entry at `from` in front of the entry at `to` within one
    /// instance
    fn shift_entry(&mut self, member: SequenceKey, from: usize, to: usize) {
        let entries = self.entries(member);
        let span = entries[from];
        let dest = entries
            .get(to)
            .map_or(self.node_ref(member).elements.len(), |e| e.start);
        let width = span.width();
        let at = if dest > span.end { dest - width } else { dest };

        let node = self.node_mut(member);
        let block: Vec<Element> = node.elements.drain(span.start..=span.end).collect();
        node.elements.splice(at..at, block);

        let cursor = node.cursor.map(|c| {
            if span.contains(c) {
                c - span.start + at
            } else {
                let c = if c > span.end { c - width } else { c };
                if c >= at {
                    c + width
                } else {
                    c
                }
            }
        });
        self.set_cursor(member, cursor);
    }

    fn finish_mutation(&mut self, members: &[SequenceKey]) {
        self.refresh_ancestors(members);
        self.flush_notifications();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Identity;

    fn tracks(ids: &[i64]) -> Vec<Track> {
        ids.iter().map(|id| Track::new(*id, format!("Song {}", id))).collect()
    }

    fn ids(tree: &PlaylistTree, key: SequenceKey) -> Vec<Option<i64>> {
        tree.flat_view(key)
            .unwrap()
            .iter()
            .map(|e| e.track().map(|t| t.id))
            .collect()
    }

    fn current_id(tree: &PlaylistTree, key: SequenceKey) -> Option<i64> {
        tree.current(key).unwrap().map(|t| t.id)
    }

    #[test]
    fn test_insert_before_cursor_shifts_it() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Flat", tracks(&[1, 2]));
        tree.select(key, 1).unwrap();

        tree.insert_tracks(key, 0, tracks(&[7])).unwrap();
        assert_eq!(ids(&tree, key), vec![Some(7), Some(1), Some(2)]);
        assert_eq!(tree.cursor(key).unwrap(), Some(2));
        assert_eq!(current_id(&tree, key), Some(2));
    }

    #[test]
    fn test_insert_into_empty_sets_cursor() {
        let mut tree = PlaylistTree::new();
        let key = tree.empty("Empty");

        tree.queue_tracks(key, tracks(&[1, 2])).unwrap();
        assert_eq!(tree.cursor(key).unwrap(), Some(0));
    }

    #[test]
    fn test_insert_out_of_range() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Flat", tracks(&[1]));

        assert_eq!(
            tree.insert_tracks(key, 3, tracks(&[2])),
            Err(SequenceError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(ids(&tree, key), vec![Some(1)]);
    }

    #[test]
    fn test_insert_sequence_builds_markers() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1, 4]));
        let inner = tree.new_sequence("Inner", tracks(&[2, 3]));

        assert!(tree.insert_sequence(outer, 1, inner).unwrap());
        assert_eq!(ids(&tree, outer), vec![Some(1), None, Some(2), Some(3), None, Some(4)]);
        assert_eq!(tree.parent(inner).unwrap(), Some(outer));
        assert_eq!(tree.track_count(outer).unwrap(), 4);
    }

    #[test]
    fn test_insert_inside_nested_goes_to_child() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1, 4]));
        let inner = tree.new_sequence("Inner", tracks(&[2, 3]));
        tree.insert_sequence(outer, 1, inner).unwrap();

        // index 4 is the end marker: append to the child
        tree.insert_tracks(outer, 4, tracks(&[9])).unwrap();
        assert_eq!(ids(&tree, inner), vec![Some(2), Some(3), Some(9)]);
        assert_eq!(
            ids(&tree, outer),
            vec![Some(1), None, Some(2), Some(3), Some(9), None, Some(4)]
        );

        // index 1 is the start marker: insert before the child
        tree.insert_tracks(outer, 1, tracks(&[8])).unwrap();
        assert_eq!(ids(&tree, inner), vec![Some(2), Some(3), Some(9)]);
        assert_eq!(ids(&tree, outer)[1], Some(8));
    }

    #[test]
    fn test_insert_self_is_refused() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1]));
        let inner = tree.new_sequence("Inner", tracks(&[2]));
        tree.insert_sequence(outer, 1, inner).unwrap();

        assert!(!tree.insert_sequence(outer, 0, outer).unwrap());
        assert!(!tree.insert_sequence(inner, 0, outer).unwrap());
        assert_eq!(tree.flat_view(outer).unwrap().len(), 4);
    }

    #[test]
    fn test_remove_current_moves_back() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Flat", tracks(&[1, 2, 3]));
        tree.select(key, 1).unwrap();

        tree.remove(key, 1).unwrap();
        assert_eq!(ids(&tree, key), vec![Some(1), Some(3)]);
        assert_eq!(current_id(&tree, key), Some(1));
    }

    #[test]
    fn test_remove_last_track_clears_cursor() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Single", tracks(&[1]));

        tree.remove(key, 0).unwrap();
        assert!(tree.flat_view(key).unwrap().is_empty());
        assert_eq!(tree.cursor(key).unwrap(), None);
    }

    #[test]
    fn test_remove_marker_removes_sequence() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1, 4]));
        let inner = tree.new_sequence("Inner", tracks(&[2, 3]));
        tree.insert_sequence(outer, 1, inner).unwrap();
        tree.select(outer, 3).unwrap();

        tree.remove(outer, 4).unwrap();
        assert_eq!(ids(&tree, outer), vec![Some(1), Some(4)]);
        assert!(!tree.contains(inner));
        assert_eq!(current_id(&tree, outer), Some(1));
    }

    #[test]
    fn test_remove_inside_child_keeps_parent_cursor() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1, 4]));
        let inner = tree.new_sequence("Inner", tracks(&[2, 3]));
        tree.insert_sequence(outer, 1, inner).unwrap();
        tree.select(outer, 3).unwrap();

        tree.remove(outer, 2).unwrap();
        assert_eq!(ids(&tree, outer), vec![Some(1), None, Some(3), None, Some(4)]);
        assert_eq!(tree.cursor(outer).unwrap(), Some(2));
        assert_eq!(tree.cursor(inner).unwrap(), Some(0));
        assert_eq!(current_id(&tree, outer), Some(3));
    }

    #[test]
    fn test_remove_playing_row_of_expanded_child_retreats_in_view() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1, 4]));
        let inner = tree.new_sequence("Inner", tracks(&[2, 3]));
        tree.insert_sequence(outer, 1, inner).unwrap();
        tree.select(outer, 2).unwrap();

        tree.remove(outer, 2).unwrap();
        assert_eq!(ids(&tree, outer), vec![Some(1), None, Some(3), None, Some(4)]);
        assert_eq!(tree.cursor(outer).unwrap(), Some(0));
        assert_eq!(current_id(&tree, outer), Some(1));
    }

    #[test]
    fn test_remove_current_flat() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Flat", tracks(&[1, 2, 3]));
        tree.select(key, 1).unwrap();

        assert!(tree.remove_current(key).unwrap());
        assert_eq!(ids(&tree, key), vec![Some(1), Some(3)]);
        assert_eq!(current_id(&tree, key), Some(1));

        let empty = tree.empty("Empty");
        assert!(!tree.remove_current(empty).unwrap());
    }

    #[test]
    fn test_remove_current_through_folded_sequence() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1, 4]));
        let inner = tree.new_sequence("Inner", tracks(&[2, 3]));
        tree.insert_sequence(outer, 1, inner).unwrap();
        tree.fold(outer, 1).unwrap();
        tree.select(outer, 1).unwrap();
        assert_eq!(current_id(&tree, outer), Some(2));

        assert!(tree.remove_current(outer).unwrap());
        assert_eq!(ids(&tree, inner), vec![Some(3)]);
        assert_eq!(ids(&tree, outer), vec![Some(1), None, Some(4)]);
        assert_eq!(current_id(&tree, outer), Some(3));
    }

    #[test]
    fn test_move_forward_keeps_cursor_on_track() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Flat", tracks(&[1, 2, 3, 4]));

        assert!(tree.move_element(key, 0, 3).unwrap());
        assert_eq!(ids(&tree, key), vec![Some(2), Some(3), Some(1), Some(4)]);
        assert_eq!(current_id(&tree, key), Some(1));
        assert_eq!(tree.cursor(key).unwrap(), Some(2));
    }

    #[test]
    fn test_move_to_end_and_noop() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Flat", tracks(&[1, 2, 3]));

        assert!(!tree.move_element(key, 1, 2).unwrap());
        assert!(tree.move_element(key, 0, 3).unwrap());
        assert_eq!(ids(&tree, key), vec![Some(2), Some(3), Some(1)]);
    }

    #[test]
    fn test_move_into_nested_sequence() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1, 4]));
        let inner = tree.new_sequence("Inner", tracks(&[2, 3]));
        tree.insert_sequence(outer, 1, inner).unwrap();
        // [1, <, 2, 3, >, 4] with the cursor on 1

        assert!(tree.move_element(outer, 0, 4).unwrap());
        assert_eq!(ids(&tree, inner), vec![Some(2), Some(3), Some(1)]);
        assert_eq!(ids(&tree, outer), vec![None, Some(2), Some(3), Some(1), None, Some(4)]);
        assert_eq!(tree.cursor(outer).unwrap(), Some(3));
        assert_eq!(tree.cursor(inner).unwrap(), Some(2));
        assert_eq!(current_id(&tree, outer), Some(1));
    }

    #[test]
    fn test_move_sequence_into_itself_is_refused() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1]));
        let inner = tree.new_sequence("Inner", tracks(&[2, 3]));
        tree.insert_sequence(outer, 1, inner).unwrap();

        assert!(!tree.move_element(outer, 1, 3).unwrap());
        assert_eq!(tree.flat_view(outer).unwrap().len(), 5);
    }

    #[test]
    fn test_fold_and_unfold() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1, 4]));
        let inner = tree.new_sequence("Inner", tracks(&[2, 3]));
        tree.insert_sequence(outer, 1, inner).unwrap();
        tree.select(outer, 3).unwrap();

        assert!(tree.fold(outer, 4).unwrap());
        assert_eq!(ids(&tree, outer), vec![Some(1), None, Some(4)]);
        assert_eq!(tree.cursor(outer).unwrap(), Some(1));
        assert_eq!(current_id(&tree, outer), Some(3));
        assert!(!tree.fold(outer, 0).unwrap());

        assert!(tree.unfold(outer, 1).unwrap());
        assert_eq!(tree.flat_view(outer).unwrap().len(), 6);
        assert_eq!(tree.cursor(outer).unwrap(), Some(3));
    }

    #[test]
    fn test_fold_after_cursor() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", tracks(&[1, 4]));
        let inner = tree.new_sequence("Inner", tracks(&[2, 3]));
        tree.insert_sequence(outer, 1, inner).unwrap();
        tree.select(outer, 5).unwrap();

        tree.fold(outer, 1).unwrap();
        assert_eq!(tree.cursor(outer).unwrap(), Some(2));
        assert_eq!(current_id(&tree, outer), Some(4));
    }

    #[test]
    fn test_edit_fans_out_to_every_instance() {
        let mut tree = PlaylistTree::new();
        let first = tree.new_sequence("Mix", tracks(&[1, 2]));
        tree.assign_id(first, 5).unwrap();
        let second = tree.clone_subtree(first);

        tree.insert_tracks(first, 2, tracks(&[3])).unwrap();
        assert_eq!(ids(&tree, second), vec![Some(1), Some(2), Some(3)]);

        tree.remove(second, 0).unwrap();
        assert_eq!(ids(&tree, first), vec![Some(2), Some(3)]);
    }

    #[test]
    fn test_embedded_copy_refreshes_its_parent() {
        let mut tree = PlaylistTree::new();
        let mix = tree.new_sequence("Mix", tracks(&[2, 3]));
        let outer = tree.new_sequence("Outer", tracks(&[1]));
        tree.insert_sequence(outer, 1, mix).unwrap();
        let standalone = tree.clone_subtree(mix);

        tree.queue_tracks(standalone, tracks(&[9])).unwrap();
        assert_eq!(ids(&tree, mix), vec![Some(2), Some(3), Some(9)]);
        assert_eq!(
            ids(&tree, outer),
            vec![Some(1), None, Some(2), Some(3), Some(9), None]
        );
    }

    #[test]
    fn test_play_next_inserts_after_cursor() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Flat", tracks(&[1, 2]));

        tree.play_next(key, tracks(&[7, 8])).unwrap();
        assert_eq!(ids(&tree, key), vec![Some(1), Some(7), Some(8), Some(2)]);
        assert_eq!(tree.select_next(key).unwrap().map(|t| t.id), Some(7));
    }

    #[test]
    fn test_play_sequence_next_embeds_after_cursor() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Flat", tracks(&[1, 2]));
        let extra = tree.new_sequence("Extra", tracks(&[5, 6]));

        assert!(tree.play_sequence_next(key, extra).unwrap());
        assert_eq!(
            ids(&tree, key),
            vec![Some(1), None, Some(5), Some(6), None, Some(2)]
        );
        assert_eq!(tree.select_next(key).unwrap().map(|t| t.id), Some(5));
    }

    #[test]
    fn test_assign_id_regroups_instances() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Mix", tracks(&[1]));
        let copy = tree.clone_subtree(key);

        tree.assign_id(key, 12).unwrap();
        assert_eq!(tree.get(copy).unwrap().identity(), Identity::Persisted(12));
        assert_eq!(tree.registry().group_of(Identity::Persisted(12)), vec![key, copy]);

        let mut saved = tree.to_transfer(key).unwrap();
        assert!(!tree.adopt_saved_id(key, &saved).unwrap());
        saved.id = 13;
        assert!(tree.adopt_saved_id(copy, &saved).unwrap());
        assert_eq!(tree.get(key).unwrap().id(), 13);
    }

    #[test]
    fn test_rename_applies_to_group() {
        let mut tree = PlaylistTree::new();
        let key = tree.new_sequence("Old", tracks(&[1]));
        let copy = tree.clone_subtree(key);

        tree.rename(copy, "New").unwrap();
        assert_eq!(tree.get(key).unwrap().name(), "New");
    }
}
