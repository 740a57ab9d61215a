//! Arena of nested sequences
//!
//! Every sequence instance lives in one [`PlaylistTree`] and is addressed by
//! a [`SequenceKey`]. A sequence owns its elements; the parent link is a
//! plain key used for lookups only. An expanded child shows up in its
//! parent's element list as `Marker(Start) .. child elements .. Marker(End)`,
//! so the parent's list doubles as the flattened view. Whenever a child
//! changes, the copy of its elements inside every ancestor is refreshed.

use super::element::{Entry, EntryKind};
use super::{Edge, Element, Identity, Row, RowKind, SequenceError, SequenceKey, SequenceRegistry, TreeConfig};
use crate::model::{PlaylistTransfer, Track, TransferElement, TransferKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, SequenceError>;

/// Handle for removing a cursor-change handler again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type CursorHandler = Box<dyn FnMut(Option<usize>)>;
type LengthHandler = Box<dyn FnMut(usize)>;

/// Length-change handlers of one sequence and the length they last saw
struct LengthWatch {
    last: usize,
    handlers: Vec<(SubscriptionId, LengthHandler)>,
}

/// One playlist instance: its own elements (flattened view) and cursor
#[derive(Debug, Clone)]
pub struct Sequence {
    pub(super) id: i64,
    pub(super) identity: Identity,
    pub(super) name: String,
    pub(super) elements: Vec<Element>,
    pub(super) cursor: Option<usize>,
    pub(super) parent: Option<SequenceKey>,
}

impl Sequence {
    /// Persisted id (`<= 0` while unsaved)
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The flattened view
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn parent(&self) -> Option<SequenceKey> {
        self.parent
    }

    /// Length of the flattened view
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Arena holding every live sequence, the identity registry and the
/// cursor-change subscriptions
pub struct PlaylistTree {
    pub(super) nodes: HashMap<SequenceKey, Sequence>,
    pub(super) registry: SequenceRegistry,
    pub(super) config: TreeConfig,
    next_key: u64,
    next_transient: u64,
    handlers: HashMap<SequenceKey, Vec<(SubscriptionId, CursorHandler)>>,
    next_subscription: u64,
    changed_cursors: Vec<SequenceKey>,
    length_watches: HashMap<SequenceKey, LengthWatch>,
}

impl fmt::Debug for PlaylistTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaylistTree")
            .field("sequences", &self.nodes.len())
            .field("groups", &self.registry.group_count())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for PlaylistTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistTree {
    /// Create an empty tree with the default configuration
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            nodes: HashMap::new(),
            registry: SequenceRegistry::new(),
            config,
            next_key: 0,
            next_transient: 0,
            handlers: HashMap::new(),
            next_subscription: 0,
            changed_cursors: Vec::new(),
            length_watches: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn registry(&self) -> &SequenceRegistry {
        &self.registry
    }

    pub fn get(&self, key: SequenceKey) -> Option<&Sequence> {
        self.nodes.get(&key)
    }

    pub fn contains(&self, key: SequenceKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Number of live sequence instances
    pub fn instance_count(&self) -> usize {
        self.nodes.len()
    }

    /// Sequences without a parent, in key order
    pub fn roots(&self) -> Vec<SequenceKey> {
        let mut roots: Vec<SequenceKey> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(key, _)| *key)
            .collect();
        roots.sort();
        roots
    }

    /// Create an empty, unsaved sequence
    pub fn empty(&mut self, name: impl Into<String>) -> SequenceKey {
        self.new_sequence(name, Vec::new())
    }

    /// Create an unsaved sequence from tracks; the cursor starts on the first
    pub fn new_sequence(&mut self, name: impl Into<String>, tracks: Vec<Track>) -> SequenceKey {
        let elements: Vec<Element> = tracks
            .into_iter()
            .map(|track| Element::Track(Arc::new(track)))
            .collect();
        let cursor = if elements.is_empty() { None } else { Some(0) };

        let key = self.allocate_key();
        let identity = self.fresh_identity(0);
        self.insert_node(
            key,
            Sequence {
                id: 0,
                identity,
                name: name.into(),
                elements,
                cursor,
                parent: None,
            },
        );
        key
    }

    /// Build a sequence tree from a transfer object
    ///
    /// Nested playlists become expanded children. On a malformed node nothing
    /// is left behind in the arena.
    pub fn from_transfer(&mut self, transfer: &PlaylistTransfer) -> Result<SequenceKey> {
        let mut created = Vec::new();
        match self.build(transfer.id, &transfer.name, &transfer.list, "list", &mut created) {
            Ok(key) => {
                log::debug!(
                    "Built {} from transfer '{}' ({} sequence(s))",
                    key,
                    transfer.name,
                    created.len()
                );
                Ok(key)
            }
            Err(e) => {
                for key in created {
                    if let Some(node) = self.nodes.remove(&key) {
                        self.registry.unregister(node.identity, key);
                    }
                }
                Err(e)
            }
        }
    }

    fn build(
        &mut self,
        id: i64,
        name: &str,
        list: &[TransferElement],
        path: &str,
        created: &mut Vec<SequenceKey>,
    ) -> Result<SequenceKey> {
        let key = self.allocate_key();
        let mut elements = Vec::with_capacity(list.len());
        let mut children = Vec::new();

        for (n, item) in list.iter().enumerate() {
            let item_path = format!("{}[{}]", path, n);
            match item.kind() {
                Some(TransferKind::Track(track)) => elements.push(Element::Track(Arc::new(track))),
                Some(TransferKind::Playlist { id, name, list }) => {
                    let child_path = format!("{}.list", item_path);
                    let child = self.build(id, name, list, &child_path, created)?;
                    children.push(child);
                    elements.push(Element::Marker(Edge::Start, child));
                    elements.extend(self.node_ref(child).elements.iter().cloned());
                    elements.push(Element::Marker(Edge::End, child));
                }
                None => return Err(SequenceError::MalformedInput { path: item_path }),
            }
        }

        // First playable row; inside a child that is the child's own first row
        let cursor = elements.iter().position(|e| e.is_playable());
        let identity = self.fresh_identity(id);
        self.insert_node(
            key,
            Sequence {
                id,
                identity,
                name: name.to_string(),
                elements,
                cursor,
                parent: None,
            },
        );
        created.push(key);

        for child in children {
            self.node_mut(child).parent = Some(key);
        }
        Ok(key)
    }

    /// Project a sequence back into a transfer object
    ///
    /// Cursor and fold state are not part of the projection.
    pub fn to_transfer(&self, key: SequenceKey) -> Result<PlaylistTransfer> {
        self.node(key)?;
        Ok(self.transfer_of(key))
    }

    fn transfer_of(&self, key: SequenceKey) -> PlaylistTransfer {
        let node = self.node_ref(key);
        let mut list = Vec::new();

        for entry in self.entries(key) {
            match entry.kind {
                EntryKind::Track => {
                    if let Some(track) = node.elements[entry.start].track() {
                        list.push(TransferElement::from(track));
                    }
                }
                EntryKind::Folded(child) | EntryKind::Expanded(child) => {
                    list.push(self.transfer_of(child).into());
                }
            }
        }

        PlaylistTransfer {
            id: node.id,
            name: node.name.clone(),
            list,
        }
    }

    /// Read-only flattened view for rendering
    pub fn flat_view(&self, key: SequenceKey) -> Result<&[Element]> {
        Ok(&self.node(key)?.elements)
    }

    pub fn cursor(&self, key: SequenceKey) -> Result<Option<usize>> {
        Ok(self.node(key)?.cursor)
    }

    pub fn parent(&self, key: SequenceKey) -> Result<Option<SequenceKey>> {
        Ok(self.node(key)?.parent)
    }

    /// Every live instance of the same logical playlist, `key` first
    pub fn group(&self, key: SequenceKey) -> Result<Vec<SequenceKey>> {
        self.node(key)?;
        Ok(self.group_members(key))
    }

    /// Number of tracks in the sequence, nested ones included
    pub fn track_count(&self, key: SequenceKey) -> Result<usize> {
        self.node(key)?;
        Ok(self.count_tracks(key))
    }

    fn count_tracks(&self, key: SequenceKey) -> usize {
        self.entries(key)
            .iter()
            .map(|entry| match entry.child() {
                Some(child) => self.count_tracks(child),
                None => 1,
            })
            .sum()
    }

    /// Rendering rows with nesting depth and the current-row flag
    pub fn rows(&self, key: SequenceKey) -> Result<Vec<Row<'_>>> {
        let node = self.node(key)?;
        let mut depth = 0usize;
        let mut rows = Vec::with_capacity(node.elements.len());

        for (index, element) in node.elements.iter().enumerate() {
            let kind = match element {
                Element::Track(track) => RowKind::Track(track.as_ref()),
                Element::Sequence(child) => RowKind::Folded {
                    key: *child,
                    name: &self.node_ref(*child).name,
                    tracks: self.count_tracks(*child),
                },
                Element::Marker(Edge::Start, child) => RowKind::Start {
                    key: *child,
                    name: &self.node_ref(*child).name,
                },
                Element::Marker(Edge::End, child) => {
                    depth = depth.saturating_sub(1);
                    RowKind::End {
                        key: *child,
                        name: &self.node_ref(*child).name,
                    }
                }
            };

            rows.push(Row {
                index,
                depth,
                current: node.cursor == Some(index),
                kind,
            });

            if matches!(element, Element::Marker(Edge::Start, _)) {
                depth += 1;
            }
        }

        Ok(rows)
    }

    /// Call `handler` with the new flat-view cursor whenever the cursor of
    /// `key` changes
    pub fn on_cursor_change<F>(&mut self, key: SequenceKey, handler: F) -> Result<SubscriptionId>
    where
        F: FnMut(Option<usize>) + 'static,
    {
        self.node(key)?;
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        let handler: CursorHandler = Box::new(handler);
        self.handlers.entry(key).or_default().push((id, handler));
        Ok(id)
    }

    /// Remove a handler; returns `false` if it was not registered
    pub fn off_cursor_change(&mut self, key: SequenceKey, id: SubscriptionId) -> bool {
        let Some(handlers) = self.handlers.get_mut(&key) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            self.handlers.remove(&key);
        }
        removed
    }

    /// Call `handler` with the new flat-view length whenever an operation
    /// changes the length of `key`
    pub fn on_length_change<F>(&mut self, key: SequenceKey, handler: F) -> Result<SubscriptionId>
    where
        F: FnMut(usize) + 'static,
    {
        let last = self.node(key)?.elements.len();
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        let handler: LengthHandler = Box::new(handler);
        self.length_watches
            .entry(key)
            .or_insert_with(|| LengthWatch {
                last,
                handlers: Vec::new(),
            })
            .handlers
            .push((id, handler));
        Ok(id)
    }

    pub fn off_length_change(&mut self, key: SequenceKey, id: SubscriptionId) -> bool {
        let Some(watch) = self.length_watches.get_mut(&key) else {
            return false;
        };
        let before = watch.handlers.len();
        watch.handlers.retain(|(handler_id, _)| *handler_id != id);
        let removed = watch.handlers.len() != before;
        if watch.handlers.is_empty() {
            self.length_watches.remove(&key);
        }
        removed
    }

    /// Drop a root sequence and everything embedded in it
    pub fn release(&mut self, key: SequenceKey) -> Result<()> {
        if self.node(key)?.parent.is_some() {
            return Err(SequenceError::Embedded(key));
        }
        self.retire(key);
        log::debug!("Released {}", key);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Arena internals
    // ---------------------------------------------------------------------

    fn allocate_key(&mut self) -> SequenceKey {
        self.next_key += 1;
        SequenceKey(self.next_key)
    }

    pub(super) fn fresh_identity(&mut self, id: i64) -> Identity {
        if id > 0 {
            Identity::Persisted(id)
        } else {
            self.next_transient += 1;
            Identity::Transient(self.next_transient)
        }
    }

    fn insert_node(&mut self, key: SequenceKey, node: Sequence) {
        self.registry.register(node.identity, key);
        self.nodes.insert(key, node);
    }

    pub(super) fn node(&self, key: SequenceKey) -> Result<&Sequence> {
        self.nodes
            .get(&key)
            .ok_or(SequenceError::UnknownSequence(key))
    }

    /// Lookup of a key the tree itself handed out; a miss is corruption
    pub(super) fn node_ref(&self, key: SequenceKey) -> &Sequence {
        match self.nodes.get(&key) {
            Some(node) => node,
            None => panic!("sequence {} is referenced but missing from the arena", key),
        }
    }

    pub(super) fn node_mut(&mut self, key: SequenceKey) -> &mut Sequence {
        match self.nodes.get_mut(&key) {
            Some(node) => node,
            None => panic!("sequence {} is referenced but missing from the arena", key),
        }
    }

    /// Direct children of a sequence with their flat spans
    pub(crate) fn entries(&self, key: SequenceKey) -> Vec<Entry> {
        entries_of(&self.node_ref(key).elements)
    }

    /// Flat start of the entry at `entry`, or the view length past the end
    pub(super) fn entry_start(&self, key: SequenceKey, entry: usize) -> usize {
        self.entries(key)
            .get(entry)
            .map_or(self.node_ref(key).elements.len(), |e| e.start)
    }

    /// `key` and every sequence embedded below it, parents before children
    pub(crate) fn subtree(&self, key: SequenceKey) -> Vec<SequenceKey> {
        let mut keys = vec![key];
        let mut next = 0;
        while next < keys.len() {
            let children: Vec<SequenceKey> =
                self.entries(keys[next]).iter().filter_map(|e| e.child()).collect();
            keys.extend(children);
            next += 1;
        }
        keys
    }

    /// Where `child` sits inside `parent`
    ///
    /// Panics if the child is not there: the parent link and the parent's
    /// elements disagree, which means the tree is corrupt.
    pub(super) fn embedding(&self, parent: SequenceKey, child: SequenceKey) -> Entry {
        match self
            .entries(parent)
            .into_iter()
            .find(|entry| entry.child() == Some(child))
        {
            Some(entry) => entry,
            None => panic!("missing parent: {} is not embedded in its parent {}", child, parent),
        }
    }

    pub(super) fn group_members(&self, key: SequenceKey) -> Vec<SequenceKey> {
        let identity = self.node_ref(key).identity;
        let mut members = self.registry.group_of(identity);
        members.retain(|member| *member != key);
        members.insert(0, key);
        members
    }

    pub(super) fn playable_before(&self, key: SequenceKey, index: usize) -> Option<usize> {
        let elements = &self.node_ref(key).elements;
        elements[..index.min(elements.len())]
            .iter()
            .rposition(|e| e.is_playable())
    }

    pub(super) fn playable_from(&self, key: SequenceKey, index: usize) -> Option<usize> {
        self.node_ref(key)
            .elements
            .iter()
            .skip(index)
            .position(|e| e.is_playable())
            .map(|offset| index + offset)
    }

    /// Previous playable row before `before`, else the first one from `after`
    pub(super) fn fallback_cursor(&self, key: SequenceKey, before: usize, after: usize) -> Option<usize> {
        self.playable_before(key, before)
            .or_else(|| self.playable_from(key, after))
    }

    pub(super) fn set_cursor(&mut self, key: SequenceKey, cursor: Option<usize>) {
        let node = self.node_mut(key);
        if node.cursor != cursor {
            node.cursor = cursor;
            if !self.changed_cursors.contains(&key) {
                self.changed_cursors.push(key);
            }
        }
    }

    /// Push the cursor of `key` down into the expanded child it points into
    pub(super) fn sync_down(&mut self, key: SequenceKey) {
        let mut key = key;
        loop {
            let Some(cursor) = self.node_ref(key).cursor else {
                return;
            };

            let inner = self.entries(key).into_iter().find_map(|entry| match entry.kind {
                EntryKind::Expanded(child) if entry.start < cursor && cursor < entry.end => {
                    Some((child, cursor - entry.start - 1))
                }
                _ => None,
            });

            match inner {
                Some((child, local)) => {
                    self.set_cursor(child, Some(local));
                    key = child;
                }
                None => return,
            }
        }
    }

    /// Point every ancestor's cursor at the row of `key`'s cursor
    pub(super) fn sync_up(&mut self, key: SequenceKey) {
        let mut child = key;
        while let Some(parent) = self.node_ref(child).parent {
            let Some(cursor) = self.node_ref(child).cursor else {
                return;
            };

            let entry = self.embedding(parent, child);
            let position = match entry.kind {
                EntryKind::Expanded(_) => entry.start + 1 + cursor,
                _ => entry.start,
            };
            self.set_cursor(parent, Some(position));
            child = parent;
        }
    }

    /// Re-copy changed children into every ancestor that embeds them
    pub(super) fn refresh_ancestors(&mut self, changed: &[SequenceKey]) {
        let map = {
            let nodes = &self.nodes;
            SequenceRegistry::ancestor_map(changed, |key| match nodes.get(&key) {
                Some(node) => node.parent,
                None => panic!("missing parent: sequence {} is not in the arena", key),
            })
        };

        for (ancestor, children) in map.iter() {
            for &child in children {
                self.resplice(ancestor, child);
            }
        }
    }

    fn resplice(&mut self, parent: SequenceKey, child: SequenceKey) {
        let entry = self.embedding(parent, child);
        let EntryKind::Expanded(_) = entry.kind else {
            // folded: the parent shows a single row, nothing to copy
            return;
        };

        let interior = self.node_ref(child).elements.clone();
        let child_cursor = self.node_ref(child).cursor;
        let (start, end) = (entry.start, entry.end);
        let new_end = start + interior.len() + 1;

        let node = self.node_mut(parent);
        node.elements.splice(start + 1..end, interior);
        let current = node.cursor;

        let cursor = match current {
            Some(i) if i > end => Some(i - end + new_end),
            Some(i) if i == end => Some(new_end),
            Some(i) if i > start => match child_cursor {
                Some(inner) => Some(start + 1 + inner),
                None => self.fallback_cursor(parent, start, new_end + 1),
            },
            other => other,
        };

        self.set_cursor(parent, cursor);
        self.sync_down(parent);
    }

    /// Deep copy of a subtree, registered in the same identity groups
    pub(super) fn clone_subtree(&mut self, source: SequenceKey) -> SequenceKey {
        let mut mapping = HashMap::new();
        self.clone_node(source, &mut mapping)
    }

    fn clone_node(
        &mut self,
        source: SequenceKey,
        mapping: &mut HashMap<SequenceKey, SequenceKey>,
    ) -> SequenceKey {
        let key = self.allocate_key();

        let children: Vec<SequenceKey> = self.entries(source).iter().filter_map(|e| e.child()).collect();
        let mut copies = Vec::with_capacity(children.len());
        for child in children {
            copies.push(self.clone_node(child, mapping));
        }

        let original = self.node_ref(source);
        let elements = original
            .elements
            .iter()
            .map(|element| match element {
                Element::Track(track) => Element::Track(Arc::clone(track)),
                Element::Sequence(child) => Element::Sequence(mapping[child]),
                Element::Marker(edge, child) => Element::Marker(*edge, mapping[child]),
            })
            .collect();

        let copy = Sequence {
            id: original.id,
            identity: original.identity,
            name: original.name.clone(),
            elements,
            cursor: original.cursor,
            parent: None,
        };
        self.insert_node(key, copy);

        for child in copies {
            self.node_mut(child).parent = Some(key);
        }
        mapping.insert(source, key);
        key
    }

    /// Remove a subtree from the arena, the registry and the subscriptions
    pub(super) fn retire(&mut self, key: SequenceKey) {
        for retired in self.subtree(key) {
            if let Some(node) = self.nodes.remove(&retired) {
                self.registry.unregister(node.identity, retired);
            }
            self.handlers.remove(&retired);
            self.length_watches.remove(&retired);
            self.changed_cursors.retain(|changed| *changed != retired);
        }
    }

    /// Deliver one notification per sequence whose cursor or length changed
    pub(super) fn flush_notifications(&mut self) {
        for (key, watch) in self.length_watches.iter_mut() {
            let Some(len) = self.nodes.get(key).map(|node| node.elements.len()) else {
                continue;
            };
            if len != watch.last {
                watch.last = len;
                for (_, handler) in watch.handlers.iter_mut() {
                    handler(len);
                }
            }
        }

        let changed = std::mem::take(&mut self.changed_cursors);
        for key in changed {
            let Some(cursor) = self.nodes.get(&key).map(|node| node.cursor) else {
                continue;
            };
            if let Some(handlers) = self.handlers.get_mut(&key) {
                for (_, handler) in handlers.iter_mut() {
                    handler(cursor);
                }
            }
        }
    }
}

/// Split a flat element list into its direct entries
fn entries_of(elements: &[Element]) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut index = 0;

    while index < elements.len() {
        let entry = match elements[index] {
            Element::Track(_) => Entry {
                start: index,
                end: index,
                kind: EntryKind::Track,
            },
            Element::Sequence(child) => Entry {
                start: index,
                end: index,
                kind: EntryKind::Folded(child),
            },
            Element::Marker(Edge::Start, child) => Entry {
                start: index,
                end: matching_end(elements, index, child),
                kind: EntryKind::Expanded(child),
            },
            Element::Marker(Edge::End, child) => {
                panic!("end marker of {} at {} has no start marker", child, index)
            }
        };
        index = entry.end + 1;
        entries.push(entry);
    }

    entries
}

fn matching_end(elements: &[Element], start: usize, child: SequenceKey) -> usize {
    match elements[start + 1..]
        .iter()
        .position(|e| matches!(e, Element::Marker(Edge::End, key) if *key == child))
    {
        Some(offset) => start + 1 + offset,
        None => panic!("start marker of {} at {} has no end marker", child, start),
    }
}
