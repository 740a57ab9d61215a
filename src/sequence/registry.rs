//! Identity cache of live sequence instances
//!
//! The same logical playlist can be held in memory several times (opened in
//! two views, embedded in two parents). The registry groups those instances
//! by [`Identity`] so a mutation can be replayed on every one of them.

use super::{Identity, SequenceKey};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
pub struct SequenceRegistry {
    groups: HashMap<Identity, BTreeSet<SequenceKey>>,
}

/// Ancestors that embed a set of changed sequences
///
/// Each entry lists an ancestor and the immediate children through which a
/// change reaches it. Entries are ordered deepest first, so refreshing them
/// in order never reads a stale child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorMap {
    entries: Vec<(SequenceKey, Vec<SequenceKey>)>,
}

impl AncestorMap {
    pub fn iter(&self) -> impl Iterator<Item = (SequenceKey, &[SequenceKey])> {
        self.entries
            .iter()
            .map(|(ancestor, children)| (*ancestor, children.as_slice()))
    }

    /// Children needing a refresh below `ancestor`
    pub fn children_of(&self, ancestor: SequenceKey) -> Option<&[SequenceKey]> {
        self.entries
            .iter()
            .find(|(key, _)| *key == ancestor)
            .map(|(_, children)| children.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SequenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance to its identity group
    pub fn register(&mut self, identity: Identity, key: SequenceKey) {
        self.groups.entry(identity).or_default().insert(key);
    }

    /// Remove an instance from its identity group
    ///
    /// Returns `false` when the instance was not registered under `identity`.
    pub fn unregister(&mut self, identity: Identity, key: SequenceKey) -> bool {
        let Some(group) = self.groups.get_mut(&identity) else {
            return false;
        };

        let removed = group.remove(&key);
        if group.is_empty() {
            self.groups.remove(&identity);
        }
        removed
    }

    /// All live instances of one logical playlist, in key order
    pub fn group_of(&self, identity: Identity) -> Vec<SequenceKey> {
        self.groups
            .get(&identity)
            .map(|group| group.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, identity: Identity, key: SequenceKey) -> bool {
        self.groups
            .get(&identity)
            .is_some_and(|group| group.contains(&key))
    }

    /// Number of distinct logical playlists
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of registered instances
    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Ancestor map of every instance in an identity group
    pub fn group_ancestors<F>(&self, identity: Identity, parent_of: F) -> AncestorMap
    where
        F: FnMut(SequenceKey) -> Option<SequenceKey>,
    {
        Self::ancestor_map(&self.group_of(identity), parent_of)
    }

    /// Walk each member's parent chain and collect, per ancestor, the
    /// immediate children that lead to a changed member
    pub fn ancestor_map<F>(members: &[SequenceKey], mut parent_of: F) -> AncestorMap
    where
        F: FnMut(SequenceKey) -> Option<SequenceKey>,
    {
        // (ancestor, depth, children)
        let mut found: Vec<(SequenceKey, usize, Vec<SequenceKey>)> = Vec::new();

        for &member in members {
            let mut chain = vec![member];
            let mut current = member;
            while let Some(parent) = parent_of(current) {
                chain.push(parent);
                current = parent;
            }

            // chain = [member, parent, grandparent, ..., root]
            let root_distance = chain.len() - 1;
            for (level, link) in chain.windows(2).enumerate() {
                let (child, ancestor) = (link[0], link[1]);
                let depth = root_distance - (level + 1);

                match found.iter_mut().find(|(key, _, _)| *key == ancestor) {
                    Some((_, _, children)) => {
                        if !children.contains(&child) {
                            children.push(child);
                        }
                    }
                    None => found.push((ancestor, depth, vec![child])),
                }
            }
        }

        found.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        AncestorMap {
            entries: found
                .into_iter()
                .map(|(ancestor, _, children)| (ancestor, children))
                .collect(),
        }
    }
}
