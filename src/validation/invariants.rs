//! Structural checks on a sequence tree
//!
//! Walks a tree top down and verifies that every flattened view agrees with
//! the sequences embedded in it.

use crate::sequence::{Edge, Element, EntryKind, PlaylistTree, SequenceKey};
use anyhow::{bail, ensure, Context, Result};

/// Check `root` and everything embedded in it
///
/// # Checks
/// * start/end markers pair up and nest
/// * the rows between a child's markers equal the child's own rows
/// * children point back at the sequence that embeds them
/// * cursors stay in range and never rest on a marker
/// * a parent cursor inside a child's span agrees with the child's cursor
/// * every instance is registered under its identity
pub fn check_tree(tree: &PlaylistTree, root: SequenceKey) -> Result<()> {
    if tree.get(root).is_none() {
        bail!("sequence {} is not in the tree", root);
    }

    let mut checked = 0;
    let mut pending = vec![root];
    while let Some(key) = pending.pop() {
        check_sequence(tree, key).with_context(|| format!("invariant violated in {}", key))?;
        pending.extend(tree.entries(key).iter().filter_map(|entry| entry.child()));
        checked += 1;
    }

    log::debug!("Checked {} sequence(s) under {}", checked, root);
    Ok(())
}

/// Check every root sequence of the tree
pub fn check_all(tree: &PlaylistTree) -> Result<()> {
    for root in tree.roots() {
        check_tree(tree, root)?;
    }
    Ok(())
}

fn check_sequence(tree: &PlaylistTree, key: SequenceKey) -> Result<()> {
    let node = tree.get(key).context("sequence is referenced but missing")?;
    let elements = node.elements();

    ensure!(
        tree.registry().contains(node.identity(), key),
        "not registered under {}",
        node.identity()
    );

    // markers first: entries() assumes they pair up
    let mut open: Vec<SequenceKey> = Vec::new();
    for (index, element) in elements.iter().enumerate() {
        match element {
            Element::Marker(Edge::Start, child) => open.push(*child),
            Element::Marker(Edge::End, child) => {
                let closed = open.pop();
                ensure!(
                    closed == Some(*child),
                    "end marker of {} at {} closes {:?}",
                    child,
                    index,
                    closed
                );
            }
            _ => {}
        }
    }
    ensure!(open.is_empty(), "unclosed start markers: {:?}", open);

    if let Some(cursor) = node.cursor() {
        ensure!(cursor < elements.len(), "cursor {} past the end ({})", cursor, elements.len());
        ensure!(!elements[cursor].is_marker(), "cursor {} rests on a marker", cursor);
    }

    for entry in tree.entries(key) {
        let child = match entry.kind {
            EntryKind::Track => continue,
            EntryKind::Folded(child) | EntryKind::Expanded(child) => child,
        };
        let child_node = tree
            .get(child)
            .with_context(|| format!("embedded sequence {} is missing", child))?;
        ensure!(
            child_node.parent() == Some(key),
            "{} at {} points at parent {:?}",
            child,
            entry.start,
            child_node.parent()
        );

        if let EntryKind::Expanded(_) = entry.kind {
            ensure!(
                &elements[entry.start + 1..entry.end] == child_node.elements(),
                "rows of {} at {}..{} are stale",
                child,
                entry.start,
                entry.end
            );

            if let Some(cursor) = node.cursor() {
                if entry.start < cursor && cursor < entry.end {
                    let expected = cursor - entry.start - 1;
                    ensure!(
                        child_node.cursor() == Some(expected),
                        "cursor {} expects {} at {}, found {:?}",
                        cursor,
                        child,
                        expected,
                        child_node.cursor()
                    );
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Track;

    #[test]
    fn test_fresh_tree_passes() {
        let mut tree = PlaylistTree::new();
        let outer = tree.new_sequence("Outer", vec![Track::new(1, "One")]);
        let inner = tree.new_sequence("Inner", vec![Track::new(2, "Two")]);
        tree.insert_sequence(outer, 1, inner).unwrap();

        check_tree(&tree, outer).unwrap();
        check_all(&tree).unwrap();
    }

    #[test]
    fn test_unknown_root_fails() {
        let mut tree = PlaylistTree::new();
        let key = tree.empty("Gone");
        tree.release(key).unwrap();

        assert!(check_tree(&tree, key).is_err());
    }
}
