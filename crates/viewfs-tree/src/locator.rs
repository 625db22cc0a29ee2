//! Depth-first search and removal over caller-owned trees.
//!
//! Traversal uses an explicit work-list instead of recursion, so tree depth is bounded only by
//! memory. Sibling visit order is an implementation detail; every node is visited exactly once.

use crate::node::TreeItem;

/// Case-insensitive id comparison, one character at a time.
///
/// Characters are folded with their single-character uppercase mapping; a character whose
/// uppercase form expands (`ß` to `SS`) only matches itself.
pub fn ids_match(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.chars().map(fold_char).eq(b.chars().map(fold_char))
}

fn fold_char(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => c,
    }
}

/// Returns the node whose id matches `id`, or `None`.
///
/// With duplicate ids the result is whichever match the traversal reaches first.
pub fn find<'a, T: TreeItem>(roots: &'a [T], id: &str) -> Option<&'a T> {
    let mut stack: Vec<&T> = roots.iter().collect();
    while let Some(node) = stack.pop() {
        if ids_match(node.unique_id(), id) {
            return Some(node);
        }
        stack.extend(node.children());
    }
    None
}

/// Mutable counterpart of [`find`].
pub fn find_mut<'a, T: TreeItem>(roots: &'a mut [T], id: &str) -> Option<&'a mut T> {
    let mut stack: Vec<&mut T> = roots.iter_mut().collect();
    while let Some(node) = stack.pop() {
        if ids_match(node.unique_id(), id) {
            return Some(node);
        }
        stack.extend(node.children_mut().iter_mut());
    }
    None
}

/// Removes `target` from the tree. Returns whether anything was removed.
///
/// Nodes are matched by id, never by walking their subtrees. If a root matches, every matching
/// root is removed and nothing else is touched. Otherwise every node is visited and the first
/// matching child of each node is removed; traversal does not stop after a removal, so a
/// (forbidden) duplicate elsewhere is removed too.
pub fn remove<T: TreeItem>(roots: &mut Vec<T>, target: &T) -> bool {
    let detached = detach(roots, target.unique_id());
    let removed = !detached.is_empty();
    detached.into_iter().for_each(dispose);
    removed
}

/// Removes the node with `id` and hands it back, subtree included.
///
/// Follows the same rules as [`remove`]; when duplicates were removed, the first one found is
/// returned.
pub fn remove_by_id<T: TreeItem>(roots: &mut Vec<T>, id: &str) -> Option<T> {
    let mut detached = detach(roots, id).into_iter();
    let first = detached.next();
    let duplicates = detached.len();
    detached.for_each(dispose);
    tracing::debug!(
        target = "viewfs.tree",
        id,
        removed = first.is_some(),
        duplicates,
        "removed tree node"
    );
    first
}

fn detach<T: TreeItem>(roots: &mut Vec<T>, id: &str) -> Vec<T> {
    if roots.iter().any(|node| ids_match(node.unique_id(), id)) {
        let (detached, kept): (Vec<T>, Vec<T>) = std::mem::take(roots)
            .into_iter()
            .partition(|node| ids_match(node.unique_id(), id));
        *roots = kept;
        return detached;
    }

    let mut detached = Vec::new();
    let mut stack: Vec<&mut T> = roots.iter_mut().collect();
    while let Some(node) = stack.pop() {
        let children = node.children_mut();
        if let Some(pos) = children
            .iter()
            .position(|child| ids_match(child.unique_id(), id))
        {
            detached.push(children.remove(pos));
        }
        stack.extend(children.iter_mut());
    }
    detached
}

/// Drops `node` level by level so arbitrarily deep subtrees cannot exhaust the stack.
fn dispose<T: TreeItem>(node: T) {
    let mut pending = vec![node];
    while let Some(mut node) = pending.pop() {
        pending.append(node.children_mut());
    }
}
