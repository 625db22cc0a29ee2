//! Lookup and removal primitives for content trees.
//!
//! The tree itself belongs to the caller (typically an admin request handler that loads a
//! persisted preset, edits it, and saves it back). Nothing here locks, persists, or keeps
//! references across calls; callers serialize access to a tree for the duration of one
//! find → edit/remove → persist cycle.

mod locator;
mod node;

pub use locator::{find, find_mut, ids_match, remove, remove_by_id};
pub use node::{new_unique_id, TreeItem, TreeNode};
