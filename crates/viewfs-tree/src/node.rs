use serde::{Deserialize, Serialize};

/// Shape of a node in a caller-owned content tree.
///
/// Ids are compared case-insensitively and must be unique across the whole tree. The tree must be
/// acyclic; neither property is checked.
pub trait TreeItem: Sized {
    fn unique_id(&self) -> &str;

    fn children(&self) -> &[Self];

    fn children_mut(&mut self) -> &mut Vec<Self>;
}

/// Default node type persisted by content-tree presets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub unique_id: String,
    /// Provider type that created this node (e.g. `ContentTypesTreeNode`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            kind: String::new(),
            name: String::new(),
            children: Vec::new(),
        }
    }

    /// A node with a freshly generated id.
    pub fn with_new_id(kind: impl Into<String>) -> Self {
        let mut node = Self::new(new_unique_id());
        node.kind = kind.into();
        node
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }
}

impl TreeItem for TreeNode {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        // Drop glue would recurse once per level.
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// 32 lowercase hex digits without separators.
pub fn new_unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
