//! Tree nodes: string leaves and insertion-ordered groups.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::LookupError;

/// A node of the settings tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A terminal string value.
    Leaf(String),
    /// Named children, iterated in insertion order.
    Group(Group),
}

impl Node {
    pub fn leaf(value: impl Into<String>) -> Self {
        Node::Leaf(value.into())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Node::Group(_))
    }

    /// Returns the string of a leaf, `None` for a group.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Group(_) => None,
        }
    }

    /// Returns the children of a group, `None` for a leaf.
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(group) => Some(group),
            Node::Leaf(_) => None,
        }
    }
}

impl From<Group> for Node {
    fn from(group: Group) -> Self {
        Node::Group(group)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Leaf(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Leaf(value)
    }
}

/// An ordered mapping from names to child nodes.
///
/// Names are unique: inserting an existing name replaces the child and keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    children: IndexMap<String, Node>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Inserts a child, returning the node it replaced.
    pub fn insert(&mut self, name: impl Into<String>, node: impl Into<Node>) -> Option<Node> {
        self.children.insert(name.into(), node.into())
    }

    /// Returns the direct child called `name`.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// Walks a dotted path (`section.sub.key`) down the tree.
    ///
    /// A missing component, an empty component, or a leaf met before the
    /// last component all yield [`LookupError::NotFound`].
    pub fn lookup(&self, path: &str) -> Result<&Node, LookupError> {
        let not_found = || LookupError::not_found(path);

        let mut parts = path.split('.');
        let first = parts
            .next()
            .filter(|part| !part.is_empty())
            .ok_or_else(not_found)?;
        let mut current = self.children.get(first).ok_or_else(not_found)?;

        for part in parts {
            if part.is_empty() {
                return Err(not_found());
            }
            current = current
                .as_group()
                .and_then(|group| group.children.get(part))
                .ok_or_else(not_found)?;
        }

        Ok(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_ok()
    }

    /// Iterates over `(name, node)` pairs in insertion order.
    ///
    /// Calling it again restarts from the first child.
    pub fn children(&self) -> Children<'_> {
        Children {
            inner: self.children.iter(),
        }
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.children.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &Node> + '_ {
        self.children.values()
    }

    /// Folds `overlay` into `self`.
    ///
    /// Groups present on both sides merge recursively; any other pairing is
    /// settled by the overlay's node replacing ours, so a leaf can turn into
    /// a group (and back) from one source to the next.
    pub fn merge(&mut self, overlay: Group) {
        for (name, node) in overlay.children {
            match (self.children.get_mut(&name), node) {
                (Some(Node::Group(base)), Node::Group(overlay)) => base.merge(overlay),
                (_, node) => {
                    self.children.insert(name, node);
                }
            }
        }
    }

    /// Merges `node` at `path` below this group, creating intermediate groups.
    ///
    /// An intermediate leaf in the way is replaced by a group. With an empty
    /// path `node` is merged into this group itself, which only a group can
    /// be; a leaf has no name to live under and is dropped.
    pub fn merge_at(&mut self, path: &[String], node: Node) {
        let Some((first, rest)) = path.split_first() else {
            debug_assert!(node.is_group(), "only a group can be merged at an empty path");
            if let Node::Group(overlay) = node {
                self.merge(overlay);
            }
            return;
        };

        if rest.is_empty() {
            let mut single = Group::new();
            single.insert(first.clone(), node);
            self.merge(single);
            return;
        }

        if !matches!(self.children.get(first), Some(Node::Group(_))) {
            self.children.insert(first.clone(), Node::Group(Group::new()));
        }

        if let Some(Node::Group(nested)) = self.children.get_mut(first) {
            nested.merge_at(rest, node);
        }
    }
}

/// Borrowing iterator over a group's children.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    inner: indexmap::map::Iter<'a, String, Node>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (&'a str, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(name, node)| (name.as_str(), node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}

impl<'a> IntoIterator for &'a Group {
    type Item = (&'a str, &'a Node);
    type IntoIter = Children<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.children()
    }
}

impl<K: Into<String>, V: Into<Node>> FromIterator<(K, V)> for Group {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut group = Group::new();
        for (name, node) in iter {
            group.insert(name, node);
        }
        group
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Leaf(value) => serializer.serialize_str(value),
            Node::Group(group) => group.serialize(serializer),
        }
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.children.len()))?;
        for (name, node) in &self.children {
            map.serialize_entry(name, node)?;
        }
        map.end()
    }
}
