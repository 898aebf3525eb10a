//! The settings tree and its read-only snapshot handle.

mod error;
mod node;

use std::fmt;
use std::sync::Arc;

pub use error::LookupError;
pub use node::{Children, Group, Node};

use crate::cast::Cast;
use crate::render::{RenderError, Renderer};
use crate::resolver::Resolver;

/// An immutable, shareable snapshot of a merged settings tree.
///
/// Cloning is cheap (two `Arc` clones). A snapshot is never modified:
/// reloading a [`Store`](crate::Store) publishes a new snapshot, and readers
/// holding this one keep seeing the tree they started with.
#[derive(Clone)]
pub struct Settings {
    root: Arc<Group>,
    resolver: Arc<Resolver>,
}

impl Settings {
    /// Wraps a tree, resolving hostnames through the process-wide resolver.
    pub fn new(root: Group) -> Self {
        Self {
            root: Arc::new(root),
            resolver: Resolver::global(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Group::new())
    }

    /// Uses `resolver` instead of the process-wide one for `ip` lookups.
    pub fn with_resolver(mut self, resolver: Arc<Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub(crate) fn resolver_handle(&self) -> Arc<Resolver> {
        Arc::clone(&self.resolver)
    }

    pub fn get(&self, path: &str) -> Result<&Node, LookupError> {
        self.root.lookup(path)
    }

    /// Like [`get`](Self::get), with absence mapped to `None`.
    pub fn find(&self, path: &str) -> Option<&Node> {
        self.root.lookup(path).ok()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.root.contains(path)
    }

    /// Returns the string stored at `path`.
    ///
    /// Fails with [`LookupError::TypeMismatch`] if `path` names a group.
    pub fn get_str(&self, path: &str) -> Result<&str, LookupError> {
        self.get(path)?
            .as_str()
            .ok_or_else(|| LookupError::expected_leaf(path))
    }

    /// Returns the string at `path`, or `default` when the key is absent.
    pub fn get_str_or<'a>(&'a self, path: &str, default: &'a str) -> Result<&'a str, LookupError> {
        match self.get_str(path) {
            Err(LookupError::NotFound(_)) => Ok(default),
            other => other,
        }
    }

    pub fn get_group(&self, path: &str) -> Result<&Group, LookupError> {
        self.get(path)?
            .as_group()
            .ok_or_else(|| LookupError::expected_group(path))
    }

    pub fn children(&self) -> Children<'_> {
        self.root.children()
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.root.keys()
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &Node> + '_ {
        self.root.values()
    }

    /// Typed, fallible view over this snapshot.
    pub fn cast(&self) -> Cast<'_> {
        Cast::new(self)
    }

    pub fn as_int(&self, key: &str) -> Result<i64, LookupError> {
        self.cast().int(key)
    }

    pub fn as_bool(&self, key: &str) -> Result<bool, LookupError> {
        self.cast().bool(key)
    }

    pub fn as_ip(&self, key: &str) -> Result<String, LookupError> {
        self.cast().ip(key)
    }

    pub fn renderer(&self) -> Renderer<'_> {
        Renderer::new(self)
    }

    /// Renders `template` against this snapshot.
    pub fn render(&self, template: &str) -> Result<String, RenderError> {
        self.renderer().render(template)
    }

    /// Dumps the tree as TOML, leaves as strings.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self.root.as_ref())
    }

    /// Returns `true` if both handles point at the same tree.
    pub fn ptr_eq(a: &Settings, b: &Settings) -> bool {
        Arc::ptr_eq(&a.root, &b.root)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings").field("root", &self.root).finish()
    }
}

impl<'a> IntoIterator for &'a Settings {
    type Item = (&'a str, &'a Node);
    type IntoIter = Children<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.children()
    }
}
