//! Typed accessors over leaf strings.
//!
//! Every setting is stored as a string; these helpers parse on read and
//! fail loudly when the string does not fit the requested type.
//!
//! Accepted boolean forms (case-insensitive): `true`/`false`, `yes`/`no`,
//! `on`/`off`, `1`/`0`.

use crate::settings::{LookupError, Node, Settings};

/// Conversion from a leaf string.
pub trait FromLeaf: Sized {
    /// Name of the target type, used in error messages.
    const TARGET: &'static str;

    fn parse_leaf(raw: &str) -> Option<Self>;

    fn from_leaf(key: &str, raw: &str) -> Result<Self, LookupError> {
        Self::parse_leaf(raw).ok_or_else(|| LookupError::Conversion {
            key: key.to_string(),
            raw: raw.to_string(),
            target: Self::TARGET,
        })
    }
}

impl FromLeaf for i64 {
    const TARGET: &'static str = "integer";

    fn parse_leaf(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl FromLeaf for bool {
    const TARGET: &'static str = "boolean";

    fn parse_leaf(raw: &str) -> Option<Self> {
        const TRUE: [&str; 4] = ["true", "yes", "on", "1"];
        const FALSE: [&str; 4] = ["false", "no", "off", "0"];

        if TRUE.iter().any(|form| raw.eq_ignore_ascii_case(form)) {
            Some(true)
        } else if FALSE.iter().any(|form| raw.eq_ignore_ascii_case(form)) {
            Some(false)
        } else {
            None
        }
    }
}

/// Typed view over a [`Settings`] snapshot.
///
/// A key that names a group counts as absent here: only leaves carry values.
#[derive(Debug, Clone, Copy)]
pub struct Cast<'a> {
    settings: &'a Settings,
}

impl<'a> Cast<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    fn leaf(&self, key: &str) -> Result<&'a str, LookupError> {
        match self.settings.get(key)? {
            Node::Leaf(raw) => Ok(raw),
            Node::Group(_) => Err(LookupError::not_found(key)),
        }
    }

    pub fn get<T: FromLeaf>(&self, key: &str) -> Result<T, LookupError> {
        T::from_leaf(key, self.leaf(key)?)
    }

    /// Like [`get`](Self::get), returning `fallback` when the key is absent.
    ///
    /// Conversion failures are still reported.
    pub fn get_or<T: FromLeaf>(&self, key: &str, fallback: T) -> Result<T, LookupError> {
        match self.leaf(key) {
            Ok(raw) => T::from_leaf(key, raw),
            Err(err) if err.is_not_found() => Ok(fallback),
            Err(err) => Err(err),
        }
    }

    pub fn int(&self, key: &str) -> Result<i64, LookupError> {
        self.get(key)
    }

    pub fn int_or(&self, key: &str, fallback: i64) -> Result<i64, LookupError> {
        self.get_or(key, fallback)
    }

    pub fn bool(&self, key: &str) -> Result<bool, LookupError> {
        self.get(key)
    }

    pub fn bool_or(&self, key: &str, fallback: bool) -> Result<bool, LookupError> {
        self.get_or(key, fallback)
    }

    /// Resolves the hostname stored at `key` to a dotted-quad IPv4 address.
    ///
    /// An empty string means the host did not resolve.
    pub fn ip(&self, key: &str) -> Result<String, LookupError> {
        let hostname = self.leaf(key)?;
        Ok(self.settings.resolver().resolve(hostname))
    }

    pub fn ip_or(&self, key: &str, fallback: impl Into<String>) -> Result<String, LookupError> {
        match self.leaf(key) {
            Ok(hostname) => Ok(self.settings.resolver().resolve(hostname)),
            Err(err) if err.is_not_found() => Ok(fallback.into()),
            Err(err) => Err(err),
        }
    }
}
