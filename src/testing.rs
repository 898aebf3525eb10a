//! Temporary overrides for tests.
//!
//! ```no_run
//! use unified_cfg::{testing, Store};
//!
//! let store = Store::builder().with_source("/etc/myapp").build()?;
//! {
//!     let _guard = testing::mock(&store, [("config.group.value", "1")])?;
//!     assert_eq!(store.get_str("config.group.value")?, "1");
//! }
//! // previous sources restored here
//! # Ok::<(), unified_cfg::Error>(())
//! ```

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::config::{ConfigError, Store};

const OVERRIDE_FILE: &str = "overrides.toml";

/// Restores a store's previous source list when dropped.
#[derive(Debug)]
#[must_use = "the override is undone as soon as the guard is dropped"]
pub struct MockGuard<'s> {
    store: &'s Store,
    previous: Vec<PathBuf>,
    _dir: Option<TempDir>,
}

impl MockGuard<'_> {
    /// Sources that will be restored.
    pub fn previous_sources(&self) -> &[PathBuf] {
        &self.previous
    }
}

impl Drop for MockGuard<'_> {
    fn drop(&mut self) {
        match self.store.set_sources(&self.previous) {
            Ok(()) => debug!(sources = self.previous.len(), "restored config sources"),
            Err(e) => warn!(error = %e, "failed to restore config sources"),
        }
    }
}

/// Overrides individual keys until the returned guard is dropped.
///
/// The values are written to a temporary TOML file appended after the
/// current sources, so they win over everything already configured.
pub fn mock<'s, I, K, V>(store: &'s Store, overrides: I) -> Result<MockGuard<'s>, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let overrides: Vec<(String, String)> = overrides
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect();
    let contents = overrides_toml(&overrides)?;

    let dir = tempfile::Builder::new()
        .prefix("unified-cfg-")
        .tempdir()
        .map_err(|e| ConfigError::WriteError {
            path: std::env::temp_dir(),
            source: e,
        })?;
    let file = dir.path().join(OVERRIDE_FILE);
    std::fs::write(&file, contents).map_err(|e| ConfigError::WriteError {
        path: file.clone(),
        source: e,
    })?;

    let previous = store.get_sources();
    let mut sources = previous.clone();
    sources.push(file);
    store.set_sources(&sources)?;
    debug!(keys = overrides.len(), "config overrides installed");

    Ok(MockGuard {
        store,
        previous,
        _dir: Some(dir),
    })
}

/// Swaps the whole source list until the returned guard is dropped.
pub fn mock_sources<'s, I, P>(store: &'s Store, paths: I) -> Result<MockGuard<'s>, ConfigError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let previous = store.get_sources();
    store.set_sources(paths)?;

    Ok(MockGuard {
        store,
        previous,
        _dir: None,
    })
}

/// Writes overrides as dotted TOML keys, one per line.
fn overrides_toml(overrides: &[(String, String)]) -> Result<String, ConfigError> {
    for (key, _) in overrides {
        if key.split('.').any(str::is_empty) {
            return Err(ConfigError::InvalidOverrideKey(key.clone()));
        }
    }

    for (key, _) in overrides {
        let nested = overrides.iter().any(|(other, _)| {
            other
                .strip_prefix(key.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
        });
        if nested {
            return Err(ConfigError::InconsistentOverride(key.clone()));
        }
    }

    let mut contents = String::new();
    let mut seen = std::collections::HashSet::new();
    // Later duplicates win, so emit each key once with its last value.
    for (key, value) in overrides.iter().rev() {
        if !seen.insert(key.as_str()) {
            continue;
        }
        let dotted = key
            .split('.')
            .map(quote)
            .collect::<Vec<_>>()
            .join(".");
        contents.push_str(&format!("{dotted} = {}\n", quote(value)));
    }
    Ok(contents)
}

fn quote(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}
