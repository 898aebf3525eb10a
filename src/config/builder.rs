use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::file::FileParser;
use super::source::SourceParser;
use super::store::Store;
use super::ConfigError;
use crate::resolver::Resolver;

/// Builder for a [`Store`] loaded from an ordered list of sources.
///
/// Sources are merged in registration order, with later sources overriding
/// earlier ones. Groups are merged recursively; when one source has a value
/// where another has a group, the later source's node replaces the earlier
/// one entirely.
///
/// ## Example
///
/// ```no_run
/// use unified_cfg::Store;
///
/// let store = Store::builder()
///     .with_source("/etc/myapp")
///     .with_env_sources("MYAPP_CONFIG_PATH")
///     .with_source("local.toml")
///     .build()?;
///
/// let port = store.as_int("server.http.port")?;
/// let conf = store.render("listen ${server.http.port};")?;
/// # let _ = (port, conf);
/// # Ok::<(), unified_cfg::Error>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct StoreBuilder {
    sources: Vec<PathBuf>,
    parser: Option<Box<dyn SourceParser>>,
    resolver: Option<Arc<Resolver>>,
}

impl StoreBuilder {
    /// Adds a source: a `.toml`/`.ini` file or a directory of them.
    pub fn with_source(mut self, path: impl AsRef<Path>) -> Self {
        self.sources.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_sources<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.sources
            .extend(paths.into_iter().map(|path| path.as_ref().to_path_buf()));
        self
    }

    /// Appends the sources listed in environment variable `var`.
    ///
    /// The value is split like `PATH` (`:` on Unix, `;` on Windows); empty
    /// entries are ignored. An unset variable adds nothing.
    pub fn with_env_sources(mut self, var: &str) -> Self {
        match std::env::var_os(var) {
            Some(value) => {
                let before = self.sources.len();
                self.sources.extend(
                    std::env::split_paths(&value).filter(|path| !path.as_os_str().is_empty()),
                );
                debug!(var, added = self.sources.len() - before, "config sources from environment");
            }
            None => debug!(var, "config source variable not set"),
        }
        self
    }

    /// Replaces the default [`FileParser`].
    pub fn with_parser(mut self, parser: impl SourceParser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Resolves `ip` lookups with `resolver` instead of the process-wide one.
    pub fn with_resolver(mut self, resolver: Arc<Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Builds the store and loads every registered source.
    pub fn build(self) -> Result<Store, ConfigError> {
        let parser = self.parser.unwrap_or_else(|| Box::new(FileParser));
        let resolver = self.resolver.unwrap_or_else(Resolver::global);

        let store = Store::with_parts(parser, resolver);
        store.set_sources(&self.sources)?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Group;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct Fixed;

    impl SourceParser for Fixed {
        fn parse(&self, location: &Path) -> Result<Group, ConfigError> {
            let name = location.to_string_lossy().into_owned();
            Ok(Group::from_iter([("source", name)]))
        }
    }

    #[test]
    fn test_build_merges_in_order() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base.toml");
        let local = dir.path().join("local.toml");
        fs::write(&base, "[server]\nhost = \"example.com\"\nport = 80\n").unwrap();
        fs::write(&local, "[server]\nport = 8080\n").unwrap();

        let store = Store::builder()
            .with_source(&base)
            .with_source(&local)
            .build()
            .unwrap();

        assert_eq!(store.get_str("server.host").unwrap(), "example.com");
        assert_eq!(store.as_int("server.port").unwrap(), 8080);
        assert_eq!(store.get_sources(), vec![base, local]);
    }

    #[test]
    fn test_build_fails_on_missing_source() {
        let result = Store::builder()
            .with_source("/nonexistent/path/config.toml")
            .build();
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_custom_parser() {
        let store = Store::builder()
            .with_sources(["first", "second"])
            .with_parser(Fixed)
            .build()
            .unwrap();

        assert_eq!(store.get_str("source").unwrap(), "second");
    }

    #[test]
    fn test_env_sources() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.toml");
        let b = dir.path().join("b.toml");
        fs::write(&a, "k = \"a\"\n").unwrap();
        fs::write(&b, "k = \"b\"\n").unwrap();

        let joined = std::env::join_paths([&a, &b]).unwrap();
        std::env::set_var("UNIFIED_CFG_TEST_BUILDER_PATH", &joined);

        let store = Store::builder()
            .with_env_sources("UNIFIED_CFG_TEST_BUILDER_PATH")
            .with_env_sources("UNIFIED_CFG_TEST_UNSET_VAR")
            .build()
            .unwrap();

        assert_eq!(store.get_sources(), vec![a, b]);
        assert_eq!(store.get_str("k").unwrap(), "b");
    }
}
