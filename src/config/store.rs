//! The shared, reloadable settings handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::builder::StoreBuilder;
use super::file::FileParser;
use super::source::SourceParser;
use super::ConfigError;
use crate::render::RenderError;
use crate::resolver::Resolver;
use crate::settings::{Group, LookupError, Settings};

#[derive(Debug)]
struct Loaded {
    sources: Vec<PathBuf>,
    settings: Settings,
}

/// Owns the configured source list and the settings tree built from it.
///
/// Readers take a [`Settings`] snapshot with [`settings`](Self::settings);
/// a reload builds a complete new tree and swaps it in, so a snapshot taken
/// earlier is never torn. Reloads are serialized.
///
/// Share a `Store` between threads through an `Arc`.
#[derive(Debug)]
pub struct Store {
    parser: Box<dyn SourceParser>,
    resolver: Arc<Resolver>,
    current: RwLock<Loaded>,
    reload: Mutex<()>,
}

impl Store {
    /// Creates a configuration builder.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// An empty store reading files with [`FileParser`].
    pub fn new() -> Self {
        Self::with_parts(Box::new(FileParser), Resolver::global())
    }

    pub(crate) fn with_parts(parser: Box<dyn SourceParser>, resolver: Arc<Resolver>) -> Self {
        let settings = Settings::empty().with_resolver(Arc::clone(&resolver));
        Self {
            parser,
            resolver,
            current: RwLock::new(Loaded {
                sources: Vec::new(),
                settings,
            }),
            reload: Mutex::new(()),
        }
    }

    /// Returns a snapshot of the current tree.
    pub fn settings(&self) -> Settings {
        self.current.read().settings.clone()
    }

    /// The configured sources, in merge order.
    pub fn get_sources(&self) -> Vec<PathBuf> {
        self.current.read().sources.clone()
    }

    /// Replaces the source list and rebuilds the tree from scratch.
    ///
    /// Sources are merged in order, later ones overriding earlier ones. If
    /// any source fails, the error is returned and both the previous tree
    /// and the previous source list stay in place.
    pub fn set_sources<I, P>(&self, sources: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let sources: Vec<PathBuf> = sources
            .into_iter()
            .map(|path| path.as_ref().to_path_buf())
            .collect();

        let _reload = self.reload.lock();
        self.rebuild(sources)
    }

    /// Rebuilds the tree from the current source list.
    ///
    /// The list is read under the reload lock, so a concurrent
    /// [`set_sources`](Self::set_sources) is never reverted.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let _reload = self.reload.lock();
        self.rebuild(self.get_sources())
    }

    /// Caller holds `self.reload`.
    fn rebuild(&self, sources: Vec<PathBuf>) -> Result<(), ConfigError> {
        let root = self.build_tree(&sources).map_err(|e| {
            warn!(error = %e, "config reload failed, keeping previous settings");
            e
        })?;

        info!(sources = sources.len(), keys = root.len(), "settings reloaded");
        self.publish(sources, root);
        Ok(())
    }

    /// Publishes an empty tree; the source list is kept.
    pub fn clear(&self) {
        let _reload = self.reload.lock();
        let sources = self.get_sources();
        debug!("settings cleared");
        self.publish(sources, Group::new());
    }

    fn build_tree(&self, sources: &[PathBuf]) -> Result<Group, ConfigError> {
        let mut root = Group::new();
        for source in sources {
            let group = self.parser.parse(source)?;
            debug!(source = %source.display(), keys = group.len(), "merging config source");
            root.merge(group);
        }
        Ok(root)
    }

    fn publish(&self, sources: Vec<PathBuf>, root: Group) {
        let settings = Settings::new(root).with_resolver(Arc::clone(&self.resolver));
        *self.current.write() = Loaded { sources, settings };
    }

    pub fn contains(&self, key: &str) -> bool {
        self.settings().contains(key)
    }

    pub fn get_str(&self, key: &str) -> Result<String, LookupError> {
        self.settings().get_str(key).map(str::to_string)
    }

    pub fn as_int(&self, key: &str) -> Result<i64, LookupError> {
        self.settings().as_int(key)
    }

    pub fn as_bool(&self, key: &str) -> Result<bool, LookupError> {
        self.settings().as_bool(key)
    }

    pub fn as_ip(&self, key: &str) -> Result<String, LookupError> {
        self.settings().as_ip(key)
    }

    /// Renders `template` against the current snapshot.
    pub fn render(&self, template: &str) -> Result<String, RenderError> {
        self.settings().render(template)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
