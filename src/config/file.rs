//! File and directory configuration sources.

use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, trace};
use walkdir::WalkDir;

use super::ini;
use super::source::{group_from_table, SourceParser};
use super::ConfigError;
use crate::settings::{Group, Node};

/// The default source parser.
///
/// - A `.toml` or `.ini` file contributes its keys at the root.
/// - A directory is walked recursively; each `sub/dir/name.toml` (or
///   `.ini`) file inside contributes its keys under the prefix
///   `sub.dir.name`. Files are visited in file-name order, hidden entries
///   and other extensions are skipped. Symlinks are followed, so mounted
///   config directories whose visible files link into a hidden data
///   directory load like plain ones; a link loop is a [`ConfigError::WalkError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileParser;

impl SourceParser for FileParser {
    fn parse(&self, location: &Path) -> Result<Group, ConfigError> {
        let metadata = std::fs::metadata(location).map_err(|e| read_error(location, e))?;

        if metadata.is_dir() {
            load_directory(location)
        } else {
            load_file(location)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Ini,
}

fn format_of(path: &Path) -> Option<Format> {
    let ext = path.extension().and_then(OsStr::to_str)?.to_ascii_lowercase();
    match ext.as_str() {
        "toml" => Some(Format::Toml),
        "ini" => Some(Format::Ini),
        _ => None,
    }
}

fn read_error(path: &Path, e: std::io::Error) -> ConfigError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ConfigError::NotFound(path.to_path_buf())
    } else {
        ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

/// Loads and parses a single TOML or INI file.
fn load_file(path: &Path) -> Result<Group, ConfigError> {
    let format = format_of(path).ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
    let contents = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;

    match format {
        Format::Toml => {
            let table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(group_from_table(table))
        }
        Format::Ini => ini::parse(&contents, path),
    }
}

fn load_directory(root: &Path) -> Result<Group, ConfigError> {
    let mut group = Group::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| ConfigError::WalkError {
            path: root.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();

        if !entry.file_type().is_file() || format_of(path).is_none() {
            continue;
        }
        let Some(prefix) = key_prefix(root, path) else {
            trace!(path = %path.display(), "skipping file with unusable name");
            continue;
        };

        debug!(path = %path.display(), prefix = %prefix.join("."), "loading config file");
        group.merge_at(&prefix, Node::Group(load_file(path)?));
    }

    Ok(group)
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

/// `root/a/b/c.toml` -> `["a", "b", "c"]`; `c.d.toml` adds both `c` and `d`.
fn key_prefix(root: &Path, path: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let mut prefix = Vec::new();

    for component in relative.iter() {
        for part in component.to_str()?.split('.') {
            if part.is_empty() {
                return None;
            }
            prefix.push(part.to_string());
        }
    }

    (!prefix.is_empty()).then_some(prefix)
}
