//! Minimal INI reader.
//!
//! `[section]` headers open a group (dotted names nest), `key = value` or
//! `key: value` lines add leaves, and lines starting with `;` or `#` are
//! comments. Keys and values are trimmed; values are otherwise kept as is.

use std::path::Path;

use super::ConfigError;
use crate::settings::{Group, Node};

pub fn parse(contents: &str, path: &Path) -> Result<Group, ConfigError> {
    let mut root = Group::new();
    let mut section: Vec<String> = Vec::new();

    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        let syntax = |message: &str| ConfigError::IniSyntax {
            path: path.to_path_buf(),
            line: index + 1,
            message: message.to_string(),
        };

        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let name = header
                .strip_suffix(']')
                .ok_or_else(|| syntax("unterminated section header"))?;
            section = split_name(name.trim()).ok_or_else(|| syntax("invalid section name"))?;
            root.merge_at(&section, Node::Group(Group::new()));
            continue;
        }

        let separator = line
            .find(['=', ':'])
            .ok_or_else(|| syntax("expected 'key = value'"))?;
        let key = split_name(line[..separator].trim()).ok_or_else(|| syntax("invalid key"))?;
        let value = line[separator + 1..].trim();

        let full_path: Vec<String> = section.iter().cloned().chain(key).collect();
        root.merge_at(&full_path, Node::leaf(value));
    }

    Ok(root)
}

/// Splits a dotted name, rejecting empty segments.
fn split_name(name: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = name.split('.').map(|part| part.trim().to_string()).collect();
    if parts.iter().any(String::is_empty) {
        return None;
    }
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(contents: &str) -> Result<Group, ConfigError> {
        parse(contents, Path::new("test.ini"))
    }

    #[test]
    fn test_sections_and_keys() {
        let group = parse_str(
            "; comment\n\
             top = level\n\
             [group]\n\
             value = 5\n\
             other: some text = with equals\n\
             # another comment\n\
             [net.dns]\n\
             server = 10.0.0.53\n",
        )
        .unwrap();

        assert_eq!(group.lookup("top").unwrap().as_str(), Some("level"));
        assert_eq!(group.lookup("group.value").unwrap().as_str(), Some("5"));
        assert_eq!(
            group.lookup("group.other").unwrap().as_str(),
            Some("some text = with equals")
        );
        assert_eq!(group.lookup("net.dns.server").unwrap().as_str(), Some("10.0.0.53"));
    }

    #[test]
    fn test_empty_section_is_kept() {
        let group = parse_str("[empty]\n").unwrap();
        assert!(group.lookup("empty").unwrap().is_group());
    }

    #[test]
    fn test_repeated_key_last_wins() {
        let group = parse_str("[a]\nk = 1\nk = 2\n").unwrap();
        assert_eq!(group.lookup("a.k").unwrap().as_str(), Some("2"));
    }

    #[test]
    fn test_syntax_errors_report_line() {
        let err = parse_str("[ok]\nno separator here\n").unwrap_err();
        assert!(matches!(err, ConfigError::IniSyntax { line: 2, .. }));

        let err = parse_str("[broken\n").unwrap_err();
        assert!(matches!(err, ConfigError::IniSyntax { line: 1, .. }));

        let err = parse_str(" = value\n").unwrap_err();
        assert!(matches!(err, ConfigError::IniSyntax { line: 1, .. }));
    }
}
