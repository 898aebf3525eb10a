use std::path::Path;

use toml::{Table, Value};

use super::ConfigError;
use crate::settings::{Group, Node};

/// Turns one source location into the group of its top-level keys.
pub trait SourceParser: Send + Sync + std::fmt::Debug {
    fn parse(&self, location: &Path) -> Result<Group, ConfigError>;
}

/// Converts a parsed TOML table into a settings group.
///
/// Scalars keep their TOML string form; arrays become groups keyed by
/// index (`"0"`, `"1"`, ...).
pub fn group_from_table(table: Table) -> Group {
    table
        .into_iter()
        .map(|(key, value)| (key, node_from_value(value)))
        .collect()
}

fn node_from_value(value: Value) -> Node {
    match value {
        Value::String(s) => Node::Leaf(s),
        Value::Integer(i) => Node::Leaf(i.to_string()),
        Value::Float(f) => Node::Leaf(f.to_string()),
        Value::Boolean(b) => Node::Leaf(b.to_string()),
        Value::Datetime(dt) => Node::Leaf(dt.to_string()),
        Value::Array(items) => Node::Group(
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), node_from_value(item)))
                .collect(),
        ),
        Value::Table(table) => Node::Group(group_from_table(table)),
    }
}
