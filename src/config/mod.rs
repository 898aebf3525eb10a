//! Configuration sources, merging and the reloadable [`Store`].

mod builder;
mod error;
mod file;
mod ini;
mod source;
mod store;

pub use builder::StoreBuilder;
pub use error::ConfigError;
pub use file::FileParser;
pub use source::{group_from_table, SourceParser};
pub use store::Store;
