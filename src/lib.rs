pub mod cast;
pub mod config;
mod error;
pub mod render;
pub mod resolver;
pub mod settings;
pub mod testing;

pub use cast::{Cast, FromLeaf};
pub use config::{ConfigError, SourceParser, Store, StoreBuilder};
pub use error::Error;
pub use render::{RenderError, Renderer};
pub use resolver::{AddressLookup, Resolver, SystemLookup};
pub use settings::{Group, LookupError, Node, Settings};
