use crate::config::ConfigError;
use crate::render::RenderError;
use crate::settings::LookupError;
use thiserror::Error;

/// Top-level error type for the unified-cfg library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("settings lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),
}
