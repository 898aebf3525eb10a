//! Template rendering against a settings snapshot.
//!
//! ## Directive syntax
//!
//! ```text
//! ${svc.port}          leaf string at `svc.port`
//! ${svc.port | int}    parsed as an integer, written in canonical form
//! ${svc.debug | bool}  parsed as a boolean, written as `true`/`false`
//! ${db.host | ip}      hostname resolved to an IPv4 address (may be empty)
//! ${svc.name | str}    same as no modifier
//! $$                   a literal `$`
//! ```
//!
//! Whitespace around the path and the modifier is ignored. A `$` not
//! followed by `$` or `{` is copied as is. Everything outside directives is
//! copied byte for byte, so templates need not be UTF-8; only directive
//! tokens must be.
//!
//! Input is read in fixed-size chunks and only the directive being scanned
//! is buffered, so template size is not bounded by memory.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use tracing::trace;

use crate::settings::{LookupError, Settings};

/// Longest directive token accepted between `${` and `}`.
pub const MAX_DIRECTIVE_LEN: usize = 1024;

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    #[error("unterminated directive starting at byte {position}")]
    Truncated { position: usize },

    #[error("invalid directive {token:?} at byte {position}: {reason}")]
    InvalidDirective {
        position: usize,
        token: String,
        reason: &'static str,
    },

    #[error("directive at byte {position} exceeds the maximum directive length")]
    DirectiveTooLong { position: usize },

    #[error("cannot expand directive at byte {position}: {source}")]
    Lookup {
        position: usize,
        #[source]
        source: LookupError,
    },

    #[error("template i/o error: {0}")]
    Io(#[from] io::Error),
}

impl RenderError {
    /// Byte offset of the failing directive, if the error came from one.
    pub fn position(&self) -> Option<usize> {
        match self {
            RenderError::Truncated { position }
            | RenderError::InvalidDirective { position, .. }
            | RenderError::DirectiveTooLong { position }
            | RenderError::Lookup { position, .. } => Some(*position),
            RenderError::Io(_) => None,
        }
    }
}

/// How a directive's value is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modifier {
    #[default]
    Str,
    Int,
    Bool,
    Ip,
}

impl FromStr for Modifier {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(Modifier::Str),
            "int" => Ok(Modifier::Int),
            "bool" => Ok(Modifier::Bool),
            "ip" => Ok(Modifier::Ip),
            _ => Err("unknown modifier"),
        }
    }
}

/// A parsed `${path | modifier}` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive<'t> {
    pub path: &'t str,
    pub modifier: Modifier,
}

impl<'t> Directive<'t> {
    /// Parses the text between `${` and `}`.
    pub fn parse(token: &'t str) -> Result<Self, &'static str> {
        let (path, modifier) = match token.split_once('|') {
            Some((path, modifier)) => (path.trim(), modifier.trim().parse()?),
            None => (token.trim(), Modifier::Str),
        };

        if path.is_empty() {
            return Err("empty path");
        }
        if path.split('.').any(|segment| segment.is_empty()) {
            return Err("empty path segment");
        }
        if path
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '$' | '{' | '|'))
        {
            return Err("unexpected character in path");
        }

        Ok(Directive { path, modifier })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Copying literal bytes.
    Copying,
    /// Saw a `$`, deciding between escape, directive or literal.
    Dollar,
    /// Accumulating a directive token up to `}`.
    InDirective,
}

#[derive(Debug)]
struct Scan {
    state: State,
    token: Vec<u8>,
    start: usize,
    expanded: usize,
}

impl Scan {
    fn new() -> Self {
        Self {
            state: State::Copying,
            token: Vec::new(),
            start: 0,
            expanded: 0,
        }
    }

    fn push_token(&mut self, bytes: &[u8]) -> Result<(), RenderError> {
        if self.token.len() + bytes.len() > MAX_DIRECTIVE_LEN {
            return Err(RenderError::DirectiveTooLong {
                position: self.start,
            });
        }
        self.token.extend_from_slice(bytes);
        Ok(())
    }
}

/// Expands directives in templates using one [`Settings`] snapshot.
///
/// Rendering only reads the snapshot; concurrent renders are fine.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    settings: &'a Settings,
}

impl<'a> Renderer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Renders a template string.
    ///
    /// Either the whole rendered text is returned or an error; a failing
    /// directive never yields partial output.
    pub fn render(&self, template: &str) -> Result<String, RenderError> {
        let rendered = self.render_bytes(template.as_bytes())?;
        String::from_utf8(rendered)
            .map_err(|e| RenderError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Renders a template that may not be UTF-8.
    pub fn render_bytes(&self, template: &[u8]) -> Result<Vec<u8>, RenderError> {
        let mut output = Vec::with_capacity(template.len());
        self.render_to(template, &mut output)?;
        Ok(output)
    }

    /// Renders the template file at `path`.
    pub fn render_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, RenderError> {
        let file = File::open(path.as_ref())?;
        let mut output = Vec::new();
        self.render_to(BufReader::new(file), &mut output)?;
        Ok(output)
    }

    /// Streams `input` to `output`, expanding directives on the way.
    ///
    /// On error, `output` may already hold the text before the failing
    /// directive; callers wanting all-or-nothing must discard it.
    pub fn render_to<R: Read, W: Write>(&self, mut input: R, mut output: W) -> Result<(), RenderError> {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut scan = Scan::new();
        let mut offset = 0;

        loop {
            let n = match input.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.feed(&mut scan, &chunk[..n], offset, &mut output)?;
            offset += n;
        }

        match scan.state {
            State::Copying => {}
            State::Dollar => output.write_all(b"$")?,
            State::InDirective => {
                return Err(RenderError::Truncated {
                    position: scan.start,
                })
            }
        }
        output.flush()?;

        trace!(bytes = offset, directives = scan.expanded, "rendered template");
        Ok(())
    }

    fn feed<W: Write>(
        &self,
        scan: &mut Scan,
        chunk: &[u8],
        base: usize,
        output: &mut W,
    ) -> Result<(), RenderError> {
        let mut i = 0;

        while i < chunk.len() {
            match scan.state {
                State::Copying => match find(&chunk[i..], b'$') {
                    Some(rel) => {
                        output.write_all(&chunk[i..i + rel])?;
                        scan.start = base + i + rel;
                        scan.state = State::Dollar;
                        i += rel + 1;
                    }
                    None => {
                        output.write_all(&chunk[i..])?;
                        i = chunk.len();
                    }
                },
                State::Dollar => match chunk[i] {
                    b'$' => {
                        output.write_all(b"$")?;
                        scan.state = State::Copying;
                        i += 1;
                    }
                    b'{' => {
                        scan.token.clear();
                        scan.state = State::InDirective;
                        i += 1;
                    }
                    _ => {
                        // Lone `$`: emit it and rescan the current byte.
                        output.write_all(b"$")?;
                        scan.state = State::Copying;
                    }
                },
                State::InDirective => match find(&chunk[i..], b'}') {
                    Some(rel) => {
                        scan.push_token(&chunk[i..i + rel])?;
                        i += rel + 1;
                        self.expand(&scan.token, scan.start, output)?;
                        scan.expanded += 1;
                        scan.state = State::Copying;
                    }
                    None => {
                        scan.push_token(&chunk[i..])?;
                        i = chunk.len();
                    }
                },
            }
        }

        Ok(())
    }

    fn expand<W: Write>(&self, token: &[u8], position: usize, output: &mut W) -> Result<(), RenderError> {
        let invalid = |reason: &'static str| RenderError::InvalidDirective {
            position,
            token: String::from_utf8_lossy(token).into_owned(),
            reason,
        };

        let token = std::str::from_utf8(token).map_err(|_| invalid("not valid UTF-8"))?;
        let directive = Directive::parse(token).map_err(invalid)?;
        let value = self
            .resolve(&directive)
            .map_err(|source| RenderError::Lookup { position, source })?;

        output.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Produces the replacement text for one directive.
    pub fn resolve(&self, directive: &Directive<'_>) -> Result<Cow<'a, str>, LookupError> {
        let cast = self.settings.cast();
        Ok(match directive.modifier {
            Modifier::Str => Cow::Borrowed(self.settings.get_str(directive.path)?),
            Modifier::Int => Cow::Owned(cast.int(directive.path)?.to_string()),
            Modifier::Bool => Cow::Owned(cast.bool(directive.path)?.to_string()),
            Modifier::Ip => Cow::Owned(cast.ip(directive.path)?),
        })
    }
}

fn find(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}
