//! Entry points for turning EDN text into [`Value`]s.
//!
//! [`Reader`] owns the configuration for a series of parses: which
//! [`TagRegistry`] resolves tagged literals and how deeply forms may nest.
//! The free functions [`parse`], [`parse_bytes`] and [`register_tag`] use a
//! default reader backed by [`TagRegistry::global`].

use std::sync::Arc;

use bstr::ByteSlice;

use crate::edn::lexer::Position;
use crate::edn::parser::Parser;
use crate::edn::tags::TagRegistry;
use crate::edn::Value;
use crate::error::{EdnError, EdnResult, HandlerError};

/// Nesting ceiling used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Hard cap on the nesting ceiling; the parser recurses once per level.
pub const MAX_DEPTH_LIMIT: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Deepest allowed nesting of collections, tagged literals and discards.
    /// Values above [`MAX_DEPTH_LIMIT`] are treated as [`MAX_DEPTH_LIMIT`].
    pub max_depth: usize,
}

impl ReaderConfig {
    /// The ceiling the parser actually enforces.
    pub fn depth_limit(&self) -> usize {
        self.max_depth.min(MAX_DEPTH_LIMIT)
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reader {
    registry: Arc<TagRegistry>,
    config: ReaderConfig,
}

impl Reader {
    /// A reader using the process-wide registry and default limits.
    pub fn new() -> Self {
        Self {
            registry: TagRegistry::global(),
            config: ReaderConfig::default(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<TagRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<TagRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Parse exactly one top-level form.
    ///
    /// `Ok(None)` means the input held only discarded forms.
    pub fn parse(&self, text: &str) -> EdnResult<Option<Value>> {
        self.parser(text).parse()
    }

    /// Like [`Reader::parse`], for input that has not been checked for UTF-8 yet.
    pub fn parse_bytes(&self, bytes: &[u8]) -> EdnResult<Option<Value>> {
        self.parse(decode(bytes)?)
    }

    /// Read every top-level form in `text`, in order.
    pub fn read_all(&self, text: &str) -> EdnResult<Vec<Value>> {
        self.parser(text).collect()
    }

    pub fn read_all_bytes(&self, bytes: &[u8]) -> EdnResult<Vec<Value>> {
        self.read_all(decode(bytes)?)
    }

    /// A parser over `text` bound to the registry as it is right now.
    pub fn parser<'a>(&self, text: &'a str) -> Parser<'a> {
        Parser::new(text, self.registry.snapshot(), self.config.clone())
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one EDN form with the process-wide registry.
///
/// ```
/// use ednr::Value;
///
/// let value = ednr::parse("{:a [1 2]}").unwrap().unwrap();
/// let path = [Value::from(":a"), Value::from(1)];
/// assert_eq!(value.get_in(path), Some(&Value::from(2)));
/// ```
pub fn parse(text: &str) -> EdnResult<Option<Value>> {
    Reader::new().parse(text)
}

pub fn parse_bytes(bytes: &[u8]) -> EdnResult<Option<Value>> {
    Reader::new().parse_bytes(bytes)
}

/// Register a handler for `#tag` on the process-wide registry.
///
/// Parses started after this call see the handler; parses already running do not.
pub fn register_tag<F>(tag: impl Into<String>, handler: F)
where
    F: Fn(Value) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    TagRegistry::global().register(tag, handler);
}

fn decode(bytes: &[u8]) -> EdnResult<&str> {
    bytes.to_str().map_err(|e| {
        let valid = e.valid_up_to();
        // Everything before `valid` is UTF-8, so the prefix always decodes.
        let prefix = std::str::from_utf8(&bytes[..valid]).unwrap_or_default();
        EdnError::syntax(
            Position::locate(prefix, valid),
            format!("invalid UTF-8 at offset {}", valid),
        )
    })
}
