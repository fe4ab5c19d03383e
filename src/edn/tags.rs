//! Tagged-literal handlers.
//!
//! A [`TagRegistry`] maps tag names to conversion functions. Parsing never
//! holds the registry lock: each parse takes a [`TagSnapshot`] up front and
//! sees that table for its whole run, so handlers registered meanwhile only
//! affect later parses.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::edn::Value;
use crate::error::HandlerError;

/// Converts the value following `#tag` into the tag's host value.
pub type TagHandler = Arc<dyn Fn(Value) -> Result<Value, HandlerError> + Send + Sync>;

type HandlerTable = HashMap<String, TagHandler>;

static GLOBAL_REGISTRY: OnceLock<Arc<TagRegistry>> = OnceLock::new();

#[derive(Error, Debug)]
pub enum TagError {
    #[error("#{tag} expects a string, got {actual}")]
    ExpectedString { tag: &'static str, actual: &'static str },

    #[error("invalid timestamp \"{0}\"")]
    InvalidInstant(String),

    #[error("invalid UUID \"{text}\": {source}")]
    InvalidUuid {
        text: String,
        #[source]
        source: uuid::Error,
    },
}

pub struct TagRegistry {
    handlers: RwLock<Arc<HandlerTable>>,
}

impl TagRegistry {
    /// A registry with the builtin `inst`, `uuid` and `db/fn` handlers.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register("inst", read_inst);
        registry.register("uuid", read_uuid);
        registry.register("db/fn", Ok);
        registry
    }

    /// A registry with no handlers at all; every tag falls back to [`Value::Tagged`].
    pub fn empty() -> Self {
        Self {
            handlers: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// The process-wide registry used by [`crate::parse`] and [`crate::register_tag`].
    pub fn global() -> Arc<TagRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(TagRegistry::new()))
            .clone()
    }

    /// Install or replace the handler for `tag` (without the leading `#`).
    pub fn register<F>(&self, tag: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        let tag = tag.into();
        let mut table = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = Arc::make_mut(&mut *table)
            .insert(tag.clone(), Arc::new(handler))
            .is_some();
        debug!(tag = %tag, replaced, "registered tag handler");
    }

    /// Remove the handler for `tag`, returning whether one was installed.
    pub fn unregister(&self, tag: &str) -> bool {
        let mut table = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let removed = Arc::make_mut(&mut *table).remove(tag).is_some();
        debug!(tag, removed, "unregistered tag handler");
        removed
    }

    pub fn resolve(&self, tag: &str) -> Option<TagHandler> {
        self.snapshot().resolve(tag).cloned()
    }

    pub fn is_known(&self, tag: &str) -> bool {
        self.snapshot().resolve(tag).is_some()
    }

    pub fn known_tags(&self) -> BTreeSet<String> {
        self.snapshot().0.keys().cloned().collect()
    }

    /// The current handler table, unaffected by later registrations.
    pub fn snapshot(&self) -> TagSnapshot {
        let table = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        TagSnapshot(Arc::clone(&*table))
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagRegistry")
            .field("tags", &self.known_tags())
            .finish()
    }
}

/// Read-only view of a registry's handlers at one point in time.
#[derive(Clone)]
pub struct TagSnapshot(Arc<HandlerTable>);

impl TagSnapshot {
    pub fn resolve(&self, tag: &str) -> Option<&TagHandler> {
        self.0.get(tag)
    }
}

impl fmt::Debug for TagSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

fn read_inst(value: Value) -> Result<Value, HandlerError> {
    match value {
        Value::Text(text) => Ok(Value::Inst(parse_instant(&text)?)),
        other => Err(TagError::ExpectedString { tag: "inst", actual: other.type_name() }.into()),
    }
}

fn read_uuid(value: Value) -> Result<Value, HandlerError> {
    match value {
        Value::Text(text) => match Uuid::parse_str(&text) {
            Ok(uuid) => Ok(Value::Uuid(uuid)),
            Err(source) => Err(TagError::InvalidUuid { text, source }.into()),
        },
        other => Err(TagError::ExpectedString { tag: "uuid", actual: other.type_name() }.into()),
    }
}

/// Parse an RFC 3339 timestamp as found in `#inst` literals.
///
/// Also accepts a missing offset (read as UTC) and the reduced forms
/// `YYYY`, `YYYY-MM` and `YYYY-MM-DD`.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, TagError> {
    // "-00:00" is RFC 3339's "offset unknown"; read it as UTC.
    let normalized = text.strip_suffix("-00:00").map(|head| format!("{}Z", head));
    if let Ok(instant) = DateTime::parse_from_rfc3339(normalized.as_deref().unwrap_or(text)) {
        return Ok(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    reduced_date(text)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| TagError::InvalidInstant(text.to_string()))
}

fn reduced_date(text: &str) -> Option<NaiveDate> {
    let number = |part: &str, width: usize| {
        (part.len() == width && part.bytes().all(|b| b.is_ascii_digit()))
            .then(|| part.parse::<u32>().ok())
            .flatten()
    };
    let mut parts = text.split('-');
    let year = number(parts.next()?, 4)?;
    let month = parts.next().map_or(Some(1), |m| number(m, 2))?;
    let day = parts.next().map_or(Some(1), |d| number(d, 2))?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}
