//! A reader for Extensible Data Notation (EDN).
//!
//! ```
//! use ednr::Value;
//!
//! let value = ednr::parse("[1 #_ 2 :three]").unwrap();
//! assert_eq!(value, Some(Value::from(vec![Value::from(1), Value::from(":three")])));
//!
//! // Input holding only discarded forms has no value at all.
//! assert_eq!(ednr::parse("#_ :gone").unwrap(), None);
//! ```
//!
//! Tagged literals are converted by handlers looked up in a [`TagRegistry`];
//! `#inst`, `#uuid` and `#db/fn` are built in and unknown tags come back as
//! [`Value::Tagged`].

pub mod edn;
pub mod error;

pub use edn::{
    parse, parse_bytes, register_tag, Parser, Reader, ReaderConfig, TagRegistry, Tagged, Value,
};
pub use error::{EdnError, EdnResult, HandlerError};
