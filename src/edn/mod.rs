pub mod lexer;
pub mod number;
pub mod parser;
pub mod reader;
pub mod tags;
pub mod value;

pub use lexer::{Lexer, Position};
pub use parser::Parser;
pub use reader::{parse, parse_bytes, register_tag, Reader, ReaderConfig};
pub use tags::{TagHandler, TagRegistry, TagSnapshot};
pub use value::{Tagged, Value};
