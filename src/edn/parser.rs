use indexmap::{IndexMap, IndexSet};

use crate::edn::lexer::{Delim, Lexer, Position, TokenKind};
use crate::edn::number;
use crate::edn::reader::ReaderConfig;
use crate::edn::tags::TagSnapshot;
use crate::edn::{Tagged, Value};
use crate::error::{EdnError, EdnResult};

/// What the grammar found at the current point of a sequence of forms.
enum Element {
    Form(Value, Position),
    Close(Delim, Position),
    End,
}

/// Recursive-descent EDN parser over a single input.
#[derive(Debug)]
pub struct Parser<'a> {
    src: &'a str,
    lexer: Lexer<'a>,
    tags: TagSnapshot,
    config: ReaderConfig,
    depth: usize,
    discarded: bool,
    failed: bool,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str, tags: TagSnapshot, config: ReaderConfig) -> Self {
        Self {
            src,
            lexer: Lexer::new(src),
            tags,
            config,
            depth: 0,
            discarded: false,
            failed: false,
        }
    }

    /// Parse the whole input as exactly one top-level form.
    ///
    /// Returns `Ok(None)` when the input holds nothing but discarded forms.
    /// Empty input is an error.
    pub fn parse(&mut self) -> EdnResult<Option<Value>> {
        let value = match self.next_element()? {
            Element::Form(value, _) => Some(value),
            Element::Close(delim, at) => return Err(unmatched(delim, at)),
            Element::End if self.discarded => None,
            Element::End => {
                return Err(EdnError::syntax(self.lexer.position(), "no form found"));
            }
        };

        match self.next_element()? {
            Element::End => Ok(value),
            Element::Form(_, at) => Err(EdnError::syntax(
                at,
                format!("trailing content after top-level form at offset {}", at.offset),
            )),
            Element::Close(delim, at) => Err(unmatched(delim, at)),
        }
    }

    /// Read the next top-level form, for inputs holding a stream of them.
    pub fn next_form(&mut self) -> EdnResult<Option<Value>> {
        match self.next_element()? {
            Element::Form(value, _) => Ok(Some(value)),
            Element::Close(delim, at) => Err(unmatched(delim, at)),
            Element::End => Ok(None),
        }
    }

    /// Consume one complete form and return its value.
    pub fn parse_value(&mut self) -> EdnResult<Value> {
        match self.next_element()? {
            Element::Form(value, _) => Ok(value),
            Element::Close(delim, at) => Err(unmatched(delim, at)),
            Element::End => Err(EdnError::syntax(self.lexer.position(), "unexpected end of input")),
        }
    }

    fn next_element(&mut self) -> EdnResult<Element> {
        loop {
            let Some(token) = self.lexer.next_token()? else {
                return Ok(Element::End);
            };
            let at = token.pos;
            let value = match token.kind {
                TokenKind::Close(delim) => return Ok(Element::Close(delim, at)),
                TokenKind::Discard => {
                    self.nested(at, |p| p.discard(at))?;
                    continue;
                }
                TokenKind::Open(delim) => self.nested(at, |p| p.parse_collection(delim, at))?,
                TokenKind::Tag(tag) => self.nested(at, |p| p.parse_tagged(tag, at))?,
                TokenKind::Number(class) => {
                    let text = token.text(self.src);
                    number::convert(class, text)
                        .map_err(|e| EdnError::conversion(text, at.offset, e))?
                }
                TokenKind::Symbol => match token.text(self.src) {
                    "nil" => Value::Nil,
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    symbol => Value::Text(symbol.to_string()),
                },
                TokenKind::Keyword => Value::Text(token.text(self.src).to_string()),
                TokenKind::String(text) => Value::Text(text),
                TokenKind::Char(ch) => Value::Text(ch.to_string()),
                TokenKind::Symbolic(name) => Value::Float(match name.as_str() {
                    "Inf" => f64::INFINITY,
                    "-Inf" => f64::NEG_INFINITY,
                    _ => f64::NAN,
                }),
            };
            return Ok(Element::Form(value, at));
        }
    }

    /// Run `f` one nesting level deeper, enforcing the depth ceiling.
    fn nested<T>(
        &mut self,
        at: Position,
        f: impl FnOnce(&mut Self) -> EdnResult<T>,
    ) -> EdnResult<T> {
        let limit = self.config.depth_limit();
        if self.depth >= limit {
            return Err(EdnError::syntax(
                at,
                format!("maximum nesting depth ({}) exceeded at offset {}", limit, at.offset),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn discard(&mut self, marker: Position) -> EdnResult<()> {
        match self.next_element()? {
            Element::Form(..) => {
                self.discarded = true;
                Ok(())
            }
            Element::Close(delim, at) => Err(EdnError::syntax(
                at,
                format!(
                    "discard at offset {} has no form to drop before '{}'",
                    marker.offset,
                    delim.close_char()
                ),
            )),
            Element::End => Err(EdnError::syntax(
                marker,
                format!("discard at offset {} has no form to drop", marker.offset),
            )),
        }
    }

    fn parse_collection(&mut self, delim: Delim, open: Position) -> EdnResult<Value> {
        let mut items = Vec::new();
        loop {
            match self.next_element()? {
                Element::Form(value, _) => items.push(value),
                Element::Close(close, _) if close == delim.closer() => break,
                Element::Close(close, at) => {
                    return Err(EdnError::syntax(
                        at,
                        format!(
                            "mismatched delimiter: expected '{}' to close '{}' \
                             at offset {}, found '{}'",
                            delim.close_char(),
                            delim.open_str(),
                            open.offset,
                            close.close_char()
                        ),
                    ))
                }
                Element::End => {
                    return Err(EdnError::syntax(
                        open,
                        format!(
                            "unterminated {} starting at offset {}, expected '{}'",
                            delim.describe(),
                            open.offset,
                            delim.close_char()
                        ),
                    ))
                }
            }
        }

        match delim {
            Delim::Paren | Delim::Bracket => Ok(Value::Seq(items)),
            Delim::Set => Ok(Value::Set(items.into_iter().collect::<IndexSet<_>>())),
            Delim::Brace => {
                if items.len() % 2 != 0 {
                    return Err(EdnError::syntax(
                        open,
                        format!(
                            "map literal must contain an even number of forms, \
                             found {} in map at offset {}",
                            items.len(),
                            open.offset
                        ),
                    ));
                }
                let mut map = IndexMap::with_capacity(items.len() / 2);
                let mut forms = items.into_iter();
                while let (Some(key), Some(value)) = (forms.next(), forms.next()) {
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
        }
    }

    fn parse_tagged(&mut self, tag: String, marker: Position) -> EdnResult<Value> {
        let value = match self.next_element()? {
            Element::Form(value, _) => value,
            Element::Close(..) | Element::End => {
                return Err(EdnError::syntax(
                    marker,
                    format!(
                        "tagged literal #{} at offset {} is missing its value",
                        tag, marker.offset
                    ),
                ));
            }
        };

        match self.tags.resolve(&tag) {
            Some(handler) => handler(value).map_err(|source| {
                let literal = &self.src[marker.offset..self.lexer.position().offset];
                EdnError::tag_conversion(tag.as_str(), literal, marker.offset, source)
            }),
            None => Ok(Value::Tagged(Tagged::new(tag, value))),
        }
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = EdnResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_form();
        self.failed = next.is_err();
        next.transpose()
    }
}

fn unmatched(delim: Delim, at: Position) -> EdnError {
    EdnError::syntax(
        at,
        format!("unmatched delimiter '{}' at offset {}", delim.close_char(), at.offset),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edn::tags::TagRegistry;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> EdnResult<Option<Value>> {
        Parser::new(input, TagRegistry::new().snapshot(), ReaderConfig::default()).parse()
    }

    fn read(input: &str) -> Value {
        parse(input).unwrap().expect("a value")
    }

    fn text(s: &str) -> Value {
        Value::from(s)
    }

    fn seq(items: Vec<Value>) -> Value {
        Value::Seq(items)
    }

    #[test]
    fn test_parse_nil() {
        assert_eq!(read("nil"), Value::Nil);
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(read("true"), Value::Bool(true));
        assert_eq!(read("false"), Value::Bool(false));
    }

    #[test]
    fn test_reserved_words_need_a_boundary() {
        assert_eq!(read("nilly"), text("nilly"));
        assert_eq!(read("true?"), text("true?"));
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(read("\"hello world\""), text("hello world"));
        assert_eq!(read("\"hello\\nworld\""), text("hello\nworld"));
        assert_eq!(read(r#""string\"ing""#), text("string\"ing"));
    }

    #[test]
    fn test_parse_keyword_keeps_colon() {
        assert_eq!(read(":key"), text(":key"));
        assert_eq!(read(":ns/key"), text(":ns/key"));
    }

    #[test]
    fn test_parse_character() {
        assert_eq!(read("\\a"), text("a"));
        assert_eq!(read("\\newline"), text("\n"));
        assert_eq!(read("\\u03A9"), text("Ω"));
        assert_eq!(read("\\你"), text("你"));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(read("42"), Value::from(42));
        assert_eq!(read("-17"), Value::from(-17));
        assert_eq!(read("3.14"), Value::Float(3.14));
        assert_eq!(read("-2.5"), Value::Float(-2.5));
        assert_eq!(read("1e10"), Value::Float(1e10));
        assert_eq!(read("##Inf"), Value::Float(f64::INFINITY));
        assert!(matches!(read("##NaN"), Value::Float(f) if f.is_nan()));
    }

    #[test]
    fn test_number_conversion_errors() {
        let err = parse("[1 1/0]").unwrap_err();
        assert!(err.is_conversion());
        assert_eq!(err.offset(), 3);

        let err = parse("1e999").unwrap_err();
        assert!(err.is_conversion());
    }

    #[test]
    fn test_parse_symbol() {
        assert_eq!(read("symbol"), text("symbol"));
        assert_eq!(read("ns/symbol"), text("ns/symbol"));
        assert_eq!(read("+"), text("+"));
    }

    #[test]
    fn test_parse_vector_and_list_collapse() {
        let expected = seq(vec![Value::from(1), Value::from(2), Value::from(3)]);
        assert_eq!(read("[1 2 3]"), expected);
        assert_eq!(read("(1 2 3)"), expected);
        assert_eq!(read("(+ 1 2)"), seq(vec![text("+"), Value::from(1), Value::from(2)]));
    }

    #[test]
    fn test_parse_map() {
        let result = read("{:name \"Alice\" :age 30}");
        let map = result.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&text(":name")), Some(&text("Alice")));
        assert_eq!(map.get(&text(":age")), Some(&Value::from(30)));
    }

    #[test]
    fn test_map_last_write_wins() {
        let result = read("{:a 1 :a 2}");
        let map = result.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&text(":a")), Some(&Value::from(2)));
    }

    #[test]
    fn test_map_with_collection_keys() {
        let result = read("{[1 2] :pair #{nil false} :set}");
        let map = result.as_map().unwrap();
        assert_eq!(map.get(&seq(vec![Value::from(1), Value::from(2)])), Some(&text(":pair")));
        let set_key = Value::Set([Value::Bool(false), Value::Nil].into_iter().collect());
        assert_eq!(map.get(&set_key), Some(&text(":set")));
    }

    #[test]
    fn test_parse_set_dedups() {
        let result = read("#{1 1 2}");
        let set = result.as_set().unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Value::from(1)));
        assert!(set.contains(&Value::from(2)));
    }

    #[test]
    fn test_empty_collections() {
        assert_eq!(read("[]"), seq(vec![]));
        assert_eq!(read("()"), seq(vec![]));
        assert_eq!(read("{}"), Value::Map(IndexMap::new()));
        assert_eq!(read("#{}"), Value::Set(IndexSet::new()));
    }

    #[test]
    fn test_parse_tagged_literal_fallback() {
        assert_eq!(
            read("#custom \"value\""),
            Value::Tagged(Tagged::new("custom", text("value")))
        );
        assert_eq!(
            read("#myapp/point [1 2]"),
            Value::Tagged(Tagged::new("myapp/point", seq(vec![Value::from(1), Value::from(2)])))
        );
    }

    #[test]
    fn test_nested_tags_compose() {
        assert_eq!(
            read("#outer #inner 1"),
            Value::Tagged(Tagged::new("outer", Value::Tagged(Tagged::new("inner", Value::from(1)))))
        );
    }

    #[test]
    fn test_tag_missing_value() {
        let err = parse("[#foo]").unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().contains("#foo at offset 1 is missing its value"));
        assert!(parse("#foo").unwrap_err().is_syntax());
    }

    #[test]
    fn test_conversion_error_carries_literal() {
        match parse("[1 #uuid \"not-a-uuid\"]").unwrap_err() {
            EdnError::Conversion { tag, literal, offset, .. } => {
                assert_eq!(tag.as_deref(), Some("uuid"));
                assert_eq!(literal, "#uuid \"not-a-uuid\"");
                assert_eq!(offset, 3);
            }
            other => panic!("expected conversion error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_discard() {
        assert_eq!(
            read("[1 2 #_ 3 4]"),
            seq(vec![Value::from(1), Value::from(2), Value::from(4)])
        );

        let result = read("{:a 1 #_ :b #_ 2 :c 3}");
        let map = result.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&text(":b")), None);

        let result = read("#{1 #_ 2 3}");
        assert_eq!(result.count(), Some(2));

        assert_eq!(read("#_ :discarded :kept"), text(":kept"));
        assert_eq!(read("#_ #_ 1 2 3"), Value::from(3));
        assert_eq!(read("#_ {[#{}] #{[]}} [23[34][32][4]]").count(), Some(4));
    }

    #[test]
    fn test_discard_only_is_no_value() {
        assert_eq!(parse("#_ 1").unwrap(), None);
        assert_eq!(parse("#_ 1 #_ [2]").unwrap(), None);
        assert_eq!(parse("nil").unwrap(), Some(Value::Nil));
    }

    #[test]
    fn test_discard_without_form() {
        assert!(parse("[1 #_]").unwrap_err().to_string().contains("no form to drop before ']'"));
        assert!(parse("#_").unwrap_err().is_syntax());
    }

    #[test]
    fn test_trailing_content() {
        let err = parse("1 2").unwrap_err();
        assert!(err.is_syntax());
        assert_eq!(err.offset(), 2);
        assert_eq!(read("1 #_ 2 ; done"), Value::from(1));
        assert!(parse("[1] ]").unwrap_err().to_string().contains("unmatched delimiter ']'"));
    }

    #[test]
    fn test_empty_input() {
        for input in ["", "   ", "; comment only\n", ",,,"] {
            let err = parse(input).unwrap_err();
            assert!(err.to_string().contains("no form found"), "{:?}", input);
        }
    }

    #[test]
    fn test_delimiter_errors() {
        let err = parse("[1 2").unwrap_err();
        assert!(err.to_string().contains("unterminated vector starting at offset 0"));
        let err = parse("{:a 1").unwrap_err();
        assert!(err.to_string().contains("unterminated map"));
        let err = parse("(1 2]").unwrap_err();
        assert!(err.to_string().contains("expected ')'"));
        assert_eq!(err.offset(), 4);
        assert!(parse("#{1 2)").is_err());
    }

    #[test]
    fn test_odd_map() {
        let err = parse("{:key}").unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().contains("even number of forms"));
    }

    #[test]
    fn test_depth_limit() {
        let config = ReaderConfig { max_depth: 3 };
        let tags = TagRegistry::new().snapshot();
        assert!(Parser::new("[[[1]]]", tags.clone(), config.clone()).parse().is_ok());

        let err = Parser::new("[[[[1]]]]", tags.clone(), config.clone()).parse().unwrap_err();
        assert!(err.to_string().contains("maximum nesting depth (3) exceeded"));

        let err = Parser::new("#a #b #c #d 1", tags, config).parse().unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_next_form_stream() {
        let mut parser = Parser::new(
            "1 #_ 2 [3] {:a 4}",
            TagRegistry::new().snapshot(),
            ReaderConfig::default(),
        );
        assert_eq!(parser.next_form().unwrap(), Some(Value::from(1)));
        assert_eq!(parser.next_form().unwrap(), Some(seq(vec![Value::from(3)])));
        assert!(parser.next_form().unwrap().is_some());
        assert_eq!(parser.next_form().unwrap(), None);
    }

    #[test]
    fn test_parse_value_requires_a_form() {
        let mut parser = Parser::new("  ", TagRegistry::new().snapshot(), ReaderConfig::default());
        assert!(parser.parse_value().unwrap_err().to_string().contains("unexpected end of input"));
    }

    #[test]
    fn test_parse_with_comments() {
        let result = read(
            r#"
            ; This is a comment
            {:name "Alice" ; inline comment
             :age 30}
            "#,
        );
        assert_eq!(result.count(), Some(2));
    }

    #[test]
    fn test_whitespace_handling() {
        for input in ["  42  ", "\n\t42\r\n", "42", ",42,"] {
            assert_eq!(read(input), Value::from(42));
        }
    }
}
