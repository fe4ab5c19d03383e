use std::ops::Range;

use crate::edn::number::{self, NumberClass};
use crate::error::{EdnError, EdnResult};

/// Location of a token or error in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset from the start of the input.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Self { offset: 0, line: 1, column: 1 }
    }

    /// Locate a byte offset in `src` by counting the lines before it.
    pub fn locate(src: &str, offset: usize) -> Self {
        let mut pos = Self::start();
        for (at, ch) in src.char_indices() {
            if at >= offset {
                break;
            }
            pos.advance(ch);
        }
        pos.offset = offset;
        pos
    }

    fn advance(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delim {
    Paren,
    Bracket,
    Brace,
    Set,
}

impl Delim {
    /// The delimiter kind whose close token ends this collection.
    pub fn closer(self) -> Delim {
        match self {
            Delim::Set => Delim::Brace,
            other => other,
        }
    }

    pub fn open_str(self) -> &'static str {
        match self {
            Delim::Paren => "(",
            Delim::Bracket => "[",
            Delim::Brace => "{",
            Delim::Set => "#{",
        }
    }

    pub fn close_char(self) -> char {
        match self {
            Delim::Paren => ')',
            Delim::Bracket => ']',
            Delim::Brace | Delim::Set => '}',
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Delim::Paren => "list",
            Delim::Bracket => "vector",
            Delim::Brace => "map",
            Delim::Set => "set",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Open(Delim),
    Close(Delim),
    Number(NumberClass),
    Symbol,
    /// Keyword text keeps its leading colon.
    Keyword,
    String(String),
    Char(char),
    /// `#_`
    Discard,
    /// `#name`, holding the name without `#`
    Tag(String),
    /// `##Inf`, `##-Inf`, `##NaN`, holding the name without `##`
    Symbolic(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range of the raw token text.
    pub span: Range<usize>,
    pub pos: Position,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.span.clone()]
    }
}

/// Splits EDN source into tokens on demand.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: Position,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: Position::start(),
            failed: false,
        }
    }

    /// Position just past the last consumed character.
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Produce the next token, or `None` once only insignificant input remains.
    pub fn next_token(&mut self) -> EdnResult<Option<Token>> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        let kind = match ch {
            '(' => self.single(TokenKind::Open(Delim::Paren)),
            ')' => self.single(TokenKind::Close(Delim::Paren)),
            '[' => self.single(TokenKind::Open(Delim::Bracket)),
            ']' => self.single(TokenKind::Close(Delim::Bracket)),
            '{' => self.single(TokenKind::Open(Delim::Brace)),
            '}' => self.single(TokenKind::Close(Delim::Brace)),
            '"' => self.lex_string(start)?,
            '\\' => self.lex_char(start)?,
            '#' => self.lex_dispatch(start)?,
            ':' => self.lex_keyword(start)?,
            _ if self.starts_number() => self.lex_number(start)?,
            _ if is_symbol_start(ch) => self.lex_symbol(start)?,
            _ => {
                return Err(EdnError::syntax(start, format!("unexpected character '{}'", ch)));
            }
        };

        Ok(Some(Token {
            kind,
            span: start.offset..self.pos.offset,
            pos: start,
        }))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn lex_string(&mut self, start: Position) -> EdnResult<TokenKind> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            let escape_at = self.pos;
            match self.bump() {
                None => {
                    return Err(EdnError::syntax(
                        start,
                        format!("unterminated string starting at offset {}", start.offset),
                    ))
                }
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('b') => value.push('\x08'),
                    Some('f') => value.push('\x0C'),
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('u') => value.push(self.string_unicode_escape(escape_at)?),
                    Some(other) => {
                        return Err(EdnError::syntax(
                            escape_at,
                            format!("invalid escape sequence \\{} in string", other),
                        ))
                    }
                    None => {
                        return Err(EdnError::syntax(
                            start,
                            format!("unterminated string starting at offset {}", start.offset),
                        ))
                    }
                },
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::String(value))
    }

    /// `\uXXXX` inside a string, combining UTF-16 surrogate pairs.
    fn string_unicode_escape(&mut self, escape_at: Position) -> EdnResult<char> {
        let unit = self.hex4(escape_at)?;
        if (0xD800..0xDC00).contains(&unit) && self.src[self.pos.offset..].starts_with("\\u") {
            let low_at = self.pos;
            self.bump();
            self.bump();
            let low = self.hex4(low_at)?;
            if (0xDC00..0xE000).contains(&low) {
                let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                return code_point(combined, escape_at);
            }
            return Err(EdnError::syntax(
                low_at,
                format!("unpaired surrogate \\u{:04X} in string", unit),
            ));
        }
        code_point(unit, escape_at)
    }

    fn hex4(&mut self, escape_at: Position) -> EdnResult<u32> {
        let mut value = 0u32;
        for _ in 0..4 {
            let digit = self.peek().and_then(|c| c.to_digit(16)).ok_or_else(|| {
                EdnError::syntax(escape_at, "unicode escape requires exactly 4 hex digits")
            })?;
            self.bump();
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn lex_char(&mut self, start: Position) -> EdnResult<TokenKind> {
        self.bump(); // backslash
        let Some(first) = self.bump() else {
            return Err(EdnError::syntax(start, "incomplete character literal at end of input"));
        };
        if first.is_whitespace() {
            return Err(EdnError::syntax(
                start,
                "backslash must be followed by a character, not whitespace",
            ));
        }
        let rest_start = self.pos.offset;
        while self.peek().is_some_and(is_symbol_char) {
            self.bump();
        }
        let rest = &self.src[rest_start..self.pos.offset];
        if rest.is_empty() {
            return Ok(TokenKind::Char(first));
        }

        let name = &self.src[start.offset + 1..self.pos.offset];
        let ch = match name {
            "newline" => '\n',
            "space" => ' ',
            "tab" => '\t',
            "return" => '\r',
            "formfeed" => '\x0C',
            "backspace" => '\x08',
            _ if first == 'u' && rest.len() == 4 && rest.bytes().all(|b| b.is_ascii_hexdigit()) => {
                let unit = u32::from_str_radix(rest, 16)
                    .map_err(|_| {
                        EdnError::syntax(start, format!("invalid character literal \\{}", name))
                    })?;
                code_point(unit, start)?
            }
            _ => {
                return Err(EdnError::syntax(
                    start,
                    format!("unrecognized character name \\{}", name),
                ))
            }
        };
        Ok(TokenKind::Char(ch))
    }

    fn lex_dispatch(&mut self, start: Position) -> EdnResult<TokenKind> {
        self.bump(); // '#'
        match self.peek() {
            Some('{') => Ok(self.single(TokenKind::Open(Delim::Set))),
            Some('_') => Ok(self.single(TokenKind::Discard)),
            Some('#') => {
                self.bump();
                let name = self.read_run();
                match name {
                    "Inf" | "-Inf" | "NaN" => Ok(TokenKind::Symbolic(name.to_string())),
                    _ => Err(EdnError::syntax(start, format!("unknown symbolic value ##{}", name))),
                }
            }
            Some(c) if c.is_alphabetic() => {
                let name = self.read_run();
                validate_name(name).map_err(|msg| {
                    EdnError::syntax(start, format!("invalid tag #{}: {}", name, msg))
                })?;
                Ok(TokenKind::Tag(name.to_string()))
            }
            Some(c) => Err(EdnError::syntax(
                start,
                format!("invalid dispatch '#{}': a tag must start with a letter", c),
            )),
            None => Err(EdnError::syntax(start, "unexpected end of input after '#'")),
        }
    }

    fn lex_keyword(&mut self, start: Position) -> EdnResult<TokenKind> {
        self.bump(); // ':'
        let name = self.read_run();
        if name.is_empty() {
            return Err(EdnError::syntax(start, "keyword is missing its name"));
        }
        if name.starts_with(':') {
            return Err(EdnError::syntax(start, format!("invalid keyword :{}", name)));
        }
        validate_name(name).map_err(|msg| {
            EdnError::syntax(start, format!("invalid keyword :{}: {}", name, msg))
        })?;
        Ok(TokenKind::Keyword)
    }

    fn lex_number(&mut self, start: Position) -> EdnResult<TokenKind> {
        let text = self.read_run();
        number::classify(text)
            .map(TokenKind::Number)
            .map_err(|msg| EdnError::syntax(start, msg))
    }

    fn lex_symbol(&mut self, start: Position) -> EdnResult<TokenKind> {
        let name = self.read_run();
        validate_name(name)
            .map_err(|msg| EdnError::syntax(start, format!("invalid symbol {}: {}", name, msg)))?;
        Ok(TokenKind::Symbol)
    }

    /// Consume the maximal run of symbol characters.
    fn read_run(&mut self) -> &'a str {
        let from = self.pos.offset;
        while self.peek().is_some_and(is_symbol_char) {
            self.bump();
        }
        &self.src[from..self.pos.offset]
    }

    fn starts_number(&self) -> bool {
        let mut chars = self.src[self.pos.offset..].chars();
        let first = chars.next();
        let second = chars.next();
        let third = chars.next();
        let digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
        match first {
            Some(c) if c.is_ascii_digit() => true,
            Some('+' | '-') => digit(second) || (second == Some('.') && digit(third)),
            Some('.') => digit(second),
            _ => false,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == ',' {
                self.bump();
            } else if ch == ';' {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos.offset..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos.advance(ch);
        Some(ch)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = EdnResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_token();
        self.failed = next.is_err();
        next.transpose()
    }
}

fn is_symbol_start(ch: char) -> bool {
    ch.is_alphabetic() || ".*+!-_?$%&=<>/".contains(ch)
}

fn is_symbol_char(ch: char) -> bool {
    ch.is_alphanumeric() || ".*+!-_?$%&=<>/:#'".contains(ch)
}

/// At most one `/`, with text on both sides of it; `/` alone is fine.
fn validate_name(name: &str) -> Result<(), &'static str> {
    if name == "/" {
        return Ok(());
    }
    match name.split_once('/') {
        None => Ok(()),
        Some((_, name)) if name.contains('/') => Err("more than one '/'"),
        Some((ns, name)) if ns.is_empty() || name.is_empty() => Err("empty namespace or name"),
        Some(_) => Ok(()),
    }
}

fn code_point(value: u32, at: Position) -> EdnResult<char> {
    char::from_u32(value)
        .ok_or_else(|| EdnError::syntax(at, format!("invalid unicode code point U+{:04X}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .map(|token| token.unwrap().kind)
            .collect()
    }

    fn lex_error(input: &str) -> EdnError {
        Lexer::new(input)
            .find_map(|token| token.err())
            .expect("expected a lexical error")
    }

    #[test]
    fn test_delimiters_and_separators() {
        assert_eq!(
            kinds("( [ ,{ } ] ) #{}"),
            vec![
                TokenKind::Open(Delim::Paren),
                TokenKind::Open(Delim::Bracket),
                TokenKind::Open(Delim::Brace),
                TokenKind::Close(Delim::Brace),
                TokenKind::Close(Delim::Bracket),
                TokenKind::Close(Delim::Paren),
                TokenKind::Open(Delim::Set),
                TokenKind::Close(Delim::Brace),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("; leading\n1 ; trailing\n,,2"),
            vec![TokenKind::Number(NumberClass::Integer), TokenKind::Number(NumberClass::Integer)]
        );
        assert_eq!(kinds("  ; only a comment"), vec![]);
    }

    #[test]
    fn test_spans_and_positions() {
        let src = "[:a\n  foo/bar]";
        let tokens: Vec<Token> = Lexer::new(src).map(Result::unwrap).collect();
        assert_eq!(tokens[1].kind, TokenKind::Keyword);
        assert_eq!(tokens[1].text(src), ":a");
        assert_eq!(tokens[2].kind, TokenKind::Symbol);
        assert_eq!(tokens[2].text(src), "foo/bar");
        assert_eq!(tokens[2].pos, Position { offset: 6, line: 2, column: 3 });
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#""a\tb\n\"q\"\\""#),
            vec![TokenKind::String("a\tb\n\"q\"\\".to_string())]
        );
        assert_eq!(kinds(r#""Hello \u03A9""#), vec![TokenKind::String("Hello Ω".to_string())]);
        assert_eq!(kinds(r#""\uD83D\uDE00""#), vec![TokenKind::String("😀".to_string())]);
        assert_eq!(kinds("\"你\""), vec![TokenKind::String("你".to_string())]);
    }

    #[test]
    fn test_string_errors() {
        let err = lex_error("[1 \"abc");
        assert_eq!(err.offset(), 3);
        assert!(err.to_string().contains("unterminated string starting at offset 3"));

        assert!(lex_error(r#""\q""#).to_string().contains("invalid escape"));
        assert!(lex_error(r#""\u03A""#).to_string().contains("4 hex digits"));
        assert!(lex_error(r#""\uD83D""#).to_string().contains("U+D83D"));
    }

    #[test]
    fn test_characters() {
        assert_eq!(
            kinds(r"\a \newline \space \tab \return A \€ \( \\"),
            vec![
                TokenKind::Char('a'),
                TokenKind::Char('\n'),
                TokenKind::Char(' '),
                TokenKind::Char('\t'),
                TokenKind::Char('\r'),
                TokenKind::Char('A'),
                TokenKind::Char('€'),
                TokenKind::Char('('),
                TokenKind::Char('\\'),
            ]
        );
        assert_eq!(kinds(r"\u"), vec![TokenKind::Char('u')]);
        assert_eq!(kinds(r"(\a\b)").len(), 4);
    }

    #[test]
    fn test_character_errors() {
        assert!(lex_error(r"\bogus").to_string().contains("unrecognized character name \\bogus"));
        assert!(lex_error("\\").to_string().contains("incomplete character"));
        for input in ["\\ ", "[\\\n]", "\\\t"] {
            let err = lex_error(input);
            assert!(err.to_string().contains("not whitespace"), "{:?}", input);
        }
    }

    #[test]
    fn test_numbers_are_classified() {
        assert_eq!(
            kinds("42 -7 +3 1.5 .5 -1e3 3/4 7N 2.5M 0xFF"),
            vec![
                TokenKind::Number(NumberClass::Integer),
                TokenKind::Number(NumberClass::Integer),
                TokenKind::Number(NumberClass::Integer),
                TokenKind::Number(NumberClass::Float),
                TokenKind::Number(NumberClass::Float),
                TokenKind::Number(NumberClass::Float),
                TokenKind::Number(NumberClass::Ratio),
                TokenKind::Number(NumberClass::Integer),
                TokenKind::Number(NumberClass::Decimal),
                TokenKind::Number(NumberClass::Integer),
            ]
        );
        assert!(lex_error("1.2.3").to_string().contains("multiple decimal points"));
    }

    #[test]
    fn test_symbols_versus_numbers() {
        assert_eq!(
            kinds("- + -foo +bar .foo / a/b ->x"),
            vec![TokenKind::Symbol; 8]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(kinds(":a :user/email :a.b/c-d?"), vec![TokenKind::Keyword; 3]);
        assert!(lex_error(":").to_string().contains("missing its name"));
        assert!(lex_error("::auto").to_string().contains("invalid keyword"));
        assert!(lex_error(":a/b/c").to_string().contains("more than one '/'"));
        assert!(lex_error(":ns/").to_string().contains("empty namespace or name"));
    }

    #[test]
    fn test_dispatch() {
        assert_eq!(
            kinds("#_ #inst #myapp/point ##Inf ##-Inf ##NaN"),
            vec![
                TokenKind::Discard,
                TokenKind::Tag("inst".to_string()),
                TokenKind::Tag("myapp/point".to_string()),
                TokenKind::Symbolic("Inf".to_string()),
                TokenKind::Symbolic("-Inf".to_string()),
                TokenKind::Symbolic("NaN".to_string()),
            ]
        );
        assert!(lex_error("# inst").to_string().contains("invalid dispatch"));
        assert!(lex_error("#").to_string().contains("end of input"));
        assert!(lex_error("##Foo").to_string().contains("unknown symbolic value"));
    }

    #[test]
    fn test_unexpected_characters() {
        let err = lex_error("@EE");
        assert_eq!(err.offset(), 0);
        assert!(err.to_string().contains("unexpected character '@'"));
        assert!(lex_error("[@nil tee]").is_syntax());
        assert!(lex_error("^:meta").is_syntax());
    }

    #[test]
    fn test_locate() {
        assert_eq!(Position::locate("ab\ncd", 4), Position { offset: 4, line: 2, column: 2 });
        assert_eq!(Position::locate("", 0), Position::start());
    }
}
