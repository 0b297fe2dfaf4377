use std::{
    collections::{BTreeMap, VecDeque},
    str::Chars,
};

use itertools::{PeekNth, peek_nth};
use once_cell::sync::Lazy;
use strum::EnumString;

use crate::frontend::SourceFile;

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source SourceFile,
    position: usize,
    line_number: usize,
    chars: PeekNth<Chars<'source>>,
    peek_buffer: VecDeque<Token>,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /* Words */
    Keyword(Keyword), // while
    Identifier,       // main

    /* Literals */
    BooleanLiteral, // true
    IntegerLiteral, // 1
    ShortLiteral,   // 1s
    StringLiteral,  // "hello, world"

    /* Delimiters */
    OpenParen,  // (
    CloseParen, // )
    OpenBrace,  // {
    CloseBrace, // }
    Semicolon,  // ;
    Comma,      // ,

    /* Unary Ops */
    Bang,      // !
    Ampersand, // &
    At,        // @

    /* Unary + Binary Ops */
    Minus, // -

    /* Binary Ops */
    Plus,                 // +
    Asterisk,             // *
    Divide,               // /
    LogicalAnd,           // &&
    LogicalOr,            // ||
    DoubleEquals,         // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=

    /* Assignment and update */
    Equals,     // =
    PlusPlus,   // ++
    MinusMinus, // --
}

impl TokenKind {
    pub fn is_comparison_operator(&self) -> bool {
        matches!(
            self,
            Self::DoubleEquals
                | Self::NotEquals
                | Self::LessThan
                | Self::LessThanOrEqualTo
                | Self::GreaterThan
                | Self::GreaterThanOrEqualTo
        )
    }

    pub fn is_term_operator(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus)
    }

    pub fn is_factor_operator(&self) -> bool {
        matches!(self, Self::Asterisk | Self::Divide)
    }

    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Self::Keyword(Keyword::Int)
                | Self::Keyword(Keyword::Short)
                | Self::Keyword(Keyword::Bool)
                | Self::Keyword(Keyword::Void)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Keyword {
    Int,
    Short,
    Bool,
    Void,
    Ptr,
    If,
    Else,
    While,
    Return,
    Input,
    Output,
}

/// Table of single char tokens (matched after longer sequences are checked for)
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('(', TokenKind::OpenParen),
        (')', TokenKind::CloseParen),
        ('{', TokenKind::OpenBrace),
        ('}', TokenKind::CloseBrace),
        (';', TokenKind::Semicolon),
        (',', TokenKind::Comma),
        ('!', TokenKind::Bang),
        ('&', TokenKind::Ampersand),
        ('@', TokenKind::At),
        ('-', TokenKind::Minus),
        ('+', TokenKind::Plus),
        ('*', TokenKind::Asterisk),
        ('/', TokenKind::Divide),
        ('=', TokenKind::Equals),
        ('<', TokenKind::LessThan),
        ('>', TokenKind::GreaterThan),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source SourceFile) -> Self {
        Self {
            source,
            chars: peek_nth(source.contents.chars()),
            position: 0,
            line_number: 0,
            peek_buffer: VecDeque::new(),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.source.contents.len()
    }

    pub fn source(&self) -> &SourceFile {
        self.source
    }

    fn report_fatal_error(&self, message: &str) -> ! {
        eprintln!(
            "Fatal error reported in Lexer ({}:{}):",
            self.source.origin,
            self.line_number + 1,
        );
        eprintln!("{message}");
        std::process::exit(1);
    }

    fn ignore_whitespace(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if !c.is_ascii_whitespace() {
                break;
            }

            if c == '\n' {
                self.line_number += 1;
            }

            self.chars.next();
            self.position += 1;
        }
    }

    fn ignore_line(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.chars.next();
            self.position += 1;
        }
    }

    fn read_string_literal(&mut self) -> Token {
        let start_position = self.position;

        // Consume the opening quote
        assert!(self.chars.next().is_some());
        self.position += 1;

        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                self.report_fatal_error("Reached end of line while reading string literal");
            }

            self.chars.next();
            self.position += 1;

            // If we encountered an escape sequence, keep going
            if c == '\\' && self.chars.peek().is_some_and(|c| *c == '"') {
                self.chars.next();
                self.position += 1;
            }

            if c == '"' {
                return Token {
                    span: self.new_span(start_position),
                    kind: TokenKind::StringLiteral,
                };
            }
        }

        self.report_fatal_error("Reached end of file while reading string literal")
    }

    // Keyword, identifier, or boolean literal
    fn read_word(&mut self) -> Token {
        let start_position = self.position;

        while let Some(c) = self.chars.peek().copied() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }

            self.chars.next();
            self.position += 1;
        }

        let span = self.new_span(start_position);
        let value = self.source.value_of_span(span);

        let kind = if let Ok(keyword) = value.parse() {
            TokenKind::Keyword(keyword)
        } else {
            match value {
                "true" | "false" => TokenKind::BooleanLiteral,
                _ => TokenKind::Identifier,
            }
        };

        Token { kind, span }
    }

    // Integer literal, or a short literal when suffixed with `s`
    fn read_number(&mut self) -> Token {
        let start_position = self.position;
        let mut kind = TokenKind::IntegerLiteral;

        assert!(self.chars.peek().is_some());

        while let Some(c) = self.chars.peek().copied() {
            if c == 's' || c == 'S' {
                kind = TokenKind::ShortLiteral;
                self.chars.next();
                self.position += 1;
                break;
            }

            if !c.is_ascii_digit() {
                break;
            }

            self.chars.next();
            self.position += 1;
        }

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn read_single(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;

        self.chars.next();
        self.position += 1;

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn read_double(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;

        self.chars.next();
        self.chars.next();

        self.position += 2;

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn new_span(&self, start: usize) -> Span {
        Span {
            start,
            end: self.position,
        }
    }

    pub fn peek(&mut self) -> Option<Token> {
        if !self.peek_buffer.is_empty() {
            return self.peek_buffer.front().cloned();
        }

        if let Some(token) = self.next() {
            self.peek_buffer.push_back(token);
        }

        self.peek_buffer.front().cloned()
    }

    pub fn peek_second(&mut self) -> Option<Token> {
        self.peek_nth(1)
    }

    /// Peeks n tokens past the next one (`peek_nth(0)` is `peek`)
    pub fn peek_nth(&mut self, n: usize) -> Option<Token> {
        while self.peek_buffer.len() <= n {
            let Some(token) = self.read_token() else {
                break;
            };
            self.peek_buffer.push_back(token);
        }

        self.peek_buffer.get(n).cloned()
    }

    pub fn next(&mut self) -> Option<Token> {
        if !self.peek_buffer.is_empty() {
            return self.peek_buffer.pop_front();
        }

        self.read_token()
    }

    fn read_token(&mut self) -> Option<Token> {
        while let Some(c) = self.chars.peek().copied() {
            if !c.is_ascii() {
                self.report_fatal_error(&format!("Unexpected non-ascii character in stream: `{c}`"))
            }

            let token = match c {
                // Ignore whitespace
                c if c.is_whitespace() => {
                    self.ignore_whitespace();
                    continue;
                }
                // Ignore comments
                '/' if self.chars.peek_nth(1).is_some_and(|c| *c == '/') => {
                    self.ignore_line();
                    continue;
                }

                // String literals
                '"' => self.read_string_literal(),

                // Integer and short literals
                n if n.is_ascii_digit() => self.read_number(),

                // Identifiers, keywords, and boolean literals
                a if a.is_ascii_alphabetic() || a == '_' => self.read_word(),

                // Double Equals (==)
                '=' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::DoubleEquals)
                }
                // Not Equals (!=)
                '!' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::NotEquals)
                }
                // Less than or equal (<=)
                '<' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::LessThanOrEqualTo)
                }
                // Greater than or equal (>=)
                '>' if self.chars.peek_nth(1).is_some_and(|c| *c == '=') => {
                    self.read_double(TokenKind::GreaterThanOrEqualTo)
                }

                // Post increment (++)
                '+' if self.chars.peek_nth(1).is_some_and(|c| *c == '+') => {
                    self.read_double(TokenKind::PlusPlus)
                }
                // Post decrement (--)
                '-' if self.chars.peek_nth(1).is_some_and(|c| *c == '-') => {
                    self.read_double(TokenKind::MinusMinus)
                }

                // Logical And (&&)
                '&' if self.chars.peek_nth(1).is_some_and(|c| *c == '&') => {
                    self.read_double(TokenKind::LogicalAnd)
                }
                // Logical Or (||)
                '|' if self.chars.peek_nth(1).is_some_and(|c| *c == '|') => {
                    self.read_double(TokenKind::LogicalOr)
                }

                s if SINGLE_TOKENS.contains_key(&s) => {
                    self.read_single(*SINGLE_TOKENS.get(&s).unwrap())
                }
                c => self.report_fatal_error(&format!("Unexpected character in stream: `{c}`")),
            };

            return Some(token);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::{Keyword, Lexer, TokenKind};
    use crate::frontend::SourceFile;

    fn kinds_of(source: &str) -> Vec<TokenKind> {
        let source = SourceFile::new_in_memory(source);
        let mut lexer = Lexer::new(&source);
        let mut kinds = Vec::new();

        while let Some(token) = lexer.next() {
            kinds.push(token.kind);
        }

        kinds
    }

    #[test]
    fn lexes_a_declaration_and_assignment() {
        assert_eq!(
            kinds_of("int x; x = 3 + 4 * 2;"),
            vec![
                TokenKind::Keyword(Keyword::Int),
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::IntegerLiteral,
                TokenKind::Plus,
                TokenKind::IntegerLiteral,
                TokenKind::Asterisk,
                TokenKind::IntegerLiteral,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn lexes_short_literals_and_update_operators() {
        assert_eq!(
            kinds_of("3s x++ y-- @p &q"),
            vec![
                TokenKind::ShortLiteral,
                TokenKind::Identifier,
                TokenKind::PlusPlus,
                TokenKind::Identifier,
                TokenKind::MinusMinus,
                TokenKind::At,
                TokenKind::Identifier,
                TokenKind::Ampersand,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn skips_comments_and_reads_strings() {
        assert_eq!(
            kinds_of("// nothing here\noutput \"hi\\\"there\";"),
            vec![
                TokenKind::Keyword(Keyword::Output),
                TokenKind::StringLiteral,
                TokenKind::Semicolon,
            ]
        );
    }
}
