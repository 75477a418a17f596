//! Lexer for Go source files
//!
//! Converts source code into a stream of tokens. Newlines are significant
//! only through automatic semicolon insertion: a line ending after an
//! identifier, literal, closing bracket or terminator keyword yields a
//! `Semicolon` token, so the parser sees Go's statement structure without
//! tracking layout itself.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::Span;

/// Multi-character operators, longest first.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "&^=", "...", "&&", "||", "<-", "++", "--", "==", "!=", "<=", ">=", ":=",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "&^",
];

/// The lexer state
pub struct Lexer {
    /// Source code as chars
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    /// File ID for span tracking
    file_id: usize,
    /// Whether the last emitted token may end a statement
    semicolon_pending: bool,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str, file_id: usize) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            file_id,
            semicolon_pending: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos, self.file_id)
    }

    fn make_token(&mut self, kind: TokenKind) -> Token {
        self.semicolon_pending = kind.ends_statement();
        Token::new(kind, self.make_span())
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.source.get(self.pos + i) == Some(&c))
    }

    /// Skip whitespace and comments, reporting whether a newline was crossed
    fn skip_whitespace(&mut self) -> bool {
        let mut newline = false;
        while let Some(c) = self.peek() {
            match c {
                '\n' => {
                    newline = true;
                    self.advance();
                }
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '/' if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        if self.advance() == Some('\n') {
                            newline = true;
                        }
                    }
                }
                _ => break,
            }
        }
        newline
    }

    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.source[self.start..self.pos].iter().collect();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));
        self.make_token(kind)
    }

    /// Numbers are kept as written; declarations never need their value.
    fn read_number(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                let exponent = matches!(c, 'e' | 'E' | 'p' | 'P');
                self.advance();
                if exponent && matches!(self.peek(), Some('+') | Some('-')) {
                    self.advance();
                }
            } else {
                break;
            }
        }
        let text: String = self.source[self.start..self.pos].iter().collect();
        self.make_token(TokenKind::Number(text))
    }

    fn read_quoted(&mut self, quote: char) -> String {
        self.advance(); // opening quote
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                break;
            } else if c == '\\' {
                self.advance();
                match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => break,
                }
            } else if c == '\n' {
                // unterminated; let the parser report what follows
                break;
            } else {
                value.push(c);
                self.advance();
            }
        }
        value
    }

    fn read_raw_string(&mut self) -> Token {
        self.advance(); // opening backtick
        let mut value = String::new();
        while let Some(c) = self.advance() {
            if c == '`' {
                break;
            }
            value.push(c);
        }
        self.make_token(TokenKind::StringLit(value))
    }

    fn read_operator(&mut self, c: char) -> TokenKind {
        for op in OPERATORS {
            if self.starts_with(op) {
                self.pos += op.chars().count();
                return match *op {
                    "..." => TokenKind::Ellipsis,
                    "<-" => TokenKind::Arrow,
                    _ => TokenKind::Op(op.to_string()),
                };
            }
        }

        self.advance();
        match c {
            '*' => TokenKind::Star,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '=' => TokenKind::Eq,
            '~' => TokenKind::Tilde,
            '|' => TokenKind::Pipe,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '+' | '-' | '/' | '%' | '&' | '^' | '!' | '<' | '>' => TokenKind::Op(c.to_string()),
            _ => TokenKind::Unknown(c),
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        let newline = self.skip_whitespace();
        if self.semicolon_pending && (newline || self.is_at_end()) {
            self.start = self.pos;
            return self.make_token(TokenKind::Semicolon);
        }

        self.start = self.pos;
        let c = match self.peek() {
            Some(c) => c,
            None => return Token::eof(self.make_span()),
        };

        if c.is_alphabetic() || c == '_' {
            return self.read_identifier();
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_next().is_some_and(|n| n.is_ascii_digit())) {
            return self.read_number();
        }
        match c {
            '"' => {
                let value = self.read_quoted('"');
                self.make_token(TokenKind::StringLit(value))
            }
            '\'' => {
                let value = self.read_quoted('\'');
                self.make_token(TokenKind::CharLit(value))
            }
            '`' => self.read_raw_string(),
            _ => {
                let kind = self.read_operator(c);
                self.make_token(kind)
            }
        }
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
