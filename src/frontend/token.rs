//! Token definitions for the Go declaration subset
#![allow(dead_code)]

use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, span }
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Keywords ============
    /// package
    Package,
    /// import
    Import,
    /// type
    Type,
    /// struct
    Struct,
    /// interface
    Interface,
    /// map
    Map,
    /// chan
    Chan,
    /// func
    Func,
    /// var
    Var,
    /// const
    Const,
    /// return, break, continue, fallthrough: only matter for semicolon insertion
    Terminator(String),
    /// Any other Go keyword
    Keyword(String),

    // ============ Identifiers and Literals ============
    Ident(String),
    /// Integer, float or imaginary literal, kept as written
    Number(String),
    /// Interpreted or raw string literal, unquoted
    StringLit(String),
    CharLit(String),

    // ============ Punctuation ============
    /// *
    Star,
    /// .
    Dot,
    /// ...
    Ellipsis,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// :
    Colon,
    /// =
    Eq,
    /// <-
    Arrow,
    /// ~
    Tilde,
    /// |
    Pipe,
    /// (
    LParen,
    /// )
    RParen,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// {
    LBrace,
    /// }
    RBrace,
    /// Any other operator, only skipped over
    Op(String),

    // ============ Special ============
    Eof,
    Unknown(char),
}

impl TokenKind {
    /// Convert a keyword string to its token kind
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "package" => Some(TokenKind::Package),
            "import" => Some(TokenKind::Import),
            "type" => Some(TokenKind::Type),
            "struct" => Some(TokenKind::Struct),
            "interface" => Some(TokenKind::Interface),
            "map" => Some(TokenKind::Map),
            "chan" => Some(TokenKind::Chan),
            "func" => Some(TokenKind::Func),
            "var" => Some(TokenKind::Var),
            "const" => Some(TokenKind::Const),
            "return" | "break" | "continue" | "fallthrough" => {
                Some(TokenKind::Terminator(s.to_string()))
            }
            "case" | "default" | "defer" | "else" | "for" | "go" | "goto" | "if" | "range"
            | "select" | "switch" => Some(TokenKind::Keyword(s.to_string())),
            _ => None,
        }
    }

    /// Whether a newline directly after this token ends the statement.
    pub fn ends_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident(_)
                | TokenKind::Number(_)
                | TokenKind::StringLit(_)
                | TokenKind::CharLit(_)
                | TokenKind::Terminator(_)
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        ) || matches!(self, TokenKind::Op(op) if op == "++" || op == "--")
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Package => write!(f, "package"),
            TokenKind::Import => write!(f, "import"),
            TokenKind::Type => write!(f, "type"),
            TokenKind::Struct => write!(f, "struct"),
            TokenKind::Interface => write!(f, "interface"),
            TokenKind::Map => write!(f, "map"),
            TokenKind::Chan => write!(f, "chan"),
            TokenKind::Func => write!(f, "func"),
            TokenKind::Var => write!(f, "var"),
            TokenKind::Const => write!(f, "const"),
            TokenKind::Terminator(s) | TokenKind::Keyword(s) => write!(f, "{}", s),
            TokenKind::Ident(s) => write!(f, "identifier {}", s),
            TokenKind::Number(s) => write!(f, "number {}", s),
            TokenKind::StringLit(s) => write!(f, "string {:?}", s),
            TokenKind::CharLit(s) => write!(f, "rune '{}'", s),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Ellipsis => write!(f, "..."),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Eq => write!(f, "="),
            TokenKind::Arrow => write!(f, "<-"),
            TokenKind::Tilde => write!(f, "~"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Op(s) => write!(f, "{}", s),
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Unknown(c) => write!(f, "{:?}", c),
        }
    }
}
