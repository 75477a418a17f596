//! Frontend module - Lexer, Parser, compilation units and module resolution

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod unit;
pub mod module;
