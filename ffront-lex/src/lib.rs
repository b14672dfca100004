#![forbid(unsafe_code)]

//! Tokenizer for field operator and program definitions.
//!
//! Produces logical lines with explicit `Indent`/`Dedent` tokens, which is
//! all the symbol classifier needs to find scopes and bindings.

mod lexer;
mod token;

pub use lexer::{LexError, Lexer};
pub use token::{IntLiteral, Token, TokenKind};
