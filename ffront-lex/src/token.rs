#![forbid(unsafe_code)]

use ffront_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwDef,
    KwReturn,
    KwLambda,
    KwClass,
    KwImport,
    KwFrom,
    KwAs,
    KwGlobal,
    KwNonlocal,
    KwIf,
    KwElif,
    KwElse,
    KwFor,
    KwIn,
    KwWhile,
    KwWith,
    KwTry,
    KwExcept,
    KwFinally,
    KwPass,
    KwBreak,
    KwContinue,
    KwDel,
    KwRaise,
    KwAssert,
    KwYield,
    KwAsync,
    KwAwait,
    KwNot,
    KwAnd,
    KwOr,
    KwIs,
    KwTrue,
    KwFalse,
    KwNone,

    // Operators / punctuation
    Arrow,
    Walrus,
    /// Augmented assignment; holds the operator without `=` (e.g. `+`).
    AugAssign(String),
    Colon,
    Semicolon,
    Eq,
    EqEq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,

    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    At,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    Dot,
    Ellipsis,
    Comma,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Newline,
    Indent,
    Dedent,
    Eof,

    // Literals / identifiers
    Ident(String),
    Int(IntLiteral),
    Float(String),
    /// Raw literal text including quotes and prefix.
    String(String),
}

/// An integer literal of any size, as underscore-free digits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntLiteral {
    pub radix: u32,
    pub digits: String,
}

impl IntLiteral {
    /// `None` when the literal does not fit in a `u64`.
    pub fn value(&self) -> Option<u64> {
        u64::from_str_radix(&self.digits, self.radix).ok()
    }
}

impl TokenKind {
    pub fn is_open_bracket(&self) -> bool {
        matches!(
            self,
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace
        )
    }

    pub fn is_close_bracket(&self) -> bool {
        matches!(
            self,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
        )
    }

    pub fn ident(&self) -> Option<&str> {
        match self {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}
