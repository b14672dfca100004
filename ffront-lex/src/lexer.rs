#![forbid(unsafe_code)]

use ffront_ast::{span_between, Span};
use logos::Logos;
use miette::Diagnostic;
use thiserror::Error;

use crate::token::{IntLiteral, Token, TokenKind};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error: {message}")]
#[diagnostic(code(ffront::lex))]
#[allow(unused_assignments)]
pub struct LexError {
    pub message: String,
    #[label]
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r]+")]
enum RawToken {
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,
    #[regex(r"\\\r?\n", logos::skip)]
    LineContinuation,
    #[token("\n")]
    Newline,

    #[token("def")]
    KwDef,
    #[token("return")]
    KwReturn,
    #[token("lambda")]
    KwLambda,
    #[token("class")]
    KwClass,
    #[token("import")]
    KwImport,
    #[token("from")]
    KwFrom,
    #[token("as")]
    KwAs,
    #[token("global")]
    KwGlobal,
    #[token("nonlocal")]
    KwNonlocal,
    #[token("if")]
    KwIf,
    #[token("elif")]
    KwElif,
    #[token("else")]
    KwElse,
    #[token("for")]
    KwFor,
    #[token("in")]
    KwIn,
    #[token("while")]
    KwWhile,
    #[token("with")]
    KwWith,
    #[token("try")]
    KwTry,
    #[token("except")]
    KwExcept,
    #[token("finally")]
    KwFinally,
    #[token("pass")]
    KwPass,
    #[token("break")]
    KwBreak,
    #[token("continue")]
    KwContinue,
    #[token("del")]
    KwDel,
    #[token("raise")]
    KwRaise,
    #[token("assert")]
    KwAssert,
    #[token("yield")]
    KwYield,
    #[token("async")]
    KwAsync,
    #[token("await")]
    KwAwait,
    #[token("not")]
    KwNot,
    #[token("and")]
    KwAnd,
    #[token("or")]
    KwOr,
    #[token("is")]
    KwIs,
    #[token("True")]
    KwTrue,
    #[token("False")]
    KwFalse,
    #[token("None")]
    KwNone,

    #[token("->")]
    Arrow,
    #[token(":=")]
    Walrus,

    #[regex(r"(\*\*|//|>>|<<|[-+*/%@&|^])=", |lex| {
        let s = lex.slice();
        s[..s.len() - 1].to_string()
    })]
    AugAssign(String),

    #[token("==")]
    EqEq,
    #[token("!=")]
    Neq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    #[token("**")]
    StarStar,
    #[token("//")]
    SlashSlash,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("@")]
    At,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,

    #[token("...")]
    Ellipsis,
    #[token(".")]
    Dot,

    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("=")]
    Eq,
    #[token(",")]
    Comma,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    #[regex(r"0[bB][01_]+", |lex| parse_int_prefixed(lex.slice(), 2, 2))]
    #[regex(r"0[oO][0-7_]+", |lex| parse_int_prefixed(lex.slice(), 8, 2))]
    #[regex(r"0[xX][0-9a-fA-F_]+", |lex| parse_int_prefixed(lex.slice(), 16, 2))]
    #[regex(r"[0-9][0-9_]*", |lex| parse_int_decimal(lex.slice()))]
    Int(Option<IntLiteral>),

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9_]+)?", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9_]+", |lex| lex.slice().to_string())]
    Float(String),

    // Literal text is kept verbatim; only scoping is derived from the token stream.
    #[regex(r#"[rRbBuUfF]?[rRbBuUfF]?"([^"\\\n]|\\.)*""#, |lex| lex.slice().to_string())]
    #[regex(r#"[rRbBuUfF]?[rRbBuUfF]?'([^'\\\n]|\\.)*'"#, |lex| lex.slice().to_string())]
    #[regex(r#"[rRbBuUfF]?[rRbBuUfF]?"""([^"\\]|\\(.|\n)|"[^"\\]|""[^"\\])*""""#, |lex| lex.slice().to_string())]
    #[regex(r#"[rRbBuUfF]?[rRbBuUfF]?'''([^'\\]|\\(.|\n)|'[^'\\]|''[^'\\])*'''"#, |lex| lex.slice().to_string())]
    String(String),

    #[regex(r"[\p{XID_Start}_]\p{XID_Continue}*", |lex| lex.slice().to_string())]
    Ident(String),
}

fn parse_int_decimal(s: &str) -> Option<IntLiteral> {
    Some(IntLiteral {
        radix: 10,
        digits: strip_underscores(s)?,
    })
}

fn parse_int_prefixed(s: &str, radix: u32, prefix_len: usize) -> Option<IntLiteral> {
    let rest = s.get(prefix_len..)?;
    // `0x_ff` is valid: one underscore may follow the prefix.
    let rest = rest.strip_prefix('_').unwrap_or(rest);
    Some(IntLiteral {
        radix,
        digits: strip_underscores(rest)?,
    })
}

fn strip_underscores(s: &str) -> Option<String> {
    if s.is_empty() {
        return None;
    }
    if s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return None;
    }
    Some(s.replace('_', ""))
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    /// Tokenize into logical lines. Newlines inside brackets and after a
    /// backslash do not end a line; indentation changes at the start of a
    /// logical line produce `Indent`/`Dedent`.
    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut indent_stack: Vec<usize> = vec![0];
        let mut brackets: Vec<Token> = Vec::new();
        let mut at_line_start = true;

        let mut lex = RawToken::lexer(self.src);
        while let Some(raw) = lex.next() {
            let range = lex.span();
            let span = span_between(range.start, range.end);

            let kind = match raw {
                Ok(RawToken::Newline) => {
                    if brackets.is_empty() && !at_line_start {
                        tokens.push(Token {
                            kind: TokenKind::Newline,
                            span,
                        });
                        at_line_start = true;
                    }
                    continue;
                }
                // Skipped by their callbacks.
                Ok(RawToken::Comment) | Ok(RawToken::LineContinuation) => continue,

                Ok(RawToken::KwDef) => TokenKind::KwDef,
                Ok(RawToken::KwReturn) => TokenKind::KwReturn,
                Ok(RawToken::KwLambda) => TokenKind::KwLambda,
                Ok(RawToken::KwClass) => TokenKind::KwClass,
                Ok(RawToken::KwImport) => TokenKind::KwImport,
                Ok(RawToken::KwFrom) => TokenKind::KwFrom,
                Ok(RawToken::KwAs) => TokenKind::KwAs,
                Ok(RawToken::KwGlobal) => TokenKind::KwGlobal,
                Ok(RawToken::KwNonlocal) => TokenKind::KwNonlocal,
                Ok(RawToken::KwIf) => TokenKind::KwIf,
                Ok(RawToken::KwElif) => TokenKind::KwElif,
                Ok(RawToken::KwElse) => TokenKind::KwElse,
                Ok(RawToken::KwFor) => TokenKind::KwFor,
                Ok(RawToken::KwIn) => TokenKind::KwIn,
                Ok(RawToken::KwWhile) => TokenKind::KwWhile,
                Ok(RawToken::KwWith) => TokenKind::KwWith,
                Ok(RawToken::KwTry) => TokenKind::KwTry,
                Ok(RawToken::KwExcept) => TokenKind::KwExcept,
                Ok(RawToken::KwFinally) => TokenKind::KwFinally,
                Ok(RawToken::KwPass) => TokenKind::KwPass,
                Ok(RawToken::KwBreak) => TokenKind::KwBreak,
                Ok(RawToken::KwContinue) => TokenKind::KwContinue,
                Ok(RawToken::KwDel) => TokenKind::KwDel,
                Ok(RawToken::KwRaise) => TokenKind::KwRaise,
                Ok(RawToken::KwAssert) => TokenKind::KwAssert,
                Ok(RawToken::KwYield) => TokenKind::KwYield,
                Ok(RawToken::KwAsync) => TokenKind::KwAsync,
                Ok(RawToken::KwAwait) => TokenKind::KwAwait,
                Ok(RawToken::KwNot) => TokenKind::KwNot,
                Ok(RawToken::KwAnd) => TokenKind::KwAnd,
                Ok(RawToken::KwOr) => TokenKind::KwOr,
                Ok(RawToken::KwIs) => TokenKind::KwIs,
                Ok(RawToken::KwTrue) => TokenKind::KwTrue,
                Ok(RawToken::KwFalse) => TokenKind::KwFalse,
                Ok(RawToken::KwNone) => TokenKind::KwNone,

                Ok(RawToken::Arrow) => TokenKind::Arrow,
                Ok(RawToken::Walrus) => TokenKind::Walrus,
                Ok(RawToken::AugAssign(op)) => TokenKind::AugAssign(op),

                Ok(RawToken::EqEq) => TokenKind::EqEq,
                Ok(RawToken::Neq) => TokenKind::Neq,
                Ok(RawToken::Le) => TokenKind::Le,
                Ok(RawToken::Ge) => TokenKind::Ge,
                Ok(RawToken::Shl) => TokenKind::Shl,
                Ok(RawToken::Shr) => TokenKind::Shr,
                Ok(RawToken::Lt) => TokenKind::Lt,
                Ok(RawToken::Gt) => TokenKind::Gt,

                Ok(RawToken::StarStar) => TokenKind::StarStar,
                Ok(RawToken::SlashSlash) => TokenKind::SlashSlash,
                Ok(RawToken::Plus) => TokenKind::Plus,
                Ok(RawToken::Minus) => TokenKind::Minus,
                Ok(RawToken::Star) => TokenKind::Star,
                Ok(RawToken::Slash) => TokenKind::Slash,
                Ok(RawToken::Percent) => TokenKind::Percent,
                Ok(RawToken::At) => TokenKind::At,
                Ok(RawToken::Amp) => TokenKind::Amp,
                Ok(RawToken::Pipe) => TokenKind::Pipe,
                Ok(RawToken::Caret) => TokenKind::Caret,
                Ok(RawToken::Tilde) => TokenKind::Tilde,

                Ok(RawToken::Ellipsis) => TokenKind::Ellipsis,
                Ok(RawToken::Dot) => TokenKind::Dot,

                Ok(RawToken::Colon) => TokenKind::Colon,
                Ok(RawToken::Semicolon) => TokenKind::Semicolon,
                Ok(RawToken::Eq) => TokenKind::Eq,
                Ok(RawToken::Comma) => TokenKind::Comma,

                Ok(RawToken::LParen) => TokenKind::LParen,
                Ok(RawToken::RParen) => TokenKind::RParen,
                Ok(RawToken::LBrace) => TokenKind::LBrace,
                Ok(RawToken::RBrace) => TokenKind::RBrace,
                Ok(RawToken::LBracket) => TokenKind::LBracket,
                Ok(RawToken::RBracket) => TokenKind::RBracket,

                Ok(RawToken::Ident(s)) => TokenKind::Ident(s),
                Ok(RawToken::Int(Some(lit))) => TokenKind::Int(lit),
                Ok(RawToken::Int(None)) => {
                    return Err(LexError {
                        message: "invalid integer literal".to_string(),
                        span,
                    });
                }
                Ok(RawToken::Float(s)) => TokenKind::Float(s),
                Ok(RawToken::String(s)) => TokenKind::String(s),

                Err(_) => {
                    return Err(LexError {
                        message: "unexpected token".to_string(),
                        span,
                    });
                }
            };

            if at_line_start {
                self.indent_line(range.start, &mut indent_stack, &mut tokens)?;
                at_line_start = false;
            }

            if kind.is_open_bracket() {
                brackets.push(Token {
                    kind: kind.clone(),
                    span,
                });
            } else if kind.is_close_bracket() {
                let Some(open) = brackets.pop() else {
                    return Err(LexError {
                        message: "unmatched closing bracket".to_string(),
                        span,
                    });
                };
                let matches = matches!(
                    (&open.kind, &kind),
                    (TokenKind::LParen, TokenKind::RParen)
                        | (TokenKind::LBracket, TokenKind::RBracket)
                        | (TokenKind::LBrace, TokenKind::RBrace)
                );
                if !matches {
                    return Err(LexError {
                        message: "mismatched closing bracket".to_string(),
                        span,
                    });
                }
            }

            tokens.push(Token { kind, span });
        }

        if let Some(open) = brackets.pop() {
            return Err(LexError {
                message: "unclosed bracket".to_string(),
                span: open.span,
            });
        }

        let end = span_between(self.src.len(), self.src.len());
        if !at_line_start {
            tokens.push(Token {
                kind: TokenKind::Newline,
                span: end,
            });
        }

        // Close open indents.
        while indent_stack.len() > 1 {
            indent_stack.pop();
            tokens.push(Token {
                kind: TokenKind::Dedent,
                span: end,
            });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: end,
        });

        Ok(tokens)
    }

    fn indent_line(
        &self,
        token_start: usize,
        indent_stack: &mut Vec<usize>,
        tokens: &mut Vec<Token>,
    ) -> Result<(), LexError> {
        let line_start = self.src[..token_start].rfind('\n').map_or(0, |i| i + 1);
        let prefix = &self.src[line_start..token_start];

        // Reject tabs in indentation (simpler/safer indentation rules).
        if prefix.contains('\t') {
            return Err(LexError {
                message: "tabs are not allowed in indentation; use spaces".to_string(),
                span: span_between(line_start, token_start),
            });
        }

        let width = prefix.len();
        let current_indent = *indent_stack.last().unwrap_or(&0);
        if width > current_indent {
            indent_stack.push(width);
            tokens.push(Token {
                kind: TokenKind::Indent,
                span: span_between(line_start, token_start),
            });
        } else if width < current_indent {
            while let Some(&top) = indent_stack.last() {
                if width >= top {
                    break;
                }
                indent_stack.pop();
                tokens.push(Token {
                    kind: TokenKind::Dedent,
                    span: span_between(line_start, token_start),
                });
            }
            if *indent_stack.last().unwrap_or(&usize::MAX) != width {
                return Err(LexError {
                    message: "inconsistent indentation".to_string(),
                    span: span_between(line_start, token_start),
                });
            }
        }
        Ok(())
    }
}
