#![forbid(unsafe_code)]

//! Program AST. A program body is a sequence of calls to field operators.

use crate::{SourceLocation, Symbol, SymbolType};

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Option<SymbolType>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Name(String),
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
}

impl Expr {
    pub fn name(id: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind: ExprKind::Name(id.into()),
            ty: None,
            location,
        }
    }

    pub fn call(
        func: Expr,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
        location: SourceLocation,
    ) -> Self {
        Self {
            kind: ExprKind::Call {
                func: Box::new(func),
                args,
                kwargs,
            },
            ty: None,
            location,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub id: String,
    pub params: Vec<Symbol>,
    pub body: Vec<Expr>,
    pub captured_vars: Vec<Symbol>,
    pub location: SourceLocation,
}
