#![forbid(unsafe_code)]

//! Field operator AST.
//!
//! Nodes are values: passes build new nodes instead of mutating. Every
//! expression carries `ty`, which stays `None` until type deduction ran.

use std::fmt;

use crate::{SourceLocation, Symbol, SymbolType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mult,
    Div,
    BitAnd,
    BitOr,
}

impl BinaryOperator {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Mult | BinaryOperator::Div
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mult => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOperator::Eq => "==",
            CompareOperator::NotEq => "!=",
            CompareOperator::Lt => "<",
            CompareOperator::LtE => "<=",
            CompareOperator::Gt => ">",
            CompareOperator::GtE => ">=",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    UAdd,
    USub,
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOperator::UAdd => "+",
            UnaryOperator::USub => "-",
            UnaryOperator::Not => "not",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Option<SymbolType>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Name(String),
    /// Literal; `ty` is set by the parser from the literal's classification.
    Constant {
        value: String,
    },
    /// `value[index]`: tuple element access, or an offset inside a shift.
    Subscript {
        value: Box<Expr>,
        index: i64,
    },
    BinOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    TupleExpr {
        elts: Vec<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        Self {
            kind,
            ty: None,
            location,
        }
    }

    pub fn typed(kind: ExprKind, ty: Option<SymbolType>, location: SourceLocation) -> Self {
        Self { kind, ty, location }
    }

    pub fn name(id: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ExprKind::Name(id.into()), location)
    }

    pub fn constant(value: impl Into<String>, ty: SymbolType, location: SourceLocation) -> Self {
        Self::typed(
            ExprKind::Constant {
                value: value.into(),
            },
            Some(ty),
            location,
        )
    }

    pub fn subscript(value: Expr, index: i64, location: SourceLocation) -> Self {
        Self::new(
            ExprKind::Subscript {
                value: Box::new(value),
                index,
            },
            location,
        )
    }

    pub fn binop(op: BinaryOperator, left: Expr, right: Expr, location: SourceLocation) -> Self {
        Self::new(
            ExprKind::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            location,
        )
    }

    pub fn compare(op: CompareOperator, left: Expr, right: Expr, location: SourceLocation) -> Self {
        Self::new(
            ExprKind::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            location,
        )
    }

    pub fn unary(op: UnaryOperator, operand: Expr, location: SourceLocation) -> Self {
        Self::new(
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            location,
        )
    }

    pub fn tuple(elts: Vec<Expr>, location: SourceLocation) -> Self {
        Self::new(ExprKind::TupleExpr { elts }, location)
    }

    pub fn call(func: Expr, args: Vec<Expr>, location: SourceLocation) -> Self {
        Self::new(
            ExprKind::Call {
                func: Box::new(func),
                args,
            },
            location,
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Assign {
        target: Symbol,
        value: Expr,
        location: SourceLocation,
    },
    Return {
        value: Expr,
        location: SourceLocation,
    },
    ExternalImport {
        symbols: Vec<Symbol>,
        location: SourceLocation,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldOperator {
    pub id: String,
    pub params: Vec<Symbol>,
    pub body: Vec<Stmt>,
    pub captured_vars: Vec<Symbol>,
    pub location: SourceLocation,
}

impl FieldOperator {
    /// Type of the value returned by the last `return` statement.
    pub fn return_type(&self) -> Option<&SymbolType> {
        self.body.iter().rev().find_map(|stmt| match stmt {
            Stmt::Return { value, .. } => value.ty.as_ref(),
            _ => None,
        })
    }

    /// Every symbol declared by this operator, in declaration order.
    pub fn declarations(&self) -> Vec<&Symbol> {
        let mut out: Vec<&Symbol> = self.params.iter().chain(self.captured_vars.iter()).collect();
        for stmt in &self.body {
            match stmt {
                Stmt::Assign { target, .. } => out.push(target),
                Stmt::ExternalImport { symbols, .. } => out.extend(symbols.iter()),
                Stmt::Return { .. } => {}
            }
        }
        out
    }
}
