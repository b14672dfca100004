#![forbid(unsafe_code)]

//! Type deduction for field operators.
//!
//! Types are computed bottom-up. Symbols live in one table for the whole
//! pass; an assignment refines its target's entry to the value's type.

use std::collections::HashMap;

use ffront_ast::foast::{
    BinaryOperator, CompareOperator, Expr, ExprKind, FieldOperator, Stmt, UnaryOperator,
};
use ffront_ast::{Dims, FieldType, SourceLocation, Symbol, SymbolType, TupleType};
use tracing::{debug, instrument};

use crate::error::TypeDeductionError;
use crate::type_info::{are_broadcast_compatible, boolified_type, broadcast_types, TypeInfo};

#[derive(Clone, Copy, Debug, Default)]
struct VisitContext {
    /// Inside the arguments of a shift: subscripts are offsets.
    in_shift: bool,
}

pub struct FieldOperatorTypeDeduction {
    symtable: HashMap<String, Symbol>,
}

pub(crate) fn describe(ty: Option<&SymbolType>) -> String {
    ty.map_or_else(|| "None".to_string(), |t| t.to_string())
}

impl FieldOperatorTypeDeduction {
    /// Type every expression of `node`. Fails on the first ill-typed node.
    #[instrument(level = "debug", skip_all, fields(operator = %node.id))]
    pub fn apply(node: &FieldOperator) -> Result<FieldOperator, TypeDeductionError> {
        let symtable = node
            .declarations()
            .into_iter()
            .map(|sym| (sym.id.clone(), sym.clone()))
            .collect();
        let mut pass = Self { symtable };

        let body = node
            .body
            .iter()
            .map(|stmt| pass.visit_stmt(stmt))
            .collect::<Result<Vec<_>, _>>()?;

        let typed = FieldOperator {
            id: node.id.clone(),
            params: node.params.clone(),
            body,
            captured_vars: node.captured_vars.clone(),
            location: node.location.clone(),
        };
        debug!(returns = %describe(typed.return_type()), "deduced field operator types");
        Ok(typed)
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<Stmt, TypeDeductionError> {
        match stmt {
            Stmt::Assign {
                target,
                value,
                location,
            } => {
                let value = if TypeInfo::new(value.ty.as_ref()).is_complete() {
                    value.clone()
                } else {
                    self.visit_expr(value, VisitContext::default())?
                };
                let target = self.visit_symbol(target, value.ty.as_ref())?;
                Ok(Stmt::Assign {
                    target,
                    value,
                    location: location.clone(),
                })
            }
            Stmt::Return { value, location } => Ok(Stmt::Return {
                value: self.visit_expr(value, VisitContext::default())?,
                location: location.clone(),
            }),
            Stmt::ExternalImport { .. } => Ok(stmt.clone()),
        }
    }

    fn visit_symbol(
        &mut self,
        symbol: &Symbol,
        refine_type: Option<&SymbolType>,
    ) -> Result<Symbol, TypeDeductionError> {
        let Some(refine_type) = refine_type else {
            return Ok(symbol.clone());
        };
        if !TypeInfo::new(symbol.ty.as_ref()).can_be_refined_to(TypeInfo::of(refine_type)) {
            return Err(TypeDeductionError::new(
                format!(
                    "type inconsistency: expression was deduced to be of type {refine_type}, instead of the expected type {}",
                    describe(symbol.ty.as_ref())
                ),
                &symbol.location,
            ));
        }
        let refined = symbol.with_type(refine_type.clone());
        self.symtable.insert(refined.id.clone(), refined.clone());
        Ok(refined)
    }

    fn visit_expr(&mut self, expr: &Expr, ctx: VisitContext) -> Result<Expr, TypeDeductionError> {
        let location = &expr.location;
        match &expr.kind {
            ExprKind::Name(id) => {
                let ty = self
                    .symtable
                    .get(id)
                    .and_then(|sym| sym.ty.clone())
                    .ok_or_else(|| {
                        TypeDeductionError::new(format!("undeclared symbol `{id}`"), location)
                    })?;
                Ok(Expr::typed(expr.kind.clone(), Some(ty), location.clone()))
            }
            ExprKind::Constant { value } => {
                if expr.ty.is_none() {
                    return Err(TypeDeductionError::new(
                        format!("unrecognized literal type of constant `{value}`"),
                        location,
                    ));
                }
                Ok(expr.clone())
            }
            ExprKind::Subscript { value, index } => {
                let value = self.visit_expr(value, ctx)?;
                let ty = if ctx.in_shift {
                    value.ty.clone()
                } else {
                    match &value.ty {
                        Some(SymbolType::Tuple(t)) => Some(tuple_element(t, *index, &value.location)?),
                        _ => {
                            return Err(TypeDeductionError::new(
                                "could not deduce type of subscript expression",
                                &value.location,
                            ));
                        }
                    }
                };
                Ok(Expr::typed(
                    ExprKind::Subscript {
                        value: Box::new(value),
                        index: *index,
                    },
                    ty,
                    location.clone(),
                ))
            }
            ExprKind::BinOp { op, left, right } => {
                let left = self.visit_expr(left, ctx)?;
                let right = self.visit_expr(right, ctx)?;
                let ty = deduce_binop_type(*op, left.ty.as_ref(), right.ty.as_ref(), location)?;
                Ok(Expr::typed(
                    ExprKind::BinOp {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    ty,
                    location.clone(),
                ))
            }
            ExprKind::Compare { op, left, right } => {
                let left = self.visit_expr(left, ctx)?;
                let right = self.visit_expr(right, ctx)?;
                let ty = deduce_compare_type(*op, left.ty.as_ref(), right.ty.as_ref(), location)?;
                Ok(Expr::typed(
                    ExprKind::Compare {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    ty,
                    location.clone(),
                ))
            }
            ExprKind::UnaryOp { op, operand } => {
                let operand = self.visit_expr(operand, ctx)?;
                let info = TypeInfo::new(operand.ty.as_ref());
                let compatible = match op {
                    UnaryOperator::UAdd | UnaryOperator::USub => info.is_arithmetic_compatible(),
                    UnaryOperator::Not => info.is_logics_compatible(),
                };
                if !compatible {
                    return Err(TypeDeductionError::new(
                        format!(
                            "incompatible type for unary operator '{op}': {}",
                            describe(operand.ty.as_ref())
                        ),
                        location,
                    ));
                }
                let ty = operand.ty.clone();
                Ok(Expr::typed(
                    ExprKind::UnaryOp {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    ty,
                    location.clone(),
                ))
            }
            ExprKind::TupleExpr { elts } => {
                let elts = elts
                    .iter()
                    .map(|e| self.visit_expr(e, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                // An element of unknown type leaves the tuple unknown.
                let ty = elts
                    .iter()
                    .map(|e| e.ty.clone())
                    .collect::<Option<Vec<_>>>()
                    .map(|types| SymbolType::Tuple(TupleType { types }));
                Ok(Expr::typed(ExprKind::TupleExpr { elts }, ty, location.clone()))
            }
            ExprKind::Call { func, args } => self.visit_call(func, args, ctx, location),
        }
    }

    fn visit_call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        ctx: VisitContext,
        location: &SourceLocation,
    ) -> Result<Expr, TypeDeductionError> {
        let func = self.visit_expr(func, ctx)?;
        match &func.ty {
            Some(SymbolType::Field(field)) => {
                let shift_ctx = VisitContext { in_shift: true };
                let args = args
                    .iter()
                    .map(|a| self.visit_expr(a, shift_ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                let ty = shifted_type(&func, field, &args, location)?;
                Ok(Expr::typed(
                    ExprKind::Call {
                        func: Box::new(func),
                        args,
                    },
                    Some(ty),
                    location.clone(),
                ))
            }
            Some(SymbolType::Function(function)) => {
                let returns = (*function.returns).clone();
                let args = args
                    .iter()
                    .map(|a| self.visit_expr(a, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::typed(
                    ExprKind::Call {
                        func: Box::new(func),
                        args,
                    },
                    Some(returns),
                    location.clone(),
                ))
            }
            other => Err(TypeDeductionError::new(
                format!(
                    "expression {} of type {} is not callable",
                    expr_name(&func),
                    describe(other.as_ref())
                ),
                location,
            )),
        }
    }
}

fn expr_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Name(id) => format!("`{id}`"),
        _ => "<expr>".to_string(),
    }
}

fn tuple_element(
    tuple: &TupleType,
    index: i64,
    location: &SourceLocation,
) -> Result<SymbolType, TypeDeductionError> {
    let len = tuple.types.len() as i64;
    let resolved = if index < 0 { len + index } else { index };
    usize::try_from(resolved)
        .ok()
        .and_then(|i| tuple.types.get(i))
        .cloned()
        .ok_or_else(|| {
            TypeDeductionError::new(
                format!("tuple index {index} out of range for a tuple of {len} elements"),
                location,
            )
        })
}

/// Type of `field(offset)`: the offset's source dimension is replaced in
/// place by its targets.
fn shifted_type(
    func: &Expr,
    field: &FieldType,
    args: &[Expr],
    location: &SourceLocation,
) -> Result<SymbolType, TypeDeductionError> {
    let offset = match args {
        [arg] => match &arg.ty {
            Some(SymbolType::Offset(offset)) => offset,
            other => {
                return Err(TypeDeductionError::new(
                    format!(
                        "shift of {} expects an offset, got {}",
                        expr_name(func),
                        describe(other.as_ref())
                    ),
                    &arg.location,
                ));
            }
        },
        _ => {
            return Err(TypeDeductionError::new(
                format!(
                    "shift of {} takes exactly one offset argument, got {}",
                    expr_name(func),
                    args.len()
                ),
                location,
            ));
        }
    };

    let dims = match &field.dims {
        Dims::Any => Dims::Any,
        Dims::Known(dims) if dims.is_empty() => Dims::Known(Vec::new()),
        Dims::Known(dims) => {
            if !dims.contains(&offset.source) {
                return Err(TypeDeductionError::new(
                    format!(
                        "incompatible offset at {}: can not shift from {} to {}",
                        expr_name(func),
                        offset.source,
                        dims[0]
                    ),
                    location,
                ));
            }
            let mut shifted = Vec::with_capacity(dims.len() + offset.target.len());
            for d in dims {
                if *d == offset.source {
                    shifted.extend(offset.target.iter().cloned());
                } else {
                    shifted.push(d.clone());
                }
            }
            Dims::Known(shifted)
        }
    };

    Ok(SymbolType::Field(FieldType {
        dims,
        dtype: field.dtype.clone(),
    }))
}

fn incompatible_operands(
    op: impl std::fmt::Display,
    left: Option<&SymbolType>,
    right: Option<&SymbolType>,
    location: &SourceLocation,
) -> TypeDeductionError {
    TypeDeductionError::new(
        format!(
            "incompatible type(s) for operator '{op}': {}, {}",
            describe(left),
            describe(right)
        ),
        location,
    )
}

fn deduce_binop_type(
    op: BinaryOperator,
    left: Option<&SymbolType>,
    right: Option<&SymbolType>,
    location: &SourceLocation,
) -> Result<Option<SymbolType>, TypeDeductionError> {
    // Unknown operands keep the result unknown.
    if left.is_none() || right.is_none() {
        return Ok(None);
    }
    let (l, r) = (TypeInfo::new(left), TypeInfo::new(right));
    let operands_ok = if op.is_arithmetic() {
        l.is_arithmetic_compatible() && r.is_arithmetic_compatible()
    } else {
        l.is_logics_compatible() && r.is_logics_compatible()
    };
    if operands_ok && are_broadcast_compatible(l, r) {
        if let Some(result) = broadcast_types(l, r) {
            return Ok(result.ty().cloned());
        }
    }
    Err(incompatible_operands(op, left, right, location))
}

fn deduce_compare_type(
    op: CompareOperator,
    left: Option<&SymbolType>,
    right: Option<&SymbolType>,
    location: &SourceLocation,
) -> Result<Option<SymbolType>, TypeDeductionError> {
    let (l, r) = (TypeInfo::new(left), TypeInfo::new(right));
    if !l.is_arithmetic_compatible() || !r.is_arithmetic_compatible() {
        return Err(incompatible_operands(op, left, right, location));
    }
    if left.is_none() || right.is_none() {
        return Ok(None);
    }
    // Operand dtypes must agree before both sides become boolean.
    if !are_broadcast_compatible(l, r) {
        return Err(incompatible_operands(op, left, right, location));
    }
    let (Some(lb), Some(rb)) = (boolified_type(l), boolified_type(r)) else {
        return Err(incompatible_operands(op, left, right, location));
    };
    match broadcast_types(TypeInfo::of(&lb), TypeInfo::of(&rb)) {
        Some(result) => Ok(result.ty().cloned()),
        None => Err(incompatible_operands(op, left, right, location)),
    }
}
