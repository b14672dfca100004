#![forbid(unsafe_code)]

use std::collections::HashMap;

use ffront_ast::past::{Expr, ExprKind, Program};
use ffront_ast::{SourceLocation, Symbol, SymbolType};
use tracing::{debug, instrument};

use crate::error::TypeDeductionError;
use crate::type_deduction::describe;
use crate::type_info::TypeInfo;

/// Types the calls of a program body. Every call must target a function
/// and bind its result through the `out` keyword.
pub struct ProgramTypeDeduction {
    symtable: HashMap<String, Symbol>,
}

impl ProgramTypeDeduction {
    #[instrument(level = "debug", skip_all, fields(program = %node.id))]
    pub fn apply(node: &Program) -> Result<Program, TypeDeductionError> {
        let symtable = node
            .params
            .iter()
            .chain(node.captured_vars.iter())
            .map(|sym| (sym.id.clone(), sym.clone()))
            .collect();
        let pass = Self { symtable };

        let body = node
            .body
            .iter()
            .map(|stmt| pass.visit_expr(stmt))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(statements = body.len(), "deduced program types");

        Ok(Program {
            id: node.id.clone(),
            params: node.params.clone(),
            body,
            captured_vars: node.captured_vars.clone(),
            location: node.location.clone(),
        })
    }

    fn visit_expr(&self, expr: &Expr) -> Result<Expr, TypeDeductionError> {
        match &expr.kind {
            ExprKind::Name(id) => {
                let ty = self
                    .symtable
                    .get(id)
                    .and_then(|sym| sym.ty.clone())
                    .ok_or_else(|| {
                        TypeDeductionError::new(format!("undeclared symbol `{id}`"), &expr.location)
                    })?;
                Ok(Expr {
                    kind: expr.kind.clone(),
                    ty: Some(ty),
                    location: expr.location.clone(),
                })
            }
            ExprKind::Call { func, args, kwargs } => {
                self.visit_call(func, args, kwargs, &expr.location)
            }
        }
    }

    fn visit_call(
        &self,
        func: &Expr,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        location: &SourceLocation,
    ) -> Result<Expr, TypeDeductionError> {
        let func = self.visit_expr(func)?;
        let args = args
            .iter()
            .map(|a| self.visit_expr(a))
            .collect::<Result<Vec<_>, _>>()?;
        let kwargs = kwargs
            .iter()
            .map(|(k, v)| Ok((k.clone(), self.visit_expr(v)?)))
            .collect::<Result<Vec<_>, TypeDeductionError>>()?;

        let callee = match &func.ty {
            Some(SymbolType::Function(f)) => f,
            other => {
                return Err(TypeDeductionError::new(
                    format!(
                        "expression of type {} is not callable",
                        describe(other.as_ref())
                    ),
                    location,
                ));
            }
        };

        if callee.args.len() != args.len() {
            return Err(TypeDeductionError::new(
                format!(
                    "function takes {} arguments, but {} were given",
                    callee.args.len(),
                    args.len()
                ),
                location,
            ));
        }

        if let Some((name, _)) = kwargs.iter().find(|(k, _)| k != "out") {
            return Err(TypeDeductionError::new(
                format!("only the `out` keyword argument is supported, got `{name}`"),
                location,
            ));
        }
        let Some((_, out)) = kwargs.iter().find(|(k, _)| k == "out") else {
            return Err(TypeDeductionError::new(
                "missing required keyword argument `out`",
                location,
            ));
        };

        let returns = callee.returns.as_ref();
        let out_info = TypeInfo::new(out.ty.as_ref());
        if out_info.is_complete() && TypeInfo::of(returns).is_complete() && out.ty.as_ref() != Some(returns) {
            return Err(TypeDeductionError::new(
                format!(
                    "expected {} to have type {returns}, but got {}",
                    out_name(out),
                    describe(out.ty.as_ref())
                ),
                &out.location,
            ));
        }

        let ty = Some(returns.clone());
        Ok(Expr {
            kind: ExprKind::Call {
                func: Box::new(func),
                args,
                kwargs,
            },
            ty,
            location: location.clone(),
        })
    }
}

fn out_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Name(id) => format!("`{id}`"),
        ExprKind::Call { .. } => "the `out` argument".to_string(),
    }
}
