#![forbid(unsafe_code)]

use std::sync::Arc;

use ffront_ast::{foast, past, FunctionType, Namespace, Symbol, SymbolType};
use ffront_itir::FunctionDefinition;
use tracing::debug;

use crate::args::{Argument, CallReport, OffsetProvider};
use crate::callable::GtCallable;
use crate::captured::CapturedVars;
use crate::error::{ClosureError, FrontendError};
use crate::program::Program;
use crate::program_type_deduction::ProgramTypeDeduction;
use crate::source::{SourceDefinition, SourceExtractor};
use crate::symbols::SymbolNames;
use crate::toolchain::{Externals, Toolchain};
use crate::type_deduction::FieldOperatorTypeDeduction;
use crate::uids::UidGenerator;
use crate::values::CapturedValue;

/// Name of the synthesized parameter a wrapping program writes to.
const OUT_PARAM: &str = "out";

/// A typed field operator together with everything it closes over.
///
/// Units are immutable; `with_backend` returns a new one.
#[derive(Clone, Debug)]
pub struct FieldOperator {
    foast: Arc<foast::FieldOperator>,
    captured_vars: Arc<CapturedVars>,
    externals: Arc<Externals>,
    /// Only used when the operator is called directly.
    backend: Option<String>,
    definition: Option<SourceDefinition>,
    toolchain: Arc<Toolchain>,
}

impl FieldOperator {
    pub fn from_function(
        toolchain: Arc<Toolchain>,
        func: &dyn SourceExtractor,
        externals: Externals,
        backend: Option<String>,
    ) -> Result<Self, FrontendError> {
        let definition = func.source_definition()?;
        let names = SymbolNames::from_source(&definition.source, &definition.filename)?;
        let captured = CapturedVars::resolve(func, &names);

        let parsed = toolchain
            .parser
            .parse_field_operator(&definition, &captured, &externals)?;
        let typed = FieldOperatorTypeDeduction::apply(&parsed)?;

        Ok(Self {
            foast: Arc::new(typed),
            captured_vars: Arc::new(captured),
            externals: Arc::new(externals),
            backend,
            definition: Some(definition),
            toolchain,
        })
    }

    /// Wrap an already typed operator.
    pub fn from_foast(
        toolchain: Arc<Toolchain>,
        node: foast::FieldOperator,
        captured_vars: CapturedVars,
    ) -> Self {
        Self {
            foast: Arc::new(node),
            captured_vars: Arc::new(captured_vars),
            externals: Arc::new(Externals::new()),
            backend: None,
            definition: None,
            toolchain,
        }
    }

    pub fn name(&self) -> &str {
        &self.foast.id
    }

    pub fn foast(&self) -> &foast::FieldOperator {
        &self.foast
    }

    pub fn captured_vars(&self) -> &CapturedVars {
        &self.captured_vars
    }

    pub fn backend(&self) -> Option<&str> {
        self.backend.as_deref()
    }

    pub fn definition(&self) -> Option<&SourceDefinition> {
        self.definition.as_ref()
    }

    pub fn with_backend(&self, backend: impl Into<String>) -> Self {
        Self {
            backend: Some(backend.into()),
            ..self.clone()
        }
    }

    /// Not cached: every call asks the lowering collaborator again.
    pub fn lower(&self) -> Result<FunctionDefinition, FrontendError> {
        debug!(operator = %self.foast.id, "lowering field operator");
        self.toolchain.lowering.lower_field_operator(&self.foast)
    }

    /// Signature from the annotations, falling back to the deduced types.
    pub fn function_type(&self) -> FunctionType {
        let annotations = &self.captured_vars.annotations;
        let args = self
            .foast
            .params
            .iter()
            .map(|p| {
                annotations
                    .get(&p.id)
                    .or(p.ty.as_ref())
                    .cloned()
                    .unwrap_or_else(|| SymbolType::deferred(None))
            })
            .collect();
        let returns = annotations
            .get("return")
            .or_else(|| self.foast.return_type())
            .cloned()
            .unwrap_or_else(|| SymbolType::deferred(None));
        FunctionType::new(args, returns)
    }

    /// A program with one statement, `op(__sym_0, .., out=out)`, that
    /// closes over this operator under its own name.
    pub fn as_program(&self) -> Result<Program, FrontendError> {
        let name = self.name().to_string();
        if self.foast.params.iter().any(|p| p.id == OUT_PARAM) {
            return Err(ClosureError::ReservedParameterName { operator: name }.into());
        }

        let location = self.foast.location.clone();
        let ty = self.function_type();
        let mut uids = UidGenerator::new("__sym");
        let bound = self.captured_vars.all();
        let taken = |id: &str| id == name || id == OUT_PARAM || bound.contains_key(id);

        let mut params: Vec<Symbol> = ty
            .args
            .iter()
            .map(|arg| Symbol::local(uids.fresh_unless(taken), arg.clone(), location.clone()))
            .collect();
        let args = params
            .iter()
            .map(|p| past::Expr::name(p.id.clone(), location.clone()))
            .collect();
        params.push(Symbol::new(
            OUT_PARAM,
            Some((*ty.returns).clone()),
            Namespace::Local,
            location.clone(),
        ));

        let call = past::Expr::call(
            past::Expr::name(name.clone(), location.clone()),
            args,
            vec![(
                OUT_PARAM.to_string(),
                past::Expr::name(OUT_PARAM, location.clone()),
            )],
            location.clone(),
        );
        let untyped = past::Program {
            id: format!("__field_operator_{name}"),
            params,
            body: vec![call],
            captured_vars: vec![Symbol::new(
                name.clone(),
                Some(SymbolType::Function(ty)),
                Namespace::Closure,
                location.clone(),
            )],
            location,
        };
        let typed = ProgramTypeDeduction::apply(&untyped)?;

        let captured = self
            .captured_vars
            .with_global(name, CapturedValue::Callable(Arc::new(self.clone())));

        Ok(Program::from_past(
            Arc::clone(&self.toolchain),
            typed,
            captured,
            (*self.externals).clone(),
            self.backend.clone(),
        ))
    }

    /// Run the operator as if it were called from a program, writing the
    /// result to `out`.
    pub fn call(
        &self,
        args: Vec<Argument>,
        out: Argument,
        offset_provider: &OffsetProvider,
    ) -> Result<CallReport, FrontendError> {
        let mut args = args;
        args.push(out);
        self.as_program()?
            .call(args, Default::default(), offset_provider)
    }
}

impl GtCallable for FieldOperator {
    fn gt_itir(&self) -> Result<FunctionDefinition, FrontendError> {
        self.lower()
    }

    fn gt_captured_vars(&self) -> Option<&CapturedVars> {
        Some(&self.captured_vars)
    }

    fn gt_type(&self) -> Option<FunctionType> {
        Some(self.function_type())
    }
}
