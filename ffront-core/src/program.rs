#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

use ffront_ast::{past, Dims, SymbolType, TypeConstraint};
use ffront_itir::{FencilDefinition, FunctionDefinition};
use tracing::{debug, info, trace, warn};

use crate::args::{Argument, CallReport, OffsetProvider};
use crate::callable::GtCallable;
use crate::captured::CapturedVars;
use crate::error::{CallError, ClosureError, FrontendError, FrontendWarning, UnsupportedError};
use crate::program_type_deduction::ProgramTypeDeduction;
use crate::source::{SourceDefinition, SourceExtractor};
use crate::symbols::SymbolNames;
use crate::toolchain::{Externals, Toolchain};
use crate::values::CapturedValue;

/// A typed program. Its fencil is computed on first use and cached for the
/// lifetime of the unit.
#[derive(Clone, Debug)]
pub struct Program {
    past: Arc<past::Program>,
    captured_vars: Arc<CapturedVars>,
    externals: Arc<Externals>,
    backend: Option<String>,
    definition: Option<SourceDefinition>,
    toolchain: Arc<Toolchain>,
    itir: Arc<OnceLock<FencilDefinition>>,
}

impl Program {
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
            .parse_program(&definition, &captured, &externals)?;
        let typed = ProgramTypeDeduction::apply(&parsed)?;

        let mut program = Self::from_past(toolchain, typed, captured, externals, backend);
        program.definition = Some(definition);
        Ok(program)
    }

    pub fn from_past(
        toolchain: Arc<Toolchain>,
        node: past::Program,
        captured_vars: CapturedVars,
        externals: Externals,
        backend: Option<String>,
    ) -> Self {
        Self {
            past: Arc::new(node),
            captured_vars: Arc::new(captured_vars),
            externals: Arc::new(externals),
            backend,
            definition: None,
            toolchain,
            itir: Arc::new(OnceLock::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.past.id
    }

    pub fn past(&self) -> &past::Program {
        &self.past
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

    /// A new unit with its own, empty fencil cache.
    pub fn with_backend(&self, backend: impl Into<String>) -> Self {
        Self {
            backend: Some(backend.into()),
            itir: Arc::new(OnceLock::new()),
            ..self.clone()
        }
    }

    pub fn lower(&self) -> Result<FencilDefinition, FrontendError> {
        if let Some(fencil) = self.itir.get() {
            debug!(program = %self.past.id, "fencil cache hit");
            return Ok(fencil.clone());
        }
        debug!(program = %self.past.id, "fencil cache miss");
        let fencil = self.lower_uncached()?;
        // A concurrent first lowering may have won; both results are equal.
        Ok(self.itir.get_or_init(|| fencil).clone())
    }

    fn lower_uncached(&self) -> Result<FencilDefinition, FrontendError> {
        if !self.externals.is_empty() {
            return Err(UnsupportedError::new("externals are not supported yet").into());
        }

        let mut func_names = BTreeSet::new();
        for sym in &self.past.captured_vars {
            match sym.ty.as_ref().and_then(TypeConstraint::of) {
                Some(TypeConstraint::Function) => {
                    func_names.insert(sym.id.as_str());
                }
                _ => {
                    return Err(ClosureError::UnsupportedClosureKind {
                        message: format!(
                            "only function closure vars are allowed, `{}` has type {}",
                            sym.id,
                            sym.ty.as_ref().map_or_else(|| "None".to_string(), |t| t.to_string())
                        ),
                    }
                    .into());
                }
            }
        }

        let all = self.captured_vars.all();
        let params: BTreeSet<&str> = self.past.params.iter().map(|p| p.id.as_str()).collect();
        let mut referenced = BTreeSet::new();
        for stmt in &self.past.body {
            collect_names(stmt, &mut referenced);
        }
        let undefined: Vec<String> = referenced
            .iter()
            .copied()
            .filter(|name| !params.contains(name) && !func_names.contains(name))
            .chain(func_names.iter().copied().filter(|name| !all.contains_key(name)))
            .map(str::to_string)
            .collect();
        if !undefined.is_empty() {
            return Err(ClosureError::UndefinedSymbolReference { names: undefined }.into());
        }

        let not_callable: Vec<String> = func_names
            .iter()
            .copied()
            .filter(|name| !matches!(all.get(name), Some(CapturedValue::Callable(_))))
            .map(str::to_string)
            .collect();
        if !not_callable.is_empty() {
            return Err(ClosureError::InvalidGtCallable {
                names: not_callable,
            }
            .into());
        }

        let mut flattener = ClosureFlattener::default();
        flattener.visit(&self.captured_vars)?;
        debug!(
            program = %self.past.id,
            definitions = flattener.definitions.len(),
            "flattened captured callables"
        );

        self.toolchain
            .lowering
            .lower_program(&self.past, flattener.definitions)
    }

    /// Positional arguments map one to one onto the parameters; the only
    /// keyword argument accepted is the offset provider, passed separately.
    pub fn call(
        &self,
        args: Vec<Argument>,
        kwargs: BTreeMap<String, Argument>,
        offset_provider: &OffsetProvider,
    ) -> Result<CallReport, FrontendError> {
        let params = &self.past.params;
        if args.len() != params.len() {
            return Err(CallError::ArityMismatch {
                function: self.past.id.clone(),
                expected: params.len(),
                given: args.len(),
            }
            .into());
        }
        if !kwargs.is_empty() {
            return Err(CallError::UnsupportedKeywordArguments {
                names: kwargs.into_keys().collect(),
            }
            .into());
        }

        let mut size_args = Vec::new();
        let mut rewritten = Vec::with_capacity(args.len());
        for (param, arg) in params.iter().zip(args) {
            match (&param.ty, arg) {
                (Some(SymbolType::Scalar(s)), Argument::Scalar(value)) => {
                    rewritten.push(Argument::ConstantField {
                        value,
                        dtype: s.kind,
                    });
                }
                (Some(SymbolType::Field(f)), arg) => {
                    match &arg {
                        Argument::Field(field) => match (&field.shape, &f.dims) {
                            (None, _) => size_args.push(None),
                            (Some(shape), Dims::Any) => {
                                size_args.extend(shape.iter().map(|&n| Some(n)));
                            }
                            (Some(shape), Dims::Known(dims)) => {
                                if shape.len() < dims.len() {
                                    return Err(CallError::ArgumentShape {
                                        param: param.id.clone(),
                                        expected: dims.len(),
                                        given: shape.len(),
                                    }
                                    .into());
                                }
                                size_args.extend(shape[..dims.len()].iter().map(|&n| Some(n)));
                            }
                        },
                        _ => size_args.push(None),
                    }
                    rewritten.push(arg);
                }
                (_, arg) => rewritten.push(arg),
            }
        }

        let fencil = self.lower()?;

        let mut warnings = Vec::new();
        let backend = match &self.backend {
            Some(backend) => backend.clone(),
            None => {
                let config = &self.toolchain.config;
                if config.warn_on_default_backend {
                    let warning = FrontendWarning {
                        message: format!(
                            "field view program `{}`: using default ({}) backend",
                            fencil.id, config.default_backend
                        ),
                    };
                    warn!("{warning}");
                    warnings.push(warning);
                }
                config.default_backend.clone()
            }
        };

        info!(
            program = %self.past.id,
            backend = %backend,
            args = rewritten.len(),
            size_args = size_args.len(),
            "invoking program"
        );
        self.toolchain
            .executor
            .execute(&fencil, &rewritten, &size_args, offset_provider, &backend)?;

        Ok(CallReport { backend, warnings })
    }
}

fn collect_names<'a>(expr: &'a past::Expr, out: &mut BTreeSet<&'a str>) {
    match &expr.kind {
        past::ExprKind::Name(id) => {
            out.insert(id.as_str());
        }
        past::ExprKind::Call { func, args, kwargs } => {
            collect_names(func, out);
            for arg in args.iter().chain(kwargs.iter().map(|(_, v)| v)) {
                collect_names(arg, out);
            }
        }
    }
}

/// Depth-first collection of the IR definitions of every callable reachable
/// through captured variables.
#[derive(Default)]
struct ClosureFlattener {
    definitions: Vec<FunctionDefinition>,
    /// Callables on the current path, by identity.
    path: Vec<(*const (), String)>,
}

impl ClosureFlattener {
    fn visit(&mut self, captured: &CapturedVars) -> Result<(), FrontendError> {
        for (name, value) in captured.all() {
            if value.is_type_only() {
                continue;
            }
            let CapturedValue::Callable(callable) = value else {
                return Err(ClosureError::UnsupportedClosureKind {
                    message: format!(
                        "only function closure vars are allowed, `{name}` is {}",
                        value.describe()
                    ),
                }
                .into());
            };
            self.visit_callable(name, callable)?;
        }
        Ok(())
    }

    fn visit_callable(
        &mut self,
        name: &str,
        callable: &Arc<dyn GtCallable>,
    ) -> Result<(), FrontendError> {
        let identity = Arc::as_ptr(callable) as *const ();
        if let Some(start) = self.path.iter().position(|(id, _)| *id == identity) {
            let mut cycle: Vec<String> = self.path[start..].iter().map(|(_, n)| n.clone()).collect();
            cycle.push(name.to_string());
            return Err(ClosureError::CyclicClosure { path: cycle }.into());
        }

        let definition = callable.gt_itir()?;
        if definition.id != name {
            return Err(ClosureError::ClosureNameMismatch {
                captured: name.to_string(),
                definition: definition.id,
            }
            .into());
        }
        trace!(callable = name, "collected function definition");
        self.definitions.push(definition);

        if let Some(nested) = callable.gt_captured_vars() {
            self.path.push((identity, name.to_string()));
            let result = self.visit(nested);
            self.path.pop();
            result?;
        }
        Ok(())
    }
}
