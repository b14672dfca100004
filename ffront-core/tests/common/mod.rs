#![allow(dead_code)]

//! In-memory collaborators and fixtures shared by the integration tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use ffront_ast::foast::{self, Stmt};
use ffront_ast::{past, Dimension, Dims, Namespace, ScalarKind, SourceLocation, Symbol, SymbolType};
use ffront_core::error::CollaboratorError;
use ffront_core::symbol_makers::{captured_symbols, symbol_type_from_value};
use ffront_core::{
    Argument, CapturedVars, DialectParser, Externals, FencilExecutor, FieldOperator,
    FieldOperatorTypeDeduction, FrontendConfig, FrontendError, GtCallable, Lowering,
    OffsetProvider, SourceDefinition, Toolchain,
};
use ffront_itir::{Expr as IrExpr, FencilDefinition, FunctionDefinition, StencilClosure, Sym};

pub fn loc(line: u32) -> SourceLocation {
    SourceLocation::new("ops.py", line, 1)
}

pub fn dims(names: &[&str]) -> Dims {
    Dims::Known(names.iter().map(|n| Dimension::new(*n)).collect())
}

pub fn field(names: &[&str], kind: ScalarKind) -> SymbolType {
    SymbolType::field(dims(names), kind)
}

fn def_name(source: &str) -> &str {
    source
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("def "))
        .and_then(|rest| rest.split('(').next())
        .map(str::trim)
        .unwrap_or_default()
}

/// Hands out prepared ASTs by function name, with the closure symbols a
/// real parser would add.
#[derive(Debug, Default)]
pub struct StubParser {
    operators: BTreeMap<String, foast::FieldOperator>,
    programs: BTreeMap<String, past::Program>,
}

impl StubParser {
    pub fn with_operator(mut self, node: foast::FieldOperator) -> Self {
        self.operators.insert(node.id.clone(), node);
        self
    }

    pub fn with_program(mut self, node: past::Program) -> Self {
        self.programs.insert(node.id.clone(), node);
        self
    }
}

impl DialectParser for StubParser {
    fn parse_field_operator(
        &self,
        definition: &SourceDefinition,
        captured: &CapturedVars,
        _externals: &Externals,
    ) -> Result<foast::FieldOperator, FrontendError> {
        let name = def_name(&definition.source);
        let mut node = self.operators.get(name).cloned().ok_or_else(|| {
            CollaboratorError::new("parsing", format!("no field operator named `{name}`"))
        })?;
        node.captured_vars
            .extend(captured_symbols(captured, &node.location));
        Ok(node)
    }

    fn parse_program(
        &self,
        definition: &SourceDefinition,
        captured: &CapturedVars,
        _externals: &Externals,
    ) -> Result<past::Program, FrontendError> {
        let name = def_name(&definition.source);
        let mut node = self.programs.get(name).cloned().ok_or_else(|| {
            CollaboratorError::new("parsing", format!("no program named `{name}`"))
        })?;
        let location = node.location.clone();
        node.captured_vars
            .extend(captured.all().into_iter().map(|(name, value)| {
                Symbol::new(
                    name,
                    symbol_type_from_value(value),
                    Namespace::Closure,
                    location.clone(),
                )
            }));
        Ok(node)
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoweringLog {
    pub operators: Arc<AtomicUsize>,
    pub programs: Arc<AtomicUsize>,
}

impl LoweringLog {
    pub fn operator_count(&self) -> usize {
        self.operators.load(Ordering::SeqCst)
    }

    pub fn program_count(&self) -> usize {
        self.programs.load(Ordering::SeqCst)
    }
}

/// Lowers every operator to `λ(params) → deref(first param)` and every
/// program call to one stencil closure.
#[derive(Debug, Default)]
pub struct RecordingLowering {
    pub log: LoweringLog,
}

fn name_of(expr: &past::Expr) -> Option<String> {
    match &expr.kind {
        past::ExprKind::Name(id) => Some(id.clone()),
        past::ExprKind::Call { .. } => None,
    }
}

impl Lowering for RecordingLowering {
    fn lower_field_operator(
        &self,
        node: &foast::FieldOperator,
    ) -> Result<FunctionDefinition, FrontendError> {
        self.log.operators.fetch_add(1, Ordering::SeqCst);
        let params: Vec<Sym> = node.params.iter().map(|p| Sym::new(p.id.clone())).collect();
        let expr = match params.first() {
            Some(p) => IrExpr::call("deref", vec![IrExpr::sym_ref(p.id.clone())]),
            None => IrExpr::Literal {
                value: "0".into(),
                ty: "int64".into(),
            },
        };
        Ok(FunctionDefinition {
            id: node.id.clone(),
            params,
            expr,
        })
    }

    fn lower_program(
        &self,
        node: &past::Program,
        function_definitions: Vec<FunctionDefinition>,
    ) -> Result<FencilDefinition, FrontendError> {
        self.log.programs.fetch_add(1, Ordering::SeqCst);
        let closures = node
            .body
            .iter()
            .filter_map(|stmt| match &stmt.kind {
                past::ExprKind::Call { func, args, kwargs } => {
                    let callee = name_of(func)?;
                    let output = kwargs
                        .iter()
                        .find(|(k, _)| k == "out")
                        .and_then(|(_, v)| name_of(v))?;
                    Some(StencilClosure {
                        domain: IrExpr::call("domain", vec![]),
                        stencil: IrExpr::sym_ref(callee),
                        output: IrExpr::sym_ref(output),
                        inputs: args.iter().filter_map(name_of).map(IrExpr::sym_ref).collect(),
                    })
                }
                past::ExprKind::Name(_) => None,
            })
            .collect();
        Ok(FencilDefinition {
            id: node.id.clone(),
            function_definitions,
            params: node.params.iter().map(|p| Sym::new(p.id.clone())).collect(),
            closures,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    pub fencil: FencilDefinition,
    pub args: Vec<Argument>,
    pub size_args: Vec<Option<usize>>,
    pub offsets: Vec<String>,
    pub backend: String,
}

#[derive(Clone, Debug, Default)]
pub struct ExecutionLog(Arc<Mutex<Vec<Execution>>>);

impl ExecutionLog {
    pub fn runs(&self) -> Vec<Execution> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Debug, Default)]
pub struct RecordingExecutor {
    pub log: ExecutionLog,
}

impl FencilExecutor for RecordingExecutor {
    fn execute(
        &self,
        fencil: &FencilDefinition,
        args: &[Argument],
        size_args: &[Option<usize>],
        offset_provider: &OffsetProvider,
        backend: &str,
    ) -> Result<(), FrontendError> {
        self.log.0.lock().unwrap().push(Execution {
            fencil: fencil.clone(),
            args: args.to_vec(),
            size_args: size_args.to_vec(),
            offsets: offset_provider.keys().cloned().collect(),
            backend: backend.to_string(),
        });
        Ok(())
    }
}

pub struct Harness {
    pub toolchain: Arc<Toolchain>,
    pub lowering: LoweringLog,
    pub executions: ExecutionLog,
}

pub fn harness(parser: StubParser) -> Harness {
    harness_with_config(parser, FrontendConfig::default())
}

pub fn harness_with_config(parser: StubParser, config: FrontendConfig) -> Harness {
    let lowering = RecordingLowering::default();
    let executor = RecordingExecutor::default();
    let lowering_log = lowering.log.clone();
    let executions = executor.log.clone();
    Harness {
        toolchain: Arc::new(Toolchain::new(parser, lowering, executor).with_config(config)),
        lowering: lowering_log,
        executions,
    }
}

/// `def <id>(a: Field[[I], float64]) -> Field[[I], float64]: return a`
pub fn identity_operator(id: &str) -> foast::FieldOperator {
    foast::FieldOperator {
        id: id.into(),
        params: vec![Symbol::local("a", field(&["I"], ScalarKind::Float64), loc(1))],
        body: vec![Stmt::Return {
            value: foast::Expr::name("a", loc(2)),
            location: loc(2),
        }],
        captured_vars: vec![],
        location: loc(1),
    }
}

pub fn typed_operator(
    harness: &Harness,
    node: foast::FieldOperator,
    captured: CapturedVars,
) -> FieldOperator {
    let typed = FieldOperatorTypeDeduction::apply(&node).unwrap();
    FieldOperator::from_foast(Arc::clone(&harness.toolchain), typed, captured)
}

/// `def <id>(inp, out): <callee>(inp, out=out)` closing over `callee`.
pub fn program_calling(id: &str, callee: &str, callee_ty: Option<SymbolType>) -> past::Program {
    past::Program {
        id: id.into(),
        params: vec![
            Symbol::local("inp", field(&["I"], ScalarKind::Float64), loc(1)),
            Symbol::local("out", field(&["I"], ScalarKind::Float64), loc(1)),
        ],
        body: vec![past::Expr::call(
            past::Expr::name(callee, loc(2)),
            vec![past::Expr::name("inp", loc(2))],
            vec![("out".into(), past::Expr::name("out", loc(2)))],
            loc(2),
        )],
        captured_vars: callee_ty
            .map(|ty| vec![Symbol::new(callee, Some(ty), Namespace::Closure, loc(1))])
            .unwrap_or_default(),
        location: loc(1),
    }
}

/// A callable whose captured variables are set after construction, so
/// tests can build closure graphs of any shape.
#[derive(Debug)]
pub struct LateBoundCallable {
    pub id: String,
    pub captured: OnceLock<CapturedVars>,
}

impl LateBoundCallable {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            captured: OnceLock::new(),
        })
    }
}

impl GtCallable for LateBoundCallable {
    fn gt_itir(&self) -> Result<FunctionDefinition, FrontendError> {
        Ok(FunctionDefinition {
            id: self.id.clone(),
            params: vec![Sym::new("x")],
            expr: IrExpr::call("deref", vec![IrExpr::sym_ref("x")]),
        })
    }

    fn gt_captured_vars(&self) -> Option<&CapturedVars> {
        self.captured.get()
    }
}
