#![forbid(unsafe_code)]

//! Seams to the parser, the lowering visitors and the execution backends.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ffront_ast::{foast, past};
use ffront_itir::{FencilDefinition, FunctionDefinition};

use crate::args::{Argument, OffsetProvider};
use crate::captured::CapturedVars;
use crate::config::FrontendConfig;
use crate::error::FrontendError;
use crate::operator::FieldOperator;
use crate::program::Program;
use crate::source::{SourceDefinition, SourceExtractor};
use crate::values::CapturedValue;

/// Definitions injected from outside the function's own scope.
pub type Externals = BTreeMap<String, CapturedValue>;

/// Turns source text into untyped ASTs. Every emitted expression carries a
/// location and `ty == None` except literals.
pub trait DialectParser: fmt::Debug + Send + Sync {
    fn parse_field_operator(
        &self,
        definition: &SourceDefinition,
        captured: &CapturedVars,
        externals: &Externals,
    ) -> Result<foast::FieldOperator, FrontendError>;

    fn parse_program(
        &self,
        definition: &SourceDefinition,
        captured: &CapturedVars,
        externals: &Externals,
    ) -> Result<past::Program, FrontendError>;
}

/// Node-by-node translation of typed ASTs into the iterator IR.
pub trait Lowering: fmt::Debug + Send + Sync {
    fn lower_field_operator(
        &self,
        node: &foast::FieldOperator,
    ) -> Result<FunctionDefinition, FrontendError>;

    fn lower_program(
        &self,
        node: &past::Program,
        function_definitions: Vec<FunctionDefinition>,
    ) -> Result<FencilDefinition, FrontendError>;
}

/// Runs a fencil. Results are written into the output argument.
pub trait FencilExecutor: fmt::Debug + Send + Sync {
    fn execute(
        &self,
        fencil: &FencilDefinition,
        args: &[Argument],
        size_args: &[Option<usize>],
        offset_provider: &OffsetProvider,
        backend: &str,
    ) -> Result<(), FrontendError>;
}

/// The collaborators every unit needs, shared by all units built from it.
#[derive(Debug)]
pub struct Toolchain {
    pub parser: Box<dyn DialectParser>,
    pub lowering: Box<dyn Lowering>,
    pub executor: Box<dyn FencilExecutor>,
    pub config: FrontendConfig,
}

impl Toolchain {
    pub fn new(
        parser: impl DialectParser + 'static,
        lowering: impl Lowering + 'static,
        executor: impl FencilExecutor + 'static,
    ) -> Self {
        Self {
            parser: Box::new(parser),
            lowering: Box::new(lowering),
            executor: Box::new(executor),
            config: FrontendConfig::default(),
        }
    }

    pub fn with_config(mut self, config: FrontendConfig) -> Self {
        self.config = config;
        self
    }

    /// Equivalent of decorating `func` as a field operator.
    pub fn field_operator(
        self: &Arc<Self>,
        func: &dyn SourceExtractor,
        externals: Externals,
        backend: Option<String>,
    ) -> Result<FieldOperator, FrontendError> {
        FieldOperator::from_function(Arc::clone(self), func, externals, backend)
    }

    /// Equivalent of decorating `func` as a program.
    pub fn program(
        self: &Arc<Self>,
        func: &dyn SourceExtractor,
        externals: Externals,
        backend: Option<String>,
    ) -> Result<Program, FrontendError> {
        Program::from_function(Arc::clone(self), func, externals, backend)
    }
}
