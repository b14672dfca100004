#![forbid(unsafe_code)]

//! Field-view frontend: name classification, captured environments, type
//! deduction, and assembly of operators and programs into iterator IR.

pub mod args;
pub mod builtins;
pub mod callable;
pub mod captured;
pub mod config;
pub mod error;
pub mod operator;
pub mod program;
pub mod program_type_deduction;
pub mod source;
pub mod symbol_makers;
pub mod symbols;
pub mod toolchain;
pub mod type_deduction;
pub mod type_info;
pub mod uids;
pub mod values;

pub use args::{Argument, CallReport, FieldArgument, OffsetProvider, OffsetTarget};
pub use builtins::BuiltinFunction;
pub use callable::GtCallable;
pub use captured::CapturedVars;
pub use config::FrontendConfig;
pub use error::{
    CallError, ClosureError, ConfigError, FrontendError, FrontendWarning, TypeDeductionError,
};
pub use operator::FieldOperator;
pub use program::Program;
pub use program_type_deduction::ProgramTypeDeduction;
pub use source::{HostFunction, SourceDefinition, SourceExtractor};
pub use symbols::{SymbolKind, SymbolNames};
pub use toolchain::{DialectParser, Externals, FencilExecutor, Lowering, Toolchain};
pub use type_deduction::FieldOperatorTypeDeduction;
pub use type_info::TypeInfo;
pub use uids::UidGenerator;
pub use values::{CapturedValue, FieldOffset, ScalarValue};
