#![forbid(unsafe_code)]

pub mod foast;
mod location;
pub mod past;
mod symbol;
mod types;

pub use location::{span, span_between, SourceLocation, Span};
pub use symbol::{Namespace, Symbol};
pub use types::{
    DeferredType, Dimension, Dims, FieldType, FunctionType, OffsetType, ScalarKind, ScalarType,
    SymbolType, TupleType, TypeConstraint,
};
