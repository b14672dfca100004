#![forbid(unsafe_code)]

//! Runtime values a DSL function can close over.

use std::fmt;
use std::sync::Arc;

use ffront_ast::{Dimension, ScalarKind};

use crate::builtins::BuiltinFunction;
use crate::callable::GtCallable;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

impl ScalarValue {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarValue::Bool(_) => ScalarKind::Bool,
            ScalarValue::Int32(_) => ScalarKind::Int32,
            ScalarValue::Int64(_) => ScalarKind::Int64,
            ScalarValue::Float32(_) => ScalarKind::Float32,
            ScalarValue::Float64(_) => ScalarKind::Float64,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(v) => write!(f, "{v}"),
            ScalarValue::Int32(v) => write!(f, "{v}"),
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::Float32(v) => write!(f, "{v}"),
            ScalarValue::Float64(v) => write!(f, "{v}"),
        }
    }
}

/// An offset token, e.g. `V2E = FieldOffset("V2E", source=Edge, target=(Vertex, V2EDim))`.
/// Offsets only carry type information for the frontend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldOffset {
    pub value: String,
    pub source: Dimension,
    pub target: Vec<Dimension>,
}

#[derive(Clone, Debug)]
pub enum CapturedValue {
    Callable(Arc<dyn GtCallable>),
    Offset(FieldOffset),
    Dimension(Dimension),
    Builtin(BuiltinFunction),
    /// A type-constructor builtin such as `float64`.
    TypeConstructor(ScalarKind),
    Scalar(ScalarValue),
    /// Any other host value, described for diagnostics.
    Opaque(String),
}

impl CapturedValue {
    pub fn callable(value: impl GtCallable + 'static) -> Self {
        CapturedValue::Callable(Arc::new(value))
    }

    /// Values that only contribute type information.
    pub fn is_type_only(&self) -> bool {
        matches!(
            self,
            CapturedValue::Offset(_)
                | CapturedValue::Dimension(_)
                | CapturedValue::Builtin(_)
                | CapturedValue::TypeConstructor(_)
        )
    }

    pub fn describe(&self) -> String {
        match self {
            CapturedValue::Callable(_) => "gt callable".to_string(),
            CapturedValue::Offset(o) => format!("offset `{}`", o.value),
            CapturedValue::Dimension(d) => format!("dimension `{d}`"),
            CapturedValue::Builtin(b) => format!("builtin `{b}`"),
            CapturedValue::TypeConstructor(k) => format!("type `{}`", k.name()),
            CapturedValue::Scalar(v) => format!("{} `{v}`", v.kind().name()),
            CapturedValue::Opaque(desc) => desc.clone(),
        }
    }
}
