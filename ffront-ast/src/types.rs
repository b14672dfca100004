#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

/// A named axis a field can be indexed over.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dimension(pub String);

impl Dimension {
    pub fn new(name: impl Into<String>) -> Self {
        Dimension(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, ScalarKind::Bool)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScalarType {
    pub kind: ScalarKind,
    pub shape: Option<Vec<usize>>,
}

impl ScalarType {
    pub fn new(kind: ScalarKind) -> Self {
        Self { kind, shape: None }
    }
}

/// Dimensions of a field type. `Any` is the `...` of the DSL: an
/// unconstrained ordered sequence of dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dims {
    Any,
    Known(Vec<Dimension>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldType {
    pub dims: Dims,
    pub dtype: ScalarType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionType {
    pub args: Vec<SymbolType>,
    pub kwargs: BTreeMap<String, SymbolType>,
    pub returns: Box<SymbolType>,
}

impl FunctionType {
    pub fn new(args: Vec<SymbolType>, returns: SymbolType) -> Self {
        Self {
            args,
            kwargs: BTreeMap::new(),
            returns: Box::new(returns),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleType {
    pub types: Vec<SymbolType>,
}

/// Type of an offset token: shifting a field along it replaces `source` by
/// the `target` dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffsetType {
    pub source: Dimension,
    pub target: Vec<Dimension>,
}

/// The kind a deferred type is constrained to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeConstraint {
    /// Any of scalar, field or tuple.
    Data,
    Scalar,
    Field,
    Tuple,
    Function,
    Offset,
    Dimension,
}

impl TypeConstraint {
    pub fn of(ty: &SymbolType) -> Option<TypeConstraint> {
        match ty {
            SymbolType::Deferred(d) => d.constraint,
            SymbolType::Scalar(_) => Some(TypeConstraint::Scalar),
            SymbolType::Field(_) => Some(TypeConstraint::Field),
            SymbolType::Tuple(_) => Some(TypeConstraint::Tuple),
            SymbolType::Function(_) => Some(TypeConstraint::Function),
            SymbolType::Offset(_) => Some(TypeConstraint::Offset),
            SymbolType::Dimension(_) => Some(TypeConstraint::Dimension),
        }
    }

    /// Whether a constraint of kind `other` is at least as specific as `self`.
    pub fn admits_constraint(self, other: TypeConstraint) -> bool {
        match self {
            TypeConstraint::Data => matches!(
                other,
                TypeConstraint::Data
                    | TypeConstraint::Scalar
                    | TypeConstraint::Field
                    | TypeConstraint::Tuple
            ),
            _ => self == other,
        }
    }

    pub fn admits(self, ty: &SymbolType) -> bool {
        match ty {
            SymbolType::Deferred(_) => false,
            complete => TypeConstraint::of(complete).is_some_and(|c| self.admits_constraint(c)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeConstraint::Data => "Data",
            TypeConstraint::Scalar => "Scalar",
            TypeConstraint::Field => "Field",
            TypeConstraint::Tuple => "Tuple",
            TypeConstraint::Function => "Function",
            TypeConstraint::Offset => "Offset",
            TypeConstraint::Dimension => "Dimension",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeferredType {
    pub constraint: Option<TypeConstraint>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolType {
    Deferred(DeferredType),
    Scalar(ScalarType),
    Field(FieldType),
    Tuple(TupleType),
    Function(FunctionType),
    Offset(OffsetType),
    Dimension(Dimension),
}

impl SymbolType {
    pub fn scalar(kind: ScalarKind) -> Self {
        SymbolType::Scalar(ScalarType::new(kind))
    }

    pub fn field(dims: Dims, kind: ScalarKind) -> Self {
        SymbolType::Field(FieldType {
            dims,
            dtype: ScalarType::new(kind),
        })
    }

    pub fn deferred(constraint: Option<TypeConstraint>) -> Self {
        SymbolType::Deferred(DeferredType { constraint })
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, SymbolType::Deferred(_))
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dims::Any => f.write_str("..."),
            Dims::Known(dims) => {
                f.write_str("[")?;
                write_list(f, dims)?;
                f.write_str("]")
            }
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolType::Deferred(d) => match d.constraint {
                Some(c) => write!(f, "Deferred[{}]", c.name()),
                None => f.write_str("Deferred"),
            },
            SymbolType::Scalar(s) => f.write_str(s.kind.name()),
            SymbolType::Field(field) => {
                write!(f, "Field[{}, {}]", field.dims, field.dtype.kind.name())
            }
            SymbolType::Tuple(t) => {
                f.write_str("tuple[")?;
                write_list(f, &t.types)?;
                f.write_str("]")
            }
            SymbolType::Function(func) => {
                f.write_str("(")?;
                write_list(f, &func.args)?;
                write!(f, ") -> {}", func.returns)
            }
            SymbolType::Offset(o) => {
                write!(f, "Offset[{} -> ", o.source)?;
                write_list(f, &o.target)?;
                f.write_str("]")
            }
            SymbolType::Dimension(d) => write!(f, "Dimension[{d}]"),
        }
    }
}
