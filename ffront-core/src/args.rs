#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use ffront_ast::{Dimension, ScalarKind};

use crate::error::FrontendWarning;
use crate::values::ScalarValue;

/// A field passed to a program. `shape` is `None` when the field has no
/// backing storage yet.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldArgument {
    pub dtype: ScalarKind,
    pub shape: Option<Vec<usize>>,
}

impl FieldArgument {
    pub fn new(dtype: ScalarKind, shape: Vec<usize>) -> Self {
        Self {
            dtype,
            shape: Some(shape),
        }
    }

    pub fn unallocated(dtype: ScalarKind) -> Self {
        Self { dtype, shape: None }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Argument {
    Scalar(ScalarValue),
    Field(FieldArgument),
    /// A scalar broadcast to every point of the domain.
    ConstantField { value: ScalarValue, dtype: ScalarKind },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OffsetTarget {
    /// Cartesian shift along an axis.
    Axis(Dimension),
    /// Neighbor table of an unstructured mesh.
    Connectivity {
        origin_axis: Dimension,
        neighbor_axis: Dimension,
        max_neighbors: usize,
    },
}

/// Offset name to the axis or connectivity it resolves to at execution time.
pub type OffsetProvider = BTreeMap<String, OffsetTarget>;

/// Outcome of a successful program invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallReport {
    pub backend: String,
    pub warnings: Vec<FrontendWarning>,
}
