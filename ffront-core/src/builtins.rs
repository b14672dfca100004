#![forbid(unsafe_code)]

//! Names the DSL provides without an import.

use std::collections::BTreeMap;
use std::fmt;

use ffront_ast::{FunctionType, ScalarKind, SymbolType, TypeConstraint};

pub const TYPE_BUILTIN_NAMES: &[&str] = &[
    "bool", "int", "int32", "int64", "float", "float32", "float64", "tuple",
];

pub const FUN_BUILTIN_NAMES: &[&str] = &["neighbor_sum", "max_over", "min_over", "broadcast", "where"];

pub const EXTRA_BUILTIN_NAMES: &[&str] = &["Field", "Dimension", "FieldOffset"];

pub fn is_builtin_name(name: &str) -> bool {
    TYPE_BUILTIN_NAMES
        .iter()
        .chain(FUN_BUILTIN_NAMES)
        .chain(EXTRA_BUILTIN_NAMES)
        .any(|n| *n == name)
}

/// Scalar kind a type-constructor builtin produces. `tuple` has none.
pub fn scalar_kind_for_type_builtin(name: &str) -> Option<ScalarKind> {
    match name {
        "bool" => Some(ScalarKind::Bool),
        "int32" => Some(ScalarKind::Int32),
        "int" | "int64" => Some(ScalarKind::Int64),
        "float32" => Some(ScalarKind::Float32),
        "float" | "float64" => Some(ScalarKind::Float64),
        _ => None,
    }
}

/// `(Deferred[Scalar]) -> kind`
pub fn type_constructor_type(kind: ScalarKind) -> FunctionType {
    FunctionType::new(
        vec![SymbolType::deferred(Some(TypeConstraint::Scalar))],
        SymbolType::scalar(kind),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    NeighborSum,
    MaxOver,
    MinOver,
    Broadcast,
    Where,
}

impl BuiltinFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "neighbor_sum" => Some(BuiltinFunction::NeighborSum),
            "max_over" => Some(BuiltinFunction::MaxOver),
            "min_over" => Some(BuiltinFunction::MinOver),
            "broadcast" => Some(BuiltinFunction::Broadcast),
            "where" => Some(BuiltinFunction::Where),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinFunction::NeighborSum => "neighbor_sum",
            BuiltinFunction::MaxOver => "max_over",
            BuiltinFunction::MinOver => "min_over",
            BuiltinFunction::Broadcast => "broadcast",
            BuiltinFunction::Where => "where",
        }
    }

    pub fn function_type(self) -> FunctionType {
        let deferred = |c| SymbolType::deferred(Some(c));
        match self {
            BuiltinFunction::NeighborSum | BuiltinFunction::MaxOver | BuiltinFunction::MinOver => {
                let mut ty = FunctionType::new(
                    vec![deferred(TypeConstraint::Field)],
                    deferred(TypeConstraint::Field),
                );
                ty.kwargs = BTreeMap::from([(
                    "axis".to_string(),
                    deferred(TypeConstraint::Dimension),
                )]);
                ty
            }
            BuiltinFunction::Broadcast => FunctionType::new(
                vec![deferred(TypeConstraint::Data), deferred(TypeConstraint::Tuple)],
                deferred(TypeConstraint::Field),
            ),
            BuiltinFunction::Where => FunctionType::new(
                vec![
                    deferred(TypeConstraint::Field),
                    deferred(TypeConstraint::Data),
                    deferred(TypeConstraint::Data),
                ],
                deferred(TypeConstraint::Data),
            ),
        }
    }
}

impl fmt::Display for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_group() {
        assert!(is_builtin_name("float64"));
        assert!(is_builtin_name("neighbor_sum"));
        assert!(is_builtin_name("FieldOffset"));
        assert!(!is_builtin_name("print"));
    }

    #[test]
    fn python_number_names_map_to_64_bit_kinds() {
        assert_eq!(scalar_kind_for_type_builtin("int"), Some(ScalarKind::Int64));
        assert_eq!(scalar_kind_for_type_builtin("float"), Some(ScalarKind::Float64));
        assert_eq!(scalar_kind_for_type_builtin("tuple"), None);
    }

    #[test]
    fn type_constructor_signature() {
        let ty = SymbolType::Function(type_constructor_type(ScalarKind::Float32));
        assert_eq!(ty.to_string(), "(Deferred[Scalar]) -> float32");
    }

    #[test]
    fn builtin_function_names_round_trip() {
        for name in FUN_BUILTIN_NAMES {
            let f = BuiltinFunction::from_name(name).unwrap();
            assert_eq!(f.name(), *name);
        }
    }
}
