#![forbid(unsafe_code)]

//! Symbol types of captured runtime values.

use std::collections::BTreeSet;

use ffront_ast::{Namespace, OffsetType, SourceLocation, Symbol, SymbolType, TypeConstraint};

use crate::builtins::{scalar_kind_for_type_builtin, type_constructor_type, BuiltinFunction};
use crate::captured::CapturedVars;
use crate::values::CapturedValue;

/// Type builtins that exist in every host namespace.
const HOST_TYPE_BUILTINS: &[&str] = &["bool", "int", "float"];

/// The DSL type of a captured value; `None` for values the DSL can not
/// describe.
pub fn symbol_type_from_value(value: &CapturedValue) -> Option<SymbolType> {
    match value {
        CapturedValue::Callable(c) => Some(
            c.gt_type()
                .map(SymbolType::Function)
                .unwrap_or_else(|| SymbolType::deferred(Some(TypeConstraint::Function))),
        ),
        CapturedValue::Offset(o) => Some(SymbolType::Offset(OffsetType {
            source: o.source.clone(),
            target: o.target.clone(),
        })),
        CapturedValue::Dimension(d) => Some(SymbolType::Dimension(d.clone())),
        CapturedValue::Builtin(b) => Some(SymbolType::Function(b.function_type())),
        CapturedValue::TypeConstructor(kind) => {
            Some(SymbolType::Function(type_constructor_type(*kind)))
        }
        CapturedValue::Scalar(v) => Some(SymbolType::scalar(v.kind())),
        CapturedValue::Opaque(_) => None,
    }
}

/// Closure symbols for a parser: the type-constructor builtins, one
/// symbol per captured binding, then the builtin functions the body names
/// without binding them.
pub fn captured_symbols(captured: &CapturedVars, location: &SourceLocation) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    let mut skip: BTreeSet<&str> = BTreeSet::new();

    let all = captured.all();
    let captured_type_builtins = all.iter().filter_map(|(name, value)| match value {
        CapturedValue::TypeConstructor(kind) if scalar_kind_for_type_builtin(name) == Some(*kind) => {
            Some(*name)
        }
        _ => None,
    });
    let type_builtins: BTreeSet<&str> = HOST_TYPE_BUILTINS
        .iter()
        .copied()
        .chain(captured_type_builtins)
        .collect();

    for name in type_builtins {
        if let Some(kind) = scalar_kind_for_type_builtin(name) {
            symbols.push(Symbol::new(
                name,
                Some(SymbolType::Function(type_constructor_type(kind))),
                Namespace::Closure,
                location.clone(),
            ));
            skip.insert(name);
        }
    }

    for (name, value) in &all {
        if skip.contains(name) {
            continue;
        }
        symbols.push(Symbol::new(
            *name,
            symbol_type_from_value(value),
            Namespace::Closure,
            location.clone(),
        ));
    }

    let builtin_functions = captured
        .builtins
        .iter()
        .filter(|name| !all.contains_key(name.as_str()))
        .filter_map(|name| BuiltinFunction::from_name(name));
    for builtin in builtin_functions {
        symbols.push(Symbol::new(
            builtin.name(),
            Some(SymbolType::Function(builtin.function_type())),
            Namespace::Closure,
            location.clone(),
        ));
    }
    symbols
}
