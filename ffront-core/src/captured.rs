#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use ffront_ast::SymbolType;
use tracing::debug;

use crate::builtins::is_builtin_name;
use crate::error::FrontendError;
use crate::source::SourceExtractor;
use crate::symbols::SymbolNames;
use crate::values::CapturedValue;

/// Values of the free names of a DSL function, as seen when it was
/// decorated. Never mutated once built; derived environments are new values.
#[derive(Clone, Debug, Default)]
pub struct CapturedVars {
    pub nonlocals: BTreeMap<String, CapturedValue>,
    pub globals: BTreeMap<String, CapturedValue>,
    pub annotations: BTreeMap<String, SymbolType>,
    /// Unresolved names that are DSL builtins.
    pub builtins: BTreeSet<String>,
    /// Unresolved names that are not. Only an error if actually used.
    pub unbound: BTreeSet<String>,
}

impl CapturedVars {
    pub fn from_function(func: &dyn SourceExtractor) -> Result<Self, FrontendError> {
        let def = func.source_definition()?;
        let names = SymbolNames::from_source(&def.source, &def.filename)?;
        Ok(Self::resolve(func, &names))
    }

    /// Look every free name up in the closure cells, then in the global
    /// namespace.
    pub fn resolve(func: &dyn SourceExtractor, names: &SymbolNames) -> Self {
        let mut captured = CapturedVars {
            annotations: func.annotations().clone(),
            ..Default::default()
        };

        for name in names.free_names() {
            if let Some(value) = func.closure_cells().get(&name) {
                captured.nonlocals.insert(name, value.clone());
            } else if let Some(value) = func.global_namespace().get(&name) {
                captured.globals.insert(name, value.clone());
            } else if is_builtin_name(&name) {
                captured.builtins.insert(name);
            } else {
                captured.unbound.insert(name);
            }
        }

        debug!(
            function = func.name(),
            nonlocals = captured.nonlocals.len(),
            globals = captured.globals.len(),
            builtins = captured.builtins.len(),
            unbound = captured.unbound.len(),
            "resolved captured variables"
        );
        captured
    }

    /// Globals shadow nonlocals of the same name.
    pub fn get(&self, name: &str) -> Option<&CapturedValue> {
        self.globals.get(name).or_else(|| self.nonlocals.get(name))
    }

    /// Every captured binding; a global shadows a nonlocal of the same name.
    pub fn all(&self) -> BTreeMap<&str, &CapturedValue> {
        let mut all: BTreeMap<&str, &CapturedValue> = self
            .nonlocals
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        all.extend(self.globals.iter().map(|(k, v)| (k.as_str(), v)));
        all
    }

    pub fn is_empty(&self) -> bool {
        self.nonlocals.is_empty() && self.globals.is_empty()
    }

    /// A copy with `name` bound in the globals.
    pub fn with_global(&self, name: impl Into<String>, value: CapturedValue) -> Self {
        let mut derived = self.clone();
        derived.globals.insert(name.into(), value);
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::HostFunction;
    use crate::values::ScalarValue;
    use ffront_ast::{Dimension, ScalarKind};

    fn host() -> HostFunction {
        HostFunction::new(
            "f",
            "def f(a):\n    return where(a > limit, a, fill) + I + missing\n",
            "/src/ops.py",
        )
        .with_closure_cell("limit", CapturedValue::Scalar(ScalarValue::Float64(1.0)))
        .with_global("fill", CapturedValue::Scalar(ScalarValue::Float64(0.0)))
        .with_global("I", CapturedValue::Dimension(Dimension::new("I")))
        .with_global("unused", CapturedValue::Opaque("module os".into()))
        .with_annotation("return", SymbolType::scalar(ScalarKind::Float64))
    }

    #[test]
    fn free_names_are_split_by_origin() {
        let captured = CapturedVars::from_function(&host()).unwrap();
        assert_eq!(
            captured.nonlocals.keys().collect::<Vec<_>>(),
            vec!["limit"]
        );
        assert_eq!(captured.globals.keys().collect::<Vec<_>>(), vec!["I", "fill"]);
        assert!(captured.builtins.contains("where"));
        assert!(captured.unbound.contains("missing"));
        assert!(captured.annotations.contains_key("return"));
    }

    #[test]
    fn closure_cell_wins_over_global_lookup() {
        let f = host().with_global("limit", CapturedValue::Opaque("shadowed".into()));
        let captured = CapturedVars::from_function(&f).unwrap();
        assert!(captured.nonlocals.contains_key("limit"));
        assert!(!captured.globals.contains_key("limit"));
    }

    #[test]
    fn with_global_leaves_the_original_untouched() {
        let captured = CapturedVars::from_function(&host()).unwrap();
        let derived = captured.with_global("limit", CapturedValue::Opaque("new".into()));

        assert!(captured.globals.get("limit").is_none());
        assert!(matches!(derived.get("limit"), Some(CapturedValue::Opaque(s)) if s == "new"));
        assert!(matches!(captured.get("limit"), Some(CapturedValue::Scalar(_))));
        assert_eq!(derived.all().len(), 3);
    }
}
