#![forbid(unsafe_code)]

use crate::{SourceLocation, SymbolType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Local,
    Closure,
    External,
}

/// Declaration of a name: parameter, assignment target, captured value or
/// external import. Shared by both dialects.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub id: String,
    pub ty: Option<SymbolType>,
    pub namespace: Namespace,
    pub location: SourceLocation,
}

impl Symbol {
    pub fn new(
        id: impl Into<String>,
        ty: Option<SymbolType>,
        namespace: Namespace,
        location: SourceLocation,
    ) -> Self {
        Self {
            id: id.into(),
            ty,
            namespace,
            location,
        }
    }

    pub fn local(id: impl Into<String>, ty: SymbolType, location: SourceLocation) -> Self {
        Self::new(id, Some(ty), Namespace::Local, location)
    }

    pub fn with_type(&self, ty: SymbolType) -> Self {
        Self {
            id: self.id.clone(),
            ty: Some(ty),
            namespace: self.namespace,
            location: self.location.clone(),
        }
    }
}
