#![forbid(unsafe_code)]

//! Queries over possibly incomplete symbol types, and the broadcasting
//! rules for binary operators.

use ffront_ast::{Dims, FieldType, ScalarKind, ScalarType, SymbolType, TypeConstraint};

/// A view of an optional type. `None` means "not deduced yet" and behaves
/// like an unconstrained type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TypeInfo<'a> {
    ty: Option<&'a SymbolType>,
}

impl<'a> TypeInfo<'a> {
    pub fn new(ty: Option<&'a SymbolType>) -> Self {
        Self { ty }
    }

    pub fn of(ty: &'a SymbolType) -> Self {
        Self { ty: Some(ty) }
    }

    pub fn ty(&self) -> Option<&'a SymbolType> {
        self.ty
    }

    pub fn is_complete(&self) -> bool {
        self.ty.is_some_and(|t| !t.is_deferred())
    }

    /// Kind of the type, or of the deferred type's constraint.
    pub fn constraint(&self) -> Option<TypeConstraint> {
        self.ty.and_then(TypeConstraint::of)
    }

    pub fn is_any_type(&self) -> bool {
        !self.is_complete() && self.constraint().is_none()
    }

    pub fn is_field_type(&self) -> bool {
        self.constraint() == Some(TypeConstraint::Field)
    }

    pub fn is_scalar(&self) -> bool {
        self.constraint() == Some(TypeConstraint::Scalar)
    }

    pub fn dtype(&self) -> Option<&'a ScalarType> {
        match self.ty {
            Some(SymbolType::Scalar(s)) => Some(s),
            Some(SymbolType::Field(f)) => Some(&f.dtype),
            _ => None,
        }
    }

    pub fn dims(&self) -> Option<&'a Dims> {
        match self.ty {
            Some(SymbolType::Field(f)) => Some(&f.dims),
            _ => None,
        }
    }

    fn dtype_matches(&self, pred: impl Fn(ScalarKind) -> bool) -> bool {
        if self.is_any_type() {
            return true;
        }
        (self.is_field_type() || self.is_scalar()) && self.dtype().is_none_or(|d| pred(d.kind))
    }

    pub fn is_arithmetic_compatible(&self) -> bool {
        self.dtype_matches(ScalarKind::is_numeric)
    }

    pub fn is_logics_compatible(&self) -> bool {
        self.dtype_matches(|k| k == ScalarKind::Bool)
    }

    /// Whether a symbol declared with this type may take `other`.
    pub fn can_be_refined_to(&self, other: TypeInfo<'_>) -> bool {
        if self.is_any_type() {
            return true;
        }
        if self.is_complete() {
            return self.ty == other.ty;
        }
        match self.constraint() {
            Some(c) => match other.ty {
                Some(t) if other.is_complete() => c.admits(t),
                _ => other.constraint().is_some_and(|oc| c.admits_constraint(oc)),
            },
            None => false,
        }
    }
}

/// Equal dtypes, and when both sides have known dimensions the shorter
/// list is a contiguous run of the longer one.
pub fn are_broadcast_compatible(left: TypeInfo<'_>, right: TypeInfo<'_>) -> bool {
    if let (Some(Dims::Known(l)), Some(Dims::Known(r))) = (left.dims(), right.dims()) {
        if !l.is_empty() && !r.is_empty() {
            let (small, big) = if l.len() <= r.len() { (l, r) } else { (r, l) };
            let start = big.iter().position(|d| Some(d) == small.first());
            let end = big.iter().position(|d| Some(d) == small.last());
            match (start, end) {
                (Some(s), Some(e)) if s <= e => {
                    if small[..] != big[s..=e] {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
    left.dtype() == right.dtype()
}

/// Result type of a binary operation. A field wins over a scalar, the
/// longer dimension list wins, and otherwise `left` wins.
pub fn broadcast_types<'a>(left: TypeInfo<'a>, right: TypeInfo<'a>) -> Option<TypeInfo<'a>> {
    if !are_broadcast_compatible(left, right) {
        return None;
    }
    if left.is_scalar() && right.is_field_type() {
        return Some(right);
    }
    if let (Some(Dims::Known(l)), Some(Dims::Known(r))) = (left.dims(), right.dims()) {
        if !l.is_empty() && r.len() > l.len() {
            return Some(right);
        }
    }
    Some(left)
}

/// The type with its dtype replaced by `bool`; dimensions are kept.
pub fn boolified_type(info: TypeInfo<'_>) -> Option<SymbolType> {
    let dtype = ScalarType {
        kind: ScalarKind::Bool,
        shape: info.dtype().and_then(|d| d.shape.clone()),
    };
    match info.constraint()? {
        TypeConstraint::Field => Some(SymbolType::Field(FieldType {
            dims: info.dims().cloned().unwrap_or(Dims::Any),
            dtype,
        })),
        TypeConstraint::Scalar => Some(SymbolType::Scalar(dtype)),
        _ => None,
    }
}
