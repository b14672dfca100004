#![forbid(unsafe_code)]

use std::fmt;

use ffront_ast::FunctionType;
use ffront_itir::FunctionDefinition;

use crate::captured::CapturedVars;
use crate::error::FrontendError;

/// A value that can be called from a program: it lowers to one IR function
/// definition and may itself close over further callables.
pub trait GtCallable: fmt::Debug + Send + Sync {
    fn gt_itir(&self) -> Result<FunctionDefinition, FrontendError>;

    fn gt_captured_vars(&self) -> Option<&CapturedVars>;

    /// Signature, when known. Unknown signatures type as `Deferred[Function]`.
    fn gt_type(&self) -> Option<FunctionType> {
        None
    }
}
