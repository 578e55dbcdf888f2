//! Compile errors.
//!
//! There is a single failure kind: a node the compiler has no rule for. Missing
//! operators or conversions are never errors; the rewrite is skipped instead.

use thiserror::Error;

use crate::expr::ExprKind;

/// Errors raised while normalizing or generating code for a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The node shape is outside what the compiler handles.
    #[error("unsupported {kind} node: {reason}")]
    UnsupportedConstruct { kind: ExprKind, reason: String },
}

impl CompileError {
    pub fn unsupported(kind: ExprKind, reason: impl Into<String>) -> Self {
        CompileError::UnsupportedConstruct {
            kind,
            reason: reason.into(),
        }
    }

    /// Kind of the offending node.
    pub fn kind(&self) -> ExprKind {
        match self {
            CompileError::UnsupportedConstruct { kind, .. } => *kind,
        }
    }
}

/// Result alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOp;

    #[test]
    fn message_names_the_kind() {
        let err = CompileError::unsupported(ExprKind::Binary(BinaryOp::Assign), "target is a call");
        assert_eq!(err.to_string(), "unsupported Binary(Assign) node: target is a call");
        assert_eq!(err.kind(), ExprKind::Binary(BinaryOp::Assign));
    }
}
