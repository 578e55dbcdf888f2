//! User-defined operator lookup.
//!
//! The normalizer never searches types itself. It asks an [`OperatorResolver`]
//! for a static operator method and rewrites the node into a call when one is
//! found; a missing operator simply leaves the node alone.

use std::fmt;

use crate::members::{MethodDef, MethodRef};
use crate::DataType;

/// Operators the compiler may resolve to user methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `==` (`opEquals`)
    Equals,
    /// `!=` (`opNotEquals`)
    NotEquals,
    /// Explicit conversion (`opCast`)
    Cast,
    /// Implicit conversion (`opImplConv`)
    ImplConv,
}

impl Operator {
    /// Name the operator method is declared under.
    pub const fn method_name(&self) -> &'static str {
        match self {
            Operator::Equals => "opEquals",
            Operator::NotEquals => "opNotEquals",
            Operator::Cast => "opCast",
            Operator::ImplConv => "opImplConv",
        }
    }

    pub const fn is_conversion(&self) -> bool {
        matches!(self, Operator::Cast | Operator::ImplConv)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method_name())
    }
}

/// Finds the user method implementing an operator.
///
/// Candidates are searched on each operand type in argument order, then on the
/// result type; the first candidate satisfying [`is_operator_candidate`] wins.
/// Implementations must be deterministic and safe to share between threads.
pub trait OperatorResolver: Send + Sync {
    fn resolve(
        &self,
        op: Operator,
        operand_types: &[DataType],
        result_type: Option<&DataType>,
    ) -> Option<MethodRef>;
}

impl<R: OperatorResolver + ?Sized> OperatorResolver for &R {
    fn resolve(
        &self,
        op: Operator,
        operand_types: &[DataType],
        result_type: Option<&DataType>,
    ) -> Option<MethodRef> {
        (**self).resolve(op, operand_types, result_type)
    }
}

/// A resolver that knows no operators.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOperators;

impl OperatorResolver for NoOperators {
    fn resolve(&self, _: Operator, _: &[DataType], _: Option<&DataType>) -> Option<MethodRef> {
        None
    }
}

/// Whether `method` can implement `op` for the given operands.
pub fn is_operator_candidate(
    method: &MethodDef,
    op: Operator,
    operand_types: &[DataType],
    result_type: Option<&DataType>,
) -> bool {
    method.is_static()
        && method.name == op.method_name()
        && method.params.len() == operand_types.len()
        && method
            .params
            .iter()
            .zip(operand_types)
            .all(|(param, operand)| param.is_assignable_from(operand))
        && result_type.is_none_or(|ty| &method.return_type == ty)
}

/// Types searched for candidates, in order, without repeats.
pub fn search_order(operand_types: &[DataType], result_type: Option<&DataType>) -> Vec<DataType> {
    let mut order: Vec<DataType> = Vec::with_capacity(operand_types.len() + 1);
    for ty in operand_types.iter().chain(result_type) {
        if !order.contains(ty) {
            order.push(ty.clone());
        }
    }
    order
}
