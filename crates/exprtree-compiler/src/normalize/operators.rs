//! Coalesce and equality rewrites.

use exprtree_core::{nullable, BinaryExpr, BinaryOp, CompileResult, DataType, Expr, Operator};

use super::{coerce, has_value, Normalizer};

/// `left ?? right`  =>  `{ tmp; tmp = left; tmp != null ? (T)tmp : right }`
///
/// The left side is evaluated exactly once.
pub(super) fn normalize_coalesce(n: &mut Normalizer<'_>, node: &BinaryExpr) -> CompileResult<Expr> {
    let ty = &node.data_type;
    let left_ty = node.left.data_type().clone();
    tracing::trace!(left = %left_ty, ty = %ty, "rewrite coalesce");

    let tmp = n.fresh("coalesce", &left_ty);
    let rewritten = Expr::block_typed(
        vec![tmp.clone()],
        vec![
            Expr::assign(Expr::variable(&tmp), node.left.as_ref().clone()),
            Expr::conditional_typed(
                Expr::not_equal(Expr::variable(&tmp), Expr::null(left_ty)),
                coerce(Expr::variable(&tmp), ty),
                coerce(node.right.as_ref().clone(), ty),
                ty.clone(),
            ),
        ],
        ty.clone(),
    );
    n.visit(&rewritten)
}

/// `Equal` / `NotEqual`.
///
/// With a nullable operand:
///
/// | tree            | rewrite            |
/// |-----------------|--------------------|
/// | `null == x`     | `!x.HasValue`      |
/// | `null != x`     | `x.HasValue`       |
/// | `a == b`        | `T?.Equals(a, b)`  |
/// | `a != b`        | `!T?.Equals(a, b)` |
///
/// Otherwise a user `opEquals` / `opNotEquals` is called when one resolves, and
/// the node is kept as is when none does.
pub(super) fn normalize_equality(n: &mut Normalizer<'_>, node: &BinaryExpr) -> CompileResult<Expr> {
    let negate = node.op == BinaryOp::NotEqual;
    let left = node.left.as_ref();
    let right = node.right.as_ref();

    if let Some(nullable_ty) = nullable_operand(left, right) {
        let rewritten = if left.is_null_constant() || right.is_null_constant() {
            let other = if left.is_null_constant() { right } else { left };
            tracing::trace!(ty = %nullable_ty, negate, "rewrite null comparison to HasValue");
            let check = has_value(lift(other.clone(), &nullable_ty));
            // `== null` holds when there is no value
            if negate { check } else { Expr::not(check) }
        } else {
            tracing::trace!(ty = %nullable_ty, negate, "rewrite nullable equality");
            let equals = Expr::call_static(
                nullable::equals(&nullable_ty),
                vec![
                    lift(left.clone(), &nullable_ty),
                    lift(right.clone(), &nullable_ty),
                ],
            );
            if negate { Expr::not(equals) } else { equals }
        };
        return n.visit(&coerce(rewritten, &node.data_type));
    }

    let op = if negate {
        Operator::NotEquals
    } else {
        Operator::Equals
    };
    let operand_types = [left.data_type().clone(), right.data_type().clone()];
    if let Some(method) = n.resolver().resolve(op, &operand_types, None) {
        tracing::trace!(%op, method = %method, "rewrite to user operator");
        let call = Expr::call_static(method, vec![left.clone(), right.clone()]);
        return n.visit(&coerce(call, &node.data_type));
    }

    Ok(Expr::Binary(BinaryExpr {
        op: node.op,
        left: Box::new(n.visit(left)?),
        right: Box::new(n.visit(right)?),
        data_type: node.data_type.clone(),
    }))
}

/// The nullable type the comparison is carried out in, if any.
fn nullable_operand(left: &Expr, right: &Expr) -> Option<DataType> {
    [left, right]
        .into_iter()
        .map(Expr::data_type)
        .find(|ty| ty.is_nullable())
        .cloned()
}

/// Widen a non-nullable operand to `nullable_ty`.
fn lift(expr: Expr, nullable_ty: &DataType) -> Expr {
    coerce(expr, nullable_ty)
}
