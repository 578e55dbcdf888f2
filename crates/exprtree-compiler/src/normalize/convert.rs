//! Conversions.
//!
//! Rules are tried in order; the first that applies wins:
//!
//! 1. Identity: the conversion is dropped, along with any method attached.
//! 2. Lifted method (`S? -> T?` through a method `S -> T`): the operand is
//!    bound once and the method only runs when a value is present.
//! 3. Explicit method: the method is called.
//! 4. `T? -> U`: unwrap through `Value`.
//! 5. `T -> T?`: wrap through the nullable constructor.
//! 6. A user `opCast` or `opImplConv` for exactly these types is called.
//! 7. Otherwise the conversion is kept for the code generator.

use exprtree_core::{
    nullable, CompileError, CompileResult, Expr, ExprKind, MethodRef, Operator, UnaryExpr,
    UnaryOp,
};

use super::{coerce, has_value, value_of, Normalizer};

pub(super) fn normalize_convert(n: &mut Normalizer<'_>, node: &UnaryExpr) -> CompileResult<Expr> {
    let operand = node.operand.as_ref();
    let source = operand.data_type();
    let target = &node.data_type;

    // 1.
    if source == target {
        return n.visit(operand);
    }

    if let Some(method) = &node.method {
        // 2.
        if source.is_nullable()
            && target.is_nullable()
            && target.underlying() == Some(&method.return_type)
        {
            tracing::trace!(from = %source, to = %target, method = %method, "rewrite lifted conversion");
            let tmp = n.fresh("lifted", source);
            let converted = conversion_call(method, value_of(Expr::variable(&tmp)))?;
            let rewritten = Expr::block_typed(
                vec![tmp.clone()],
                vec![
                    Expr::assign(Expr::variable(&tmp), operand.clone()),
                    Expr::conditional_typed(
                        has_value(Expr::variable(&tmp)),
                        Expr::new_object(nullable::constructor(target), vec![converted]),
                        Expr::null(target.clone()),
                        target.clone(),
                    ),
                ],
                target.clone(),
            );
            return n.visit(&rewritten);
        }

        // 3.
        tracing::trace!(from = %source, to = %target, method = %method, "rewrite conversion method");
        let call = conversion_call(method, operand.clone())?;
        return n.visit(&coerce(call, target));
    }

    // 4.
    if source.is_nullable() && !target.is_nullable() {
        tracing::trace!(from = %source, to = %target, "rewrite nullable unwrap");
        return n.visit(&coerce(value_of(operand.clone()), target));
    }

    // 5.
    if let Some(inner) = target.underlying()
        && !source.is_nullable()
    {
        tracing::trace!(from = %source, to = %target, "rewrite nullable wrap");
        let wrapped = Expr::new_object(
            nullable::constructor(target),
            vec![coerce(operand.clone(), inner)],
        );
        return n.visit(&wrapped);
    }

    // 6.
    let operand_types = [source.clone()];
    let user_op = [Operator::Cast, Operator::ImplConv]
        .into_iter()
        .find_map(|op| n.resolver().resolve(op, &operand_types, Some(target)));
    if let Some(method) = user_op {
        tracing::trace!(from = %source, to = %target, method = %method, "rewrite to user conversion");
        return n.visit(&Expr::call_static(method, vec![operand.clone()]));
    }

    // 7.
    Ok(Expr::Unary(UnaryExpr {
        op: UnaryOp::Convert,
        operand: Box::new(n.visit(operand)?),
        method: None,
        data_type: target.clone(),
    }))
}

/// Apply a conversion method to `arg`: `M(arg)` when static, `arg.M()` otherwise.
fn conversion_call(method: &MethodRef, arg: Expr) -> CompileResult<Expr> {
    match (method.is_static(), method.params.as_slice()) {
        (true, [param]) => {
            let arg = coerce(arg, param);
            Ok(Expr::call_static(method.clone(), vec![arg]))
        }
        (false, []) => Ok(Expr::call(Some(arg), method.clone(), Vec::new())),
        _ => Err(CompileError::unsupported(
            ExprKind::Unary(UnaryOp::Convert),
            format!(
                "conversion method {method} must be static with one parameter or an instance method with none"
            ),
        )),
    }
}
