//! Equality, negation and casts.

use exprtree_core::{BinaryExpr, BinaryOp, CompileResult, Expr, UnaryExpr};

use super::{unsupported, CodeGenerator, Produced};
use crate::bytecode::OpCode;
use crate::sink::Operand;

pub(super) fn emit_equality(
    generator: &mut CodeGenerator<'_>,
    node: &BinaryExpr,
) -> CompileResult<Produced> {
    generator.emit_operand(&node.left)?;
    generator.emit_operand(&node.right)?;
    generator.sink().emit(OpCode::Equal);
    if node.op == BinaryOp::NotEqual {
        negate(generator);
    }
    Ok(Produced::Value)
}

/// `!b` on booleans, `~n` on integers.
pub(super) fn emit_not(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    node: &UnaryExpr,
) -> CompileResult<Produced> {
    let ty = node.operand.data_type();
    if node.method.is_some() || !(ty.is_bool() || ty.is_integer()) {
        return Err(unsupported(expr, format!("no negation for type {ty}")));
    }
    generator.emit_operand(&node.operand)?;
    if ty.is_bool() {
        negate(generator);
    } else {
        generator.sink().emit(OpCode::BitNot);
    }
    Ok(Produced::Value)
}

/// Checked reference conversion. Anything else must have been rewritten.
pub(super) fn emit_convert(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    node: &UnaryExpr,
) -> CompileResult<Produced> {
    let from = node.operand.data_type();
    let to = &node.data_type;
    if node.method.is_some() || !from.is_reference_type() || !to.is_reference_type() {
        return Err(unsupported(expr, format!("no conversion from {from} to {to}")));
    }
    generator.emit_operand(&node.operand)?;
    generator
        .sink()
        .emit_with(OpCode::CastClass, Operand::Type(to.clone()));
    Ok(Produced::Value)
}

/// Safe cast to a reference or nullable type: null (or absent) on mismatch.
pub(super) fn emit_type_as(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    node: &UnaryExpr,
) -> CompileResult<Produced> {
    let to = &node.data_type;
    if !to.is_reference_type() && !to.is_nullable() {
        return Err(unsupported(expr, format!("safe cast to value type {to}")));
    }
    generator.emit_operand(&node.operand)?;
    generator
        .sink()
        .emit_with(OpCode::IsInstance, Operand::Type(to.clone()));
    Ok(Produced::Value)
}

fn negate(generator: &mut CodeGenerator<'_>) {
    generator.sink().emit(OpCode::PushTrue);
    generator.sink().emit(OpCode::Xor);
}

#[cfg(test)]
mod tests {
    use exprtree_core::{DataType, ExprKind, UnaryOp, VarId, Variable};

    use super::*;
    use crate::codegen::tests::generate;

    #[test]
    fn not_equal_negates_equal() {
        let chunk = generate(&Expr::not_equal(Expr::int(1), Expr::int(2)), &[]).unwrap();
        chunk.assert_opcodes(&[
            OpCode::PushInt,
            OpCode::PushInt,
            OpCode::Equal,
            OpCode::PushTrue,
            OpCode::Xor,
        ]);
    }

    #[test]
    fn not_on_integer_is_bitwise() {
        let chunk = generate(&Expr::not(Expr::int(5)), &[]).unwrap();
        chunk.assert_opcodes(&[OpCode::PushInt, OpCode::BitNot]);
    }

    #[test]
    fn not_on_other_types_is_rejected() {
        let err = generate(&Expr::not(Expr::string("x")), &[]).unwrap_err();
        assert_eq!(err.kind(), ExprKind::Unary(UnaryOp::Not));
    }

    #[test]
    fn reference_conversion_is_a_checked_cast() {
        let animal = DataType::class("Animal");
        let o = Variable::new(VarId(0), "o", DataType::object());
        let chunk = generate(&Expr::convert(Expr::variable(&o), animal.clone()), &[o]).unwrap();
        chunk.assert_opcodes(&[OpCode::LoadArg, OpCode::CastClass]);
        assert_eq!(chunk.instructions()[1].operand, Some(Operand::Type(animal)));
    }

    #[test]
    fn value_conversion_is_rejected() {
        let tree = Expr::convert(Expr::int(1), DataType::int64());
        let err = generate(&tree, &[]).unwrap_err();
        assert_eq!(err.kind(), ExprKind::Unary(UnaryOp::Convert));
    }

    #[test]
    fn type_as_is_a_safe_cast() {
        let animal = DataType::class("Animal");
        let o = Variable::new(VarId(0), "o", DataType::object());
        let chunk = generate(&Expr::type_as(Expr::variable(&o), animal), &[o]).unwrap();
        chunk.assert_opcodes(&[OpCode::LoadArg, OpCode::IsInstance]);
    }

    #[test]
    fn type_as_nullable_keeps_the_nullable_target() {
        let maybe = DataType::nullable(&DataType::int32());
        let o = Variable::new(VarId(0), "o", DataType::object());
        let chunk = generate(&Expr::type_as(Expr::variable(&o), maybe.clone()), &[o]).unwrap();
        chunk.assert_opcodes(&[OpCode::LoadArg, OpCode::IsInstance]);
        assert_eq!(chunk.instructions()[1].operand, Some(Operand::Type(maybe)));
    }

    #[test]
    fn type_as_plain_value_type_is_rejected() {
        let o = Variable::new(VarId(0), "o", DataType::object());
        let err = generate(&Expr::type_as(Expr::variable(&o), DataType::int32()), &[o]).unwrap_err();
        assert_eq!(err.kind(), ExprKind::Unary(UnaryOp::TypeAs));
    }
}
