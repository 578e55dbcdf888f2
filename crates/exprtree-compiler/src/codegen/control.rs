//! Short-circuit logic, conditionals and blocks.

use exprtree_core::{BinaryExpr, BlockExpr, CompileResult, ConditionalExpr, Expr};

use super::{produced_for, unsupported, CodeGenerator, Produced};
use crate::bytecode::OpCode;

/// `left && right`: `right` only runs when `left` is true.
pub(super) fn emit_and_also(
    generator: &mut CodeGenerator<'_>,
    node: &BinaryExpr,
) -> CompileResult<Produced> {
    let end = generator.sink().define_label();

    // 1. Left, kept as the result when false
    generator.emit_operand(&node.left)?;
    generator.sink().emit(OpCode::Dup);
    generator.sink().emit_jump(OpCode::JumpIfFalse, end);

    // 2. Left was true, the result is right
    generator.sink().emit(OpCode::Pop);
    generator.emit_operand(&node.right)?;

    generator.sink().mark_label(end);
    Ok(Produced::Value)
}

pub(super) fn emit_conditional(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    node: &ConditionalExpr,
) -> CompileResult<Produced> {
    let produced = produced_for(&node.data_type);
    let if_false = generator.sink().define_label();
    let end = generator.sink().define_label();

    // 1. Test
    generator.emit_operand(&node.test)?;
    generator.sink().emit_jump(OpCode::JumpIfFalse, if_false);

    // 2. True branch, then skip the false branch
    emit_branch(generator, expr, &node.if_true, produced)?;
    generator.sink().emit_jump(OpCode::Jump, end);

    // 3. False branch
    generator.sink().mark_label(if_false);
    emit_branch(generator, expr, &node.if_false, produced)?;

    generator.sink().mark_label(end);
    Ok(produced)
}

fn emit_branch(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    branch: &Expr,
    produced: Produced,
) -> CompileResult<()> {
    match produced {
        Produced::Nothing => generator.emit_discard(branch),
        _ if branch.data_type().is_void() => Err(unsupported(
            expr,
            format!("void branch in a conditional of type {}", expr.data_type()),
        )),
        _ => generator.emit_operand(branch),
    }
}

/// Locals are declared up front; every expression but the last is discarded.
pub(super) fn emit_block(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    node: &BlockExpr,
) -> CompileResult<Produced> {
    let produced = produced_for(&node.data_type);
    let Some((last, rest)) = node.body.split_last() else {
        if produced == Produced::Nothing {
            return Ok(Produced::Nothing);
        }
        return Err(unsupported(
            expr,
            format!("empty block of type {}", node.data_type),
        ));
    };

    // 1. Locals
    generator.scope().push_scope();
    for local in &node.locals {
        let slot = generator.sink().declare_local(&local.data_type);
        generator.scope().declare(local, slot)?;
    }

    // 2. Body
    for body_expr in rest {
        generator.emit_discard(body_expr)?;
    }
    if produced == Produced::Nothing {
        generator.emit_discard(last)?;
    } else {
        generator.emit_operand(last)?;
    }

    // 3. Release the frame
    generator.scope().pop_scope();
    Ok(produced)
}

#[cfg(test)]
mod tests {
    use exprtree_core::{DataType, ExprKind, MethodDef, VarId, Variable};

    use super::*;
    use crate::codegen::tests::generate;

    #[test]
    fn and_also_keeps_left_on_the_false_path() {
        let a = Variable::new(VarId(0), "a", DataType::bool());
        let b = Variable::new(VarId(1), "b", DataType::bool());
        let tree = Expr::and_also(Expr::variable(&a), Expr::variable(&b));
        let chunk = generate(&tree, &[a, b]).unwrap();

        chunk.assert_opcodes(&[
            OpCode::LoadArg,
            OpCode::Dup,
            OpCode::JumpIfFalse,
            OpCode::Pop,
            OpCode::LoadArg,
        ]);
        assert_eq!(chunk.label_target(crate::sink::Label(0)), Some(5));
    }

    #[test]
    fn conditional_has_two_labels() {
        let tree = Expr::conditional(Expr::bool(false), Expr::int(1), Expr::int(2));
        let chunk = generate(&tree, &[]).unwrap();

        chunk.assert_opcodes(&[
            OpCode::PushFalse,
            OpCode::JumpIfFalse,
            OpCode::PushInt,
            OpCode::Jump,
            OpCode::PushInt,
        ]);
        assert_eq!(chunk.label_count(), 2);
    }

    #[test]
    fn void_conditional_pops_branch_residue() {
        let log = MethodDef::new_static(&DataType::class("Log"), "Write", vec![], DataType::void())
            .into_ref();
        let tree = Expr::conditional_typed(
            Expr::bool(true),
            Expr::int(1),
            Expr::call_static(log, vec![]),
            DataType::void(),
        );
        let chunk = generate(&tree, &[]).unwrap();
        chunk.assert_opcodes(&[
            OpCode::PushTrue,
            OpCode::JumpIfFalse,
            OpCode::PushInt,
            OpCode::Pop,
            OpCode::Jump,
            OpCode::Call,
        ]);
    }

    #[test]
    fn block_declares_locals_first_and_discards_all_but_last() {
        let x = Variable::new(VarId(0), "x", DataType::int32());
        let tree = Expr::block(
            vec![x.clone()],
            vec![
                Expr::assign(Expr::variable(&x), Expr::int(2)),
                Expr::equal(Expr::variable(&x), Expr::int(2)),
            ],
        );
        let chunk = generate(&tree, &[]).unwrap();

        chunk.assert_opcodes(&[
            OpCode::PushInt,
            OpCode::Dup,
            OpCode::StoreLocal,
            OpCode::Pop,
            OpCode::LoadLocal,
            OpCode::PushInt,
            OpCode::Equal,
        ]);
        assert_eq!(chunk.locals(), &[DataType::int32()]);
    }

    #[test]
    fn void_block_pops_its_last_value() {
        let x = Variable::new(VarId(0), "x", DataType::int32());
        let tree = Expr::block_typed(
            vec![x.clone()],
            vec![Expr::assign(Expr::variable(&x), Expr::int(1))],
            DataType::void(),
        );
        let chunk = generate(&tree, &[]).unwrap();
        assert_eq!(chunk.opcodes().last(), Some(&OpCode::Pop));
    }

    #[test]
    fn block_locals_are_not_visible_after_the_block() {
        let x = Variable::new(VarId(0), "x", DataType::int32());
        let inner = Expr::block(vec![x.clone()], vec![Expr::variable(&x)]);
        let tree = Expr::block(vec![], vec![inner, Expr::variable(&x)]);
        let err = generate(&tree, &[]).unwrap_err();
        assert_eq!(err.kind(), ExprKind::Variable);
    }

    #[test]
    fn duplicate_local_is_rejected() {
        let x = Variable::new(VarId(0), "x", DataType::int32());
        let inner = Expr::block(vec![x.clone()], vec![Expr::variable(&x)]);
        let tree = Expr::block(vec![x], vec![inner]);
        assert!(generate(&tree, &[]).is_err());
    }
}
