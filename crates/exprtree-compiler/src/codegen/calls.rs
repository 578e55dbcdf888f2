//! Method calls and object construction.

use exprtree_core::{CallExpr, CompileResult, Expr, NewExpr};

use super::{produced_for, unsupported, CodeGenerator, Produced};
use crate::bytecode::OpCode;
use crate::sink::Operand;

/// Receiver, arguments left to right, then a direct or virtual call.
pub(super) fn emit_call(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    node: &CallExpr,
) -> CompileResult<Produced> {
    let method = &node.method;

    // 1. Receiver
    match (node.instance.as_deref(), method.is_static()) {
        (Some(instance), false) => generator.emit_receiver(instance)?,
        (None, true) => {}
        (Some(_), true) => {
            return Err(unsupported(
                expr,
                format!("static method {method} called with an instance"),
            ));
        }
        (None, false) => {
            return Err(unsupported(
                expr,
                format!("instance method {method} called without an instance"),
            ));
        }
    }

    // 2. Arguments
    if node.arguments.len() != method.params.len() {
        return Err(unsupported(
            expr,
            format!(
                "{method} takes {} arguments, got {}",
                method.params.len(),
                node.arguments.len()
            ),
        ));
    }
    generator.emit_all(&node.arguments)?;

    // 3. Call
    let op = if method.requires_virtual_dispatch() {
        OpCode::CallVirtual
    } else {
        OpCode::Call
    };
    generator.sink().emit_with(op, Operand::Method(method.clone()));
    Ok(produced_for(&method.return_type))
}

pub(super) fn emit_new(generator: &mut CodeGenerator<'_>, node: &NewExpr) -> CompileResult<Produced> {
    generator.emit_all(&node.arguments)?;
    generator
        .sink()
        .emit_with(OpCode::NewObject, Operand::Constructor(node.constructor.clone()));
    Ok(Produced::Value)
}

#[cfg(test)]
mod tests {
    use exprtree_core::{
        nullable, ConstructorDef, DataType, ExprKind, MethodDef, MethodTraits, VarId, Variable,
    };

    use super::*;
    use crate::codegen::tests::{generate, lower};

    #[test]
    fn virtual_and_interface_methods_dispatch_virtually() {
        let shape = DataType::class("Shape");
        let area = MethodDef::new(&shape, "Area", vec![], DataType::int32())
            .with_traits(MethodTraits::VIRTUAL)
            .into_ref();
        let s = Variable::new(VarId(0), "s", shape);
        let chunk = generate(&Expr::call(Some(Expr::variable(&s)), area, vec![]), &[s]).unwrap();
        chunk.assert_opcodes(&[OpCode::LoadArg, OpCode::CallVirtual]);

        let drawable = DataType::interface("IDrawable");
        let draw = MethodDef::new(&drawable, "Draw", vec![], DataType::void()).into_ref();
        let d = Variable::new(VarId(0), "d", drawable);
        let chunk = generate(&Expr::call(Some(Expr::variable(&d)), draw, vec![]), &[d]).unwrap();
        chunk.assert_opcodes(&[OpCode::LoadArg, OpCode::CallVirtual]);
    }

    #[test]
    fn struct_receiver_is_passed_by_address() {
        let vector = DataType::structure("Vector");
        let length = MethodDef::new(&vector, "Length", vec![], DataType::int32()).into_ref();
        let v = Variable::new(VarId(0), "v", vector);
        let chunk = generate(&Expr::call(Some(Expr::variable(&v)), length, vec![]), &[v]).unwrap();
        chunk.assert_opcodes(&[OpCode::LoadArgAddress, OpCode::Call]);
    }

    #[test]
    fn arguments_are_emitted_left_to_right() {
        let math = DataType::class("Math");
        let max = MethodDef::new_static(&math, "Max", vec![DataType::int32(); 2], DataType::int32())
            .into_ref();
        let chunk = generate(&Expr::call_static(max, vec![Expr::int(1), Expr::int(2)]), &[]).unwrap();
        chunk.assert_opcodes(&[OpCode::PushInt, OpCode::PushInt, OpCode::Call]);
        assert_eq!(chunk.instructions()[0].operand, Some(Operand::Int(1)));
    }

    #[test]
    fn receiver_mismatch_is_rejected() {
        let widget = DataType::class("Widget");
        let reset = MethodDef::new(&widget, "Reset", vec![], DataType::void()).into_ref();
        let err = generate(&Expr::call_static(reset, vec![]), &[]).unwrap_err();
        assert_eq!(err.kind(), ExprKind::Call);
    }

    #[test]
    fn new_object_after_arguments() {
        let pair = DataType::class("Pair");
        let ctor = ConstructorDef::new(&pair, vec![DataType::int32(), DataType::string()]).into_ref();
        let tree = Expr::new_object(ctor, vec![Expr::int(1), Expr::string("a")]);
        let chunk = generate(&tree, &[]).unwrap();
        chunk.assert_opcodes(&[OpCode::PushInt, OpCode::PushString, OpCode::NewObject]);
    }

    #[test]
    fn null_comparison_on_nullable_becomes_has_value_call() {
        let maybe = DataType::nullable(&DataType::int32());
        let x = Variable::new(VarId(0), "x", maybe.clone());
        let tree = Expr::equal(Expr::null(maybe.clone()), Expr::variable(&x));
        let chunk = lower(&tree, &[x]);

        chunk.assert_opcodes(&[
            OpCode::LoadArgAddress,
            OpCode::Call,
            OpCode::PushTrue,
            OpCode::Xor,
        ]);
        let getter = nullable::has_value(&maybe).getter.clone().unwrap();
        assert_eq!(chunk.instructions()[1].operand, Some(Operand::Method(getter)));
    }
}
