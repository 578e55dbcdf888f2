//! Constants and default values.

use exprtree_core::{CompileResult, ConstantExpr, ConstantValue, DataType, Expr};

use super::{unsupported, CodeGenerator, Produced};
use crate::bytecode::OpCode;
use crate::sink::Operand;

pub(super) fn emit_constant(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    node: &ConstantExpr,
) -> CompileResult<Produced> {
    let ty = &node.data_type;
    let sink = generator.sink();
    match &node.value {
        ConstantValue::Bool(value) => sink.emit_bool(*value),
        ConstantValue::Int32(value) => sink.emit_with(OpCode::PushInt, Operand::Int(*value)),
        ConstantValue::String(value) => {
            sink.emit_with(OpCode::PushString, Operand::Str(value.clone()))
        }
        ConstantValue::Type(value) => sink.emit_with(OpCode::PushType, Operand::Type(value.clone())),
        // An absent nullable is a value, not a null reference.
        ConstantValue::Null if ty.is_nullable() => {
            sink.emit_with(OpCode::DefaultValue, Operand::Type(ty.clone()))
        }
        ConstantValue::Null if ty.is_reference_type() => sink.emit(OpCode::PushNull),
        ConstantValue::Null | ConstantValue::Int64(_) | ConstantValue::Float64(_) => {
            return Err(unsupported(expr, format!("no constant encoding for type {ty}")));
        }
    }
    Ok(Produced::Value)
}

pub(super) fn emit_default(expr: &Expr, ty: &DataType) -> CompileResult<Produced> {
    if ty.is_void() {
        Ok(Produced::Nothing)
    } else {
        Err(unsupported(expr, format!("default of non-void type {ty}")))
    }
}
