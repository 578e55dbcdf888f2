//! Variables, fields and assignment.

use exprtree_core::{BinaryExpr, CompileResult, Expr, FieldRef, Member, MemberExpr, Variable};

use super::{unsupported, Access, CodeGenerator, Produced};
use crate::bytecode::OpCode;
use crate::scope::VarSlot;
use crate::sink::Operand;

/// Load a parameter or local, or its address when one is requested.
pub(super) fn emit_variable(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    var: &Variable,
    req: Access,
) -> CompileResult<Produced> {
    let slot = lookup(generator, expr, var)?;
    let by_address = req == Access::Address && var.data_type.is_value_type();
    let (op, operand) = match (slot, by_address) {
        (VarSlot::Arg(index), false) => (OpCode::LoadArg, Operand::Arg(index)),
        (VarSlot::Arg(index), true) => (OpCode::LoadArgAddress, Operand::Arg(index)),
        (VarSlot::Local(slot), false) => (OpCode::LoadLocal, Operand::Local(slot)),
        (VarSlot::Local(slot), true) => (OpCode::LoadLocalAddress, Operand::Local(slot)),
    };
    generator.sink().emit_with(op, operand);
    Ok(if by_address {
        Produced::Address
    } else {
        Produced::Value
    })
}

/// Field read. Property reads must have been rewritten to getter calls.
pub(super) fn emit_member(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    node: &MemberExpr,
    req: Access,
) -> CompileResult<Produced> {
    let Member::Field(field) = &node.member else {
        return Err(unsupported(
            expr,
            format!("property {} must be rewritten to an accessor call", node.member.name()),
        ));
    };
    let by_address = req == Access::Address && field.data_type.is_value_type();

    if field.is_static {
        let op = if by_address {
            OpCode::LoadStaticFieldAddress
        } else {
            OpCode::LoadStaticField
        };
        generator.sink().emit_with(op, Operand::Field(field.clone()));
    } else {
        emit_field_instance(generator, expr, field, node.instance.as_deref())?;
        let op = if by_address {
            OpCode::LoadFieldAddress
        } else {
            OpCode::LoadField
        };
        generator.sink().emit_with(op, Operand::Field(field.clone()));
    }

    Ok(if by_address {
        Produced::Address
    } else {
        Produced::Value
    })
}

/// Store to a variable or field, leaving the stored value.
pub(super) fn emit_assign(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    node: &BinaryExpr,
) -> CompileResult<Produced> {
    match node.left.as_ref() {
        Expr::Variable(var) => {
            let slot = lookup(generator, expr, var)?;

            // 1. Value, kept once for the result
            generator.emit_operand(&node.right)?;
            generator.sink().emit(OpCode::Dup);

            // 2. Store the copy
            let (op, operand) = match slot {
                VarSlot::Arg(index) => (OpCode::StoreArg, Operand::Arg(index)),
                VarSlot::Local(slot) => (OpCode::StoreLocal, Operand::Local(slot)),
            };
            generator.sink().emit_with(op, operand);
        }
        Expr::Member(MemberExpr {
            instance,
            member: Member::Field(field),
            ..
        }) => {
            if field.is_static {
                generator.emit_operand(&node.right)?;
                generator.sink().emit(OpCode::Dup);
                generator
                    .sink()
                    .emit_with(OpCode::StoreStaticField, Operand::Field(field.clone()));
            } else {
                // 1. Value into a temporary
                generator.emit_operand(&node.right)?;
                let tmp = generator.sink().declare_local(&field.data_type);
                generator.sink().emit_with(OpCode::StoreLocal, Operand::Local(tmp));

                // 2. Instance, by address for value types
                emit_field_instance(generator, expr, field, instance.as_deref())?;

                // 3. Store, then reload as the result
                generator.sink().emit_with(OpCode::LoadLocal, Operand::Local(tmp));
                generator
                    .sink()
                    .emit_with(OpCode::StoreField, Operand::Field(field.clone()));
                generator.sink().emit_with(OpCode::LoadLocal, Operand::Local(tmp));
            }
        }
        other => {
            return Err(unsupported(
                expr,
                format!("cannot assign to a {} node", other.kind()),
            ));
        }
    }
    Ok(Produced::Value)
}

/// The instance an instance field is accessed on: its address when the
/// declaring type is a value type, so loads and stores touch the original.
fn emit_field_instance(
    generator: &mut CodeGenerator<'_>,
    expr: &Expr,
    field: &FieldRef,
    instance: Option<&Expr>,
) -> CompileResult<()> {
    let Some(instance) = instance else {
        return Err(unsupported(
            expr,
            format!(
                "instance field {}::{} accessed without an instance",
                field.declaring_type, field.name
            ),
        ));
    };
    if field.declaring_type.is_value_type() {
        generator.emit_address(instance)
    } else {
        generator.emit_operand(instance)
    }
}

fn lookup(generator: &mut CodeGenerator<'_>, expr: &Expr, var: &Variable) -> CompileResult<VarSlot> {
    generator
        .scope()
        .lookup(var.id)
        .map(|scoped| scoped.slot)
        .ok_or_else(|| {
            unsupported(
                expr,
                format!("variable {} ({}) is not in scope", var.name, var.id),
            )
        })
}
