//! Code generation from normalized trees.
//!
//! The [`CodeGenerator`] walks a tree that has been through the
//! [`Normalizer`](crate::normalize::Normalizer) and writes instructions to an
//! [`InstructionSink`]. Every node leaves exactly one value of its type on the
//! operand stack, or nothing when its type is `void`.
//!
//! Value-type receivers are passed by address so that calls and field stores
//! act on the storage itself. A visit is therefore asked for an [`Access`] and
//! reports what it actually [`Produced`]; when an address was wanted but only a
//! value could be produced, the value is spilled to a fresh local and that
//! local's address is used instead.

mod calls;
mod control;
mod literals;
mod operators;
mod storage;

use exprtree_core::{
    BinaryExpr, BinaryOp, BlockExpr, CallExpr, CompileError, CompileResult, ConditionalExpr,
    ConstantExpr, DataType, Expr, MemberExpr, NewExpr, UnaryExpr, UnaryOp, Variable,
};

use crate::bytecode::OpCode;
use crate::scope::LocalScope;
use crate::sink::{InstructionSink, Operand};
use crate::visit::{dispatch, ExprVisitor};

/// What the parent wants a child to leave on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Value,
    /// The address of the child's storage. Only meaningful for value types.
    Address,
}

/// What a visit left on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produced {
    Nothing,
    Value,
    Address,
}

/// Emits instructions for one method body.
pub struct CodeGenerator<'s> {
    sink: &'s mut dyn InstructionSink,
    scope: LocalScope,
}

impl<'s> CodeGenerator<'s> {
    pub fn new(sink: &'s mut dyn InstructionSink, scope: LocalScope) -> Self {
        Self { sink, scope }
    }

    /// Emit `expr`, leaving its value (if any) on the stack.
    pub fn generate(&mut self, expr: &Expr) -> CompileResult<Produced> {
        self.emit_value(expr)
    }

    // ==========================================================================
    // Entry points used by the handlers
    // ==========================================================================

    pub(crate) fn sink(&mut self) -> &mut dyn InstructionSink {
        &mut *self.sink
    }

    pub(crate) fn scope(&mut self) -> &mut LocalScope {
        &mut self.scope
    }

    /// Emit `expr` as a value.
    pub(crate) fn emit_value(&mut self, expr: &Expr) -> CompileResult<Produced> {
        dispatch(self, expr, Access::Value)
    }

    /// Emit `expr`, which must produce a value, for use as an operand.
    pub(crate) fn emit_operand(&mut self, expr: &Expr) -> CompileResult<()> {
        match self.emit_value(expr)? {
            Produced::Nothing => Err(CompileError::unsupported(
                expr.kind(),
                format!("{} of type {} used as a value", expr.kind(), expr.data_type()),
            )),
            Produced::Value | Produced::Address => Ok(()),
        }
    }

    /// Emit the address of a value-typed `expr`, spilling to a local when the
    /// node cannot be addressed directly.
    pub(crate) fn emit_address(&mut self, expr: &Expr) -> CompileResult<()> {
        let ty = expr.data_type();
        if !ty.is_value_type() {
            return Err(CompileError::unsupported(
                expr.kind(),
                format!("address of {} requested for reference type {ty}", expr.kind()),
            ));
        }
        match dispatch(self, expr, Access::Address)? {
            Produced::Address => Ok(()),
            Produced::Value => {
                let slot = self.sink.declare_local(ty);
                tracing::trace!(%slot, ty = %ty, "spill value for address");
                self.sink.emit_with(OpCode::StoreLocal, Operand::Local(slot));
                self.sink.emit_with(OpCode::LoadLocalAddress, Operand::Local(slot));
                Ok(())
            }
            Produced::Nothing => Err(CompileError::unsupported(
                expr.kind(),
                format!("{} produced no value to address", expr.kind()),
            )),
        }
    }

    /// Emit a receiver: by address for value types, by value otherwise.
    pub(crate) fn emit_receiver(&mut self, instance: &Expr) -> CompileResult<()> {
        if instance.data_type().is_value_type() {
            self.emit_address(instance)
        } else {
            self.emit_operand(instance)
        }
    }

    /// Emit `expr` for its effects only.
    pub(crate) fn emit_discard(&mut self, expr: &Expr) -> CompileResult<()> {
        if self.emit_value(expr)? != Produced::Nothing {
            self.sink.emit(OpCode::Pop);
        }
        Ok(())
    }

    fn emit_all(&mut self, exprs: &[Expr]) -> CompileResult<()> {
        exprs.iter().try_for_each(|e| self.emit_operand(e))
    }
}

/// What a node of type `ty` leaves behind as a value.
fn produced_for(ty: &DataType) -> Produced {
    if ty.is_void() {
        Produced::Nothing
    } else {
        Produced::Value
    }
}

impl ExprVisitor for CodeGenerator<'_> {
    type Output = Produced;
    type Request = Access;

    fn visit_constant(&mut self, expr: &Expr, node: &ConstantExpr, _: Access) -> CompileResult<Produced> {
        literals::emit_constant(self, expr, node)
    }

    fn visit_default(&mut self, expr: &Expr, ty: &DataType, _: Access) -> CompileResult<Produced> {
        literals::emit_default(expr, ty)
    }

    fn visit_variable(&mut self, expr: &Expr, node: &Variable, req: Access) -> CompileResult<Produced> {
        storage::emit_variable(self, expr, node, req)
    }

    fn visit_member(&mut self, expr: &Expr, node: &MemberExpr, req: Access) -> CompileResult<Produced> {
        storage::emit_member(self, expr, node, req)
    }

    fn visit_binary(&mut self, expr: &Expr, node: &BinaryExpr, req: Access) -> CompileResult<Produced> {
        match node.op {
            BinaryOp::Assign => storage::emit_assign(self, expr, node),
            BinaryOp::Equal | BinaryOp::NotEqual => operators::emit_equality(self, node),
            BinaryOp::AndAlso => control::emit_and_also(self, node),
            BinaryOp::Coalesce => self.unhandled(expr, req),
        }
    }

    fn visit_unary(&mut self, expr: &Expr, node: &UnaryExpr, _: Access) -> CompileResult<Produced> {
        match node.op {
            UnaryOp::Convert => operators::emit_convert(self, expr, node),
            UnaryOp::Not => operators::emit_not(self, expr, node),
            UnaryOp::TypeAs => operators::emit_type_as(self, expr, node),
        }
    }

    fn visit_conditional(
        &mut self,
        expr: &Expr,
        node: &ConditionalExpr,
        _: Access,
    ) -> CompileResult<Produced> {
        control::emit_conditional(self, expr, node)
    }

    fn visit_block(&mut self, expr: &Expr, node: &BlockExpr, _: Access) -> CompileResult<Produced> {
        control::emit_block(self, expr, node)
    }

    fn visit_call(&mut self, expr: &Expr, node: &CallExpr, _: Access) -> CompileResult<Produced> {
        calls::emit_call(self, expr, node)
    }

    fn visit_new(&mut self, _: &Expr, node: &NewExpr, _: Access) -> CompileResult<Produced> {
        calls::emit_new(self, node)
    }
}

fn unsupported(expr: &Expr, reason: impl Into<String>) -> CompileError {
    CompileError::unsupported(expr.kind(), reason)
}
