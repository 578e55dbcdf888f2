//! The abstract instruction sink code is generated into.
//!
//! The code generator only ever talks to an [`InstructionSink`]. Encoding,
//! label resolution and local allocation belong to the sink, so the same
//! generator can target an in-memory [`BytecodeChunk`](crate::bytecode::BytecodeChunk)
//! or a host's own method builder.

use std::fmt;

use exprtree_core::{ConstructorRef, DataType, FieldRef, MethodRef};

use crate::bytecode::{OpCode, OperandKind};

/// A forward or backward branch target, valid for the sink that defined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A local storage slot of the method being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalSlot(pub u16);

impl fmt::Display for LocalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loc{}", self.0)
    }
}

/// Inline instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Int(i32),
    Str(String),
    Type(DataType),
    Method(MethodRef),
    Constructor(ConstructorRef),
    Field(FieldRef),
    Local(LocalSlot),
    Arg(u16),
    Label(Label),
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Int(_) => OperandKind::Int,
            Operand::Str(_) => OperandKind::Str,
            Operand::Type(_) => OperandKind::Type,
            Operand::Method(_) => OperandKind::Method,
            Operand::Constructor(_) => OperandKind::Constructor,
            Operand::Field(_) => OperandKind::Field,
            Operand::Local(_) => OperandKind::Local,
            Operand::Arg(_) => OperandKind::Arg,
            Operand::Label(_) => OperandKind::Label,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(v) => write!(f, "{v}"),
            Operand::Str(s) => write!(f, "{s:?}"),
            Operand::Type(ty) => write!(f, "{ty}"),
            Operand::Method(m) => write!(f, "{m}"),
            Operand::Constructor(c) => write!(f, "{}::new/{}", c.declaring_type, c.params.len()),
            Operand::Field(field) => write!(f, "{}::{}", field.declaring_type, field.name),
            Operand::Local(slot) => write!(f, "{slot}"),
            Operand::Arg(index) => write!(f, "arg{index}"),
            Operand::Label(label) => write!(f, "{label}"),
        }
    }
}

/// Receives the instructions of one method body.
///
/// Sinks may defer validation (unknown labels, operand mismatches) until the
/// body is finished. After a compile error the sink's state is unspecified and
/// it should be discarded.
pub trait InstructionSink {
    /// Append an instruction without an operand.
    fn emit(&mut self, op: OpCode);

    /// Append an instruction with an inline operand.
    fn emit_with(&mut self, op: OpCode, operand: Operand);

    /// Allocate a fresh local slot of the given type.
    fn declare_local(&mut self, data_type: &DataType) -> LocalSlot;

    /// Create a label that is not yet bound to a position.
    fn define_label(&mut self) -> Label;

    /// Bind `label` to the position of the next instruction.
    fn mark_label(&mut self, label: Label);

    fn emit_bool(&mut self, value: bool) {
        self.emit(if value { OpCode::PushTrue } else { OpCode::PushFalse });
    }

    fn emit_jump(&mut self, op: OpCode, target: Label) {
        self.emit_with(op, Operand::Label(target));
    }
}
