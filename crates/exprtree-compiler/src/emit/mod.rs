//! In-memory instruction sink.
//!
//! [`BytecodeEmitter`] implements [`InstructionSink`] by recording instructions
//! into a [`BytecodeChunk`]. Problems that the sink interface cannot report
//! immediately (an unknown label, an operand of the wrong kind) are remembered
//! and returned by [`BytecodeEmitter::finish`].
//!
//! # Example
//!
//! ```
//! use exprtree_compiler::bytecode::OpCode;
//! use exprtree_compiler::emit::BytecodeEmitter;
//! use exprtree_compiler::sink::InstructionSink;
//!
//! let mut emitter = BytecodeEmitter::new();
//! let end = emitter.define_label();
//! emitter.emit_bool(true);
//! emitter.emit_jump(OpCode::JumpIfFalse, end);
//! emitter.mark_label(end);
//! emitter.emit(OpCode::Return);
//!
//! let chunk = emitter.finish().unwrap();
//! assert_eq!(chunk.len(), 3);
//! ```

mod labels;

use exprtree_core::DataType;
use thiserror::Error;

use crate::bytecode::{BytecodeChunk, Instruction, OpCode, OperandKind};
use crate::sink::{InstructionSink, Label, LocalSlot, Operand};
pub use labels::LabelTable;

/// Errors detected while assembling a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    /// A label was defined but never bound to a position.
    #[error("label {0} was never marked")]
    UnmarkedLabel(Label),

    /// A label was bound twice.
    #[error("label {0} was marked twice")]
    LabelMarkedTwice(Label),

    /// A label not defined by this emitter was used.
    #[error("unknown label {0}")]
    UnknownLabel(Label),

    /// An instruction carried the wrong operand, or none when one was required.
    #[error("{op} expects operand {expected:?}, got {found:?}")]
    OperandMismatch {
        op: OpCode,
        expected: Option<OperandKind>,
        found: Option<OperandKind>,
    },

    /// The body declared more locals than a slot index can address.
    #[error("too many locals")]
    TooManyLocals,
}

/// Records instructions for a single method body.
#[derive(Debug, Default)]
pub struct BytecodeEmitter {
    /// Instructions emitted so far
    instructions: Vec<Instruction>,

    /// Label definitions and bindings
    labels: LabelTable,

    /// Local types, indexed by slot
    locals: Vec<DataType>,

    /// First deferred error, reported by `finish`
    error: Option<EmitError>,
}

impl BytecodeEmitter {
    /// Create a new bytecode emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next instruction will be written at.
    pub fn current_offset(&self) -> usize {
        self.instructions.len()
    }

    /// Resolve labels and produce the finished chunk.
    pub fn finish(self) -> Result<BytecodeChunk, EmitError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let labels = self.labels.resolve()?;
        tracing::trace!(
            instructions = self.instructions.len(),
            labels = labels.len(),
            locals = self.locals.len(),
            "chunk finished"
        );
        Ok(BytecodeChunk::from_parts(
            self.instructions,
            labels,
            self.locals,
        ))
    }

    fn record(&mut self, error: EmitError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn push(&mut self, op: OpCode, operand: Option<Operand>) {
        let found = operand.as_ref().map(Operand::kind);
        if op.operand_kind() != found {
            self.record(EmitError::OperandMismatch {
                op,
                expected: op.operand_kind(),
                found,
            });
        }
        if let Some(Operand::Label(label)) = &operand
            && let Err(error) = self.labels.check(*label)
        {
            self.record(error);
        }
        self.instructions.push(Instruction::new(op, operand));
    }
}

impl InstructionSink for BytecodeEmitter {
    fn emit(&mut self, op: OpCode) {
        self.push(op, None);
    }

    fn emit_with(&mut self, op: OpCode, operand: Operand) {
        self.push(op, Some(operand));
    }

    fn declare_local(&mut self, data_type: &DataType) -> LocalSlot {
        let slot = match u16::try_from(self.locals.len()) {
            Ok(index) => LocalSlot(index),
            Err(_) => {
                self.record(EmitError::TooManyLocals);
                LocalSlot(u16::MAX)
            }
        };
        tracing::trace!(%slot, ty = %data_type, "declare local");
        self.locals.push(data_type.clone());
        slot
    }

    fn define_label(&mut self) -> Label {
        self.labels.define()
    }

    fn mark_label(&mut self, label: Label) {
        let offset = self.current_offset();
        tracing::trace!(%label, offset, "mark label");
        if let Err(error) = self.labels.mark(label, offset) {
            self.record(error);
        }
    }
}
