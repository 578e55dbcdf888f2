//! Bytecode chunk for one compiled method body.
//!
//! A `BytecodeChunk` holds the instruction list, the position every label was
//! bound to, and the types of the locals the body declared.

use std::fmt;

use exprtree_core::DataType;

use super::OpCode;
use crate::sink::{Label, LocalSlot, Operand};

/// One instruction with its inline operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub op: OpCode,
    pub operand: Option<Operand>,
}

impl Instruction {
    pub fn new(op: OpCode, operand: Option<Operand>) -> Self {
        Self { op, operand }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(operand) => write!(f, "{} {}", self.op, operand),
            None => write!(f, "{}", self.op),
        }
    }
}

/// Compiled instructions for a single method body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytecodeChunk {
    /// The instructions, in execution order.
    instructions: Vec<Instruction>,
    /// Instruction index each label is bound to, indexed by label number.
    labels: Vec<usize>,
    /// Local types, indexed by slot.
    locals: Vec<DataType>,
}

impl BytecodeChunk {
    /// Create a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a chunk from already resolved parts.
    pub fn from_parts(
        instructions: Vec<Instruction>,
        labels: Vec<usize>,
        locals: Vec<DataType>,
    ) -> Self {
        Self {
            instructions,
            labels,
            locals,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn get(&self, offset: usize) -> Option<&Instruction> {
        self.instructions.get(offset)
    }

    /// Instruction index a label is bound to.
    pub fn label_target(&self, label: Label) -> Option<usize> {
        self.labels.get(label.0 as usize).copied()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Declared local types, indexed by slot.
    pub fn locals(&self) -> &[DataType] {
        &self.locals
    }

    pub fn local_type(&self, slot: LocalSlot) -> Option<&DataType> {
        self.locals.get(slot.0 as usize)
    }

    /// Get the number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Extract all opcodes from the chunk, dropping operands.
    ///
    /// This is useful for testing instruction sequences without worrying about
    /// specific operand values.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instructions.iter().map(|i| i.op).collect()
    }

    /// Count instructions with the given opcode.
    pub fn count_op(&self, op: OpCode) -> usize {
        self.instructions.iter().filter(|i| i.op == op).count()
    }

    /// Check if this chunk contains exactly the given opcode sequence.
    ///
    /// This ignores operand values, only checking the opcodes themselves.
    /// Panics with a descriptive message if the sequences don't match.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}\n{}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            self,
        );
    }

    /// Check if this chunk contains the given opcodes (in order, but not necessarily contiguous).
    ///
    /// Useful for verifying key opcodes are present without checking every instruction.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:\n{}",
                remaining, self,
            );
        }
    }
}

/// Disassembly listing: locals, then one instruction per line with labels
/// printed where they are bound.
impl fmt::Display for BytecodeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (slot, ty) in self.locals.iter().enumerate() {
            writeln!(f, ".local loc{slot}: {ty}")?;
        }
        for offset in 0..=self.instructions.len() {
            for (label, _) in self.labels.iter().enumerate().filter(|(_, t)| **t == offset) {
                writeln!(f, "L{label}:")?;
            }
            if let Some(instruction) = self.instructions.get(offset) {
                writeln!(f, "  {offset:04}  {instruction}")?;
            }
        }
        Ok(())
    }
}
