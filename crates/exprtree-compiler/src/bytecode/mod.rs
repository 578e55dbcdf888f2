//! Bytecode types for the exprtree compiler.
//!
//! - [`OpCode`] - The instruction set of the target stack machine
//! - [`Instruction`] - An opcode with its inline operand
//! - [`BytecodeChunk`] - Compiled instructions for one method body

mod chunk;
mod opcode;

pub use chunk::{BytecodeChunk, Instruction};
pub use opcode::{OpCode, OperandKind};
