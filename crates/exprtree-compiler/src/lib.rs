//! exprtree compiler
//!
//! Compiles immutable expression trees into stack-machine instructions in two
//! passes over the same tree walker:
//!
//! - **Normalization**: sugared nodes (property and indexer access, coalesce,
//!   nullable equality, object initializers, conversions) are rewritten into a
//!   small primitive subset
//! - **Code generation**: the primitive tree is emitted into an
//!   [`InstructionSink`]
//!
//! ## Modules
//!
//! - [`bytecode`]: Bytecode types (OpCode, Instruction, BytecodeChunk)
//! - [`codegen`]: Code generation with value/address requests
//! - [`emit`]: In-memory instruction sink producing a `BytecodeChunk`
//! - [`normalize`]: The rewriting pass
//! - [`options`]: Compiler options
//! - [`scope`]: Parameter and block-local slot tracking
//! - [`sink`]: The abstract instruction sink
//! - [`visit`]: Per-kind visitor dispatch

pub mod bytecode;
pub mod codegen;
mod compiler;
pub mod emit;
pub mod normalize;
pub mod options;
pub mod scope;
pub mod sink;
pub mod visit;

pub use bytecode::{BytecodeChunk, Instruction, OpCode, OperandKind};
pub use codegen::{Access, CodeGenerator, Produced};
pub use compiler::{compile, ExprCompiler};
pub use emit::{BytecodeEmitter, EmitError};
pub use normalize::Normalizer;
pub use options::{CompilerOptions, ReceiverSlot};
pub use scope::LocalScope;
pub use sink::{InstructionSink, Label, LocalSlot, Operand};
pub use visit::{dispatch, ExprVisitor};

// Re-export CompileError from core for convenience
pub use exprtree_core::{CompileError, CompileResult};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub(crate) mod test_utils {
    /// Install a `debug` level subscriber writing to the test output.
    /// Honours `RUST_LOG` when set.
    pub fn init_test_logging() {
        use tracing_subscriber::{fmt, EnvFilter};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
