use exprtree_compiler::{Label, OpCode};
use thiserror::Error;

/// Errors raised while executing a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("stack underflow at {op}")]
    StackUnderflow { op: OpCode },

    #[error("{op} expected {expected}, found {found}")]
    TypeMismatch {
        op: OpCode,
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot cast {from} to {to}")]
    InvalidCast { from: String, to: String },

    #[error("null reference in {op}")]
    NullReference { op: OpCode },

    #[error("no body bound for method {0}")]
    UnboundMethod(String),

    #[error("no body bound for constructor of {0}")]
    UnboundConstructor(String),

    #[error("nullable value is absent")]
    AbsentValue,

    #[error("invalid address: {0}")]
    BadAddress(String),

    #[error("argument slot {0} is out of range")]
    BadArgument(u16),

    #[error("local slot {0} is out of range")]
    BadLocal(u16),

    #[error("field index {index} is out of range for {ty}")]
    BadField { ty: String, index: u16 },

    #[error("jump to unbound label {0}")]
    BadLabel(Label),

    #[error("{0} operand missing or of the wrong kind")]
    BadOperand(OpCode),

    #[error("{0} values left on the stack at return")]
    StackImbalance(usize),

    #[error("native call failed: {0}")]
    Native(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
