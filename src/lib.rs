//! exprtree
//!
//! Compiles typed expression trees into stack-machine method bodies, and runs
//! them on a small reference machine.
//!
//! The work is split across the workspace crates, re-exported here:
//!
//! - `exprtree-core`: the expression model, types and member descriptors
//! - `exprtree-registry`: the type registry and operator resolution
//! - `exprtree-compiler`: normalization and code generation
//! - [`vm`]: the reference machine, living in this crate

pub mod vm;

use thiserror::Error;

pub use exprtree_compiler::{
    compile, BytecodeChunk, BytecodeEmitter, CompilerOptions, EmitError, ExprCompiler,
    InstructionSink, Instruction, Label, LocalSlot, Normalizer, OpCode, Operand, ReceiverSlot,
};
pub use exprtree_core::{
    nullable, CompileError, CompileResult, ConstructorDef, ConstructorRef, DataType, Expr,
    ExprKind, FieldDef, FieldRef, Intrinsic, Member, MemberBinding, MethodDef, MethodRef,
    MethodTraits, NewExpr, NoOperators, Operator, OperatorResolver, PropertyDef, PropertyRef,
    TypeHash, TypeKind, VarId, Variable,
};
pub use exprtree_registry::{CachedResolver, RegistrationError, TypeRegistry};

pub mod prelude {
    pub use crate::vm::{Value, Vm};
    pub use crate::{
        compile_chunk, DataType, Expr, ExprCompiler, ExprTreeError, TypeRegistry, Variable,
    };
}

/// Any failure along the register, compile, run pipeline.
#[derive(Debug, Error)]
pub enum ExprTreeError {
    #[error("registration failed: {0}")]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("emit failed: {0}")]
    Emit(#[from] EmitError),

    #[error("runtime error: {0}")]
    Runtime(#[from] vm::RuntimeError),
}

/// Compile `expr` with default options into a fresh chunk.
pub fn compile_chunk(
    expr: &Expr,
    params: &[Variable],
    resolver: &dyn OperatorResolver,
) -> Result<BytecodeChunk, ExprTreeError> {
    let mut emitter = BytecodeEmitter::new();
    compile(expr, params, resolver, &mut emitter)?;
    Ok(emitter.finish()?)
}
