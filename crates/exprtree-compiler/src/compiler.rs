//! Compile entry points.
//!
//! A compile normalizes the tree once, generates code for the result and
//! finishes with `Return`:
//!
//! ```
//! use exprtree_compiler::emit::BytecodeEmitter;
//! use exprtree_compiler::ExprCompiler;
//! use exprtree_core::{DataType, Expr, NoOperators, VarId, Variable};
//!
//! let x = Variable::new(VarId(0), "x", DataType::int32());
//! let tree = Expr::block(
//!     vec![x.clone()],
//!     vec![
//!         Expr::assign(Expr::variable(&x), Expr::int(2)),
//!         Expr::equal(Expr::variable(&x), Expr::int(2)),
//!     ],
//! );
//!
//! let mut emitter = BytecodeEmitter::new();
//! ExprCompiler::new(NoOperators).compile(&tree, &[], &mut emitter).unwrap();
//! let chunk = emitter.finish().unwrap();
//! assert_eq!(chunk.locals(), &[DataType::int32()]);
//! ```

use exprtree_core::{CompileResult, Expr, OperatorResolver, Variable};

use crate::bytecode::OpCode;
use crate::codegen::CodeGenerator;
use crate::normalize::Normalizer;
use crate::options::CompilerOptions;
use crate::scope::LocalScope;
use crate::sink::InstructionSink;

/// Compiles expression trees into method bodies.
///
/// Holds no per-compile state, so one compiler can be shared across threads
/// when its resolver can.
#[derive(Debug, Clone)]
pub struct ExprCompiler<R> {
    resolver: R,
    options: CompilerOptions,
}

impl<R: OperatorResolver> ExprCompiler<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            options: CompilerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Compile `expr` as the body of a method taking `params`.
    ///
    /// On error the sink holds a partial body and should be discarded.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(
        &self,
        expr: &Expr,
        params: &[Variable],
        sink: &mut dyn InstructionSink,
    ) -> CompileResult<()> {
        tracing::debug!(kind = %expr.kind(), ty = %expr.data_type(), params = params.len(), "compile");

        let scope = LocalScope::with_params(params, self.options.receiver)?;
        let mut normalizer = Normalizer::new(&self.resolver);
        normalizer.reserve(params.iter().map(|p| p.id));
        let normalized = normalizer.normalize(expr)?;

        let produced = CodeGenerator::new(&mut *sink, scope).generate(&normalized)?;
        if self.options.emit_return {
            sink.emit(OpCode::Return);
        }

        tracing::debug!(kind = %normalized.kind(), ?produced, "compiled");
        Ok(())
    }
}

/// Compile with default options.
pub fn compile(
    expr: &Expr,
    params: &[Variable],
    resolver: &dyn OperatorResolver,
    sink: &mut dyn InstructionSink,
) -> CompileResult<()> {
    ExprCompiler::new(resolver).compile(expr, params, sink)
}

#[cfg(test)]
mod tests {
    use exprtree_core::{DataType, ExprKind, IndexExpr, NoOperators, VarId};

    use super::*;
    use crate::emit::BytecodeEmitter;
    use crate::options::ReceiverSlot;
    use crate::sink::Operand;
    use crate::test_utils::init_test_logging;

    #[test]
    fn compile_ends_with_return() {
        init_test_logging();
        let mut emitter = BytecodeEmitter::new();
        compile(&Expr::int(4), &[], &NoOperators, &mut emitter).unwrap();
        emitter.finish().unwrap().assert_opcodes(&[OpCode::PushInt, OpCode::Return]);
    }

    #[test]
    fn epilogue_can_be_left_to_the_caller() {
        let mut emitter = BytecodeEmitter::new();
        ExprCompiler::new(NoOperators)
            .with_options(CompilerOptions::new().with_emit_return(false))
            .compile(&Expr::int(4), &[], &mut emitter)
            .unwrap();
        emitter.finish().unwrap().assert_opcodes(&[OpCode::PushInt]);
    }

    #[test]
    fn static_bodies_start_parameters_at_zero() {
        let x = Variable::new(VarId(0), "x", DataType::int32());
        let mut emitter = BytecodeEmitter::new();
        ExprCompiler::new(NoOperators)
            .with_options(CompilerOptions::new().with_receiver(ReceiverSlot::None))
            .compile(&Expr::variable(&x), &[x.clone()], &mut emitter)
            .unwrap();
        let chunk = emitter.finish().unwrap();
        assert_eq!(chunk.instructions()[0].operand, Some(Operand::Arg(0)));
    }

    #[test]
    fn fresh_locals_do_not_collide_with_unused_parameters() {
        init_test_logging();
        let maybe = DataType::nullable(&DataType::int32());
        let unused = Variable::new(VarId(7), "unused", DataType::int32());
        let tree = Expr::coalesce(Expr::null(maybe), Expr::int(1));

        let mut emitter = BytecodeEmitter::new();
        compile(&tree, &[unused], &NoOperators, &mut emitter).unwrap();
        let chunk = emitter.finish().unwrap();
        assert_eq!(chunk.locals().len(), 1);
        assert_eq!(chunk.opcodes().last(), Some(&OpCode::Return));
    }

    #[test]
    fn errors_name_the_offending_kind() {
        let ghost = Variable::new(VarId(3), "ghost", DataType::int32());
        let mut emitter = BytecodeEmitter::new();
        let err = compile(&Expr::variable(&ghost), &[], &NoOperators, &mut emitter).unwrap_err();
        assert_eq!(err.kind(), ExprKind::Variable);
    }

    #[test]
    fn index_without_indexer_is_rejected() {
        let xs = Variable::new(VarId(0), "xs", DataType::object());
        let tree = Expr::Index(IndexExpr {
            instance: Box::new(Expr::variable(&xs)),
            indexer: None,
            arguments: vec![Expr::int(0)],
            data_type: DataType::int32(),
        });
        let mut emitter = BytecodeEmitter::new();
        let err = compile(&tree, &[xs], &NoOperators, &mut emitter).unwrap_err();
        assert_eq!(err.kind(), ExprKind::Index);
    }
}
