//! Shared helpers for the integration tests.

#![allow(dead_code)]

use exprtree::vm::{Value, Vm};
use exprtree::{compile_chunk, BytecodeChunk, Expr, TypeRegistry, Variable};

/// Install a `debug` level subscriber writing to the test output.
/// Honours `RUST_LOG` when set.
pub fn init_test_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Compile against `registry`, failing the test on any error.
pub fn build(registry: &TypeRegistry, tree: &Expr, params: &[Variable]) -> BytecodeChunk {
    compile_chunk(tree, params, registry)
        .unwrap_or_else(|e| panic!("failed to compile {}: {e}", tree.kind()))
}

/// Compile and run a static body with no bindings.
pub fn eval(registry: &TypeRegistry, tree: &Expr, params: &[Variable], args: &[Value]) -> Option<Value> {
    let chunk = build(registry, tree, params);
    Vm::new(registry)
        .run(&chunk, None, args)
        .unwrap_or_else(|e| panic!("failed to run {}: {e}", tree.kind()))
}
