//! Variable storage tracking for code generation.
//!
//! `LocalScope` maps variable identities to where they live:
//! - Parameters get fixed argument slots for the whole compile
//! - Block locals live in a stack of frames, pushed on block entry and popped
//!   on exit
//!
//! Identities are unique within a compile. Declaring an identity that is
//! already visible (as a parameter or in any open frame) is rejected.

use exprtree_core::{CompileError, DataType, ExprKind, VarId, Variable};
use rustc_hash::FxHashMap;

use crate::options::ReceiverSlot;
use crate::sink::LocalSlot;

// ============================================================================
// Types
// ============================================================================

/// Where a variable's value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarSlot {
    Arg(u16),
    Local(LocalSlot),
}

/// A visible variable.
#[derive(Debug, Clone)]
pub struct ScopedVar {
    pub slot: VarSlot,
    pub data_type: DataType,
}

// ============================================================================
// LocalScope
// ============================================================================

#[derive(Debug, Default)]
pub struct LocalScope {
    /// Parameters by identity
    params: FxHashMap<VarId, ScopedVar>,

    /// Open block frames, innermost last
    frames: Vec<FxHashMap<VarId, ScopedVar>>,
}

impl LocalScope {
    /// Create a scope with no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope binding `params` to consecutive argument slots.
    pub fn with_params(params: &[Variable], receiver: ReceiverSlot) -> Result<Self, CompileError> {
        let mut scope = Self::new();
        let first = receiver.first_param_slot();
        for (i, param) in params.iter().enumerate() {
            let index = u16::try_from(i)
                .ok()
                .and_then(|i| i.checked_add(first))
                .ok_or_else(|| CompileError::unsupported(ExprKind::Variable, "too many parameters"))?;
            if scope.params.contains_key(&param.id) {
                return Err(duplicate(param));
            }
            scope.params.insert(
                param.id,
                ScopedVar {
                    slot: VarSlot::Arg(index),
                    data_type: param.data_type.clone(),
                },
            );
        }
        Ok(scope)
    }

    // ==========================================================================
    // Scope Management
    // ==========================================================================

    /// Enter a new block frame.
    pub fn push_scope(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Exit the innermost block frame, forgetting its locals.
    pub fn pop_scope(&mut self) {
        self.frames.pop();
    }

    /// Number of open block frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    /// Bind a block local to `slot` in the innermost frame.
    pub fn declare(&mut self, var: &Variable, slot: LocalSlot) -> Result<(), CompileError> {
        if self.lookup(var.id).is_some() {
            return Err(duplicate(var));
        }
        let frame = self.frames.last_mut().ok_or_else(|| {
            CompileError::unsupported(ExprKind::Block, "local declared outside a block")
        })?;
        frame.insert(
            var.id,
            ScopedVar {
                slot: VarSlot::Local(slot),
                data_type: var.data_type.clone(),
            },
        );
        Ok(())
    }

    /// Find a visible variable; innermost frames shadow parameters.
    pub fn lookup(&self, id: VarId) -> Option<&ScopedVar> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(&id))
            .or_else(|| self.params.get(&id))
    }
}

fn duplicate(var: &Variable) -> CompileError {
    CompileError::unsupported(
        ExprKind::Variable,
        format!("variable {} ({}) declared twice", var.name, var.id),
    )
}
