//! Normalization pass: rewrites sugared nodes into the primitive subset.
//!
//! After normalization a tree contains only constants, variables, field
//! accesses, calls, object construction, `Assign` to variables and fields,
//! `AndAlso`, `Equal`/`NotEqual` without a user operator, `Convert` without a
//! method, `Not`, `TypeAs`, conditionals, blocks and `Default`.
//!
//! Every rule builds its replacement from the *unnormalized* children and then
//! normalizes the replacement, so each child is visited exactly once and the
//! replacement itself is subject to further rules. Nodes with no applicable
//! rule are kept; the code generator decides whether it can handle them.
//!
//! The pass is pure: fresh locals are numbered after the largest identity in
//! the input (and any reserved identities), so the same input always produces
//! the same output, and normalizing a normalized tree returns it unchanged.
//!
//! # Example
//!
//! ```
//! use exprtree_compiler::normalize::Normalizer;
//! use exprtree_core::{DataType, Expr, NoOperators};
//!
//! let maybe_int = DataType::nullable(&DataType::int32());
//! let tree = Expr::coalesce(Expr::null(maybe_int), Expr::int(7));
//!
//! let normalized = Normalizer::new(&NoOperators).normalize(&tree).unwrap();
//! assert!(matches!(normalized, Expr::Block(_)));
//! assert_eq!(normalized.data_type(), tree.data_type());
//! ```

mod assign;
mod convert;
mod members;
mod operators;

use exprtree_core::{
    nullable, BinaryExpr, BinaryOp, BlockExpr, CallExpr, CompileResult, ConditionalExpr,
    ConstantExpr, DataType, Expr, IndexExpr, MemberExpr, MemberInitExpr, MethodRef, NewExpr,
    OperatorResolver, UnaryExpr, UnaryOp, VarId, Variable,
};

use crate::visit::{dispatch, ExprVisitor};

/// Rewrites trees into the primitive subset understood by the code generator.
pub struct Normalizer<'r> {
    resolver: &'r dyn OperatorResolver,
    /// Largest identity that fresh locals must not collide with
    reserved: Option<VarId>,
    next_id: u32,
}

impl<'r> Normalizer<'r> {
    pub fn new(resolver: &'r dyn OperatorResolver) -> Self {
        Self {
            resolver,
            reserved: None,
            next_id: 0,
        }
    }

    /// Keep fresh locals clear of identities that do not appear in the tree,
    /// such as unused parameters.
    pub fn reserve(&mut self, ids: impl IntoIterator<Item = VarId>) -> &mut Self {
        self.reserved = self.reserved.into_iter().chain(ids).max();
        self
    }

    /// Normalize a whole tree.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn normalize(&mut self, expr: &Expr) -> CompileResult<Expr> {
        self.next_id = expr
            .max_var_id()
            .into_iter()
            .chain(self.reserved)
            .max()
            .map_or(0, |id| id.0 + 1);
        self.visit(expr)
    }

    fn visit(&mut self, expr: &Expr) -> CompileResult<Expr> {
        dispatch(self, expr, ())
    }

    fn visit_all(&mut self, exprs: &[Expr]) -> CompileResult<Vec<Expr>> {
        exprs.iter().map(|e| self.visit(e)).collect()
    }

    fn visit_opt(&mut self, expr: Option<&Expr>) -> CompileResult<Option<Box<Expr>>> {
        expr.map(|e| self.visit(e).map(Box::new)).transpose()
    }

    pub(crate) fn resolver(&self) -> &dyn OperatorResolver {
        self.resolver
    }

    /// A local no identity in the tree uses.
    fn fresh(&mut self, hint: &str, data_type: &DataType) -> Variable {
        let id = VarId(self.next_id);
        self.next_id += 1;
        Variable::new(id, &format!("{hint}{}", id.0), data_type.clone())
    }
}

// ============================================================================
// Tree helpers shared by the rules
// ============================================================================

/// `expr` as `ty`, converting only when the types differ.
fn coerce(expr: Expr, ty: &DataType) -> Expr {
    if expr.data_type() == ty {
        expr
    } else {
        Expr::convert(expr, ty.clone())
    }
}

/// A call typed as `ty` rather than the method's return type.
fn call_typed(instance: Option<Expr>, method: MethodRef, arguments: Vec<Expr>, ty: &DataType) -> Expr {
    Expr::Call(CallExpr {
        instance: instance.map(Box::new),
        method,
        arguments,
        data_type: ty.clone(),
    })
}

/// `expr.HasValue` on a nullable-typed expression.
fn has_value(expr: Expr) -> Expr {
    let prop = nullable::has_value(expr.data_type());
    Expr::property(Some(expr), prop)
}

/// `expr.Value` on a nullable-typed expression.
fn value_of(expr: Expr) -> Expr {
    let prop = nullable::value(expr.data_type());
    Expr::property(Some(expr), prop)
}

impl ExprVisitor for Normalizer<'_> {
    type Output = Expr;
    type Request = ();

    fn visit_constant(&mut self, expr: &Expr, _: &ConstantExpr, _: ()) -> CompileResult<Expr> {
        Ok(expr.clone())
    }

    fn visit_variable(&mut self, expr: &Expr, _: &Variable, _: ()) -> CompileResult<Expr> {
        Ok(expr.clone())
    }

    fn visit_default(&mut self, expr: &Expr, _: &DataType, _: ()) -> CompileResult<Expr> {
        Ok(expr.clone())
    }

    fn visit_member(&mut self, _: &Expr, node: &MemberExpr, _: ()) -> CompileResult<Expr> {
        members::normalize_member(self, node)
    }

    fn visit_index(&mut self, _: &Expr, node: &IndexExpr, _: ()) -> CompileResult<Expr> {
        members::normalize_index(self, node)
    }

    fn visit_member_init(&mut self, _: &Expr, node: &MemberInitExpr, _: ()) -> CompileResult<Expr> {
        members::normalize_member_init(self, node)
    }

    fn visit_binary(&mut self, expr: &Expr, node: &BinaryExpr, _: ()) -> CompileResult<Expr> {
        match node.op {
            BinaryOp::Assign => assign::normalize_assign(self, expr, node),
            BinaryOp::Coalesce => operators::normalize_coalesce(self, node),
            BinaryOp::Equal | BinaryOp::NotEqual => operators::normalize_equality(self, node),
            BinaryOp::AndAlso => Ok(Expr::Binary(BinaryExpr {
                op: node.op,
                left: Box::new(self.visit(&node.left)?),
                right: Box::new(self.visit(&node.right)?),
                data_type: node.data_type.clone(),
            })),
        }
    }

    fn visit_unary(&mut self, _: &Expr, node: &UnaryExpr, _: ()) -> CompileResult<Expr> {
        match node.op {
            UnaryOp::Convert => convert::normalize_convert(self, node),
            UnaryOp::Not | UnaryOp::TypeAs => Ok(Expr::Unary(UnaryExpr {
                op: node.op,
                operand: Box::new(self.visit(&node.operand)?),
                method: node.method.clone(),
                data_type: node.data_type.clone(),
            })),
        }
    }

    fn visit_conditional(&mut self, _: &Expr, node: &ConditionalExpr, _: ()) -> CompileResult<Expr> {
        Ok(Expr::Conditional(ConditionalExpr {
            test: Box::new(self.visit(&node.test)?),
            if_true: Box::new(self.visit(&node.if_true)?),
            if_false: Box::new(self.visit(&node.if_false)?),
            data_type: node.data_type.clone(),
        }))
    }

    fn visit_block(&mut self, _: &Expr, node: &BlockExpr, _: ()) -> CompileResult<Expr> {
        Ok(Expr::Block(BlockExpr {
            locals: node.locals.clone(),
            body: self.visit_all(&node.body)?,
            data_type: node.data_type.clone(),
        }))
    }

    fn visit_call(&mut self, _: &Expr, node: &CallExpr, _: ()) -> CompileResult<Expr> {
        Ok(Expr::Call(CallExpr {
            instance: self.visit_opt(node.instance.as_deref())?,
            method: node.method.clone(),
            arguments: self.visit_all(&node.arguments)?,
            data_type: node.data_type.clone(),
        }))
    }

    fn visit_new(&mut self, _: &Expr, node: &NewExpr, _: ()) -> CompileResult<Expr> {
        Ok(Expr::New(NewExpr {
            constructor: node.constructor.clone(),
            arguments: self.visit_all(&node.arguments)?,
            data_type: node.data_type.clone(),
        }))
    }
}
