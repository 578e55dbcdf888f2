//! Per-kind dispatch shared by the normalizer and the code generator.
//!
//! An [`ExprVisitor`] has one method per node kind. Every method defaults to
//! [`ExprVisitor::unhandled`], so a pass only implements the kinds it knows and
//! everything else fails (or is passed through) in one place. [`dispatch`] is
//! the only place that matches on the node enum.

use exprtree_core::{
    BinaryExpr, BlockExpr, CallExpr, CompileError, ConditionalExpr, ConstantExpr, DataType, Expr,
    IndexExpr, MemberExpr, MemberInitExpr, NewExpr, UnaryExpr, Variable,
};

/// A pass over expression nodes.
///
/// `Request` is passed down with every visit (the code generator uses it to ask
/// for a value or an address); `Output` is what each visit produces.
pub trait ExprVisitor {
    type Output;
    type Request: Copy;

    /// Called for every kind without a specific handler.
    fn unhandled(&mut self, expr: &Expr, _req: Self::Request) -> Result<Self::Output, CompileError> {
        Err(CompileError::unsupported(
            expr.kind(),
            format!("no handler for {} of type {}", expr.kind(), expr.data_type()),
        ))
    }

    fn visit_constant(
        &mut self,
        expr: &Expr,
        _node: &ConstantExpr,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_variable(
        &mut self,
        expr: &Expr,
        _node: &Variable,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_member(
        &mut self,
        expr: &Expr,
        _node: &MemberExpr,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_index(
        &mut self,
        expr: &Expr,
        _node: &IndexExpr,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_binary(
        &mut self,
        expr: &Expr,
        _node: &BinaryExpr,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_unary(
        &mut self,
        expr: &Expr,
        _node: &UnaryExpr,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_conditional(
        &mut self,
        expr: &Expr,
        _node: &ConditionalExpr,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_block(
        &mut self,
        expr: &Expr,
        _node: &BlockExpr,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_call(
        &mut self,
        expr: &Expr,
        _node: &CallExpr,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_new(
        &mut self,
        expr: &Expr,
        _node: &NewExpr,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_member_init(
        &mut self,
        expr: &Expr,
        _node: &MemberInitExpr,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }

    fn visit_default(
        &mut self,
        expr: &Expr,
        _ty: &DataType,
        req: Self::Request,
    ) -> Result<Self::Output, CompileError> {
        self.unhandled(expr, req)
    }
}

/// Route `expr` to the visitor method for its kind.
pub fn dispatch<V: ExprVisitor + ?Sized>(
    visitor: &mut V,
    expr: &Expr,
    req: V::Request,
) -> Result<V::Output, CompileError> {
    match expr {
        Expr::Constant(node) => visitor.visit_constant(expr, node, req),
        Expr::Variable(node) => visitor.visit_variable(expr, node, req),
        Expr::Member(node) => visitor.visit_member(expr, node, req),
        Expr::Index(node) => visitor.visit_index(expr, node, req),
        Expr::Binary(node) => visitor.visit_binary(expr, node, req),
        Expr::Unary(node) => visitor.visit_unary(expr, node, req),
        Expr::Conditional(node) => visitor.visit_conditional(expr, node, req),
        Expr::Block(node) => visitor.visit_block(expr, node, req),
        Expr::Call(node) => visitor.visit_call(expr, node, req),
        Expr::New(node) => visitor.visit_new(expr, node, req),
        Expr::MemberInit(node) => visitor.visit_member_init(expr, node, req),
        Expr::Default(ty) => visitor.visit_default(expr, ty, req),
    }
}
