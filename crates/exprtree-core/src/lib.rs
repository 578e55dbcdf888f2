//! Core types for the exprtree compiler.
//!
//! ## Modules
//!
//! - [`expr`]: The immutable expression node model
//! - [`data_type`]: Static types and their value/reference classification
//! - [`type_hash`]: Deterministic identity hashes for types and members
//! - [`members`]: Method, field, property and constructor descriptors
//! - [`nullable`]: Members synthesised for nullable types
//! - [`operator`]: Operator names and the resolver trait
//! - [`error`]: Compile errors

pub mod data_type;
pub mod error;
pub mod expr;
pub mod members;
pub mod nullable;
pub mod operator;
pub mod type_hash;

pub use data_type::{DataType, TypeBuilder, TypeKind};
pub use error::{CompileError, CompileResult};
pub use expr::{
    BinaryExpr, BinaryOp, BlockExpr, CallExpr, ConditionalExpr, ConstantExpr, ConstantValue,
    Expr, ExprKind, IndexExpr, MemberBinding, MemberExpr, MemberInitExpr, NewExpr, UnaryExpr,
    UnaryOp, VarId, Variable,
};
pub use members::{
    ConstructorDef, ConstructorRef, FieldDef, FieldRef, Intrinsic, Member, MethodDef, MethodRef,
    MethodTraits, PropertyDef, PropertyRef,
};
pub use operator::{NoOperators, Operator, OperatorResolver};
pub use type_hash::TypeHash;
