//! The expression node model.
//!
//! Trees are immutable values: every node owns its children and carries the static
//! type it evaluates to. A [`Variable`] may be referenced from many positions inside
//! the block that declares it; references are matched by [`VarId`], never by
//! pointer.
//!
//! # Example
//!
//! ```
//! use exprtree_core::{DataType, Expr, Variable, VarId};
//!
//! let x = Variable::new(VarId(0), "x", DataType::int32());
//! let body = Expr::block(
//!     vec![x.clone()],
//!     vec![
//!         Expr::assign(Expr::variable(&x), Expr::int(2)),
//!         Expr::equal(Expr::variable(&x), Expr::int(2)),
//!     ],
//! );
//! assert_eq!(body.data_type(), &DataType::bool());
//! ```

use std::fmt::{self, Display, Formatter};

use ordered_float::OrderedFloat;

use crate::members::{ConstructorRef, FieldRef, Member, MethodRef, PropertyRef};
use crate::DataType;

/// Identity of a parameter or local. Unique within one compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl Display for VarId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// A parameter or block local.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub id: VarId,
    pub name: String,
    pub data_type: DataType,
}

impl Variable {
    pub fn new(id: VarId, name: &str, data_type: DataType) -> Self {
        Self {
            id,
            name: name.to_string(),
            data_type,
        }
    }
}

/// Literal payload of a constant node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(OrderedFloat<f64>),
    String(String),
    /// Null reference, or an absent nullable value.
    Null,
    /// A type literal.
    Type(DataType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstantExpr {
    pub value: ConstantValue,
    pub data_type: DataType,
}

/// Field or property read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberExpr {
    /// `None` for static members.
    pub instance: Option<Box<Expr>>,
    pub member: Member,
    pub data_type: DataType,
}

/// Indexed read, through an indexer property when one is given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexExpr {
    pub instance: Box<Expr>,
    pub indexer: Option<PropertyRef>,
    pub arguments: Vec<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Assign,
    Coalesce,
    Equal,
    NotEqual,
    AndAlso,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Assign => "Assign",
            BinaryOp::Coalesce => "Coalesce",
            BinaryOp::Equal => "Equal",
            BinaryOp::NotEqual => "NotEqual",
            BinaryOp::AndAlso => "AndAlso",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Convert,
    Not,
    TypeAs,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Convert => "Convert",
            UnaryOp::Not => "Not",
            UnaryOp::TypeAs => "TypeAs",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    /// User conversion method attached to a `Convert`.
    pub method: Option<MethodRef>,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionalExpr {
    pub test: Box<Expr>,
    pub if_true: Box<Expr>,
    pub if_false: Box<Expr>,
    pub data_type: DataType,
}

/// A scope declaring locals, evaluating `body` in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockExpr {
    pub locals: Vec<Variable>,
    pub body: Vec<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallExpr {
    /// `None` for static methods.
    pub instance: Option<Box<Expr>>,
    pub method: MethodRef,
    pub arguments: Vec<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewExpr {
    pub constructor: ConstructorRef,
    pub arguments: Vec<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberBinding {
    pub member: Member,
    pub value: Expr,
}

/// Construction followed by member assignments, in binding order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberInitExpr {
    pub new_expr: NewExpr,
    pub bindings: Vec<MemberBinding>,
    pub data_type: DataType,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Constant(ConstantExpr),
    Variable(Variable),
    Member(MemberExpr),
    Index(IndexExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Conditional(ConditionalExpr),
    Block(BlockExpr),
    Call(CallExpr),
    New(NewExpr),
    MemberInit(MemberInitExpr),
    Default(DataType),
}

/// Tag identifying a node kind, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Constant,
    Variable,
    Member,
    Index,
    Binary(BinaryOp),
    Unary(UnaryOp),
    Conditional,
    Block,
    Call,
    New,
    MemberInit,
    Default,
}

impl Display for ExprKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExprKind::Binary(op) => write!(f, "Binary({op})"),
            ExprKind::Unary(op) => write!(f, "Unary({op})"),
            other => write!(f, "{other:?}"),
        }
    }
}

impl Expr {
    // =========================================================================
    // Constants
    // =========================================================================

    pub fn constant(value: ConstantValue, data_type: DataType) -> Self {
        Expr::Constant(ConstantExpr { value, data_type })
    }

    pub fn bool(value: bool) -> Self {
        Self::constant(ConstantValue::Bool(value), DataType::bool())
    }

    pub fn int(value: i32) -> Self {
        Self::constant(ConstantValue::Int32(value), DataType::int32())
    }

    pub fn string(value: &str) -> Self {
        Self::constant(ConstantValue::String(value.to_string()), DataType::string())
    }

    /// Null of a reference or nullable type.
    pub fn null(data_type: DataType) -> Self {
        Self::constant(ConstantValue::Null, data_type)
    }

    pub fn type_of(ty: &DataType) -> Self {
        Self::constant(ConstantValue::Type(ty.clone()), DataType::type_literal())
    }

    // =========================================================================
    // Storage
    // =========================================================================

    pub fn variable(var: &Variable) -> Self {
        Expr::Variable(var.clone())
    }

    pub fn member(instance: Option<Expr>, member: Member) -> Self {
        Expr::Member(MemberExpr {
            data_type: member.data_type().clone(),
            instance: instance.map(Box::new),
            member,
        })
    }

    pub fn field(instance: Option<Expr>, field: FieldRef) -> Self {
        Self::member(instance, Member::Field(field))
    }

    pub fn property(instance: Option<Expr>, property: PropertyRef) -> Self {
        Self::member(instance, Member::Property(property))
    }

    /// Indexed read through an indexer property.
    pub fn index(instance: Expr, indexer: PropertyRef, arguments: Vec<Expr>) -> Self {
        Expr::Index(IndexExpr {
            data_type: indexer.data_type.clone(),
            instance: Box::new(instance),
            indexer: Some(indexer),
            arguments,
        })
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn binary(op: BinaryOp, left: Expr, right: Expr, data_type: DataType) -> Self {
        Expr::Binary(BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
            data_type,
        })
    }

    /// Assignment; evaluates to the assigned value.
    pub fn assign(target: Expr, value: Expr) -> Self {
        let ty = target.data_type().clone();
        Self::binary(BinaryOp::Assign, target, value, ty)
    }

    /// `left ?? right`, typed as `right`.
    pub fn coalesce(left: Expr, right: Expr) -> Self {
        let ty = right.data_type().clone();
        Self::binary(BinaryOp::Coalesce, left, right, ty)
    }

    pub fn equal(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Equal, left, right, DataType::bool())
    }

    pub fn not_equal(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::NotEqual, left, right, DataType::bool())
    }

    /// Short-circuit `left && right`.
    pub fn and_also(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::AndAlso, left, right, DataType::bool())
    }

    fn unary(op: UnaryOp, operand: Expr, method: Option<MethodRef>, data_type: DataType) -> Self {
        Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
            method,
            data_type,
        })
    }

    pub fn convert(operand: Expr, to: DataType) -> Self {
        Self::unary(UnaryOp::Convert, operand, None, to)
    }

    /// Conversion through an explicit user method.
    pub fn convert_with(operand: Expr, method: MethodRef, to: DataType) -> Self {
        Self::unary(UnaryOp::Convert, operand, Some(method), to)
    }

    pub fn not(operand: Expr) -> Self {
        let ty = operand.data_type().clone();
        Self::unary(UnaryOp::Not, operand, None, ty)
    }

    /// Safe cast: null when the runtime type does not match.
    pub fn type_as(operand: Expr, to: DataType) -> Self {
        Self::unary(UnaryOp::TypeAs, operand, None, to)
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Conditional typed as its true branch.
    pub fn conditional(test: Expr, if_true: Expr, if_false: Expr) -> Self {
        let ty = if_true.data_type().clone();
        Self::conditional_typed(test, if_true, if_false, ty)
    }

    pub fn conditional_typed(test: Expr, if_true: Expr, if_false: Expr, ty: DataType) -> Self {
        Expr::Conditional(ConditionalExpr {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
            data_type: ty,
        })
    }

    /// Block typed as its last expression, or `void` when empty.
    pub fn block(locals: Vec<Variable>, body: Vec<Expr>) -> Self {
        let ty = body
            .last()
            .map(|e| e.data_type().clone())
            .unwrap_or_else(DataType::void);
        Self::block_typed(locals, body, ty)
    }

    pub fn block_typed(locals: Vec<Variable>, body: Vec<Expr>, ty: DataType) -> Self {
        Expr::Block(BlockExpr {
            locals,
            body,
            data_type: ty,
        })
    }

    pub fn default(ty: DataType) -> Self {
        Expr::Default(ty)
    }

    // =========================================================================
    // Calls and construction
    // =========================================================================

    pub fn call(instance: Option<Expr>, method: MethodRef, arguments: Vec<Expr>) -> Self {
        Expr::Call(CallExpr {
            data_type: method.return_type.clone(),
            instance: instance.map(Box::new),
            method,
            arguments,
        })
    }

    pub fn call_static(method: MethodRef, arguments: Vec<Expr>) -> Self {
        Self::call(None, method, arguments)
    }

    pub fn new_object(constructor: ConstructorRef, arguments: Vec<Expr>) -> Self {
        Expr::New(NewExpr::new(constructor, arguments))
    }

    pub fn member_init(new_expr: NewExpr, bindings: Vec<MemberBinding>) -> Self {
        Expr::MemberInit(MemberInitExpr {
            data_type: new_expr.data_type.clone(),
            new_expr,
            bindings,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The static type this node evaluates to.
    pub fn data_type(&self) -> &DataType {
        match self {
            Expr::Constant(e) => &e.data_type,
            Expr::Variable(v) => &v.data_type,
            Expr::Member(e) => &e.data_type,
            Expr::Index(e) => &e.data_type,
            Expr::Binary(e) => &e.data_type,
            Expr::Unary(e) => &e.data_type,
            Expr::Conditional(e) => &e.data_type,
            Expr::Block(e) => &e.data_type,
            Expr::Call(e) => &e.data_type,
            Expr::New(e) => &e.data_type,
            Expr::MemberInit(e) => &e.data_type,
            Expr::Default(ty) => ty,
        }
    }

    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Constant(_) => ExprKind::Constant,
            Expr::Variable(_) => ExprKind::Variable,
            Expr::Member(_) => ExprKind::Member,
            Expr::Index(_) => ExprKind::Index,
            Expr::Binary(e) => ExprKind::Binary(e.op),
            Expr::Unary(e) => ExprKind::Unary(e.op),
            Expr::Conditional(_) => ExprKind::Conditional,
            Expr::Block(_) => ExprKind::Block,
            Expr::Call(_) => ExprKind::Call,
            Expr::New(_) => ExprKind::New,
            Expr::MemberInit(_) => ExprKind::MemberInit,
            Expr::Default(_) => ExprKind::Default,
        }
    }

    /// Literal `null` constant.
    pub fn is_null_constant(&self) -> bool {
        matches!(
            self,
            Expr::Constant(ConstantExpr {
                value: ConstantValue::Null,
                ..
            })
        )
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Constant(_) | Expr::Variable(_) | Expr::Default(_) => Vec::new(),
            Expr::Member(e) => e.instance.as_deref().into_iter().collect(),
            Expr::Index(e) => std::iter::once(e.instance.as_ref())
                .chain(e.arguments.iter())
                .collect(),
            Expr::Binary(e) => vec![e.left.as_ref(), e.right.as_ref()],
            Expr::Unary(e) => vec![e.operand.as_ref()],
            Expr::Conditional(e) => vec![e.test.as_ref(), e.if_true.as_ref(), e.if_false.as_ref()],
            Expr::Block(e) => e.body.iter().collect(),
            Expr::Call(e) => e
                .instance
                .as_deref()
                .into_iter()
                .chain(e.arguments.iter())
                .collect(),
            Expr::New(e) => e.arguments.iter().collect(),
            Expr::MemberInit(e) => e
                .new_expr
                .arguments
                .iter()
                .chain(e.bindings.iter().map(|b| &b.value))
                .collect(),
        }
    }

    /// Largest variable identity referenced or declared anywhere in the tree.
    pub fn max_var_id(&self) -> Option<VarId> {
        let own = match self {
            Expr::Variable(v) => Some(v.id),
            Expr::Block(b) => b.locals.iter().map(|v| v.id).max(),
            _ => None,
        };
        self.children()
            .into_iter()
            .filter_map(Expr::max_var_id)
            .chain(own)
            .max()
    }
}

impl NewExpr {
    pub fn new(constructor: ConstructorRef, arguments: Vec<Expr>) -> Self {
        Self {
            data_type: constructor.declaring_type.clone(),
            constructor,
            arguments,
        }
    }
}

impl MemberBinding {
    pub fn new(member: impl Into<Member>, value: Expr) -> Self {
        Self {
            member: member.into(),
            value,
        }
    }
}
