//! Runtime values and addresses.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use exprtree_core::{DataType, FieldRef};

/// Shared handle to a heap object.
pub type ObjectRef = Rc<RefCell<Object>>;

/// An instance of a reference type.
#[derive(Debug, Clone)]
pub struct Object {
    pub ty: DataType,
    pub fields: Vec<Value>,
}

/// An instance of a value type, copied on load.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub ty: DataType,
    pub fields: Vec<Value>,
}

/// A storage location that can be read and written in place.
#[derive(Debug, Clone)]
pub enum Address {
    Arg(u16),
    Local(u16),
    Static(FieldRef),
    /// Field of a heap object
    ObjectField(ObjectRef, u16),
    /// Field of the struct stored at the inner address
    Field(Box<Address>, u16),
}

/// A value on the operand stack or in a slot.
///
/// Nullable values are stored unwrapped: an absent value is `Null`, a present
/// one is the underlying value itself.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Str(Rc<str>),
    Type(DataType),
    Null,
    Object(ObjectRef),
    Struct(StructValue),
    Address(Address),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// Allocate a heap object.
    pub fn object(ty: DataType, fields: Vec<Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(Object { ty, fields })))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Type of the value as seen by casts, if it has one.
    pub fn runtime_type(&self) -> Option<DataType> {
        match self {
            Value::Bool(_) => Some(DataType::bool()),
            Value::Int32(_) => Some(DataType::int32()),
            Value::Int64(_) => Some(DataType::int64()),
            Value::Float64(_) => Some(DataType::float64()),
            Value::Str(_) => Some(DataType::string()),
            Value::Type(_) => Some(DataType::type_literal()),
            Value::Object(o) => Some(o.borrow().ty.clone()),
            Value::Struct(s) => Some(s.ty.clone()),
            Value::Null | Value::Address(_) => None,
        }
    }

    /// Short name of the variant, for errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "double",
            Value::Str(_) => "string",
            Value::Type(_) => "type",
            Value::Null => "null",
            Value::Object(_) => "object",
            Value::Struct(_) => "struct",
            Value::Address(_) => "address",
        }
    }
}

/// Equality as the `Equal` instruction sees it: primitives and strings by
/// value, objects by identity, structs field by field.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Struct(a), Value::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Type(ty) => write!(f, "typeof({ty})"),
            Value::Null => write!(f, "null"),
            Value::Object(o) => write!(f, "<{}>", o.borrow().ty),
            Value::Struct(s) => {
                write!(f, "{} {{", s.ty)?;
                for (i, field) in s.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {field}")?;
                }
                write!(f, " }}")
            }
            Value::Address(_) => write!(f, "<address>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_compare_by_identity() {
        let ty = DataType::class("Box");
        let a = Value::object(ty.clone(), vec![]);
        let b = Value::object(ty, vec![]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn structs_compare_by_fields() {
        let ty = DataType::structure("Pair");
        let a = Value::Struct(StructValue {
            ty: ty.clone(),
            fields: vec![1.into(), 2.into()],
        });
        let b = Value::Struct(StructValue {
            ty,
            fields: vec![1.into(), 2.into()],
        });
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Pair { 1, 2 }");
    }

    #[test]
    fn null_is_only_equal_to_null() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Int32(0));
        assert_eq!(Value::Null.runtime_type(), None);
    }
}
