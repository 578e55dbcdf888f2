//! DataType - the static type carried by every expression node.
//!
//! A `DataType` is a cheap, shareable handle. Two handles are equal when their
//! [`TypeHash`] is equal, so a type described twice by independent builders is
//! still the same type.
//!
//! # Example
//!
//! ```
//! use exprtree_core::{DataType, TypeKind};
//!
//! let int = DataType::int32();
//! assert!(int.is_value_type());
//!
//! let maybe = DataType::nullable(&int);
//! assert!(maybe.is_nullable());
//! assert_eq!(maybe.underlying(), Some(&int));
//!
//! let animal = DataType::class("Animal");
//! let dog = DataType::class_builder("Dog").base(&animal).build();
//! assert!(animal.is_assignable_from(&dog));
//! assert!(matches!(dog.kind(), TypeKind::Class));
//! ```

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use crate::TypeHash;

/// Type kind determines value vs reference semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The absence of a value.
    Void,
    /// Boolean primitive.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit float.
    Float64,
    /// Immutable string (reference type).
    String,
    /// Root of the reference type hierarchy.
    Object,
    /// The type of type literals.
    TypeLiteral,
    /// User value type - copied on assignment, addressable in place.
    Struct,
    /// User reference type.
    Class,
    /// Interface type; calls through it always dispatch virtually.
    Interface,
    /// Nullable wrapper around a value type.
    Nullable(DataType),
}

#[derive(Debug)]
struct TypeInfo {
    name: String,
    hash: TypeHash,
    kind: TypeKind,
    base: Option<DataType>,
    interfaces: Vec<DataType>,
}

/// A static type.
#[derive(Clone)]
pub struct DataType(Arc<TypeInfo>);

macro_rules! builtin {
    ($static_name:ident, $fn_name:ident, $name:literal, $kind:expr) => {
        static $static_name: LazyLock<DataType> = LazyLock::new(|| DataType::new($name, $kind));

        impl DataType {
            #[doc = concat!("The built-in `", $name, "` type.")]
            pub fn $fn_name() -> DataType {
                $static_name.clone()
            }
        }
    };
}

builtin!(VOID, void, "void", TypeKind::Void);
builtin!(BOOL, bool, "bool", TypeKind::Bool);
builtin!(INT32, int32, "int", TypeKind::Int32);
builtin!(INT64, int64, "int64", TypeKind::Int64);
builtin!(FLOAT64, float64, "double", TypeKind::Float64);
builtin!(STRING, string, "string", TypeKind::String);
builtin!(OBJECT, object, "object", TypeKind::Object);
builtin!(TYPE_LITERAL, type_literal, "type", TypeKind::TypeLiteral);

impl DataType {
    fn new(name: &str, kind: TypeKind) -> Self {
        DataType(Arc::new(TypeInfo {
            name: name.to_string(),
            hash: TypeHash::from_name(name),
            kind,
            base: None,
            interfaces: Vec::new(),
        }))
    }

    /// A user value type with the given qualified name.
    pub fn structure(name: &str) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    /// A user reference type with no base class.
    pub fn class(name: &str) -> Self {
        Self::new(name, TypeKind::Class)
    }

    /// An interface type.
    pub fn interface(name: &str) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    /// Start building a class with a base class and/or interfaces.
    pub fn class_builder(name: &str) -> TypeBuilder {
        TypeBuilder::new(name, TypeKind::Class)
    }

    /// Start building a struct that implements interfaces.
    pub fn struct_builder(name: &str) -> TypeBuilder {
        TypeBuilder::new(name, TypeKind::Struct)
    }

    /// The nullable form of a value type, named `T?`.
    pub fn nullable(inner: &DataType) -> Self {
        Self::new(&format!("{}?", inner.name()), TypeKind::Nullable(inner.clone()))
    }

    /// Qualified name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Identity hash.
    pub fn hash(&self) -> TypeHash {
        self.0.hash
    }

    /// The kind of this type.
    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    /// Base class, for classes that declare one.
    pub fn base(&self) -> Option<&DataType> {
        self.0.base.as_ref()
    }

    /// Directly implemented interfaces.
    pub fn interfaces(&self) -> &[DataType] {
        &self.0.interfaces
    }

    pub fn is_void(&self) -> bool {
        matches!(self.0.kind, TypeKind::Void)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.0.kind, TypeKind::Bool)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.0.kind, TypeKind::Int32 | TypeKind::Int64)
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.0.kind, TypeKind::Interface)
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self.0.kind, TypeKind::Nullable(_))
    }

    /// The wrapped type of a nullable type.
    pub fn underlying(&self) -> Option<&DataType> {
        match &self.0.kind {
            TypeKind::Nullable(inner) => Some(inner),
            _ => None,
        }
    }

    /// Value types are copied on load and can be addressed in place.
    pub fn is_value_type(&self) -> bool {
        matches!(
            self.0.kind,
            TypeKind::Bool
                | TypeKind::Int32
                | TypeKind::Int64
                | TypeKind::Float64
                | TypeKind::Struct
                | TypeKind::Nullable(_)
        )
    }

    /// Reference types are passed as references and may hold null.
    pub fn is_reference_type(&self) -> bool {
        matches!(
            self.0.kind,
            TypeKind::String
                | TypeKind::Object
                | TypeKind::TypeLiteral
                | TypeKind::Class
                | TypeKind::Interface
        )
    }

    /// Whether a value of `source` can be stored in a location of this type
    /// without conversion.
    pub fn is_assignable_from(&self, source: &DataType) -> bool {
        if self == source {
            return true;
        }
        if matches!(self.0.kind, TypeKind::Object) && source.is_reference_type() {
            return true;
        }
        source.derives_from(self)
    }

    fn derives_from(&self, target: &DataType) -> bool {
        if let Some(base) = &self.0.base
            && (base == target || base.derives_from(target))
        {
            return true;
        }
        self.0
            .interfaces
            .iter()
            .any(|iface| iface == target || iface.derives_from(target))
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.0.hash == other.0.hash
    }
}

impl Eq for DataType {}

impl Hash for DataType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash.hash(state);
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DataType({})", self.0.name)
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Builder for user types with a base class or interfaces.
#[derive(Debug)]
pub struct TypeBuilder {
    name: String,
    kind: TypeKind,
    base: Option<DataType>,
    interfaces: Vec<DataType>,
}

impl TypeBuilder {
    fn new(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            base: None,
            interfaces: Vec::new(),
        }
    }

    /// Set the base class.
    pub fn base(mut self, base: &DataType) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Add an implemented interface.
    pub fn implements(mut self, iface: &DataType) -> Self {
        self.interfaces.push(iface.clone());
        self
    }

    pub fn build(self) -> DataType {
        DataType(Arc::new(TypeInfo {
            hash: TypeHash::from_name(&self.name),
            name: self.name,
            kind: self.kind,
            base: self.base,
            interfaces: self.interfaces,
        }))
    }
}
