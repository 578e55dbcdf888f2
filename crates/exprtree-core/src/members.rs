//! Member descriptors referenced by expression nodes.
//!
//! Members are immutable and shared through `Arc`. Identity is the member's
//! [`TypeHash`]: two descriptors built independently for the same owner, name and
//! signature compare equal.

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bitflags::bitflags;

use crate::{DataType, TypeHash};

bitflags! {
    /// Method modifiers relevant to code generation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodTraits: u8 {
        /// No receiver.
        const STATIC = 1 << 0;
        /// Overridable; calls dispatch through the receiver's runtime type.
        const VIRTUAL = 1 << 1;
        /// Virtual without a body on the declaring type.
        const ABSTRACT = 1 << 2;
        /// Compiler-recognised accessor (property getter/setter, indexer, operator).
        const SPECIAL_NAME = 1 << 3;
    }
}

/// Members whose behaviour is built into every execution engine rather than
/// bound by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// `T?.HasValue` getter.
    NullableHasValue,
    /// `T?.Value` getter.
    NullableValue,
    /// `T?(T)` constructor.
    NullableNew,
    /// Static `T?.Equals(T?, T?)`.
    NullableEquals,
    /// Getter of an auto-property backed by the field at this storage index.
    FieldGet(u16),
    /// Setter of an auto-property backed by the field at this storage index.
    FieldSet(u16),
}

/// A method, including property accessors and operator methods.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub hash: TypeHash,
    pub name: String,
    pub declaring_type: DataType,
    pub params: Vec<DataType>,
    pub return_type: DataType,
    pub traits: MethodTraits,
    pub intrinsic: Option<Intrinsic>,
}

/// Shared method handle.
pub type MethodRef = Arc<MethodDef>;

impl MethodDef {
    /// An instance, non-virtual method.
    pub fn new(
        declaring_type: &DataType,
        name: &str,
        params: Vec<DataType>,
        return_type: DataType,
    ) -> Self {
        let param_hashes: Vec<TypeHash> = params.iter().map(DataType::hash).collect();
        Self {
            hash: TypeHash::from_method(declaring_type.hash(), name, &param_hashes),
            name: name.to_string(),
            declaring_type: declaring_type.clone(),
            params,
            return_type,
            traits: MethodTraits::empty(),
            intrinsic: None,
        }
    }

    /// A static method.
    pub fn new_static(
        declaring_type: &DataType,
        name: &str,
        params: Vec<DataType>,
        return_type: DataType,
    ) -> Self {
        Self::new(declaring_type, name, params, return_type).with_traits(MethodTraits::STATIC)
    }

    pub fn with_traits(mut self, traits: MethodTraits) -> Self {
        self.traits |= traits;
        self
    }

    pub fn with_intrinsic(mut self, intrinsic: Intrinsic) -> Self {
        self.intrinsic = Some(intrinsic);
        self
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> MethodRef {
        Arc::new(self)
    }

    pub fn is_static(&self) -> bool {
        self.traits.contains(MethodTraits::STATIC)
    }

    pub fn is_special_name(&self) -> bool {
        self.traits.contains(MethodTraits::SPECIAL_NAME)
    }

    /// Overridable instance method.
    pub fn is_virtual(&self) -> bool {
        !self.is_static() && self.traits.intersects(MethodTraits::VIRTUAL | MethodTraits::ABSTRACT)
    }

    /// Whether a call must dispatch on the receiver's runtime type.
    pub fn requires_virtual_dispatch(&self) -> bool {
        self.is_virtual() || (!self.is_static() && self.declaring_type.is_interface())
    }
}

impl PartialEq for MethodDef {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for MethodDef {}

impl Hash for MethodDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl Display for MethodDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.declaring_type, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// A field. Storage index is the position in the declaring type's field layout
/// (instance and static fields are numbered separately).
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub hash: TypeHash,
    pub name: String,
    pub declaring_type: DataType,
    pub data_type: DataType,
    pub index: u16,
    pub is_static: bool,
}

pub type FieldRef = Arc<FieldDef>;

impl FieldDef {
    pub fn new(declaring_type: &DataType, name: &str, data_type: DataType, index: u16) -> Self {
        Self {
            hash: TypeHash::from_field(declaring_type.hash(), name),
            name: name.to_string(),
            declaring_type: declaring_type.clone(),
            data_type,
            index,
            is_static: false,
        }
    }

    pub fn new_static(
        declaring_type: &DataType,
        name: &str,
        data_type: DataType,
        index: u16,
    ) -> Self {
        Self {
            is_static: true,
            ..Self::new(declaring_type, name, data_type, index)
        }
    }

    pub fn into_ref(self) -> FieldRef {
        Arc::new(self)
    }
}

impl PartialEq for FieldDef {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for FieldDef {}

impl Hash for FieldDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

/// A property or indexer (a property with index parameters).
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub hash: TypeHash,
    pub name: String,
    pub declaring_type: DataType,
    pub data_type: DataType,
    pub index_params: Vec<DataType>,
    pub getter: Option<MethodRef>,
    pub setter: Option<MethodRef>,
}

pub type PropertyRef = Arc<PropertyDef>;

impl PropertyDef {
    /// Describe a property; accessors are attached with [`with_getter`](Self::with_getter)
    /// and [`with_setter`](Self::with_setter).
    pub fn new(
        declaring_type: &DataType,
        name: &str,
        data_type: DataType,
        index_params: Vec<DataType>,
    ) -> Self {
        let index_hashes: Vec<TypeHash> = index_params.iter().map(DataType::hash).collect();
        Self {
            hash: TypeHash::from_property(declaring_type.hash(), name, &index_hashes),
            name: name.to_string(),
            declaring_type: declaring_type.clone(),
            data_type,
            index_params,
            getter: None,
            setter: None,
        }
    }

    pub fn with_getter(mut self, getter: MethodRef) -> Self {
        self.getter = Some(getter);
        self
    }

    pub fn with_setter(mut self, setter: MethodRef) -> Self {
        self.setter = Some(setter);
        self
    }

    pub fn into_ref(self) -> PropertyRef {
        Arc::new(self)
    }

    pub fn is_indexer(&self) -> bool {
        !self.index_params.is_empty()
    }

    /// Static when either accessor is static.
    pub fn is_static(&self) -> bool {
        self.getter
            .iter()
            .chain(self.setter.iter())
            .any(|m| m.is_static())
    }
}

impl PartialEq for PropertyDef {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for PropertyDef {}

impl Hash for PropertyDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

/// A constructor.
#[derive(Debug, Clone)]
pub struct ConstructorDef {
    pub hash: TypeHash,
    pub declaring_type: DataType,
    pub params: Vec<DataType>,
    pub intrinsic: Option<Intrinsic>,
}

pub type ConstructorRef = Arc<ConstructorDef>;

impl ConstructorDef {
    pub fn new(declaring_type: &DataType, params: Vec<DataType>) -> Self {
        let param_hashes: Vec<TypeHash> = params.iter().map(DataType::hash).collect();
        Self {
            hash: TypeHash::from_constructor(declaring_type.hash(), &param_hashes),
            declaring_type: declaring_type.clone(),
            params,
            intrinsic: None,
        }
    }

    pub fn with_intrinsic(mut self, intrinsic: Intrinsic) -> Self {
        self.intrinsic = Some(intrinsic);
        self
    }

    pub fn into_ref(self) -> ConstructorRef {
        Arc::new(self)
    }
}

impl PartialEq for ConstructorDef {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for ConstructorDef {}

impl Hash for ConstructorDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

/// The target of a member access: a field or a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Member {
    Field(FieldRef),
    Property(PropertyRef),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Field(f) => &f.name,
            Member::Property(p) => &p.name,
        }
    }

    /// Type of the value read from or written to the member.
    pub fn data_type(&self) -> &DataType {
        match self {
            Member::Field(f) => &f.data_type,
            Member::Property(p) => &p.data_type,
        }
    }

    pub fn declaring_type(&self) -> &DataType {
        match self {
            Member::Field(f) => &f.declaring_type,
            Member::Property(p) => &p.declaring_type,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Member::Field(f) => f.is_static,
            Member::Property(p) => p.is_static(),
        }
    }
}

impl From<FieldRef> for Member {
    fn from(field: FieldRef) -> Self {
        Member::Field(field)
    }
}

impl From<PropertyRef> for Member {
    fn from(property: PropertyRef) -> Self {
        Member::Property(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_identity_is_signature() {
        let point = DataType::structure("Point");
        let a = MethodDef::new(&point, "scale", vec![DataType::int32()], DataType::void());
        let b = MethodDef::new(&point, "scale", vec![DataType::int32()], DataType::void())
            .with_traits(MethodTraits::VIRTUAL);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Point::scale(int) -> void");
    }

    #[test]
    fn virtual_dispatch_rules() {
        let shape = DataType::class("Shape");
        let iface = DataType::interface("IArea");

        let plain = MethodDef::new(&shape, "id", vec![], DataType::int32());
        let overridable = MethodDef::new(&shape, "area", vec![], DataType::int32())
            .with_traits(MethodTraits::ABSTRACT);
        let through_iface = MethodDef::new(&iface, "area", vec![], DataType::int32());
        let stat = MethodDef::new_static(&iface, "make", vec![], DataType::int32());

        assert!(!plain.requires_virtual_dispatch());
        assert!(overridable.requires_virtual_dispatch());
        assert!(through_iface.requires_virtual_dispatch());
        assert!(!stat.requires_virtual_dispatch());
    }

    #[test]
    fn property_staticness_follows_accessors() {
        let config = DataType::class("Config");
        let getter = MethodDef::new_static(&config, "get_Current", vec![], config.clone())
            .with_traits(MethodTraits::SPECIAL_NAME)
            .into_ref();
        let prop = PropertyDef::new(&config, "Current", config.clone(), vec![]).with_getter(getter);
        assert!(prop.is_static());
        assert!(!prop.is_indexer());
        assert!(Member::from(prop.into_ref()).is_static());
    }
}
