//! Members every nullable type carries.
//!
//! These are synthesised on demand from the nullable type alone, so trees can use
//! them without registering anything. The same inputs always produce equal
//! descriptors.

use crate::members::{
    ConstructorDef, ConstructorRef, Intrinsic, MethodDef, MethodRef, MethodTraits, PropertyDef,
    PropertyRef,
};
use crate::DataType;

/// Property name of the presence flag.
pub const HAS_VALUE: &str = "HasValue";
/// Property name of the unwrapped value.
pub const VALUE: &str = "Value";
/// Name of the static equality method.
pub const EQUALS: &str = "Equals";

/// `T?.HasValue`.
pub fn has_value(nullable: &DataType) -> PropertyRef {
    debug_assert!(nullable.is_nullable(), "{nullable} is not nullable");
    let getter = MethodDef::new(nullable, "get_HasValue", vec![], DataType::bool())
        .with_traits(MethodTraits::SPECIAL_NAME)
        .with_intrinsic(Intrinsic::NullableHasValue)
        .into_ref();
    PropertyDef::new(nullable, HAS_VALUE, DataType::bool(), vec![])
        .with_getter(getter)
        .into_ref()
}

/// `T?.Value`, typed as the underlying `T`.
pub fn value(nullable: &DataType) -> PropertyRef {
    let inner = underlying_or_self(nullable);
    let getter = MethodDef::new(nullable, "get_Value", vec![], inner.clone())
        .with_traits(MethodTraits::SPECIAL_NAME)
        .with_intrinsic(Intrinsic::NullableValue)
        .into_ref();
    PropertyDef::new(nullable, VALUE, inner, vec![])
        .with_getter(getter)
        .into_ref()
}

/// `T?(T)`: wraps a present value.
pub fn constructor(nullable: &DataType) -> ConstructorRef {
    let inner = underlying_or_self(nullable);
    ConstructorDef::new(nullable, vec![inner])
        .with_intrinsic(Intrinsic::NullableNew)
        .into_ref()
}

/// Static `T?.Equals(T?, T?) -> bool`: equal when both are absent, or both present
/// with equal underlying values.
pub fn equals(nullable: &DataType) -> MethodRef {
    MethodDef::new_static(
        nullable,
        EQUALS,
        vec![nullable.clone(), nullable.clone()],
        DataType::bool(),
    )
    .with_intrinsic(Intrinsic::NullableEquals)
    .into_ref()
}

fn underlying_or_self(nullable: &DataType) -> DataType {
    debug_assert!(nullable.is_nullable(), "{nullable} is not nullable");
    nullable.underlying().cloned().unwrap_or_else(|| nullable.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_are_deterministic() {
        let n = DataType::nullable(&DataType::int32());
        assert_eq!(has_value(&n), has_value(&n));
        assert_eq!(equals(&n), equals(&n));
        assert_eq!(value(&n).data_type, DataType::int32());
        assert_eq!(constructor(&n).params, vec![DataType::int32()]);
    }

    #[test]
    fn members_differ_per_nullable_type() {
        let a = DataType::nullable(&DataType::int32());
        let b = DataType::nullable(&DataType::bool());
        assert_ne!(has_value(&a), has_value(&b));
        assert!(equals(&a).is_static());
        assert!(has_value(&a).getter.as_ref().is_some_and(|g| g.is_special_name()));
    }
}
