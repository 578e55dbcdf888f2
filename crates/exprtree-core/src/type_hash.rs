//! Deterministic hash-based identity for types and members.
//!
//! [`TypeHash`] is a 64-bit hash computed from a type's name, or from a member's
//! owner, name and signature. Because it is a pure function of those inputs, two
//! independently built descriptions of the same member compare equal, which is what
//! lets expression trees reference members that were never registered anywhere.
//!
//! # Examples
//!
//! ```
//! use exprtree_core::TypeHash;
//!
//! let int_hash = TypeHash::from_name("int");
//! assert_eq!(int_hash, TypeHash::from_name("int"));
//!
//! let owner = TypeHash::from_name("Point");
//! let m1 = TypeHash::from_method(owner, "scale", &[int_hash]);
//! let m2 = TypeHash::from_method(owner, "scale", &[TypeHash::from_name("double")]);
//! assert_ne!(m1, m2);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Different entity kinds produce distinct hashes even when they share a name.
pub mod hash_constants {
    /// Separator constant for signature components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for method hashes.
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructor hashes.
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Domain marker for field hashes.
    pub const FIELD: u64 = 0x1a095090689d4647;

    /// Domain marker for property hashes.
    pub const PROPERTY: u64 = 0x3e9f5d2a8c7b1403;

    /// Parameter position mixing constants, so parameter order matters.
    pub const PARAM_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit hash identifying a type or a member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a method hash from owner type, method name and parameter type hashes.
    #[inline]
    pub fn from_method(owner: TypeHash, name: &str, param_hashes: &[TypeHash]) -> Self {
        let seed = hash_constants::METHOD ^ owner.0 ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, param_hashes))
    }

    /// Create a constructor hash from owner type and parameter type hashes.
    #[inline]
    pub fn from_constructor(owner: TypeHash, param_hashes: &[TypeHash]) -> Self {
        TypeHash(mix_params(hash_constants::CONSTRUCTOR ^ owner.0, param_hashes))
    }

    /// Create a field hash from owner type and field name.
    #[inline]
    pub fn from_field(owner: TypeHash, name: &str) -> Self {
        TypeHash(hash_constants::FIELD ^ owner.0 ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a property hash from owner type, property name and index parameters.
    #[inline]
    pub fn from_property(owner: TypeHash, name: &str, index_hashes: &[TypeHash]) -> Self {
        let seed = hash_constants::PROPERTY ^ owner.0 ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, index_hashes))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn mix_params(seed: u64, param_hashes: &[TypeHash]) -> u64 {
    let mut hash = seed;
    for (i, param) in param_hashes.iter().enumerate() {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        // wrapping_mul keeps the mix order-sensitive, unlike XOR
        hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ param.0);
    }
    hash
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_hash_determinism() {
        assert_eq!(TypeHash::from_name("int"), TypeHash::from_name("int"));
        assert_ne!(TypeHash::from_name("int"), TypeHash::from_name("string"));
    }

    #[test]
    fn method_hash_parameter_order_matters() {
        let owner = TypeHash::from_name("Point");
        let int_hash = TypeHash::from_name("int");
        let str_hash = TypeHash::from_name("string");

        let m1 = TypeHash::from_method(owner, "set", &[int_hash, str_hash]);
        let m2 = TypeHash::from_method(owner, "set", &[str_hash, int_hash]);
        assert_ne!(m1, m2);
    }

    #[test]
    fn method_hash_includes_owner() {
        let int_hash = TypeHash::from_name("int");
        let a = TypeHash::from_method(TypeHash::from_name("A"), "run", &[int_hash]);
        let b = TypeHash::from_method(TypeHash::from_name("B"), "run", &[int_hash]);
        assert_ne!(a, b);
    }

    #[test]
    fn member_domains_are_distinct() {
        let owner = TypeHash::from_name("Point");
        let field = TypeHash::from_field(owner, "x");
        let property = TypeHash::from_property(owner, "x", &[]);
        let method = TypeHash::from_method(owner, "x", &[]);
        assert_ne!(field, property);
        assert_ne!(field, method);
        assert_ne!(property, method);
    }

    #[test]
    fn many_params_still_order_sensitive() {
        let owner = TypeHash::from_name("Wide");
        let a = TypeHash::from_name("a");
        let b = TypeHash::from_name("b");
        let mut params = vec![a; 10];
        let first = TypeHash::from_constructor(owner, &params);
        params[9] = b;
        assert_ne!(first, TypeHash::from_constructor(owner, &params));
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(format!("{}", TypeHash(0xff)), "0x00000000000000ff");
        assert!(TypeHash::EMPTY.is_empty());
    }
}
