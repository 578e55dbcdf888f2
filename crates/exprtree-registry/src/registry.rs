//! TypeRegistry - the type universe trees are built against.
//!
//! The registry owns every user type and its members, keyed by [`TypeHash`].
//! Trees never need the registry to be compiled (members travel inside the
//! nodes), but operator resolution and execution do: the registry answers
//! which operator methods a type declares, how an object's fields are laid
//! out, and which override a virtual call lands on.
//!
//! # Field layout
//!
//! Instance fields are numbered per type, with inherited fields first. Register
//! a base class's fields before any derived class adds its own.
//!
//! # Example
//!
//! ```
//! use exprtree_core::{DataType, MethodDef, Operator, OperatorResolver};
//! use exprtree_registry::TypeRegistry;
//!
//! let money = DataType::structure("Money");
//! let mut registry = TypeRegistry::new();
//! registry.register_type(&money).unwrap();
//! registry
//!     .add_method(MethodDef::new_static(
//!         &money,
//!         "opEquals",
//!         vec![money.clone(), money.clone()],
//!         DataType::bool(),
//!     ))
//!     .unwrap();
//!
//! let found = registry.resolve(Operator::Equals, &[money.clone(), money.clone()], None);
//! assert!(found.is_some());
//! ```

use rustc_hash::FxHashMap;
use thiserror::Error;

use exprtree_core::operator::{is_operator_candidate, search_order};
use exprtree_core::{
    ConstructorDef, ConstructorRef, DataType, FieldDef, FieldRef, Intrinsic, MethodDef, MethodRef,
    MethodTraits, Operator, OperatorResolver, PropertyDef, PropertyRef, TypeHash,
};

/// Errors raised while populating a [`TypeRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The declaring type was never registered.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// A type with this name already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// A member with the same signature already exists on the type.
    #[error("duplicate member: {owner}::{name}")]
    DuplicateMember { owner: String, name: String },

    /// The declaration is invalid.
    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),
}

#[derive(Debug)]
struct TypeEntry {
    data_type: DataType,
    methods: Vec<MethodRef>,
    fields: Vec<FieldRef>,
    static_fields: Vec<FieldRef>,
    properties: Vec<PropertyRef>,
    constructors: Vec<ConstructorRef>,
}

impl TypeEntry {
    fn new(data_type: &DataType) -> Self {
        Self {
            data_type: data_type.clone(),
            methods: Vec::new(),
            fields: Vec::new(),
            static_fields: Vec::new(),
            properties: Vec::new(),
            constructors: Vec::new(),
        }
    }
}

/// Storage for user types and their members.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeHash, TypeEntry>,
    methods: FxHashMap<TypeHash, MethodRef>,
    fields: FxHashMap<TypeHash, FieldRef>,
    properties: FxHashMap<TypeHash, PropertyRef>,
    constructors: FxHashMap<TypeHash, ConstructorRef>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a user type.
    pub fn register_type(&mut self, ty: &DataType) -> Result<(), RegistrationError> {
        if self.types.contains_key(&ty.hash()) {
            return Err(RegistrationError::DuplicateType(ty.name().to_string()));
        }
        tracing::trace!(ty = %ty, "register type");
        self.types.insert(ty.hash(), TypeEntry::new(ty));
        Ok(())
    }

    /// Register a method on its declaring type.
    pub fn add_method(&mut self, def: MethodDef) -> Result<MethodRef, RegistrationError> {
        let method = def.into_ref();
        self.insert_method(method.clone())?;
        Ok(method)
    }

    fn insert_method(&mut self, method: MethodRef) -> Result<(), RegistrationError> {
        if self.methods.contains_key(&method.hash) {
            return Err(duplicate(&method.declaring_type, &method.name));
        }
        self.entry_mut(&method.declaring_type)?
            .methods
            .push(method.clone());
        self.methods.insert(method.hash, method);
        Ok(())
    }

    /// Add an instance field; its storage index follows the inherited fields.
    pub fn add_field(
        &mut self,
        owner: &DataType,
        name: &str,
        data_type: DataType,
    ) -> Result<FieldRef, RegistrationError> {
        let index = self.next_field_index(owner)?;
        self.insert_field(FieldDef::new(owner, name, data_type, index).into_ref())
    }

    /// Add a static field.
    pub fn add_static_field(
        &mut self,
        owner: &DataType,
        name: &str,
        data_type: DataType,
    ) -> Result<FieldRef, RegistrationError> {
        let index = to_index(self.entry(owner)?.static_fields.len())?;
        self.insert_field(FieldDef::new_static(owner, name, data_type, index).into_ref())
    }

    fn insert_field(&mut self, field: FieldRef) -> Result<FieldRef, RegistrationError> {
        if self.fields.contains_key(&field.hash) {
            return Err(duplicate(&field.declaring_type, &field.name));
        }
        let entry = self.entry_mut(&field.declaring_type)?;
        if field.is_static {
            entry.static_fields.push(field.clone());
        } else {
            entry.fields.push(field.clone());
        }
        self.fields.insert(field.hash, field.clone());
        Ok(field)
    }

    /// Register a property together with its accessors.
    pub fn add_property(&mut self, def: PropertyDef) -> Result<PropertyRef, RegistrationError> {
        if def.getter.is_none() && def.setter.is_none() {
            return Err(RegistrationError::InvalidDeclaration(format!(
                "property {}::{} has no accessors",
                def.declaring_type, def.name
            )));
        }
        if self.properties.contains_key(&def.hash) {
            return Err(duplicate(&def.declaring_type, &def.name));
        }
        self.entry(&def.declaring_type)?;
        for accessor in def.getter.iter().chain(def.setter.iter()) {
            if !self.methods.contains_key(&accessor.hash) {
                self.insert_method(accessor.clone())?;
            }
        }
        let property = def.into_ref();
        self.entry_mut(&property.declaring_type)?
            .properties
            .push(property.clone());
        self.properties.insert(property.hash, property.clone());
        Ok(property)
    }

    /// Add a property backed by a hidden field. Its accessors run as intrinsics,
    /// so no host binding is needed.
    pub fn add_auto_property(
        &mut self,
        owner: &DataType,
        name: &str,
        data_type: DataType,
    ) -> Result<PropertyRef, RegistrationError> {
        let backing = self.add_field(owner, &format!("<{name}>backing"), data_type.clone())?;
        let getter = MethodDef::new(owner, &format!("get_{name}"), vec![], data_type.clone())
            .with_traits(MethodTraits::SPECIAL_NAME)
            .with_intrinsic(Intrinsic::FieldGet(backing.index))
            .into_ref();
        let setter = MethodDef::new(
            owner,
            &format!("set_{name}"),
            vec![data_type.clone()],
            DataType::void(),
        )
        .with_traits(MethodTraits::SPECIAL_NAME)
        .with_intrinsic(Intrinsic::FieldSet(backing.index))
        .into_ref();
        self.add_property(
            PropertyDef::new(owner, name, data_type, vec![])
                .with_getter(getter)
                .with_setter(setter),
        )
    }

    /// Add an indexer named `name` with `get_<name>`/`set_<name>` accessors. The
    /// accessor bodies are bound by the host.
    pub fn add_indexer(
        &mut self,
        owner: &DataType,
        name: &str,
        data_type: DataType,
        index_params: Vec<DataType>,
        writable: bool,
    ) -> Result<PropertyRef, RegistrationError> {
        if index_params.is_empty() {
            return Err(RegistrationError::InvalidDeclaration(format!(
                "indexer {owner}::{name} needs at least one index parameter"
            )));
        }
        let getter = MethodDef::new(
            owner,
            &format!("get_{name}"),
            index_params.clone(),
            data_type.clone(),
        )
        .with_traits(MethodTraits::SPECIAL_NAME)
        .into_ref();
        let mut def =
            PropertyDef::new(owner, name, data_type.clone(), index_params.clone()).with_getter(getter);
        if writable {
            let mut params = index_params;
            params.push(data_type);
            let setter = MethodDef::new(owner, &format!("set_{name}"), params, DataType::void())
                .with_traits(MethodTraits::SPECIAL_NAME)
                .into_ref();
            def = def.with_setter(setter);
        }
        self.add_property(def)
    }

    pub fn add_constructor(
        &mut self,
        def: ConstructorDef,
    ) -> Result<ConstructorRef, RegistrationError> {
        if self.constructors.contains_key(&def.hash) {
            return Err(duplicate(&def.declaring_type, "constructor"));
        }
        let ctor = def.into_ref();
        self.entry_mut(&ctor.declaring_type)?
            .constructors
            .push(ctor.clone());
        self.constructors.insert(ctor.hash, ctor.clone());
        Ok(ctor)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn contains_type(&self, ty: &DataType) -> bool {
        self.types.contains_key(&ty.hash())
    }

    pub fn get_type(&self, hash: TypeHash) -> Option<&DataType> {
        self.types.get(&hash).map(|e| &e.data_type)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Methods declared directly on `ty`, in registration order.
    pub fn methods_of(&self, ty: &DataType) -> &[MethodRef] {
        self.types
            .get(&ty.hash())
            .map(|e| e.methods.as_slice())
            .unwrap_or(&[])
    }

    pub fn method(&self, hash: TypeHash) -> Option<&MethodRef> {
        self.methods.get(&hash)
    }

    pub fn field(&self, hash: TypeHash) -> Option<&FieldRef> {
        self.fields.get(&hash)
    }

    pub fn property(&self, hash: TypeHash) -> Option<&PropertyRef> {
        self.properties.get(&hash)
    }

    pub fn constructor(&self, hash: TypeHash) -> Option<&ConstructorRef> {
        self.constructors.get(&hash)
    }

    /// Look up a property by name on `ty` or its bases.
    pub fn find_property(&self, ty: &DataType, name: &str) -> Option<&PropertyRef> {
        lineage(ty).find_map(|t| {
            self.types
                .get(&t.hash())?
                .properties
                .iter()
                .find(|p| p.name == name)
        })
    }

    /// Look up a field by name on `ty` or its bases.
    pub fn find_field(&self, ty: &DataType, name: &str) -> Option<&FieldRef> {
        lineage(ty).find_map(|t| {
            let entry = self.types.get(&t.hash())?;
            entry
                .fields
                .iter()
                .chain(entry.static_fields.iter())
                .find(|f| f.name == name)
        })
    }

    /// Instance field layout of `ty`: inherited fields first, in storage order.
    pub fn instance_fields(&self, ty: &DataType) -> Vec<FieldRef> {
        let mut chain: Vec<&DataType> = lineage(ty).collect();
        chain.reverse();
        chain
            .into_iter()
            .filter_map(|t| self.types.get(&t.hash()))
            .flat_map(|e| e.fields.iter().cloned())
            .collect()
    }

    /// Static fields declared on `ty`, in storage order.
    pub fn static_fields(&self, ty: &DataType) -> &[FieldRef] {
        self.types
            .get(&ty.hash())
            .map(|e| e.static_fields.as_slice())
            .unwrap_or(&[])
    }

    /// The implementation a virtual call to `method` reaches on a receiver whose
    /// runtime type is `runtime`: the most derived non-abstract method with the
    /// same name and parameters.
    pub fn resolve_virtual(&self, runtime: &DataType, method: &MethodDef) -> Option<MethodRef> {
        lineage(runtime).find_map(|t| {
            self.methods_of(t)
                .iter()
                .find(|m| {
                    !m.is_static()
                        && !m.traits.contains(MethodTraits::ABSTRACT)
                        && m.name == method.name
                        && m.params == method.params
                })
                .cloned()
        })
    }

    fn next_field_index(&self, owner: &DataType) -> Result<u16, RegistrationError> {
        self.entry(owner)?;
        to_index(self.instance_fields(owner).len())
    }

    fn entry(&self, ty: &DataType) -> Result<&TypeEntry, RegistrationError> {
        self.types
            .get(&ty.hash())
            .ok_or_else(|| RegistrationError::TypeNotFound(ty.name().to_string()))
    }

    fn entry_mut(&mut self, ty: &DataType) -> Result<&mut TypeEntry, RegistrationError> {
        self.types
            .get_mut(&ty.hash())
            .ok_or_else(|| RegistrationError::TypeNotFound(ty.name().to_string()))
    }
}

impl OperatorResolver for TypeRegistry {
    fn resolve(
        &self,
        op: Operator,
        operand_types: &[DataType],
        result_type: Option<&DataType>,
    ) -> Option<MethodRef> {
        let found = search_order(operand_types, result_type)
            .iter()
            .find_map(|ty| {
                self.methods_of(ty)
                    .iter()
                    .find(|m| is_operator_candidate(m, op, operand_types, result_type))
                    .cloned()
            });
        tracing::trace!(%op, found = ?found.as_ref().map(|m| m.to_string()), "resolve operator");
        found
    }
}

/// `ty` followed by its base classes, most derived first.
fn lineage(ty: &DataType) -> impl Iterator<Item = &DataType> {
    std::iter::successors(Some(ty), |t| t.base())
}

fn duplicate(owner: &DataType, name: &str) -> RegistrationError {
    RegistrationError::DuplicateMember {
        owner: owner.name().to_string(),
        name: name.to_string(),
    }
}

fn to_index(len: usize) -> Result<u16, RegistrationError> {
    u16::try_from(len)
        .map_err(|_| RegistrationError::InvalidDeclaration("too many fields".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(types: &[&DataType]) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        for ty in types {
            registry.register_type(ty).unwrap();
        }
        registry
    }

    #[test]
    fn new_registry_is_empty() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.type_count(), 0);
        assert!(registry.methods_of(&DataType::int32()).is_empty());
    }

    #[test]
    fn duplicate_type_error() {
        let player = DataType::class("Player");
        let mut registry = registry_with(&[&player]);
        assert_eq!(
            registry.register_type(&DataType::class("Player")),
            Err(RegistrationError::DuplicateType("Player".to_string()))
        );
    }

    #[test]
    fn members_need_a_registered_owner() {
        let mut registry = TypeRegistry::new();
        let ghost = DataType::class("Ghost");
        let result = registry.add_field(&ghost, "x", DataType::int32());
        assert_eq!(result, Err(RegistrationError::TypeNotFound("Ghost".to_string())));
    }

    #[test]
    fn duplicate_method_error() {
        let player = DataType::class("Player");
        let mut registry = registry_with(&[&player]);
        let def = MethodDef::new(&player, "jump", vec![], DataType::void());
        registry.add_method(def.clone()).unwrap();
        assert!(matches!(
            registry.add_method(def),
            Err(RegistrationError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn field_layout_puts_inherited_fields_first() {
        let animal = DataType::class("Animal");
        let dog = DataType::class_builder("Dog").base(&animal).build();
        let mut registry = registry_with(&[&animal, &dog]);

        let legs = registry.add_field(&animal, "legs", DataType::int32()).unwrap();
        let name = registry.add_field(&dog, "name", DataType::string()).unwrap();
        let count = registry
            .add_static_field(&dog, "count", DataType::int32())
            .unwrap();

        assert_eq!(legs.index, 0);
        assert_eq!(name.index, 1);
        assert_eq!(count.index, 0);
        assert_eq!(registry.instance_fields(&dog), vec![legs.clone(), name]);
        assert_eq!(registry.find_field(&dog, "legs"), Some(&legs));
        assert_eq!(registry.static_fields(&dog), &[count]);
    }

    #[test]
    fn auto_property_uses_field_intrinsics() {
        let point = DataType::structure("Point");
        let mut registry = registry_with(&[&point]);
        registry.add_field(&point, "x", DataType::int32()).unwrap();
        let y = registry
            .add_auto_property(&point, "Y", DataType::int32())
            .unwrap();

        let getter = y.getter.as_ref().unwrap();
        let setter = y.setter.as_ref().unwrap();
        assert_eq!(getter.intrinsic, Some(Intrinsic::FieldGet(1)));
        assert_eq!(setter.intrinsic, Some(Intrinsic::FieldSet(1)));
        assert!(getter.is_special_name());
        assert_eq!(registry.instance_fields(&point).len(), 2);
        assert_eq!(registry.find_property(&point, "Y"), Some(&y));
        assert!(registry.method(getter.hash).is_some());
    }

    #[test]
    fn indexer_accessor_shapes() {
        let list = DataType::class("IntList");
        let mut registry = registry_with(&[&list]);
        let item = registry
            .add_indexer(&list, "Item", DataType::int32(), vec![DataType::int32()], true)
            .unwrap();

        assert!(item.is_indexer());
        let setter = item.setter.as_ref().unwrap();
        assert_eq!(setter.params, vec![DataType::int32(), DataType::int32()]);
        assert!(
            registry
                .add_indexer(&list, "Other", DataType::int32(), vec![], false)
                .is_err()
        );
    }

    #[test]
    fn virtual_resolution_finds_most_derived_override() {
        let shape = DataType::class("Shape");
        let square = DataType::class_builder("Square").base(&shape).build();
        let unit = DataType::class_builder("UnitSquare").base(&square).build();
        let mut registry = registry_with(&[&shape, &square, &unit]);

        let base = registry
            .add_method(
                MethodDef::new(&shape, "area", vec![], DataType::int32())
                    .with_traits(MethodTraits::ABSTRACT),
            )
            .unwrap();
        let over = registry
            .add_method(
                MethodDef::new(&square, "area", vec![], DataType::int32())
                    .with_traits(MethodTraits::VIRTUAL),
            )
            .unwrap();

        assert_eq!(registry.resolve_virtual(&unit, &base), Some(over));
        assert_eq!(registry.resolve_virtual(&shape, &base), None);
    }

    #[test]
    fn operator_search_prefers_operands_over_result() {
        let celsius = DataType::structure("Celsius");
        let kelvin = DataType::structure("Kelvin");
        let mut registry = registry_with(&[&celsius, &kelvin]);

        let on_result = registry
            .add_method(MethodDef::new_static(
                &kelvin,
                "opImplConv",
                vec![celsius.clone()],
                kelvin.clone(),
            ))
            .unwrap();
        let on_operand = registry
            .add_method(MethodDef::new_static(
                &celsius,
                "opImplConv",
                vec![celsius.clone()],
                kelvin.clone(),
            ))
            .unwrap();

        let found = registry.resolve(Operator::ImplConv, &[celsius.clone()], Some(&kelvin));
        assert_eq!(found, Some(on_operand));
        assert_ne!(found, Some(on_result));
        assert!(registry.resolve(Operator::Cast, &[celsius], Some(&kelvin)).is_none());
    }

    #[test]
    fn operator_return_type_must_match_exactly() {
        let money = DataType::structure("Money");
        let mut registry = registry_with(&[&money]);
        registry
            .add_method(MethodDef::new_static(
                &money,
                "opCast",
                vec![money.clone()],
                DataType::int64(),
            ))
            .unwrap();

        let operands = [money];
        assert!(
            registry
                .resolve(Operator::Cast, &operands, Some(&DataType::int32()))
                .is_none()
        );
        assert!(
            registry
                .resolve(Operator::Cast, &operands, Some(&DataType::int64()))
                .is_some()
        );
    }
}
