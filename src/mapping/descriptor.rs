//! Entity descriptor tables
//!
//! Each entity type declares its identifier and fields once, through
//! [`DescriptorBuilder`]. The codec, the sorter and the residual filter all
//! read fields through this table.

use std::collections::HashSet;
use std::fmt;

use super::errors::{MappingError, MappingResult};
use super::value::{FieldType, Value};

/// Reads a field from an entity; `None` means the field is unset
pub type Getter<E> = fn(&E) -> Option<Value>;

/// Writes an already-coerced value into an entity
pub type Setter<E> = fn(&mut E, Value) -> MappingResult<()>;

/// A typed domain object stored as one record.
///
/// Implementations return a descriptor built once, typically held in a
/// `std::sync::OnceLock`.
pub trait Entity: Default + Send + 'static {
    fn descriptor() -> &'static EntityDescriptor<Self>;
}

/// Accessor pair for one declared field
pub struct FieldDescriptor<E> {
    name: String,
    field_type: FieldType,
    get: Getter<E>,
    set: Setter<E>,
}

impl<E> FieldDescriptor<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Reads the field, checking the value against the declared type
    pub fn read(&self, entity: &E) -> MappingResult<Option<Value>> {
        match (self.get)(entity) {
            None => Ok(None),
            Some(value) if value.field_type() == self.field_type => Ok(Some(value)),
            Some(value) => Err(MappingError::unsupported_type(
                &self.name,
                value.type_name(),
            )),
        }
    }

    /// Coerces a stored value and writes it into the entity
    pub fn write(&self, entity: &mut E, value: Value) -> MappingResult<()> {
        let value = self.field_type.coerce(&self.name, value)?;
        (self.set)(entity, value).map_err(|e| e.for_field(&self.name))
    }
}

impl<E> fmt::Debug for FieldDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .finish()
    }
}

/// Descriptor table for one entity type
pub struct EntityDescriptor<E> {
    collection: String,
    id: FieldDescriptor<E>,
    fields: Vec<FieldDescriptor<E>>,
}

impl<E> EntityDescriptor<E> {
    /// Starts a descriptor for entities stored in `collection`
    pub fn builder(collection: impl Into<String>) -> DescriptorBuilder<E> {
        DescriptorBuilder {
            collection: collection.into(),
            id: None,
            fields: Vec::new(),
        }
    }

    /// Collection (set) name records are stored under
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Identifier accessor
    pub fn id(&self) -> &FieldDescriptor<E> {
        &self.id
    }

    /// Declared data fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor<E>] {
        &self.fields
    }

    /// Looks up a data field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<E>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared type of a data field or of the identifier
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        if name == self.id.name {
            return Some(self.id.field_type);
        }
        self.field(name).map(FieldDescriptor::field_type)
    }

    /// Reads any declared field, the identifier included
    pub fn value_of(&self, entity: &E, name: &str) -> MappingResult<Option<Value>> {
        if name == self.id.name {
            return self.id.read(entity);
        }
        match self.field(name) {
            Some(field) => field.read(entity),
            None => Err(MappingError::unknown_field(&self.collection, name)),
        }
    }
}

impl<E> fmt::Debug for EntityDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("collection", &self.collection)
            .field("id", &self.id)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Builder for [`EntityDescriptor`]
pub struct DescriptorBuilder<E> {
    collection: String,
    id: Option<FieldDescriptor<E>>,
    fields: Vec<FieldDescriptor<E>>,
}

impl<E> DescriptorBuilder<E> {
    /// Declares the identifier field. Only string and integer identifiers
    /// can form record keys.
    pub fn id(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        get: Getter<E>,
        set: Setter<E>,
    ) -> Self {
        self.id = Some(FieldDescriptor {
            name: name.into(),
            field_type,
            get,
            set,
        });
        self
    }

    /// Declares a data field
    pub fn field(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        get: Getter<E>,
        set: Setter<E>,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            field_type,
            get,
            set,
        });
        self
    }

    /// Validates and freezes the table
    pub fn build(self) -> MappingResult<EntityDescriptor<E>> {
        if self.collection.is_empty() {
            return Err(MappingError::invalid_descriptor(
                "collection name must not be empty",
            ));
        }

        let id = self.id.ok_or_else(|| {
            MappingError::invalid_descriptor(format!(
                "collection '{}' declares no identifier",
                self.collection
            ))
        })?;

        if !matches!(id.field_type, FieldType::Str | FieldType::Int) {
            return Err(MappingError::unsupported_type(
                &id.name,
                id.field_type.as_str(),
            ));
        }

        let mut seen = HashSet::new();
        seen.insert(id.name.clone());
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(MappingError::invalid_descriptor(format!(
                    "collection '{}' declares a field with an empty name",
                    self.collection
                )));
            }
            if !seen.insert(field.name.clone()) {
                return Err(MappingError::invalid_descriptor(format!(
                    "collection '{}' declares field '{}' twice",
                    self.collection, field.name
                )));
            }
        }

        Ok(EntityDescriptor {
            collection: self.collection,
            id,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Item {
        sku: String,
        qty: i64,
    }

    fn builder() -> DescriptorBuilder<Item> {
        EntityDescriptor::<Item>::builder("Item")
            .id(
                "sku",
                FieldType::Str,
                |i| Some(Value::from(i.sku.clone())),
                |i, v| {
                    i.sku = v.into_string()?;
                    Ok(())
                },
            )
            .field(
                "qty",
                FieldType::Int,
                |i| Some(Value::from(i.qty)),
                |i, v| {
                    i.qty = v.into_int()?;
                    Ok(())
                },
            )
    }

    #[test]
    fn test_build_valid_descriptor() {
        let d = builder().build().unwrap();
        assert_eq!(d.collection(), "Item");
        assert_eq!(d.id().name(), "sku");
        assert_eq!(d.fields().len(), 1);
        assert_eq!(d.field_type("qty"), Some(FieldType::Int));
        assert_eq!(d.field_type("sku"), Some(FieldType::Str));
        assert_eq!(d.field_type("missing"), None);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = builder()
            .field("qty", FieldType::Int, |_| None, |_, _| Ok(()))
            .build();
        assert_eq!(
            result.unwrap_err().code(),
            super::super::errors::MappingErrorCode::InvalidDescriptor
        );
    }

    #[test]
    fn test_field_shadowing_id_rejected() {
        let result = builder()
            .field("sku", FieldType::Str, |_| None, |_, _| Ok(()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_id_rejected() {
        let result = EntityDescriptor::<Item>::builder("Item").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_float_id_rejected() {
        let result = EntityDescriptor::<Item>::builder("Item")
            .id("sku", FieldType::Float, |_| None, |_, _| Ok(()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_value_of_reads_id_and_fields() {
        let d = builder().build().unwrap();
        let item = Item {
            sku: "A1".into(),
            qty: 3,
        };
        assert_eq!(d.value_of(&item, "sku").unwrap(), Some(Value::from("A1")));
        assert_eq!(d.value_of(&item, "qty").unwrap(), Some(Value::from(3)));
        assert!(d.value_of(&item, "color").is_err());
    }

    #[test]
    fn test_write_coerces_and_names_field() {
        let d = builder().build().unwrap();
        let mut item = Item::default();
        let err = d
            .field("qty")
            .unwrap()
            .write(&mut item, Value::from("three"))
            .unwrap_err();
        assert_eq!(err.field(), Some("qty"));
    }
}
