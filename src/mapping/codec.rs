//! Entity <-> record conversion
//!
//! Encoding reads every declared field through the descriptor table and
//! derives the record key from the identifier. Decoding starts from
//! `E::default()`, restores the identifier from the key and writes back the
//! declared fields found in the record. Store fields the entity does not
//! declare are ignored.

use crate::store::{RecordData, RecordKey};

use super::descriptor::{Entity, EntityDescriptor};
use super::errors::{MappingError, MappingResult};
use super::value::{FieldType, Value};

/// Converts entities to and from store records within one namespace
#[derive(Debug, Clone)]
pub struct RecordCodec {
    namespace: String,
}

impl RecordCodec {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Encodes an entity into its key and field data.
    ///
    /// Fails if the identifier is unset or empty, or if any field holds a
    /// value of a type other than the declared one.
    pub fn encode<E: Entity>(&self, entity: &E) -> MappingResult<(RecordKey, RecordData)> {
        let descriptor = E::descriptor();
        let key = self.key_of(entity)?;
        let data = Self::encode_fields(descriptor, entity)?;
        Ok((key, data))
    }

    /// Encodes an entity under an explicitly supplied identifier
    pub fn encode_with_id<E: Entity>(
        &self,
        id: &Value,
        entity: &E,
    ) -> MappingResult<(RecordKey, RecordData)> {
        let descriptor = E::descriptor();
        let key = self.key_for::<E>(id)?;
        let data = Self::encode_fields(descriptor, entity)?;
        Ok((key, data))
    }

    /// Key of an entity, derived from its identifier field
    pub fn key_of<E: Entity>(&self, entity: &E) -> MappingResult<RecordKey> {
        let descriptor = E::descriptor();
        let id = descriptor
            .id()
            .read(entity)?
            .ok_or_else(|| MappingError::missing_id(descriptor.collection()))?;
        self.key_for::<E>(&id)
    }

    /// Key for an identifier value within the entity's collection
    pub fn key_for<E: Entity>(&self, id: &Value) -> MappingResult<RecordKey> {
        let descriptor = E::descriptor();
        let id = id
            .to_key_string()
            .ok_or_else(|| MappingError::unsupported_type(descriptor.id().name(), id.type_name()))?;
        if id.is_empty() {
            return Err(MappingError::missing_id(descriptor.collection()));
        }
        Ok(RecordKey::new(&self.namespace, descriptor.collection(), id))
    }

    /// Decodes a record read under `key`.
    ///
    /// `None` data (the store reported no record) decodes to `None`.
    pub fn decode<E: Entity>(
        &self,
        key: &RecordKey,
        data: Option<RecordData>,
    ) -> MappingResult<Option<E>> {
        let data = match data {
            Some(d) => d,
            None => return Ok(None),
        };

        let descriptor = E::descriptor();
        let mut entity = E::default();
        Self::restore_id(descriptor, &mut entity, &key.id)?;

        for (name, value) in data {
            if let Some(field) = descriptor.field(&name) {
                field.write(&mut entity, value)?;
            }
        }

        Ok(Some(entity))
    }

    fn encode_fields<E>(descriptor: &EntityDescriptor<E>, entity: &E) -> MappingResult<RecordData> {
        let mut data = RecordData::new();
        for field in descriptor.fields() {
            if let Some(value) = field.read(entity)? {
                data.insert(field.name().to_string(), value);
            }
        }
        Ok(data)
    }

    fn restore_id<E>(descriptor: &EntityDescriptor<E>, entity: &mut E, raw: &str) -> MappingResult<()> {
        let id = descriptor.id();
        let value = match id.field_type() {
            FieldType::Int => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| MappingError::type_mismatch(id.name(), "integer", "string"))?,
            _ => Value::Str(raw.to_string()),
        };
        id.write(entity, value)
    }
}
