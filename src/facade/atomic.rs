//! Single-record atomic mutations
//!
//! Each call sends the mutations plus a trailing read in one `operate`
//! request and returns the entity decoded from the post-mutation record.
//! Fields must be declared on the entity with a matching type.

use std::collections::BTreeMap;

use crate::mapping::{Entity, FieldType, MappingError};
use crate::observability::Event;
use crate::store::{Operation, Store};
use crate::translate::{AccessResult, DataAccessError};

use super::facade::AccessFacade;

impl<S: Store> AccessFacade<S> {
    /// Appends `value` to a string field
    pub fn append<E: Entity>(&self, entity: &E, field: &str, value: &str) -> AccessResult<E> {
        let op = Operation::Append {
            field: Self::declared::<E>(field, FieldType::Str)?,
            value: value.to_string(),
        };
        self.operate(entity, "append", vec![op])
    }

    /// Appends to several string fields at once
    pub fn append_all<E: Entity>(
        &self,
        entity: &E,
        values: &BTreeMap<String, String>,
    ) -> AccessResult<E> {
        let ops = values
            .iter()
            .map(|(field, value)| {
                Ok(Operation::Append {
                    field: Self::declared::<E>(field, FieldType::Str)?,
                    value: value.clone(),
                })
            })
            .collect::<AccessResult<Vec<_>>>()?;
        self.operate(entity, "append", ops)
    }

    /// Prepends `value` to a string field
    pub fn prepend<E: Entity>(&self, entity: &E, field: &str, value: &str) -> AccessResult<E> {
        let op = Operation::Prepend {
            field: Self::declared::<E>(field, FieldType::Str)?,
            value: value.to_string(),
        };
        self.operate(entity, "prepend", vec![op])
    }

    /// Prepends to several string fields at once
    pub fn prepend_all<E: Entity>(
        &self,
        entity: &E,
        values: &BTreeMap<String, String>,
    ) -> AccessResult<E> {
        let ops = values
            .iter()
            .map(|(field, value)| {
                Ok(Operation::Prepend {
                    field: Self::declared::<E>(field, FieldType::Str)?,
                    value: value.clone(),
                })
            })
            .collect::<AccessResult<Vec<_>>>()?;
        self.operate(entity, "prepend", ops)
    }

    /// Adds `delta` to an integer field
    pub fn increment<E: Entity>(&self, entity: &E, field: &str, delta: i64) -> AccessResult<E> {
        let op = Operation::Add {
            field: Self::declared::<E>(field, FieldType::Int)?,
            delta,
        };
        self.operate(entity, "add", vec![op])
    }

    /// Adds to several integer fields at once
    pub fn increment_all<E: Entity>(
        &self,
        entity: &E,
        deltas: &BTreeMap<String, i64>,
    ) -> AccessResult<E> {
        let ops = deltas
            .iter()
            .map(|(field, delta)| {
                Ok(Operation::Add {
                    field: Self::declared::<E>(field, FieldType::Int)?,
                    delta: *delta,
                })
            })
            .collect::<AccessResult<Vec<_>>>()?;
        self.operate(entity, "add", ops)
    }

    fn declared<E: Entity>(field: &str, expected: FieldType) -> AccessResult<String> {
        let descriptor = E::descriptor();
        let declared = descriptor
            .field(field)
            .ok_or_else(|| MappingError::unknown_field(descriptor.collection(), field))?;
        if declared.field_type() != expected {
            return Err(MappingError::type_mismatch(
                field,
                expected.as_str(),
                declared.field_type().as_str(),
            )
            .into());
        }
        Ok(field.to_string())
    }

    fn operate<E: Entity>(
        &self,
        entity: &E,
        operation: &str,
        mut ops: Vec<Operation>,
    ) -> AccessResult<E> {
        let key = self.codec.key_of(entity)?;
        if ops.is_empty() {
            return Err(DataAccessError::invalid_usage(format!(
                "{} needs at least one field",
                operation
            )));
        }
        ops.push(Operation::Get);

        let record = self.translated(self.store.operate(&key, &ops))?;
        let key_str = key.to_string();
        self.sink().event(
            Event::RecordWrite,
            &[("key", key_str.as_str()), ("operation", operation)],
        );

        self.codec
            .decode(&key, Some(record.data))?
            .ok_or_else(|| DataAccessError::unexpected_response("operate returned no record"))
    }
}
