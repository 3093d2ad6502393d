//! In-memory result sorting
//!
//! Sorts a materialized result by a list of (field, direction) pairs.
//!
//! Ordering rules:
//! - Lexicographic over the order list, first pair is the primary key
//! - Natural ordering within one field type
//! - Absent values after present ones ascending, before them descending
//! - Stable: ties keep their input order

use std::cmp::Ordering;

use crate::mapping::{Entity, MappingError, MappingResult, Value};
use crate::planner::{Order, Sort, SortDirection};

/// Sorts decoded entities
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts entities according to `sort`.
    ///
    /// Fails on a field the entity does not declare, on a map-typed field,
    /// and on values without a mutual ordering (such as lists mixing
    /// element types).
    pub fn sort<E: Entity>(entities: Vec<E>, sort: &Sort) -> MappingResult<Vec<E>> {
        if sort.is_unsorted() {
            return Ok(entities);
        }

        let descriptor = E::descriptor();
        for order in &sort.orders {
            let field_type = descriptor
                .field_type(&order.field)
                .ok_or_else(|| MappingError::unknown_field(descriptor.collection(), order.field.as_str()))?;
            if !field_type.is_orderable() {
                return Err(MappingError::unsupported_type(
                    order.field.as_str(),
                    field_type.as_str(),
                ));
            }
        }

        // Sort keys are read once per entity
        let mut keyed = entities
            .into_iter()
            .map(|entity| {
                let keys = sort
                    .orders
                    .iter()
                    .map(|order| {
                        let value = descriptor.value_of(&entity, &order.field)?;
                        Ok(value.map(|v| Self::normalize(v, order)))
                    })
                    .collect::<MappingResult<Vec<_>>>()?;
                Ok((keys, entity))
            })
            .collect::<MappingResult<Vec<_>>>()?;

        let mut failure: Option<MappingError> = None;
        keyed.sort_by(|(a, _), (b, _)| {
            for (i, order) in sort.orders.iter().enumerate() {
                let ordering = match Self::compare_values(a[i].as_ref(), b[i].as_ref()) {
                    Some(ordering) => ordering,
                    None => {
                        if failure.is_none() {
                            failure = Some(MappingError::type_mismatch(
                                order.field.as_str(),
                                Self::kind(a[i].as_ref()),
                                Self::kind(b[i].as_ref()),
                            ));
                        }
                        Ordering::Equal
                    }
                };
                let ordering = match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(keyed.into_iter().map(|(_, entity)| entity).collect()),
        }
    }

    fn normalize(value: Value, order: &Order) -> Value {
        match value {
            Value::Str(s) if order.ignore_case => Value::Str(s.to_lowercase()),
            other => other,
        }
    }

    /// Ascending comparison, absent last. `None` when the values have no
    /// mutual ordering.
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Option<Ordering> {
        match (a, b) {
            (None, None) => Some(Ordering::Equal),
            (None, Some(_)) => Some(Ordering::Greater),
            (Some(_), None) => Some(Ordering::Less),
            (Some(a_val), Some(b_val)) => a_val.natural_cmp(b_val),
        }
    }

    fn kind(value: Option<&Value>) -> &'static str {
        value.map_or("absent", Value::type_name)
    }
}
