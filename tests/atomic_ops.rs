//! Atomic Mutation Tests
//!
//! Append, prepend and increment run as one store-side operation and
//! return the entity as it is after the mutation.

mod common;

use std::collections::BTreeMap;

use common::{facade, person, Person};
use kvmapper::mapping::{MappingErrorCode, Value};
use kvmapper::observability::Event;
use kvmapper::store::{RecordData, RecordKey, ResultCode, StoreError, StoreOp};
use kvmapper::translate::DataAccessError;

// =============================================================================
// String Mutations
// =============================================================================

#[test]
fn test_append_returns_updated_entity() {
    let (facade, _sink) = facade();
    let p = person("1", "Ann", 30, "New");
    facade.save(&p).unwrap();

    let updated = facade.append(&p, "city", " York").unwrap();
    assert_eq!(updated.city.as_deref(), Some("New York"));
    assert_eq!(updated.name, "Ann");

    let stored: Person = facade.find_by_id("1").unwrap().unwrap();
    assert_eq!(stored, updated);
}

#[test]
fn test_prepend() {
    let (facade, _sink) = facade();
    let p = person("1", "Ann", 30, "York");
    facade.save(&p).unwrap();

    let updated = facade.prepend(&p, "city", "New ").unwrap();
    assert_eq!(updated.city.as_deref(), Some("New York"));
}

#[test]
fn test_append_all_and_prepend_all() {
    let (facade, _sink) = facade();
    let p = person("1", "Ann", 30, "Oslo");
    facade.save(&p).unwrap();

    let mut suffixes = BTreeMap::new();
    suffixes.insert("name".to_string(), "ie".to_string());
    suffixes.insert("city".to_string(), " S".to_string());
    let updated = facade.append_all(&p, &suffixes).unwrap();
    assert_eq!(updated.name, "Annie");
    assert_eq!(updated.city.as_deref(), Some("Oslo S"));

    let mut prefixes = BTreeMap::new();
    prefixes.insert("name".to_string(), "Dr ".to_string());
    let updated = facade.prepend_all(&p, &prefixes).unwrap();
    assert_eq!(updated.name, "Dr Annie");
}

#[test]
fn test_append_to_absent_field_sets_it() {
    let (facade, _sink) = facade();
    let p = Person {
        id: Some("1".into()),
        name: "Ann".into(),
        ..Default::default()
    };
    facade.save(&p).unwrap();

    let updated = facade.append(&p, "city", "Rome").unwrap();
    assert_eq!(updated.city.as_deref(), Some("Rome"));
}

// =============================================================================
// Integer Mutations
// =============================================================================

#[test]
fn test_increment() {
    let (facade, sink) = facade();
    let p = person("1", "Ann", 30, "NYC");
    facade.save(&p).unwrap();

    facade.increment(&p, "visits", 1).unwrap();
    let updated = facade.increment(&p, "visits", 4).unwrap();
    assert_eq!(updated.visits, 5);

    let writes = sink.events(Event::RecordWrite);
    assert_eq!(writes.last().unwrap().field("operation"), Some("add"));
}

#[test]
fn test_increment_all() {
    let (facade, _sink) = facade();
    let p = person("1", "Ann", 30, "NYC");
    facade.save(&p).unwrap();

    let mut deltas = BTreeMap::new();
    deltas.insert("age".to_string(), 1);
    deltas.insert("visits".to_string(), -2);
    let updated = facade.increment_all(&p, &deltas).unwrap();
    assert_eq!(updated.age, Some(31));
    assert_eq!(updated.visits, -2);
}

#[test]
fn test_increment_creates_missing_record() {
    let (facade, _sink) = facade();
    let ghost = person("9", "Ghost", 1, "X");

    let updated = facade.increment(&ghost, "visits", 3).unwrap();
    assert_eq!(updated.visits, 3);
    assert_eq!(updated.id.as_deref(), Some("9"));
    assert_eq!(updated.name, "");
}

#[test]
fn test_increment_overflow_is_invalid_usage() {
    let (facade, _sink) = facade();
    let mut p = person("1", "Ann", 30, "NYC");
    p.visits = i64::MAX;
    facade.save(&p).unwrap();

    let err = facade.increment(&p, "visits", 1).unwrap_err();
    assert!(matches!(err, DataAccessError::InvalidUsage { .. }));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_undeclared_field_rejected_before_store() {
    let (facade, _sink) = facade();
    let p = person("1", "Ann", 30, "NYC");
    facade.save(&p).unwrap();

    let err = facade.append(&p, "nickname", "x").unwrap_err();
    match err {
        DataAccessError::Mapping(mapping) => {
            assert_eq!(mapping.code(), MappingErrorCode::UnknownField)
        }
        other => panic!("expected mapping error, got {other:?}"),
    }
}

#[test]
fn test_wrong_field_type_rejected() {
    let (facade, _sink) = facade();
    let p = person("1", "Ann", 30, "NYC");

    assert_eq!(
        facade.increment(&p, "name", 1).unwrap_err().code(),
        "KV_MAPPING_ERROR"
    );
    assert_eq!(
        facade.append(&p, "age", "1").unwrap_err().code(),
        "KV_MAPPING_ERROR"
    );
}

#[test]
fn test_empty_mutation_set_is_invalid_usage() {
    let (facade, _sink) = facade();
    let p = person("1", "Ann", 30, "NYC");
    let err = facade.increment_all(&p, &BTreeMap::new()).unwrap_err();
    assert_eq!(err.code(), "KV_INVALID_USAGE");
}

#[test]
fn test_stored_type_conflict_is_invalid_usage() {
    let (facade, _sink) = facade();
    let mut data = RecordData::new();
    data.insert("visits".into(), Value::from("many"));
    facade
        .store()
        .insert_raw(&RecordKey::new("test", "Person", "1"), data);

    let err = facade
        .increment(&person("1", "Ann", 30, "NYC"), "visits", 1)
        .unwrap_err();
    assert!(matches!(err, DataAccessError::InvalidUsage { .. }));
    assert_eq!(err.store_error().unwrap().code(), ResultCode::BinTypeError);
}

#[test]
fn test_operate_failure_translated() {
    let (facade, _sink) = facade();
    facade
        .store()
        .fail_next(StoreOp::Operate, StoreError::new(ResultCode::Timeout, "slow"));

    let err = facade
        .append(&person("1", "Ann", 30, "NYC"), "name", "x")
        .unwrap_err();
    assert!(err.is_transient());
}
