//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use kvmapper::mapping::{Entity, EntityDescriptor, FieldType, Value};
use kvmapper::observability::MemoryLogSink;
use kvmapper::store::MemoryStore;
use kvmapper::{AccessFacade, FacadeConfig};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub id: Option<String>,
    pub name: String,
    pub age: Option<i64>,
    pub city: Option<String>,
    pub visits: i64,
}

impl Entity for Person {
    fn descriptor() -> &'static EntityDescriptor<Self> {
        static DESCRIPTOR: OnceLock<EntityDescriptor<Person>> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::<Person>::builder("Person")
                .id(
                    "id",
                    FieldType::Str,
                    |p| p.id.clone().map(Value::from),
                    |p, v| {
                        p.id = Some(v.into_string()?);
                        Ok(())
                    },
                )
                .field(
                    "name",
                    FieldType::Str,
                    |p| Some(Value::from(p.name.clone())),
                    |p, v| {
                        p.name = v.into_string()?;
                        Ok(())
                    },
                )
                .field(
                    "age",
                    FieldType::Int,
                    |p| p.age.map(Value::from),
                    |p, v| {
                        p.age = Some(v.into_int()?);
                        Ok(())
                    },
                )
                .field(
                    "city",
                    FieldType::Str,
                    |p| p.city.clone().map(Value::from),
                    |p, v| {
                        p.city = Some(v.into_string()?);
                        Ok(())
                    },
                )
                .field(
                    "visits",
                    FieldType::Int,
                    |p| Some(Value::from(p.visits)),
                    |p, v| {
                        p.visits = v.into_int()?;
                        Ok(())
                    },
                )
                .build()
                .expect("valid descriptor")
        })
    }
}

pub fn person(id: &str, name: &str, age: i64, city: &str) -> Person {
    Person {
        id: Some(id.to_string()),
        name: name.to_string(),
        age: Some(age),
        city: Some(city.to_string()),
        visits: 0,
    }
}

/// Facade over `store` in namespace "test", logging into memory
pub fn facade_with(store: MemoryStore) -> (AccessFacade<MemoryStore>, Arc<MemoryLogSink>) {
    let sink = Arc::new(MemoryLogSink::new());
    let facade = AccessFacade::builder(store)
        .config(FacadeConfig::with_namespace("test"))
        .log_sink(sink.clone())
        .build()
        .expect("valid config");
    (facade, sink)
}

/// Facade over an empty single-node store
pub fn facade() -> (AccessFacade<MemoryStore>, Arc<MemoryLogSink>) {
    facade_with(MemoryStore::new("test"))
}

pub fn names(people: &[Person]) -> Vec<&str> {
    people.iter().map(|p| p.name.as_str()).collect()
}
