//! Object-field mapping
//!
//! Converts typed entities into store records and back.
//!
//! # Rules
//!
//! - The record key is (namespace, collection, stringified identifier)
//! - A missing or empty identifier is an error, never generated
//! - Unset fields are not written; unknown stored fields are ignored
//! - A value whose type differs from the declared one is an error
//! - An absent record decodes to `None`

mod codec;
mod descriptor;
mod errors;
mod value;

pub use codec::RecordCodec;
pub use descriptor::{DescriptorBuilder, Entity, EntityDescriptor, FieldDescriptor, Getter, Setter};
pub use errors::{MappingError, MappingErrorCode, MappingResult};
pub use value::{FieldType, Value};
