//! Error translation
//!
//! Converts native store failures into [`DataAccessError`]. The facade
//! applies a translator at every store call; translators are pluggable.

mod errors;
mod translator;

pub use errors::{AccessResult, DataAccessError};
pub use translator::{translate_or_wrap, DefaultErrorTranslator, ErrorTranslator};
