//! Structured output: turns free model text into validated records.
//!
//! `extract` isolates the JSON candidate, `validate` parses and checks it against the
//! record shape a stage expects. Nothing here repairs output.

pub mod extract;
pub mod validate;

pub use validate::{extract_and_validate, MalformedOutputError, StructuredOutput};
