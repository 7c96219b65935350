//! Composite records: ordered, named collections of fields with optional presence.

mod fields;
mod record;
mod schema;

pub use fields::Fields;
pub use record::Record;
pub use schema::{FieldSpec, Schema};
