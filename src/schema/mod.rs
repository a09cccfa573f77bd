pub mod schema;

pub use schema::{validate_field_name, FieldBinding, FieldIndexingMode, IndexFieldsMapping, IndexFieldsMappingBuilder};
