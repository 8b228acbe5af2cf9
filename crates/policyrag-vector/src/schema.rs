use arrow_schema::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

pub const ID: &str = "id";
pub const SOURCE: &str = "source";
pub const CONTENT: &str = "content";
pub const POLICY_TYPE: &str = "policy_type";
/// Lowercased copy of `policy_type`; filters compare against it.
pub const POLICY_TYPE_KEY: &str = "policy_type_key";
pub const POLICY_NUMBER: &str = "policy_number";
pub const SECTION: &str = "section";
pub const PAGE: &str = "page";
pub const DOCUMENT_CLASS: &str = "document_class";
pub const EXTRA_JSON: &str = "extra_json";
pub const VECTOR: &str = "vector";

/// Chunk table layout; metadata is flattened into columns so it can be filtered in SQL.
pub fn build_arrow_schema(dim: i32) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(ID, DataType::Utf8, false),
        Field::new(SOURCE, DataType::Utf8, false),
        Field::new(CONTENT, DataType::Utf8, false),
        Field::new(POLICY_TYPE, DataType::Utf8, true),
        Field::new(POLICY_TYPE_KEY, DataType::Utf8, true),
        Field::new(POLICY_NUMBER, DataType::Utf8, true),
        Field::new(SECTION, DataType::Utf8, true),
        Field::new(PAGE, DataType::Utf8, true),
        Field::new(DOCUMENT_CLASS, DataType::Utf8, false),
        Field::new(EXTRA_JSON, DataType::Utf8, true),
        Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}
