use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const SEQ: &str = "seq";
pub const SOURCE_ID: &str = "source_id";
pub const ORDINAL: &str = "ordinal";
pub const TEXT: &str = "text";
pub const CHAR_LENGTH: &str = "char_length";
pub const CONTENT_HASH: &str = "content_hash";
pub const MODEL_ID: &str = "model_id";
pub const INDEXED_AT: &str = "indexed_at";
pub const VECTOR: &str = "vector";

/// One row per chunk. `seq` is the insertion position; the vector width is
/// fixed per table by the first batch written.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(SEQ, DataType::Int64, false),
		Field::new(SOURCE_ID, DataType::Utf8, false),
		Field::new(ORDINAL, DataType::Int32, false),
		Field::new(TEXT, DataType::Utf8, false),
		Field::new(CHAR_LENGTH, DataType::Int32, false),
		Field::new(CONTENT_HASH, DataType::Utf8, false),
		Field::new(MODEL_ID, DataType::Utf8, false),
		Field::new(INDEXED_AT, DataType::Timestamp(TimeUnit::Millisecond, None), false),
		Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Vector width of an existing chunk table, if its schema has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(VECTOR).ok()?.data_type() {
		DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
		_ => None,
	}
}

pub fn hash_content(s: &str) -> String {
	blake3::hash(s.as_bytes()).to_hex().to_string()
}
