//! Arrow schemas for the summary tables (Parquet export)

use std::sync::{Arc, LazyLock};

use arrow::datatypes::{DataType, Field, Schema};

pub static LANG_SUMMARY: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("lang", DataType::Utf8, false),
        Field::new("article_count", DataType::UInt64, false),
        Field::new("avg_quality", DataType::Float64, false),
        Field::new("high_quality_ratio", DataType::Float64, false),
    ]))
});

pub static QUALITY_BINS: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("lang", DataType::Utf8, false),
        Field::new("quality_bin", DataType::Int64, false),
        Field::new("bin_count", DataType::UInt64, false),
    ]))
});

pub static TITLE_LEN_BINS: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("lang", DataType::Utf8, false),
        Field::new("title_len_bin", DataType::Int64, false),
        Field::new("bin_count", DataType::UInt64, false),
        Field::new("avg_quality", DataType::Float64, false),
        Field::new("high_quality_ratio", DataType::Float64, false),
    ]))
});

pub static TOPK: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("lang", DataType::Utf8, false),
        Field::new("rank", DataType::UInt32, false),
        Field::new("quality", DataType::Float64, false),
        Field::new("page_id", DataType::Int64, false),
        Field::new("title", DataType::Utf8, false),
    ]))
});

/// Column names of a schema, in order; doubles as the CSV header
pub fn header(schema: &Schema) -> Vec<&str> {
    schema.fields().iter().map(|f| f.name().as_str()).collect()
}
