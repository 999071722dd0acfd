//! LanceDB connection helpers and the Arrow codec of chunk rows.

use anyhow::{anyhow, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{
    FixedSizeListArray, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray,
    TimestampMillisecondArray,
};
use chrono::Utc;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection};
use std::sync::Arc;

use ragdb_core::types::{Chunk, EmbeddingRecord, EmbeddingSpace, IndexEntry};

use crate::schema::{self, build_chunk_schema, hash_content};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

/// Embedding space and row count of an existing table; `(None, 0)` when the
/// table does not exist yet.
pub async fn read_state(conn: &Connection, name: &str) -> Result<(Option<EmbeddingSpace>, usize)> {
    if !table_exists(conn, name).await? { return Ok((None, 0)); }
    let table = conn.open_table(name).execute().await?;
    let count = table.count_rows(None).await?;
    if count == 0 { return Ok((None, 0)); }
    let dimension = schema::vector_dim(&*table.schema().await?).ok_or_else(|| anyhow!("table '{}' has no vector column", name))?;
    let mut stream = table.query().select(Select::columns(&[schema::MODEL_ID])).limit(1).execute().await?;
    let mut model_id = None;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        if batch.num_rows() == 0 { continue; }
        model_id = Some(string_col(&batch, schema::MODEL_ID)?.value(0).to_string());
        break;
    }
    let model_id = model_id.ok_or_else(|| anyhow!("table '{}' has rows but no model_id", name))?;
    Ok((Some(EmbeddingSpace { dimension, model_id }), count))
}

/// Write one record batch as a single commit: create the table on first use,
/// append otherwise.
pub async fn write_batch(conn: &Connection, name: &str, batch: RecordBatch) -> Result<()> {
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    if table_exists(conn, name).await? {
        conn.open_table(name).execute().await?.add(reader).execute().await?;
    } else {
        conn.create_table(name, reader).execute().await?;
    }
    Ok(())
}

/// All rows matching `filter` (every row when `None`) as `(seq, entry)`.
pub async fn scan(conn: &Connection, name: &str, filter: Option<String>, limit: Option<usize>) -> Result<Vec<(i64, IndexEntry)>> {
    if !table_exists(conn, name).await? { return Ok(Vec::new()); }
    let table = conn.open_table(name).execute().await?;
    let mut query = table.query();
    if let Some(filter) = filter { query = query.only_if(filter); }
    if let Some(limit) = limit { query = query.limit(limit); }
    let mut stream = query.execute().await?;
    let mut rows = Vec::new();
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        rows.extend(batch_to_rows(&batch)?);
    }
    Ok(rows)
}

/// Quote a string literal for a Lance SQL filter.
pub fn sql_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub fn entries_to_record_batch(entries: &[IndexEntry], first_seq: usize, dim: usize) -> Result<RecordBatch> {
    let dim = i32::try_from(dim)?;
    let now = Utc::now().timestamp_millis();
    let mut seqs = Vec::with_capacity(entries.len());
    let mut source_ids = Vec::with_capacity(entries.len());
    let mut ordinals = Vec::with_capacity(entries.len());
    let mut texts = Vec::with_capacity(entries.len());
    let mut char_lengths = Vec::with_capacity(entries.len());
    let mut hashes = Vec::with_capacity(entries.len());
    let mut model_ids = Vec::with_capacity(entries.len());
    let mut indexed_at = Vec::with_capacity(entries.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
    for (i, e) in entries.iter().enumerate() {
        seqs.push(i64::try_from(first_seq + i)?);
        source_ids.push(e.chunk.source_id.clone());
        ordinals.push(i32::try_from(e.chunk.ordinal)?);
        texts.push(e.chunk.text.clone());
        char_lengths.push(i32::try_from(e.chunk.char_length)?);
        hashes.push(hash_content(&e.chunk.text));
        model_ids.push(e.record.model_id.clone());
        indexed_at.push(now);
        vectors.push(Some(e.record.vector.iter().map(|&x| Some(x)).collect()));
    }
    let batch = RecordBatch::try_new(build_chunk_schema(dim), vec![
        Arc::new(Int64Array::from(seqs)),
        Arc::new(StringArray::from(source_ids)),
        Arc::new(Int32Array::from(ordinals)),
        Arc::new(StringArray::from(texts)),
        Arc::new(Int32Array::from(char_lengths)),
        Arc::new(StringArray::from(hashes)),
        Arc::new(StringArray::from(model_ids)),
        Arc::new(TimestampMillisecondArray::from(indexed_at)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), dim)),
    ])?;
    Ok(batch)
}

fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<(i64, IndexEntry)>> {
    let seq = int64_col(batch, schema::SEQ)?;
    let source_id = string_col(batch, schema::SOURCE_ID)?;
    let ordinal = int32_col(batch, schema::ORDINAL)?;
    let text = string_col(batch, schema::TEXT)?;
    let char_length = int32_col(batch, schema::CHAR_LENGTH)?;
    let content_hash = string_col(batch, schema::CONTENT_HASH)?;
    let model_id = string_col(batch, schema::MODEL_ID)?;
    let vector = batch
        .column_by_name(schema::VECTOR)
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| anyhow!("missing {} column", schema::VECTOR))?;

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let text = text.value(i);
        let chunk = Chunk {
            source_id: source_id.value(i).to_string(),
            ordinal: usize::try_from(ordinal.value(i))?,
            text: text.to_string(),
            char_length: usize::try_from(char_length.value(i))?,
        };
        if content_hash.value(i) != hash_content(text) {
            return Err(anyhow!("content hash mismatch for {}: stored text was altered", chunk.chunk_ref()));
        }
        let values = vector.value(i).as_primitive::<Float32Type>().values().to_vec();
        let record = EmbeddingRecord::new(chunk.chunk_ref(), values, model_id.value(i));
        rows.push((seq.value(i), IndexEntry { chunk, record }));
    }
    Ok(rows)
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("missing {} column", name))
}

fn int32_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int32Array> {
    batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<Int32Array>()).ok_or_else(|| anyhow!("missing {} column", name))
}

fn int64_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<Int64Array>()).ok_or_else(|| anyhow!("missing {} column", name))
}
