use std::collections::BTreeMap;
use std::path::Path;

use lancedb::Connection;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use ragdb_core::store::validate_batch;
use ragdb_core::traits::IndexStore;
use ragdb_core::types::{ChunkRef, EmbeddingSpace, IndexEntry, IndexStats, LoadedIndex};
use ragdb_core::{Error, Result};

use crate::table::{self, sql_string};

fn store_err(e: anyhow::Error) -> Error {
    Error::Store(format!("{e:#}"))
}

/// `IndexStore` over one LanceDB table.
///
/// Owns a Tokio runtime and blocks on it, so it must not be used from inside
/// an async context. The embedding space is read back from the table when it
/// is opened: vector width from the schema, model id from the stored rows.
pub struct LanceIndexStore {
    rt: Runtime,
    db: Connection,
    table_name: String,
    space: Option<EmbeddingSpace>,
    record_count: usize,
}

impl LanceIndexStore {
    pub fn open_or_create(db_path: &Path, table_name: &str) -> Result<Self> {
        std::fs::create_dir_all(db_path)?;
        let rt = Runtime::new()?;
        let uri = db_path.to_string_lossy().to_string();
        let (db, (space, record_count)) = rt
            .block_on(async {
                let db = table::open_db(&uri).await?;
                let state = table::read_state(&db, table_name).await?;
                anyhow::Ok((db, state))
            })
            .map_err(store_err)?;
        info!(path = %db_path.display(), table = table_name, records = record_count, "opened index store");
        Ok(Self { rt, db, table_name: table_name.to_string(), space, record_count })
    }

    pub fn table_name(&self) -> &str { &self.table_name }

    fn existing_refs(&self, entries: &[IndexEntry]) -> Result<Option<ChunkRef>> {
        if self.record_count == 0 { return Ok(None); }
        let mut by_source: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for e in entries {
            by_source.entry(e.chunk.source_id.as_str()).or_default().push(e.chunk.ordinal);
        }
        for (source_id, ordinals) in by_source {
            let list = ordinals.iter().map(|o| o.to_string()).collect::<Vec<_>>().join(", ");
            let filter = format!("source_id = {} AND ordinal IN ({})", sql_string(source_id), list);
            let found = self
                .rt
                .block_on(table::scan(&self.db, &self.table_name, Some(filter), Some(1)))
                .map_err(store_err)?;
            if let Some((_, entry)) = found.into_iter().next() {
                return Ok(Some(entry.chunk.chunk_ref()));
            }
        }
        Ok(None)
    }
}

impl IndexStore for LanceIndexStore {
    fn append(&mut self, entries: &[IndexEntry]) -> Result<usize> {
        let space = validate_batch(self.space.as_ref(), entries)?;
        if entries.is_empty() { return Ok(0); }
        if let Some(dup) = self.existing_refs(entries)? {
            return Err(Error::InvalidBatch(format!("{dup} is already indexed")));
        }
        let dim = space.as_ref().map_or(0, |s| s.dimension);
        let batch = table::entries_to_record_batch(entries, self.record_count, dim).map_err(store_err)?;
        self.rt.block_on(table::write_batch(&self.db, &self.table_name, batch)).map_err(store_err)?;
        self.record_count += entries.len();
        self.space = space;
        debug!(table = %self.table_name, added = entries.len(), total = self.record_count, "appended batch");
        Ok(entries.len())
    }

    fn load_all(&self) -> Result<LoadedIndex> {
        let mut rows = self.rt.block_on(table::scan(&self.db, &self.table_name, None, None)).map_err(store_err)?;
        rows.sort_by_key(|(seq, _)| *seq);
        info!(table = %self.table_name, records = rows.len(), "loaded index");
        Ok(LoadedIndex::from_entries(rows.into_iter().map(|(_, e)| e)))
    }

    fn get(&self, chunk_ref: &ChunkRef) -> Result<Option<IndexEntry>> {
        let filter = format!("source_id = {} AND ordinal = {}", sql_string(&chunk_ref.source_id), chunk_ref.ordinal);
        let rows = self
            .rt
            .block_on(table::scan(&self.db, &self.table_name, Some(filter), Some(1)))
            .map_err(store_err)?;
        Ok(rows.into_iter().next().map(|(_, e)| e))
    }

    fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            record_count: self.record_count,
            dimension: self.space.as_ref().map(|s| s.dimension),
            model_id: self.space.as_ref().map(|s| s.model_id.clone()),
        })
    }
}
