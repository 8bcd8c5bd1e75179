// ============================================================================
// REDB DOCUMENT STORE
// ============================================================================
//
// ACID key-value persistence. All six ledger documents live in one table;
// `put_all` writes them inside a single write transaction, so a crash mid
// flush leaves the previous state intact.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::info;

use super::{KeyValueStore, StorageError, StorageResult};

/// Documents: Key (String) → JSON (String)
const DOCUMENTS: TableDefinition<&str, &str> = TableDefinition::new("documents");

fn db_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Database(e.to_string())
}

#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Create or open `<dir>/lotto.redb`.
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join("lotto.redb");
        info!(path = %path.display(), "Opening ReDB database");

        let db = Database::create(&path).map_err(db_err)?;

        // Make sure the table exists before the first read.
        let write_txn = db.begin_write().map_err(db_err)?;
        {
            let _ = write_txn.open_table(DOCUMENTS).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(DOCUMENTS).map_err(db_err)?;
        let value = table.get(key).map_err(db_err)?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        self.put_all(&[(key, value.to_string())])
    }

    fn put_all(&self, entries: &[(&str, String)]) -> StorageResult<()> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(DOCUMENTS).map_err(db_err)?;
            for (key, value) in entries {
                table.insert(*key, value.as_str()).map_err(db_err)?;
            }
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }
}
