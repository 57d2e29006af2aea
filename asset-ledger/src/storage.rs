//! RocksDB-backed durable store
//!
//! # Column Families
//!
//! - `documents` - One JSON document per storage key

use crate::{
    error::{Error, Result},
    store::DurableStore,
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, DB};
use std::sync::Arc;

/// Column family names
const CF_DOCUMENTS: &str = "documents";

/// Storage wrapper for RocksDB
pub struct RocksStore {
    db: Arc<DB>,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .finish()
    }
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(
            CF_DOCUMENTS,
            Self::cf_options_documents(),
        )];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB document store");

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_options_documents() -> Options {
        let mut opts = Options::default();
        // Documents are rewritten whole, favour fast reads
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_DOCUMENTS)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_DOCUMENTS)))
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        self.flush()?;
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

impl DurableStore for RocksStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let cf = self.cf_handle()?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| Error::Storage(format!("Document {} is not UTF-8: {}", key, e))),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let cf = self.cf_handle()?;
        self.db.put_cf(cf, key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let cf = self.cf_handle()?;
        self.db.delete_cf(cf, key.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.db.flush_cf(self.cf_handle()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let storage = RocksStore::open(&config).unwrap();
        assert!(storage.db.cf_handle(CF_DOCUMENTS).is_some());
    }

    #[test]
    fn test_put_get_remove() {
        let (config, _temp) = test_config();
        let storage = RocksStore::open(&config).unwrap();

        assert_eq!(storage.get("k").unwrap(), None);
        storage.put("k", "{\"a\":1}").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("{\"a\":1}"));
        storage.put("k", "[]").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("[]"));
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn test_documents_survive_reopen() {
        let (config, _temp) = test_config();
        {
            let storage = RocksStore::open(&config).unwrap();
            storage.put("k", "persisted").unwrap();
            storage.close().unwrap();
        }

        let storage = RocksStore::open(&config).unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("persisted"));
    }
}
