use crate::errors::StoreError;
use crate::models::CountTable;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::error;

/// Key of the count table inside the key-value area.
pub const STORAGE_KEY: &str = "rgiDailyReplyCounts";

/// Durable home of the count table. Writes replace the whole table; the last
/// writer wins.
#[async_trait]
pub trait CountStore: Send + Sync {
    async fn get(&self) -> Result<CountTable, StoreError>;

    async fn set(&self, table: &CountTable) -> Result<(), StoreError>;
}

/// Key-value area kept as a single JSON object on disk. `fs::write` truncates
/// before writing, so every access holds `io` to keep readers off a
/// half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    io: Arc<Mutex<()>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_area(&self) -> Result<Map<String, Value>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(area) => Ok(area),
                other => {
                    error!(path = %self.path.display(), "data file holds {other}, not an object");
                    Err(StoreError::Unavailable("data file is not a JSON object".to_string()))
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(err) => {
                error!("failed to read data file: {err}");
                Err(StoreError::Read(err))
            }
        }
    }
}

#[async_trait]
impl CountStore for JsonFileStore {
    async fn get(&self) -> Result<CountTable, StoreError> {
        let _io = self.io.lock().await;
        let mut area = self.read_area().await?;
        match area.remove(STORAGE_KEY) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(CountTable::new()),
        }
    }

    async fn set(&self, table: &CountTable) -> Result<(), StoreError> {
        let _io = self.io.lock().await;
        let mut area = self.read_area().await?;
        area.insert(STORAGE_KEY.to_string(), serde_json::to_value(table)?);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(StoreError::Write)?;
        }
        let payload = serde_json::to_vec_pretty(&Value::Object(area))?;
        fs::write(&self.path, payload).await.map_err(StoreError::Write)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<CountTable>,
    writes: Mutex<usize>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: CountTable) -> Self {
        Self {
            table: Mutex::new(table),
            ..Self::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn write_count(&self) -> usize {
        *self.writes.lock().await
    }

    pub async fn snapshot(&self) -> CountTable {
        self.table.lock().await.clone()
    }
}

#[async_trait]
impl CountStore for MemoryStore {
    async fn get(&self) -> Result<CountTable, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read rejected".to_string()));
        }
        Ok(self.table.lock().await.clone())
    }

    async fn set(&self, table: &CountTable) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        *self.table.lock().await = table.clone();
        *self.writes.lock().await += 1;
        Ok(())
    }
}
