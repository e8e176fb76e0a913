//! 键值存储抽象
//!
//! 进程级 KV：按固定键整体读写字符串值（不支持部分更新）。持久性与作用域由具体后端决定。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs;

use crate::config::AppConfig;
use crate::history::SqliteKvStore;

/// 存储接口：get 不存在时返回 None
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// 内存存储：进程退出即丢失
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// 文件存储：每个键一个文件（<dir>/<key>.json），目录不存在时自动创建
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.key_path(key);
        match fs::read_to_string(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.key_path(key);
        fs::write(&path, value)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// 按 [storage].backend 创建存储：memory / file / sqlite；未知值回退到 file
pub fn create_store_from_config(cfg: &AppConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    let backend = cfg.storage.backend.to_lowercase();
    match backend.as_str() {
        "memory" => {
            tracing::info!("Using in-memory history store");
            Ok(Arc::new(MemoryKvStore::new()))
        }
        "sqlite" => {
            let path = cfg
                .storage
                .path
                .clone()
                .unwrap_or_else(|| cfg.app.data_dir.join("carepath.db"));
            tracing::info!("Using SQLite history store: {:?}", path);
            Ok(Arc::new(SqliteKvStore::open(&path)?))
        }
        other => {
            if other != "file" {
                tracing::warn!("Unknown storage backend '{}', falling back to file", other);
            }
            let dir = cfg
                .storage
                .path
                .clone()
                .unwrap_or_else(|| cfg.app.data_dir.clone());
            tracing::info!("Using file history store: {:?}", dir);
            Ok(Arc::new(FileKvStore::new(dir)))
        }
    }
}
