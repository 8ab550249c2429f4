//! JSON 文件存储
//!
//! 每个作用域对应数据目录下的一个 JSON 文档 `{scope}.json`，
//! 文档内容为 `key -> value` 对象。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::PersistenceStore;
use crate::utils::{Result, RuntimeError};

type Document = BTreeMap<String, Value>;

/// JSON 文件存储
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    /// 串行化同一进程内的读改写
    lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// 创建文件存储，目录在首次写入时创建
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// 数据目录
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn scope_path(&self, scope: &str) -> PathBuf {
        let file_name: String = scope
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.data_dir.join(format!("{}.json", file_name))
    }

    async fn read_raw(&self, scope: &str, key: &str) -> Result<Option<String>> {
        let path = self.scope_path(scope);
        if !path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            RuntimeError::PersistenceRead {
                scope: scope.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Some(content))
    }

    fn parse_document(scope: &str, key: &str, content: &str) -> Result<Document> {
        if content.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(content).map_err(|e| RuntimeError::PersistenceRead {
            scope: scope.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    async fn read_document(&self, scope: &str, key: &str) -> Result<Document> {
        match self.read_raw(scope, key).await? {
            Some(content) => Self::parse_document(scope, key, &content),
            None => Ok(Document::new()),
        }
    }

    async fn write_document(&self, scope: &str, key: &str, document: &Document) -> Result<()> {
        let write_err = |reason: String| RuntimeError::PersistenceWrite {
            scope: scope.to_string(),
            key: key.to_string(),
            reason,
        };

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| write_err(e.to_string()))?;

        let content = serde_json::to_string_pretty(document)?;
        let path = self.scope_path(scope);
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| write_err(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| write_err(e.to_string()))?;

        debug!(scope = %scope, key = %key, path = %path.display(), "作用域文档已写入");
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for JsonFileStore {
    async fn save(&self, scope: &str, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        // 损坏的文档无法恢复，写入时以新文档覆盖
        let mut document = match self.read_raw(scope, key).await? {
            Some(content) => Self::parse_document(scope, key, &content).unwrap_or_else(|e| {
                warn!(scope = %scope, error = %e, "作用域文档已损坏，将被覆盖");
                Document::new()
            }),
            None => Document::new(),
        };
        document.insert(key.to_string(), value);
        self.write_document(scope, key, &document).await
    }

    async fn load(&self, scope: &str, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document(scope, key).await?;
        Ok(document.remove(key))
    }

    async fn remove(&self, scope: &str, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document(scope, key).await?;
        if document.remove(key).is_some() {
            self.write_document(scope, key, &document).await?;
        }
        Ok(())
    }

    async fn keys(&self, scope: &str) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        let document = self.read_document(scope, "*").await?;
        Ok(document.into_keys().collect())
    }
}
