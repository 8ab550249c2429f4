//! 知识库目录
//!
//! 目录由外部服务提供，运行时只通过 [`CatalogSource`] 拉取，
//! 每次拉取成功后整体替换。

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::utils::{Result, RuntimeError};

/// 未声明渲染器时的默认渲染器
pub const DEFAULT_RENDERER: &str = "default";

/// 目录条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// 知识库 ID（UUID 字符串）
    pub id: String,

    /// 渲染器 ID，可能是旧别名
    #[serde(default)]
    pub renderer_id: Option<String>,

    /// 标题
    #[serde(default)]
    pub title: String,
}

impl CatalogEntry {
    /// 创建目录条目
    pub fn new(id: impl Into<String>, renderer_id: Option<&str>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            renderer_id: renderer_id.map(str::to_string),
            title: title.into(),
        }
    }

    /// 生效的渲染器 ID，缺失或为空时为 `default`
    pub fn renderer(&self) -> &str {
        match self.renderer_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => DEFAULT_RENDERER,
        }
    }
}

/// 目录数据源
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// 拉取完整目录
    async fn list(&self) -> Result<Vec<CatalogEntry>>;
}

/// 内存目录
///
/// 克隆句柄共享同一份数据，宿主或测试可以随时替换内容。
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Arc<RwLock<Vec<CatalogEntry>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl StaticCatalog {
    /// 使用初始条目创建
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
            failure: Arc::new(RwLock::new(None)),
        }
    }

    /// 替换全部条目
    pub async fn replace(&self, entries: Vec<CatalogEntry>) {
        *self.entries.write().await = entries;
    }

    /// 追加条目
    pub async fn push(&self, entry: CatalogEntry) {
        self.entries.write().await.push(entry);
    }

    /// 让后续拉取失败（传 `None` 恢复）
    pub async fn set_failure(&self, reason: Option<String>) {
        *self.failure.write().await = reason;
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn list(&self) -> Result<Vec<CatalogEntry>> {
        if let Some(reason) = self.failure.read().await.clone() {
            return Err(RuntimeError::CatalogFetchFailed(reason));
        }
        Ok(self.entries.read().await.clone())
    }
}

/// JSON 文件目录（文件内容为条目数组）
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    /// 创建文件目录
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for JsonFileCatalog {
    async fn list(&self) -> Result<Vec<CatalogEntry>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "读取目录文件失败");
            RuntimeError::CatalogFetchFailed(format!("{}: {}", self.path.display(), e))
        })?;

        let entries: Vec<CatalogEntry> = serde_json::from_str(&content).map_err(|e| {
            RuntimeError::CatalogFetchFailed(format!("{}: {}", self.path.display(), e))
        })?;

        debug!(path = %self.path.display(), catalog_size = entries.len(), "目录文件已加载");
        Ok(entries)
    }
}

/// 生成演示目录（每个内置渲染器一条，ID 为随机 UUID）
pub fn demo_catalog() -> Vec<CatalogEntry> {
    [
        ("math", "Calculus Notes"),
        ("vocabulary", "English Vocabulary"),
        ("memos", "Daily Memos"),
        ("vrkb", "Vulnerability Research"),
        ("admin_system", "System"),
    ]
    .iter()
    .map(|(renderer, title)| {
        CatalogEntry::new(uuid::Uuid::new_v4().to_string(), Some(*renderer), *title)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_renderer_defaults() {
        assert_eq!(CatalogEntry::new("a", None, "A").renderer(), DEFAULT_RENDERER);
        assert_eq!(CatalogEntry::new("a", Some("  "), "A").renderer(), DEFAULT_RENDERER);
        assert_eq!(CatalogEntry::new("a", Some("math"), "A").renderer(), "math");
    }

    #[tokio::test]
    async fn test_static_catalog_replace() {
        let catalog = StaticCatalog::new(vec![CatalogEntry::new("a", Some("math"), "A")]);
        assert_eq!(catalog.list().await.unwrap().len(), 1);

        catalog.replace(vec![]).await;
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_catalog_failure() {
        let catalog = StaticCatalog::default();
        catalog.set_failure(Some("offline".to_string())).await;

        let err = catalog.list().await.unwrap_err();
        assert!(matches!(err, RuntimeError::CatalogFetchFailed(_)));

        catalog.set_failure(None).await;
        assert!(catalog.list().await.is_ok());
    }

    #[tokio::test]
    async fn test_json_file_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "kb-1", "renderer_id": "math", "title": "Calc"}}, {{"id": "kb-2"}}]"#
        )
        .unwrap();

        let entries = JsonFileCatalog::new(file.path()).list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].renderer(), DEFAULT_RENDERER);
    }

    #[tokio::test]
    async fn test_json_file_catalog_missing() {
        let result = JsonFileCatalog::new("/nonexistent/catalog.json").list().await;
        assert!(matches!(result, Err(RuntimeError::CatalogFetchFailed(_))));
    }

    #[test]
    fn test_demo_catalog_ids_unique() {
        let catalog = demo_catalog();
        let mut ids: Vec<_> = catalog.iter().map(|e| e.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
    }
}
