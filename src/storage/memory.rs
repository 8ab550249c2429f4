//! 内存存储

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::PersistenceStore;
use crate::utils::{Result, RuntimeError};

/// 内存存储
///
/// 克隆句柄共享同一份数据。可以模拟写入失败，用于验证调用方的容错。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    scopes: Arc<RwLock<HashMap<String, BTreeMap<String, Value>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 开启或关闭写入失败模拟
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 记录总数
    pub async fn len(&self) -> usize {
        self.scopes.read().await.values().map(BTreeMap::len).sum()
    }

    /// 是否为空
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_writable(&self, scope: &str, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RuntimeError::PersistenceWrite {
                scope: scope.to_string(),
                key: key.to_string(),
                reason: "写入已禁用".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn save(&self, scope: &str, key: &str, value: Value) -> Result<()> {
        self.check_writable(scope, key)?;
        self.scopes
            .write()
            .await
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn load(&self, scope: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .scopes
            .read()
            .await
            .get(scope)
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn remove(&self, scope: &str, key: &str) -> Result<()> {
        self.check_writable(scope, key)?;
        if let Some(records) = self.scopes.write().await.get_mut(scope) {
            records.remove(key);
        }
        Ok(())
    }

    async fn keys(&self, scope: &str) -> Result<Vec<String>> {
        Ok(self
            .scopes
            .read()
            .await
            .get(scope)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }
}
