//! 固定偏好
//!
//! 记录用户固定在 Dock 上的模块 ID，保持固定顺序。

use std::sync::Arc;

use indexmap::IndexSet;
use tokio::sync::RwLock;
use tracing::debug;

/// 固定偏好存储
///
/// 克隆句柄共享同一份数据。
#[derive(Debug, Clone, Default)]
pub struct PinnedPreferences {
    pinned: Arc<RwLock<IndexSet<String>>>,
}

impl PinnedPreferences {
    /// 创建空偏好
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用初始固定列表创建（重复项只保留第一次出现）
    pub fn with_pinned<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pinned: Arc::new(RwLock::new(ids.into_iter().map(Into::into).collect())),
        }
    }

    /// 是否已固定
    pub async fn is_pinned(&self, id: &str) -> bool {
        self.pinned.read().await.contains(id)
    }

    /// 固定到末尾，已固定时不改变位置
    pub async fn pin(&self, id: impl Into<String>) {
        let id = id.into();
        debug!(module_id = %id, "固定模块");
        self.pinned.write().await.insert(id);
    }

    /// 取消固定
    pub async fn unpin(&self, id: &str) {
        debug!(module_id = %id, "取消固定模块");
        self.pinned.write().await.shift_remove(id);
    }

    /// 切换固定状态
    ///
    /// # Returns
    ///
    /// 切换后的固定状态
    pub async fn toggle(&self, id: &str) -> bool {
        let mut pinned = self.pinned.write().await;
        if pinned.shift_remove(id) {
            false
        } else {
            pinned.insert(id.to_string());
            true
        }
    }

    /// 固定列表（按固定顺序）
    pub async fn pinned(&self) -> Vec<String> {
        self.pinned.read().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pin_keeps_order() {
        let prefs = PinnedPreferences::new();
        prefs.pin("b").await;
        prefs.pin("a").await;
        prefs.pin("b").await;

        assert_eq!(prefs.pinned().await, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_toggle() {
        let prefs = PinnedPreferences::with_pinned(["a", "b"]);
        assert!(!prefs.toggle("a").await);
        assert!(!prefs.is_pinned("a").await);
        assert!(prefs.toggle("a").await);
        assert_eq!(prefs.pinned().await, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_unpin_missing_is_noop() {
        let prefs = PinnedPreferences::with_pinned(["a"]);
        prefs.unpin("z").await;
        assert_eq!(prefs.pinned().await, vec!["a"]);
    }
}
