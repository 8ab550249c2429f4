//! 应用生命周期存储
//!
//! 维护前台模块、后台运行集合与崩溃记录。状态转换：
//! Closed → Running → Active，Crashed 与其正交。
//!
//! 所有 ID 在进入存储前都会经过别名规范化（`system` / `admin` 映射到
//! 目录中系统管理条目的真实 ID）。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::catalog::CatalogEntry;
use crate::core::config::DockConfig;

/// Library 锚点的固定 ID
pub const LIBRARY_ID: &str = "library";

/// 崩溃记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashRecord {
    /// 错误信息
    pub message: String,
    /// 调用栈
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// 崩溃时间
    pub crashed_at: DateTime<Utc>,
}

impl CrashRecord {
    /// 以当前时间创建崩溃记录
    pub fn new(message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            message: message.into(),
            stack,
            crashed_at: Utc::now(),
        }
    }
}

/// 别名规则
///
/// 别名只会解析到渲染器属于 `renderers` 的第一个目录条目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRule {
    /// 别名列表
    pub aliases: Vec<String>,
    /// 可作为目标的渲染器
    pub renderers: Vec<String>,
}

impl AliasRule {
    /// 从 Dock 配置构建
    pub fn from_config(config: &DockConfig) -> Self {
        Self {
            aliases: config.system_aliases.clone(),
            renderers: config.system_alias_renderers.clone(),
        }
    }

    /// 尝试把别名解析为目录 ID
    pub fn resolve(&self, raw_id: &str, catalog: &[CatalogEntry]) -> Option<String> {
        if !self.aliases.iter().any(|alias| alias == raw_id) {
            return None;
        }
        catalog
            .iter()
            .find(|entry| self.renderers.iter().any(|r| r == entry.renderer()))
            .map(|entry| entry.id.clone())
    }
}

impl Default for AliasRule {
    fn default() -> Self {
        Self::from_config(&DockConfig::default())
    }
}

/// 生命周期状态快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleState {
    /// 前台模块 ID
    pub active_id: String,
    /// 运行中的模块（保持插入顺序）
    pub running_ids: IndexSet<String>,
    /// 崩溃记录
    pub crashes: HashMap<String, CrashRecord>,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self {
            active_id: LIBRARY_ID.to_string(),
            running_ids: IndexSet::new(),
            crashes: HashMap::new(),
        }
    }
}

/// 生命周期存储
///
/// 克隆得到的句柄共享同一份状态。
#[derive(Debug, Clone)]
pub struct LifecycleStore {
    state: Arc<RwLock<LifecycleState>>,
    catalog: Arc<RwLock<Vec<CatalogEntry>>>,
    aliases: AliasRule,
}

impl LifecycleStore {
    /// 使用默认别名规则创建
    pub fn new() -> Self {
        Self::with_aliases(AliasRule::default())
    }

    /// 使用指定别名规则创建
    pub fn with_aliases(aliases: AliasRule) -> Self {
        Self {
            state: Arc::new(RwLock::new(LifecycleState::default())),
            catalog: Arc::new(RwLock::new(Vec::new())),
            aliases,
        }
    }

    // ==================== 目录与别名 ====================

    /// 注册目录，用于别名规范化
    pub async fn register_catalog(&self, entries: Vec<CatalogEntry>) {
        debug!(catalog_size = entries.len(), "生命周期存储更新目录");
        *self.catalog.write().await = entries;
    }

    /// 规范化 ID
    ///
    /// `library` 原样返回；别名解析到系统条目；其余原样返回
    /// （目录中尚未同步的 ID 也允许进入）。
    pub async fn resolve_id(&self, raw_id: &str) -> String {
        if raw_id == LIBRARY_ID {
            return LIBRARY_ID.to_string();
        }
        let catalog = self.catalog.read().await;
        self.aliases
            .resolve(raw_id, &catalog)
            .unwrap_or_else(|| raw_id.to_string())
    }

    // ==================== 状态转换 ====================

    /// 切换前台模块
    ///
    /// # Returns
    ///
    /// 规范化后的前台 ID
    pub async fn switch_to(&self, raw_id: &str) -> String {
        let id = self.resolve_id(raw_id).await;
        let mut state = self.state.write().await;

        if state.active_id == id {
            debug!(active_id = %id, "目标已是前台模块");
            return id;
        }

        info!(raw_id = %raw_id, active_id = %id, "切换前台模块");
        state.active_id = id.clone();
        if id != LIBRARY_ID {
            state.running_ids.insert(id.clone());
        }
        if state.crashes.remove(&id).is_some() {
            debug!(module_id = %id, "清除旧的崩溃记录");
        }
        id
    }

    /// 关闭模块
    ///
    /// 前台模块被关闭时回退到 Library。崩溃记录保持不变。
    pub async fn close(&self, id: &str) {
        let mut state = self.state.write().await;
        state.running_ids.shift_remove(id);
        if state.active_id == id {
            info!(module_id = %id, "关闭前台模块，回到 Library");
            state.active_id = LIBRARY_ID.to_string();
        } else {
            debug!(module_id = %id, "关闭后台模块");
        }
    }

    /// 记录崩溃，不改变运行集合与前台
    pub async fn crash(&self, id: &str, message: impl Into<String>, stack: Option<String>) {
        let record = CrashRecord::new(message, stack);
        warn!(module_id = %id, message = %record.message, "模块崩溃");
        self.state
            .write()
            .await
            .crashes
            .insert(id.to_string(), record);
    }

    /// 重置为初始状态
    pub async fn reset(&self) {
        *self.state.write().await = LifecycleState::default();
        info!("生命周期状态已重置");
    }

    // ==================== 查询 ====================

    /// 前台模块 ID
    pub async fn active_id(&self) -> String {
        self.state.read().await.active_id.clone()
    }

    /// 运行中的模块 ID（插入顺序）
    pub async fn running_ids(&self) -> Vec<String> {
        self.state.read().await.running_ids.iter().cloned().collect()
    }

    /// 模块是否在运行
    pub async fn is_running(&self, id: &str) -> bool {
        self.state.read().await.running_ids.contains(id)
    }

    /// 获取崩溃记录
    pub async fn crash_record(&self, id: &str) -> Option<CrashRecord> {
        self.state.read().await.crashes.get(id).cloned()
    }

    /// 已注册的目录
    pub async fn catalog(&self) -> Vec<CatalogEntry> {
        self.catalog.read().await.clone()
    }

    /// 状态快照
    pub async fn snapshot(&self) -> LifecycleState {
        self.state.read().await.clone()
    }
}

impl Default for LifecycleStore {
    fn default() -> Self {
        Self::new()
    }
}
