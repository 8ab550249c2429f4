//! 导航历史存储
//!
//! 每个模块维护一个独立的路径栈。每次变更都会在后台把整张表写入
//! 持久化存储；写入串行执行，且总是写入执行时刻的最新状态。
//! 变更操作会先等待快照加载完成，保证已保存的历史不会被覆盖。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::config::HistoryConfig;
use crate::storage::PersistenceStore;

type Stacks = BTreeMap<String, Vec<String>>;

/// 持久化快照
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistorySnapshot {
    stacks: Stacks,
    timestamp: i64,
}

/// 导航历史存储
///
/// 克隆得到的句柄共享同一份状态。
#[derive(Clone)]
pub struct NavigationHistoryStore {
    store: Arc<dyn PersistenceStore>,
    config: HistoryConfig,
    stacks: Arc<RwLock<Stacks>>,
    loaded: Arc<OnceCell<()>>,
    write_lock: Arc<Mutex<()>>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl std::fmt::Debug for NavigationHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationHistoryStore")
            .field("config", &self.config)
            .field("loaded", &self.loaded.initialized())
            .finish_non_exhaustive()
    }
}

impl NavigationHistoryStore {
    /// 创建历史存储
    pub fn new(store: Arc<dyn PersistenceStore>, config: HistoryConfig) -> Self {
        Self {
            store,
            config,
            stacks: Arc::new(RwLock::new(Stacks::new())),
            loaded: Arc::new(OnceCell::new()),
            write_lock: Arc::new(Mutex::new(())),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 从持久化存储加载（每个进程只执行一次）
    ///
    /// 旧格式快照（每个模块只存一个字符串）直接丢弃。读取失败只记录日志，
    /// 之后从空表开始。
    pub async fn init(&self) {
        self.loaded
            .get_or_init(|| async {
                let Some(loaded) = self.load_snapshot().await else {
                    return;
                };
                let mut stacks = self.stacks.write().await;
                *stacks = loaded;
                info!(count = stacks.len(), "导航历史已加载");
            })
            .await;
    }

    async fn load_snapshot(&self) -> Option<Stacks> {
        let value = match self.store.load(&self.config.scope, &self.config.key).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!(scope = %self.config.scope, error = %e, "读取导航历史失败");
                return None;
            }
        };

        let is_legacy = value
            .get("stacks")
            .and_then(Value::as_object)
            .map(|stacks| stacks.values().any(Value::is_string))
            .unwrap_or(false);
        if is_legacy {
            info!("检测到旧格式导航历史，已丢弃");
            return None;
        }

        match serde_json::from_value::<HistorySnapshot>(value) {
            Ok(snapshot) => Some(snapshot.stacks),
            Err(e) => {
                warn!(error = %e, "导航历史格式无效，已丢弃");
                None
            }
        }
    }

    // ==================== 栈操作 ====================

    /// 压入路径，与栈顶相同时忽略
    pub async fn push_route(&self, module_id: &str, path: &str) {
        self.init().await;
        {
            let mut stacks = self.stacks.write().await;
            let stack = stacks.entry(module_id.to_string()).or_default();
            if stack.last().map(String::as_str) == Some(path) {
                return;
            }
            stack.push(path.to_string());
            debug!(module_id = %module_id, path = %path, depth = stack.len(), "压入路由");
        }
        self.schedule_persist().await;
    }

    /// 弹出栈顶，返回新的栈顶
    ///
    /// 栈内不超过一个条目时不做任何事并返回 `None`。
    pub async fn pop_route(&self, module_id: &str) -> Option<String> {
        self.init().await;
        let top = {
            let mut stacks = self.stacks.write().await;
            let stack = stacks.get_mut(module_id)?;
            if stack.len() <= 1 {
                return None;
            }
            stack.pop();
            stack.last().cloned()
        };
        self.schedule_persist().await;
        top
    }

    /// 查看栈顶
    pub async fn get_last_route(&self, module_id: &str) -> Option<String> {
        self.stacks
            .read()
            .await
            .get(module_id)
            .and_then(|stack| stack.last().cloned())
    }

    /// 清空模块的栈
    pub async fn clear_stack(&self, module_id: &str) {
        self.init().await;
        let removed = self.stacks.write().await.remove(module_id).is_some();
        if removed {
            self.schedule_persist().await;
        }
    }

    /// 全部栈的快照
    pub async fn stacks(&self) -> BTreeMap<String, Vec<String>> {
        self.stacks.read().await.clone()
    }

    /// 清空全部栈并持久化
    pub async fn reset(&self) {
        self.init().await;
        self.stacks.write().await.clear();
        self.schedule_persist().await;
    }

    // ==================== 持久化 ====================

    async fn schedule_persist(&self) {
        let store = Arc::clone(&self.store);
        let stacks = Arc::clone(&self.stacks);
        let write_lock = Arc::clone(&self.write_lock);
        let scope = self.config.scope.clone();
        let key = self.config.key.clone();

        let handle = tokio::spawn(async move {
            let _guard = write_lock.lock().await;
            let snapshot = HistorySnapshot {
                stacks: stacks.read().await.clone(),
                timestamp: Utc::now().timestamp_millis(),
            };
            let value = match serde_json::to_value(&snapshot) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "导航历史序列化失败");
                    return;
                }
            };
            if let Err(e) = store.save(&scope, &key, value).await {
                warn!(scope = %scope, key = %key, error = %e, "导航历史写入失败");
            }
        });

        let mut pending = self.pending.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// 等待所有进行中的写入完成
    pub async fn flush(&self) {
        let handles: Vec<_> = self.pending.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "导航历史写入任务异常");
            }
        }
    }
}
