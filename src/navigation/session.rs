//! 会话状态服务
//!
//! 按标签页与路由保存滚动位置、表单数据等界面状态，键格式为
//! `session:{tab}:{path}`。超过有效期的记录在读取时删除。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::config::SessionConfig;
use crate::storage::PersistenceStore;

/// 路由界面状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteState {
    /// 横向滚动位置
    #[serde(default)]
    pub scroll_x: f64,
    /// 纵向滚动位置
    #[serde(default)]
    pub scroll_y: f64,
    /// 表单数据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<BTreeMap<String, Value>>,
    /// 额外元数据（光标位置等）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<BTreeMap<String, Value>>,
    /// 保存时间（毫秒时间戳）
    #[serde(default)]
    pub timestamp: i64,
}

/// 会话状态服务
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn PersistenceStore>,
    config: SessionConfig,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionService {
    /// 创建会话服务
    pub fn new(store: Arc<dyn PersistenceStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// 生成持久化键
    pub fn key(tab_id: &str, full_path: &str) -> String {
        format!("session:{}:{}", tab_id, full_path)
    }

    fn ttl(&self) -> Duration {
        Duration::days(i64::from(self.config.ttl_days))
    }

    /// 保存路由状态（写入时打上时间戳），失败只记录日志
    pub async fn save_state(&self, tab_id: &str, full_path: &str, mut state: RouteState) {
        let key = Self::key(tab_id, full_path);
        state.timestamp = Utc::now().timestamp_millis();

        let value = match serde_json::to_value(&state) {
            Ok(value) => value,
            Err(e) => {
                warn!(record_key = %key, error = %e, "会话状态序列化失败");
                return;
            }
        };
        match self.store.save(&self.config.scope, &key, value).await {
            Ok(()) => debug!(record_key = %key, "会话状态已保存"),
            Err(e) => warn!(record_key = %key, error = %e, "会话状态保存失败"),
        }
    }

    /// 恢复路由状态
    ///
    /// 记录过期时删除并返回 `None`；读取失败同样返回 `None`。
    pub async fn restore_state(&self, tab_id: &str, full_path: &str) -> Option<RouteState> {
        let key = Self::key(tab_id, full_path);
        let value = match self.store.load(&self.config.scope, &key).await {
            Ok(value) => value?,
            Err(e) => {
                warn!(record_key = %key, error = %e, "会话状态读取失败");
                return None;
            }
        };

        let state: RouteState = match serde_json::from_value(value) {
            Ok(state) => state,
            Err(e) => {
                warn!(record_key = %key, error = %e, "会话状态格式无效");
                return None;
            }
        };

        let age = Utc::now().timestamp_millis() - state.timestamp;
        if age > self.ttl().num_milliseconds() {
            debug!(record_key = %key, "会话状态已过期");
            if let Err(e) = self.store.remove(&self.config.scope, &key).await {
                warn!(record_key = %key, error = %e, "删除过期会话状态失败");
            }
            return None;
        }
        Some(state)
    }

    /// 清除标签页的全部状态
    ///
    /// # Returns
    ///
    /// 删除的记录数
    pub async fn clear_tab(&self, tab_id: &str) -> usize {
        let prefix = format!("session:{}:", tab_id);
        let keys = match self.store.keys(&self.config.scope).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(tab_id = %tab_id, error = %e, "列出会话状态失败");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
            match self.store.remove(&self.config.scope, key).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(record_key = %key, error = %e, "删除会话状态失败"),
            }
        }
        debug!(tab_id = %tab_id, removed, "标签页会话状态已清除");
        removed
    }
}
