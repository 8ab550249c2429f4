//! 持久化存储
//!
//! 运行时通过 [`PersistenceStore`] 读写按 `scope` / `key` 组织的 JSON 值。
//! 提供内存实现与 JSON 文件实现两种后端。

mod file;
mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::utils::Result;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// 持久化存储接口
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// 保存值（覆盖）
    async fn save(&self, scope: &str, key: &str, value: Value) -> Result<()>;

    /// 读取值，不存在时返回 `None`
    async fn load(&self, scope: &str, key: &str) -> Result<Option<Value>>;

    /// 删除值，不存在时不报错
    async fn remove(&self, scope: &str, key: &str) -> Result<()>;

    /// 列出作用域内的所有键
    async fn keys(&self, scope: &str) -> Result<Vec<String>>;
}
