//! SelfSpace SDK
//!
//! Self Space 运行时的主要对外接口。把注册表、生命周期存储、Dock 编排器、
//! 导航历史与会话服务组合成一个显式持有的运行时对象：
//!
//! - 模块注册：注册描述符与扩展清单
//! - 模块切换：打开、关闭、崩溃上报
//! - Dock：获取调和后的 Dock 队列
//! - 视图：解析前台视图并交给宿主的视图工厂
//! - 导航：每个模块独立的历史栈与路由状态
//!
//! # 示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use selfspace_core::{MemoryStore, RuntimeConfig, SelfSpace, StaticCatalog};
//! use selfspace_core::catalog::demo_catalog;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let space = SelfSpace::new(
//!         RuntimeConfig::default(),
//!         Arc::new(StaticCatalog::new(demo_catalog())),
//!         Arc::new(MemoryStore::new()),
//!     );
//!     space.register_builtin_modules().await;
//!     space.initialize().await?;
//!
//!     space.switch_to("system").await?;
//!     println!("{:?}", space.current_view().await);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::catalog::CatalogSource;
use crate::core::config::RuntimeConfig;
use crate::dock::{DockItem, DockOrchestrator, ErrorRecord, OsContext};
use crate::module::builtin;
use crate::module::lifecycle::{AliasRule, CrashRecord, LifecycleStore};
use crate::module::metadata::{ModuleDescriptor, ModuleManifest};
use crate::module::registry::ModuleRegistry;
use crate::module::view::{ActiveView, ViewFactory};
use crate::navigation::{NavigationHistoryStore, SessionService};
use crate::preferences::PinnedPreferences;
use crate::storage::PersistenceStore;
use crate::utils::Result;

// ============================================================================
// SelfSpace 主结构体
// ============================================================================

/// Self Space 运行时
///
/// 所有组件通过构造函数注入，不依赖全局状态。
///
/// # 组件
///
/// - `registry`: 模块注册表
/// - `lifecycle`: 前台 / 运行集合 / 崩溃记录
/// - `orchestrator`: Dock 队列与前台视图
/// - `history`: 导航历史栈
/// - `session`: 路由界面状态
pub struct SelfSpace {
    config: RuntimeConfig,
    registry: ModuleRegistry,
    lifecycle: LifecycleStore,
    preferences: PinnedPreferences,
    orchestrator: DockOrchestrator,
    history: NavigationHistoryStore,
    session: SessionService,
    created_at: Instant,
}

impl SelfSpace {
    // ========================================================================
    // 创建与初始化
    // ========================================================================

    /// 创建运行时
    ///
    /// # Arguments
    ///
    /// * `config` - 运行时配置
    /// * `catalog` - 目录数据源
    /// * `store` - 持久化存储
    pub fn new(
        config: RuntimeConfig,
        catalog: Arc<dyn CatalogSource>,
        store: Arc<dyn PersistenceStore>,
    ) -> Self {
        Self::with_preferences(config, catalog, store, PinnedPreferences::new())
    }

    /// 使用已有的固定偏好创建运行时
    pub fn with_preferences(
        config: RuntimeConfig,
        catalog: Arc<dyn CatalogSource>,
        store: Arc<dyn PersistenceStore>,
        preferences: PinnedPreferences,
    ) -> Self {
        info!("创建 Self Space 运行时 v{}", crate::VERSION);

        let registry = ModuleRegistry::new();
        let lifecycle = LifecycleStore::with_aliases(AliasRule::from_config(&config.dock));
        let orchestrator = DockOrchestrator::new(
            config.dock.clone(),
            registry.clone(),
            lifecycle.clone(),
            preferences.clone(),
            catalog,
        );
        let history = NavigationHistoryStore::new(Arc::clone(&store), config.history.clone());
        let session = SessionService::new(store, config.session.clone());
        debug!("运行时组件创建完成");

        Self {
            config,
            registry,
            lifecycle,
            preferences,
            orchestrator,
            history,
            session,
            created_at: Instant::now(),
        }
    }

    /// 注册全部内置模块
    pub async fn register_builtin_modules(&self) -> usize {
        builtin::register_builtin_modules(&self.registry).await
    }

    /// 注册模块描述符
    pub async fn register(&self, descriptor: ModuleDescriptor) -> bool {
        self.registry.register(descriptor).await
    }

    /// 注册或覆盖扩展清单
    pub async fn register_manifest(&self, manifest: ModuleManifest) {
        self.registry.register_manifest(manifest).await
    }

    /// 初始化：加载导航历史，拉取目录并同步 Dock
    ///
    /// 重复调用只在第一次成功时执行工作。
    pub async fn initialize(&self) -> Result<()> {
        self.history.init().await;
        self.orchestrator.initialize().await
    }

    // ========================================================================
    // 模块操作
    // ========================================================================

    /// 切换到指定模块，返回实际激活的 ID
    pub async fn switch_to(&self, id: &str) -> Result<String> {
        self.orchestrator.switch_to(id).await
    }

    /// 关闭模块，返回新的 Dock 队列
    pub async fn close(&self, id: &str) -> Vec<DockItem> {
        self.orchestrator.close(id).await
    }

    /// 上报模块崩溃
    pub async fn crash(&self, id: &str, message: Option<&str>, stack: Option<String>) {
        self.orchestrator.crash(id, message, stack).await
    }

    /// 崩溃记录
    pub async fn crash_record(&self, id: &str) -> Option<CrashRecord> {
        self.orchestrator.crash_record(id).await
    }

    /// 固定或取消固定模块，返回切换后的状态
    pub async fn toggle_pin(&self, id: &str) -> bool {
        let pinned = self.preferences.toggle(id).await;
        self.orchestrator.sync_dock().await;
        pinned
    }

    // ========================================================================
    // Dock 与视图
    // ========================================================================

    /// 全部 Dock 条目
    pub async fn dock_items(&self) -> Vec<DockItem> {
        self.orchestrator.dock_items().await
    }

    /// 固定区条目
    pub async fn pinned_dock_items(&self) -> Vec<DockItem> {
        self.orchestrator.pinned_dock_items().await
    }

    /// 运行区条目
    pub async fn running_dock_items(&self) -> Vec<DockItem> {
        self.orchestrator.running_dock_items().await
    }

    /// 前台 Dock 条目
    pub async fn current_dock_item(&self) -> Option<DockItem> {
        self.orchestrator.current_dock_item().await
    }

    /// 前台视图
    pub async fn current_view(&self) -> ActiveView {
        self.orchestrator.current_view().await
    }

    /// 用宿主的视图工厂渲染前台视图
    pub async fn render<F: ViewFactory>(&self, factory: &F) -> F::View {
        factory.render(&self.current_view().await)
    }

    // ========================================================================
    // 访问器
    // ========================================================================

    /// 运行时配置
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// 模块注册表
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// 生命周期存储
    pub fn lifecycle(&self) -> &LifecycleStore {
        &self.lifecycle
    }

    /// 固定偏好
    pub fn preferences(&self) -> &PinnedPreferences {
        &self.preferences
    }

    /// Dock 编排器
    pub fn orchestrator(&self) -> &DockOrchestrator {
        &self.orchestrator
    }

    /// 导航历史
    pub fn history(&self) -> &NavigationHistoryStore {
        &self.history
    }

    /// 会话服务
    pub fn session(&self) -> &SessionService {
        &self.session
    }

    /// 交给模块使用的系统上下文
    pub fn os_context(&self) -> OsContext {
        self.orchestrator.os_context()
    }

    /// 运行时长
    pub fn uptime(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// 运行状态摘要
    pub async fn status(&self) -> StatusInfo {
        StatusInfo {
            initialized: self.orchestrator.is_initialized().await,
            loading: self.orchestrator.is_loading().await,
            active_id: self.lifecycle.active_id().await,
            running_count: self.lifecycle.running_ids().await.len(),
            dock_len: self.orchestrator.dock_items().await.len(),
            catalog_size: self.orchestrator.catalog().await.len(),
            module_count: self.registry.count().await,
            last_error: self.orchestrator.last_error().await,
            uptime_secs: self.uptime().as_secs(),
        }
    }

    // ========================================================================
    // 清理
    // ========================================================================

    /// 清空会话级状态（登出）
    ///
    /// 重置生命周期、导航历史与 Dock 队列。注册表和固定偏好保持不变。
    pub async fn reset(&self) {
        self.lifecycle.reset().await;
        self.history.reset().await;
        self.orchestrator.reset().await;
        self.history.flush().await;
        info!("Self Space 运行时已重置");
    }

    /// 等待后台写入完成
    pub async fn shutdown(&self) {
        self.history.flush().await;
        info!(uptime_secs = self.uptime().as_secs(), "Self Space 运行时已关闭");
    }
}

impl std::fmt::Debug for SelfSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfSpace")
            .field("config", &self.config)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// 状态摘要
// ============================================================================

/// 运行状态摘要
#[derive(Debug, Clone)]
pub struct StatusInfo {
    /// 是否已初始化
    pub initialized: bool,
    /// 是否正在加载
    pub loading: bool,
    /// 前台模块
    pub active_id: String,
    /// 运行中的模块数
    pub running_count: usize,
    /// Dock 条目数
    pub dock_len: usize,
    /// 目录条目数
    pub catalog_size: usize,
    /// 已注册模块数
    pub module_count: usize,
    /// 最近一次错误
    pub last_error: Option<ErrorRecord>,
    /// 运行时间（秒）
    pub uptime_secs: u64,
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, StaticCatalog};
    use crate::module::lifecycle::LIBRARY_ID;
    use crate::storage::MemoryStore;

    async fn space(entries: Vec<CatalogEntry>) -> (SelfSpace, MemoryStore) {
        let store = MemoryStore::new();
        let space = SelfSpace::new(
            RuntimeConfig::default(),
            Arc::new(StaticCatalog::new(entries)),
            Arc::new(store.clone()),
        );
        space.register_builtin_modules().await;
        (space, store)
    }

    #[tokio::test]
    async fn test_space_creation() {
        let (space, _) = space(vec![]).await;
        space.initialize().await.unwrap();

        let status = space.status().await;
        assert!(status.initialized);
        assert_eq!(status.active_id, LIBRARY_ID);
        assert_eq!(status.dock_len, 1);
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_toggle_pin_resyncs_dock() {
        let (space, _) = space(vec![CatalogEntry::new("m", Some("math"), "Calc")]).await;
        space.initialize().await.unwrap();

        assert!(space.toggle_pin("m").await);
        assert_eq!(space.pinned_dock_items().await.len(), 2);
        assert!(!space.toggle_pin("m").await);
        assert_eq!(space.dock_items().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_session_state() {
        let (space, store) = space(vec![CatalogEntry::new("m", Some("math"), "Calc")]).await;
        space.initialize().await.unwrap();
        space.switch_to("m").await.unwrap();
        space.history().push_route("m", "/m/1").await;

        space.reset().await;

        assert_eq!(space.lifecycle().active_id().await, LIBRARY_ID);
        assert!(space.history().stacks().await.is_empty());
        assert!(space.dock_items().await.is_empty());
        assert!(!space.status().await.initialized);

        let saved = store.load("navigation", "stacks").await.unwrap().unwrap();
        assert!(saved["stacks"].as_object().unwrap().is_empty());

        // 重置后可以重新初始化
        space.initialize().await.unwrap();
        assert_eq!(space.dock_items().await.len(), 1);
    }
}
