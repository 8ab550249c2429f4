//! Dock 编排器
//!
//! 组合注册表、生命周期存储、固定偏好与目录数据源，负责：
//! - 初始化（只执行一次，失败可重试）
//! - 模块切换（含完整的 ID 兜底解析链）
//! - Dock 队列同步
//! - 前台视图解析

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use super::item::DockItem;
use super::reconciler::{DockReconciler, ReconcileInput};
use crate::catalog::{CatalogEntry, CatalogSource};
use crate::core::config::DockConfig;
use crate::module::lifecycle::{CrashRecord, LifecycleStore, LIBRARY_ID};
use crate::module::registry::ModuleRegistry;
use crate::module::view::{ActiveView, BrokenReason};
use crate::preferences::PinnedPreferences;
use crate::utils::{Result, RuntimeError};

/// 最近一次错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// 错误码
    pub code: String,
    /// 错误信息
    pub message: String,
    /// 发生时间
    pub occurred_at: DateTime<Utc>,
}

impl From<&RuntimeError> for ErrorRecord {
    fn from(err: &RuntimeError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct OrchestratorState {
    catalog: Vec<CatalogEntry>,
    queue: Vec<DockItem>,
    is_loading: bool,
    is_initialized: bool,
    last_error: Option<ErrorRecord>,
}

/// Dock 编排器
///
/// 克隆得到的句柄共享同一份状态。
#[derive(Clone)]
pub struct DockOrchestrator {
    registry: ModuleRegistry,
    lifecycle: LifecycleStore,
    preferences: PinnedPreferences,
    source: Arc<dyn CatalogSource>,
    reconciler: DockReconciler,
    state: Arc<RwLock<OrchestratorState>>,
    init_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for DockOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockOrchestrator")
            .field("registry", &self.registry)
            .field("lifecycle", &self.lifecycle)
            .field("preferences", &self.preferences)
            .finish_non_exhaustive()
    }
}

impl DockOrchestrator {
    /// 创建编排器
    pub fn new(
        config: DockConfig,
        registry: ModuleRegistry,
        lifecycle: LifecycleStore,
        preferences: PinnedPreferences,
        source: Arc<dyn CatalogSource>,
    ) -> Self {
        Self {
            registry,
            lifecycle,
            preferences,
            source,
            reconciler: DockReconciler::new(config),
            state: Arc::new(RwLock::new(OrchestratorState::default())),
            init_lock: Arc::new(Mutex::new(())),
        }
    }

    // ==================== 初始化与目录 ====================

    /// 初始化：拉取目录并同步 Dock
    ///
    /// 只有第一次成功的调用会执行工作；失败时保持未初始化，允许重试。
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;
        if self.state.read().await.is_initialized {
            debug!("编排器已初始化，跳过");
            return Ok(());
        }

        self.set_loading(true).await;
        let result = self.refresh_catalog().await;
        if result.is_ok() {
            self.sync_dock().await;
        }

        let mut state = self.state.write().await;
        state.is_loading = false;
        match result {
            Ok(count) => {
                state.is_initialized = true;
                info!(catalog_size = count, "编排器初始化完成");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, error_code = e.error_code(), "编排器初始化失败");
                Err(e)
            }
        }
    }

    /// 重新拉取目录（整体替换）
    ///
    /// 失败时记录 `last_error`，保留上一次成功的目录。
    ///
    /// # Returns
    ///
    /// 目录条目数量
    #[instrument(skip(self))]
    pub async fn refresh_catalog(&self) -> Result<usize> {
        match self.source.list().await {
            Ok(entries) => {
                let count = entries.len();
                self.lifecycle.register_catalog(entries.clone()).await;
                self.state.write().await.catalog = entries;
                debug!(catalog_size = count, "目录已刷新");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "目录拉取失败，保留旧目录");
                self.record_error(&e).await;
                Err(e)
            }
        }
    }

    // ==================== Dock 队列 ====================

    /// 重新调和 Dock 队列
    ///
    /// 输入在持有状态写锁后读取，并发的同步按顺序各自看到最新的运行集合。
    pub async fn sync_dock(&self) -> Vec<DockItem> {
        let mut state = self.state.write().await;
        let snapshot = self.registry.snapshot().await;
        let pinned = self.preferences.pinned().await;
        let running = self.lifecycle.running_ids().await;

        let queue = self.reconciler.reconcile(&ReconcileInput {
            catalog: &state.catalog,
            pinned_ids: &pinned,
            running_ids: &running,
            previous: &state.queue,
            registry: &snapshot,
        });
        debug!(queue_len = queue.len(), "Dock 已同步");
        state.queue = queue.clone();
        queue
    }

    /// 全部 Dock 条目
    pub async fn dock_items(&self) -> Vec<DockItem> {
        self.state.read().await.queue.clone()
    }

    /// 固定区条目
    pub async fn pinned_dock_items(&self) -> Vec<DockItem> {
        self.state
            .read()
            .await
            .queue
            .iter()
            .filter(|item| item.pinned)
            .cloned()
            .collect()
    }

    /// 运行区条目（未固定的条目）
    pub async fn running_dock_items(&self) -> Vec<DockItem> {
        self.state
            .read()
            .await
            .queue
            .iter()
            .filter(|item| !item.pinned)
            .cloned()
            .collect()
    }

    /// 前台模块对应的 Dock 条目
    pub async fn current_dock_item(&self) -> Option<DockItem> {
        let active = self.lifecycle.active_id().await;
        self.state
            .read()
            .await
            .queue
            .iter()
            .find(|item| item.id == active)
            .cloned()
    }

    // ==================== 模块操作 ====================

    /// 切换到指定模块
    ///
    /// 解析顺序：目录 ID → 刷新目录后重试 → 旧渲染器 ID → 系统别名。
    /// 全部失败时返回 [`RuntimeError::ModuleNotFound`]，前台保持不变。
    ///
    /// # Returns
    ///
    /// 实际激活的模块 ID
    #[instrument(skip(self))]
    pub async fn switch_to(&self, raw_id: &str) -> Result<String> {
        if raw_id == LIBRARY_ID {
            let id = self.lifecycle.switch_to(LIBRARY_ID).await;
            self.sync_dock().await;
            return Ok(id);
        }

        let resolved = self.lifecycle.resolve_id(raw_id).await;
        if resolved == self.lifecycle.active_id().await {
            debug!(active_id = %resolved, "目标已是前台模块");
            return Ok(resolved);
        }

        self.set_loading(true).await;
        let target = self.locate(raw_id).await;
        self.set_loading(false).await;

        let Some(entry) = target else {
            let err = RuntimeError::ModuleNotFound(raw_id.to_string());
            warn!(module_id = %raw_id, error_code = err.error_code(), "无法解析模块");
            self.record_error(&err).await;
            return Err(err);
        };

        // 渲染器未注册时仍然切换，前台显示占位视图
        if self.registry.resolve(entry.renderer()).await.is_none() {
            warn!(module_id = %entry.id, renderer_id = %entry.renderer(), "打开的模块缺少渲染器");
        }
        let id = self.lifecycle.switch_to(&entry.id).await;
        self.sync_dock().await;
        info!(module_id = %id, renderer_id = %entry.renderer(), "模块已打开");
        Ok(id)
    }

    async fn locate(&self, raw_id: &str) -> Option<CatalogEntry> {
        if let Some(entry) = self.find_entry(|e| e.id == raw_id).await {
            return Some(entry);
        }

        // 刷新失败已记录到 last_error，继续用旧目录兜底
        if self.refresh_catalog().await.is_ok() {
            if let Some(entry) = self.find_entry(|e| e.id == raw_id).await {
                return Some(entry);
            }
        }

        if let Some(entry) = self
            .find_entry(|e| e.renderer_id.as_deref() == Some(raw_id))
            .await
        {
            info!(raw_id = %raw_id, module_id = %entry.id, "旧渲染器 ID 已解析为目录 ID");
            return Some(entry);
        }

        let aliased = self.lifecycle.resolve_id(raw_id).await;
        if aliased != raw_id {
            if let Some(entry) = self.find_entry(|e| e.id == aliased).await {
                info!(raw_id = %raw_id, module_id = %entry.id, "别名已解析");
                return Some(entry);
            }
        }
        None
    }

    async fn find_entry<F>(&self, predicate: F) -> Option<CatalogEntry>
    where
        F: Fn(&CatalogEntry) -> bool,
    {
        self.state
            .read()
            .await
            .catalog
            .iter()
            .find(|e| predicate(*e))
            .cloned()
    }

    /// 关闭模块
    ///
    /// 先乐观地更新队列（标记为未运行，未固定的直接移除），再重新同步。
    #[instrument(skip(self))]
    pub async fn close(&self, id: &str) -> Vec<DockItem> {
        self.lifecycle.close(id).await;
        {
            let mut state = self.state.write().await;
            let remove = match state.queue.iter_mut().find(|item| item.id == id) {
                Some(item) => {
                    item.is_running = false;
                    !item.pinned
                }
                None => false,
            };
            if remove {
                state.queue.retain(|item| item.id != id);
            }
        }
        self.sync_dock().await
    }

    /// 记录模块崩溃
    ///
    /// 不关闭模块，前台解析为占位视图直到用户重新打开或关闭它。
    pub async fn crash(&self, id: &str, message: Option<&str>, stack: Option<String>) {
        let message = message.unwrap_or("Unknown Application Error");
        error!(module_id = %id, message = %message, "模块崩溃");
        self.lifecycle.crash(id, message, stack).await;
    }

    /// 崩溃记录
    pub async fn crash_record(&self, id: &str) -> Option<CrashRecord> {
        self.lifecycle.crash_record(id).await
    }

    // ==================== 视图解析 ====================

    /// 解析前台应当渲染的视图
    pub async fn current_view(&self) -> ActiveView {
        let active = self.lifecycle.active_id().await;

        if let Some(record) = self.lifecycle.crash_record(&active).await {
            return ActiveView::Broken {
                module_id: active,
                reason: BrokenReason::Crashed(record),
            };
        }

        let library_renderer = self.reconciler.config().library_renderer.clone();
        if active == LIBRARY_ID {
            return match self.registry.resolve(&library_renderer).await {
                Some(descriptor) => ActiveView::Module {
                    module_id: active,
                    renderer_id: descriptor.id,
                    view: descriptor.view,
                },
                None => ActiveView::Broken {
                    module_id: active,
                    reason: BrokenReason::LibraryMissing,
                },
            };
        }

        let renderer_id = {
            let state = self.state.read().await;
            state
                .queue
                .iter()
                .find(|item| item.id == active)
                .map(|item| item.renderer_id.clone())
                .or_else(|| {
                    state
                        .catalog
                        .iter()
                        .find(|e| e.id == active)
                        .map(|e| e.renderer().to_string())
                })
                .unwrap_or(library_renderer)
        };

        match self.registry.resolve(&renderer_id).await {
            Some(descriptor) => ActiveView::Module {
                module_id: active,
                renderer_id: descriptor.id,
                view: descriptor.view,
            },
            None => ActiveView::Broken {
                module_id: active,
                reason: BrokenReason::RendererMissing { renderer_id },
            },
        }
    }

    // ==================== 状态查询 ====================

    /// 是否正在加载
    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    /// 是否已初始化
    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.is_initialized
    }

    /// 最近一次错误
    pub async fn last_error(&self) -> Option<ErrorRecord> {
        self.state.read().await.last_error.clone()
    }

    /// 当前目录
    pub async fn catalog(&self) -> Vec<CatalogEntry> {
        self.state.read().await.catalog.clone()
    }

    /// 生命周期存储
    pub fn lifecycle(&self) -> &LifecycleStore {
        &self.lifecycle
    }

    /// 固定偏好
    pub fn preferences(&self) -> &PinnedPreferences {
        &self.preferences
    }

    /// 模块可用的系统上下文
    pub fn os_context(&self) -> OsContext {
        OsContext {
            orchestrator: self.clone(),
        }
    }

    /// 清空队列、目录与错误，回到未初始化状态
    pub async fn reset(&self) {
        *self.state.write().await = OrchestratorState::default();
        info!("Dock 编排器已重置");
    }

    async fn set_loading(&self, loading: bool) {
        self.state.write().await.is_loading = loading;
    }

    async fn record_error(&self, err: &RuntimeError) {
        self.state.write().await.last_error = Some(ErrorRecord::from(err));
    }
}

/// 系统上下文
///
/// 交给模块使用，让模块可以请求打开或关闭其他模块。
#[derive(Debug, Clone)]
pub struct OsContext {
    orchestrator: DockOrchestrator,
}

impl OsContext {
    /// 打开模块
    pub async fn launch_app(&self, id: &str) -> Result<String> {
        self.orchestrator.switch_to(id).await
    }

    /// 关闭模块
    pub async fn close_app(&self, id: &str) {
        self.orchestrator.close(id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::module::builtin::register_builtin_modules;

    async fn setup(entries: Vec<CatalogEntry>) -> (DockOrchestrator, StaticCatalog) {
        let registry = ModuleRegistry::new();
        register_builtin_modules(&registry).await;
        let catalog = StaticCatalog::new(entries);
        let orchestrator = DockOrchestrator::new(
            DockConfig::default(),
            registry,
            LifecycleStore::new(),
            PinnedPreferences::new(),
            Arc::new(catalog.clone()),
        );
        (orchestrator, catalog)
    }

    fn entry(id: &str, renderer: &str) -> CatalogEntry {
        CatalogEntry::new(id, Some(renderer), id.to_uppercase())
    }

    #[tokio::test]
    async fn test_initialize_builds_queue() {
        let (orch, _) = setup(vec![entry("sys", "admin_system")]).await;
        orch.initialize().await.unwrap();

        assert!(orch.is_initialized().await);
        assert!(!orch.is_loading().await);
        let ids: Vec<_> = orch.dock_items().await.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![LIBRARY_ID, "sys"]);
    }

    #[tokio::test]
    async fn test_initialize_failure_can_retry() {
        let (orch, catalog) = setup(vec![]).await;
        catalog.set_failure(Some("offline".to_string())).await;

        assert!(orch.initialize().await.is_err());
        assert!(!orch.is_initialized().await);
        assert_eq!(orch.last_error().await.unwrap().code, "CATALOG-001");

        catalog.set_failure(None).await;
        orch.initialize().await.unwrap();
        assert!(orch.is_initialized().await);
    }

    #[tokio::test]
    async fn test_initialize_only_once() {
        let (orch, catalog) = setup(vec![entry("m", "math")]).await;
        orch.initialize().await.unwrap();

        catalog.replace(vec![]).await;
        orch.initialize().await.unwrap();
        assert_eq!(orch.catalog().await.len(), 1);
    }

    #[tokio::test]
    async fn test_switch_to_unknown_keeps_state() {
        let (orch, _) = setup(vec![entry("m", "math")]).await;
        orch.initialize().await.unwrap();
        orch.switch_to("m").await.unwrap();

        let err = orch.switch_to("ghost").await.unwrap_err();
        assert!(matches!(err, RuntimeError::ModuleNotFound(_)));
        assert_eq!(orch.lifecycle().active_id().await, "m");
        assert_eq!(orch.last_error().await.unwrap().code, "MODULE-001");
    }

    #[tokio::test]
    async fn test_switch_to_refreshes_catalog() {
        let (orch, catalog) = setup(vec![]).await;
        orch.initialize().await.unwrap();

        catalog.push(entry("late", "math")).await;
        assert_eq!(orch.switch_to("late").await.unwrap(), "late");
    }

    #[tokio::test]
    async fn test_switch_to_legacy_renderer_id() {
        let (orch, _) = setup(vec![entry("uuid-1", "vocabulary")]).await;
        orch.initialize().await.unwrap();

        assert_eq!(orch.switch_to("vocabulary").await.unwrap(), "uuid-1");
        let current = orch.current_dock_item().await.unwrap();
        assert!(current.is_running);
    }

    #[tokio::test]
    async fn test_close_unpinned_removes_item() {
        let (orch, _) = setup(vec![entry("m", "math")]).await;
        orch.initialize().await.unwrap();
        orch.switch_to("m").await.unwrap();
        assert_eq!(orch.running_dock_items().await.len(), 1);

        let queue = orch.close("m").await;
        assert_eq!(queue.len(), 1);
        assert_eq!(orch.lifecycle().active_id().await, LIBRARY_ID);
    }

    #[tokio::test]
    async fn test_close_pinned_keeps_item() {
        let (orch, _) = setup(vec![entry("m", "math")]).await;
        orch.preferences().pin("m").await;
        orch.initialize().await.unwrap();
        orch.switch_to("m").await.unwrap();

        orch.close("m").await;
        let pinned = orch.pinned_dock_items().await;
        let item = pinned.iter().find(|i| i.id == "m").unwrap();
        assert!(!item.is_running);
    }

    #[tokio::test]
    async fn test_current_view_variants() {
        let (orch, _) = setup(vec![entry("m", "math"), entry("x", "ghost")]).await;
        orch.initialize().await.unwrap();

        let view = orch.current_view().await;
        assert_eq!(view.module_id(), LIBRARY_ID);
        assert_eq!(view.view().map(|v| v.as_str()), Some("knowledge"));

        orch.switch_to("x").await.unwrap();
        assert!(matches!(
            orch.current_view().await,
            ActiveView::Broken { reason: BrokenReason::RendererMissing { .. }, .. }
        ));

        orch.switch_to("m").await.unwrap();
        orch.crash("m", Some("boom"), None).await;
        match orch.current_view().await {
            ActiveView::Broken { reason: BrokenReason::Crashed(record), .. } => {
                assert_eq!(record.message, "boom");
            }
            other => panic!("unexpected view: {:?}", other),
        }

        // 重新打开清除崩溃记录
        orch.switch_to(LIBRARY_ID).await.unwrap();
        orch.switch_to("m").await.unwrap();
        assert!(!orch.current_view().await.is_broken());
    }

    #[tokio::test]
    async fn test_library_missing() {
        let orch = DockOrchestrator::new(
            DockConfig::default(),
            ModuleRegistry::new(),
            LifecycleStore::new(),
            PinnedPreferences::new(),
            Arc::new(StaticCatalog::default()),
        );
        assert!(matches!(
            orch.current_view().await,
            ActiveView::Broken { reason: BrokenReason::LibraryMissing, .. }
        ));
    }

    #[tokio::test]
    async fn test_os_context() {
        let (orch, _) = setup(vec![entry("m", "math")]).await;
        orch.initialize().await.unwrap();
        let os = orch.os_context();

        os.launch_app("m").await.unwrap();
        assert_eq!(orch.lifecycle().active_id().await, "m");
        os.close_app("m").await;
        assert_eq!(orch.lifecycle().active_id().await, LIBRARY_ID);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sync_never_revives_closed_modules() {
        let ids: Vec<String> = (0..16).map(|i| format!("kb-{}", i)).collect();
        let entries = ids.iter().map(|id| entry(id, "memos")).collect();
        let (orch, _) = setup(entries).await;
        orch.initialize().await.unwrap();
        for id in &ids {
            orch.switch_to(id).await.unwrap();
        }

        let mut handles = vec![];
        for id in ids.clone() {
            let closer = orch.clone();
            handles.push(tokio::spawn(async move {
                closer.close(&id).await;
            }));
            let syncer = orch.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..4 {
                    syncer.sync_dock().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(orch.lifecycle().running_ids().await.is_empty());
        let queue = orch.sync_dock().await;
        let ids: Vec<_> = queue.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec![LIBRARY_ID]);
    }
}
