//! Dock 调和器
//!
//! 把注册表、固定偏好、运行集合、目录和上一轮队列调和成新的 Dock 队列。
//! 调和是纯函数：同样的输入总得到同样的输出，重复执行结果不变。
//!
//! 种子顺序：
//! 1. Library 锚点（固定、运行、排序 0）
//! 2. 固定的 ID（按固定顺序；找不到目录 ID 时按渲染器 ID 兼容旧数据）
//! 3. 系统管理条目（强制固定）
//! 4. 上一轮队列中仍在运行的条目
//! 5. 运行集合中能在目录里找到的 ID（强制运行）

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::trace;

use super::item::{DockDisplay, DockItem};
use crate::catalog::CatalogEntry;
use crate::core::config::DockConfig;
use crate::module::lifecycle::LIBRARY_ID;
use crate::module::metadata::LabelStrategy;
use crate::module::registry::RegistrySnapshot;

/// 调和输入
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    /// 当前目录
    pub catalog: &'a [CatalogEntry],
    /// 固定的 ID（按固定顺序）
    pub pinned_ids: &'a [String],
    /// 运行中的 ID（按插入顺序）
    pub running_ids: &'a [String],
    /// 上一轮队列
    pub previous: &'a [DockItem],
    /// 注册表快照
    pub registry: &'a RegistrySnapshot,
}

/// 队列构建器
struct QueueBuilder<'c> {
    config: &'c DockConfig,
    queue: IndexMap<String, DockItem>,
    processed_renderers: HashSet<String>,
}

impl<'c> QueueBuilder<'c> {
    fn new(config: &'c DockConfig) -> Self {
        Self {
            config,
            queue: IndexMap::new(),
            processed_renderers: HashSet::new(),
        }
    }

    fn attempt_add(&mut self, item: DockItem) {
        if self.queue.contains_key(&item.id) {
            return;
        }

        if self.config.is_singleton(&item.renderer_id) {
            if self.processed_renderers.contains(&item.renderer_id) {
                if let Some(existing) = self
                    .queue
                    .values_mut()
                    .find(|existing| existing.renderer_id == item.renderer_id)
                {
                    trace!(module_id = %item.id, renderer_id = %item.renderer_id, "单例渲染器合并");
                    existing.absorb_flags(&item);
                    return;
                }
            }
            self.processed_renderers.insert(item.renderer_id.clone());
        }

        self.queue.insert(item.id.clone(), item);
    }

    fn finish(self) -> Vec<DockItem> {
        self.queue.into_values().collect()
    }
}

/// Dock 调和器
#[derive(Debug, Clone, Default)]
pub struct DockReconciler {
    config: DockConfig,
}

impl DockReconciler {
    /// 创建调和器
    pub fn new(config: DockConfig) -> Self {
        Self { config }
    }

    /// Dock 配置
    pub fn config(&self) -> &DockConfig {
        &self.config
    }

    /// 构建 Library 锚点
    pub fn library_item(&self, registry: &RegistrySnapshot) -> DockItem {
        let icon = registry
            .get(&self.config.library_renderer)
            .map(|d| d.dock.icon.clone())
            .filter(|icon| !icon.is_empty())
            .unwrap_or_else(|| self.config.icons.library.clone());

        DockItem {
            id: LIBRARY_ID.to_string(),
            dock: DockDisplay {
                label: self.config.library_label.clone(),
                icon,
                order: 0,
            },
            renderer_id: self.config.library_renderer.clone(),
            pinned: true,
            is_running: true,
        }
    }

    /// 从目录条目构建 Dock 条目
    ///
    /// 渲染器未注册时条目照常生成，使用错误图标。
    pub fn create_item(
        &self,
        entry: &CatalogEntry,
        registry: &RegistrySnapshot,
        pinned: bool,
        is_running: bool,
    ) -> DockItem {
        let renderer_id = entry.renderer().to_string();
        let descriptor = registry.resolve(&renderer_id);

        let icon = match descriptor {
            Some(d) if !d.dock.icon.is_empty() => d.dock.icon.clone(),
            Some(_) => self.config.icons.generic.clone(),
            None => self.config.icons.error.clone(),
        };

        let static_label = registry
            .get_manifest(&renderer_id)
            .map(|m| m.identity.label_strategy == LabelStrategy::Static)
            .unwrap_or(false);
        let label = match descriptor {
            Some(d) if static_label => d.dock.label.clone(),
            _ => entry.title.clone(),
        };

        let order = descriptor
            .and_then(|d| d.dock.order)
            .unwrap_or(self.config.default_order);

        DockItem {
            id: entry.id.clone(),
            dock: DockDisplay { label, icon, order },
            renderer_id,
            pinned,
            is_running,
        }
    }

    /// 调和出新的 Dock 队列
    pub fn reconcile(&self, input: &ReconcileInput<'_>) -> Vec<DockItem> {
        let registry = input.registry;
        let is_pinned = |id: &str| input.pinned_ids.iter().any(|p| p == id);
        let is_running = |id: &str| input.running_ids.iter().any(|r| r == id);
        let make = |entry: &CatalogEntry| {
            self.create_item(entry, registry, is_pinned(&entry.id), is_running(&entry.id))
        };

        let mut builder = QueueBuilder::new(&self.config);

        // 1. Library 锚点
        builder.attempt_add(self.library_item(registry));

        // 2. 固定条目
        for pinned_id in input.pinned_ids {
            if let Some(entry) = input.catalog.iter().find(|e| &e.id == pinned_id) {
                builder.attempt_add(make(entry));
            } else if let Some(entry) = input
                .catalog
                .iter()
                .find(|e| e.renderer_id.as_deref() == Some(pinned_id.as_str()))
            {
                let mut item = make(entry);
                item.pinned = true;
                builder.attempt_add(item);
            }
        }

        // 3. 系统管理条目
        if let Some(entry) = input
            .catalog
            .iter()
            .find(|e| e.renderer() == self.config.system_renderer)
        {
            let mut item = make(entry);
            item.pinned = true;
            builder.attempt_add(item);
        }

        // 4. 上一轮仍在运行的条目
        for existing in input.previous.iter().filter(|item| item.is_running) {
            builder.attempt_add(existing.clone());
        }

        // 5. 运行集合
        for running_id in input.running_ids {
            if let Some(entry) = input.catalog.iter().find(|e| &e.id == running_id) {
                let mut item = make(entry);
                item.is_running = true;
                builder.attempt_add(item);
            }
        }

        let queue = builder.finish();
        trace!(queue_len = queue.len(), "Dock 调和完成");
        queue
    }
}
