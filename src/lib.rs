//! # Self Space Core - 多应用运行时
//!
//! Self Space 在一个宿主里同时承载多个独立开发、各自有状态的模块
//! （数学、词汇、漏洞研究、系统管理等知识库），提供以下核心功能：
//!
//! - **模块注册表**: 模块描述符与扩展清单的注册和解析
//! - **生命周期存储**: 前台模块、后台运行集合与崩溃记录
//! - **Dock 调和**: 固定偏好 + 运行模块 + 目录调和成去重的 Dock 队列
//! - **导航历史**: 每个模块独立的路径栈，持久化保存
//! - **配置管理**: 统一的配置加载和合并
//! - **日志系统**: 结构化日志记录
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use selfspace_core::{MemoryStore, RuntimeConfig, SelfSpace, StaticCatalog};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let space = SelfSpace::new(
//!         RuntimeConfig::default(),
//!         Arc::new(StaticCatalog::default()),
//!         Arc::new(MemoryStore::new()),
//!     );
//!     space.register_builtin_modules().await;
//!     space.initialize().await?;
//!
//!     for item in space.dock_items().await {
//!         println!("{} {}", item.dock.icon, item.dock.label);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## 模块结构
//!
//! - `module` - 模块元数据、注册表、生命周期与视图边界
//! - `dock` - Dock 调和与编排
//! - `navigation` - 导航历史与会话状态
//! - `catalog` - 目录数据源
//! - `storage` - 持久化存储
//! - `preferences` - 固定偏好
//! - `utils` - 错误类型与日志
//! - `core` - 运行时配置
//! - `api` - 公共 API 接口

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod catalog;
pub mod core;
pub mod dock;
pub mod module;
pub mod navigation;
pub mod preferences;
pub mod storage;
pub mod utils;

// 重导出常用类型，方便使用
pub use module::{
    ActiveView, BrokenReason, CrashRecord, LifecycleStore, ModuleDescriptor, ModuleManifest,
    ModuleRegistry, ViewFactory, ViewRef, LIBRARY_ID,
};

pub use catalog::{CatalogEntry, CatalogSource, JsonFileCatalog, StaticCatalog};
pub use dock::{DockItem, DockOrchestrator, DockReconciler, OsContext};
pub use navigation::{NavigationHistoryStore, RouteState, SessionService};
pub use preferences::PinnedPreferences;
pub use storage::{JsonFileStore, MemoryStore, PersistenceStore};

pub use utils::{error_code, Result, RuntimeError};
pub use utils::logger::{
    fields, LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy,
};

pub use core::config::{LogConfig, RuntimeConfig, RuntimeConfigBuilder};
pub use api::sdk::{SelfSpace, StatusInfo};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
