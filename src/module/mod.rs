//! 模块管理模块
//!
//! 包含模块系统的核心组件：
//! - 模块元数据（描述符与扩展清单）
//! - 模块注册表
//! - 应用生命周期存储
//! - 视图解析边界
//! - 内置模块表

pub mod builtin;
pub mod lifecycle;
pub mod metadata;
pub mod registry;
pub mod view;

// 重导出常用类型
pub use builtin::{builtin_descriptors, register_builtin_modules, vrkb_manifest};
pub use lifecycle::{AliasRule, CrashRecord, LifecycleState, LifecycleStore, LIBRARY_ID};
pub use metadata::{
    Capabilities, DockMeta, HeaderAction, HeaderMeta, LabelStrategy, ManifestCapabilities,
    ManifestIdentity, ManifestView, ModuleDescriptor, ModuleManifest, SettingField,
    SettingOption, SettingType, DEFAULT_SORT_ORDER,
};
pub use registry::{normalize_id, ModuleRegistry, RegistrySnapshot};
pub use view::{ActiveView, BrokenReason, ViewFactory, ViewRef};
