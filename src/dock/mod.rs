//! Dock 模块
//!
//! - `item`: Dock 条目
//! - `reconciler`: 纯函数调和算法
//! - `orchestrator`: 编排初始化、切换、关闭与视图解析

pub mod item;
pub mod orchestrator;
pub mod reconciler;

pub use item::{DockDisplay, DockItem};
pub use orchestrator::{DockOrchestrator, ErrorRecord, OsContext};
pub use reconciler::{DockReconciler, ReconcileInput};
