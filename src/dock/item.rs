//! Dock 条目

use serde::{Deserialize, Serialize};

/// Dock 条目展示信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockDisplay {
    /// 显示名称
    pub label: String,
    /// 图标
    pub icon: String,
    /// 排序值
    pub order: i32,
}

/// Dock 条目
///
/// 每次调和重新计算，只有 `is_running` 会从上一轮队列延续。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockItem {
    /// 目录 ID 或 `library`
    pub id: String,
    /// 展示信息
    pub dock: DockDisplay,
    /// 渲染器 ID
    pub renderer_id: String,
    /// 是否固定
    pub pinned: bool,
    /// 是否运行中
    pub is_running: bool,
}

impl DockItem {
    /// 把另一个同渲染器条目的标志合并进来
    pub(crate) fn absorb_flags(&mut self, other: &DockItem) {
        self.is_running |= other.is_running;
        self.pinned |= other.pinned;
    }
}
