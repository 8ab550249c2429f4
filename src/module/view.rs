//! 视图引用与视图解析边界
//!
//! 运行时从不依赖具体的 UI 类型：描述符只携带不透明的 [`ViewRef`]，
//! 由宿主实现的 [`ViewFactory`] 把 [`ActiveView`] 变成真正的视图。

use serde::{Deserialize, Serialize};

use super::lifecycle::CrashRecord;

/// 不透明的视图引用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewRef(String);

impl ViewRef {
    /// 创建视图引用
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// 宿主侧的视图标识
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ViewRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 前台视图无法正常渲染的原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrokenReason {
    /// 模块崩溃，携带崩溃记录供用户查看
    Crashed(CrashRecord),
    /// Library 描述符未注册
    LibraryMissing,
    /// 渲染器未注册
    RendererMissing {
        /// 缺失的渲染器
        renderer_id: String,
    },
}

/// 当前前台应当渲染的内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActiveView {
    /// 正常模块视图
    Module {
        /// 前台模块 ID（目录 ID 或 "library"）
        module_id: String,
        /// 解析出的渲染器
        renderer_id: String,
        /// 渲染器的视图引用
        view: ViewRef,
    },
    /// 损坏占位视图
    Broken {
        /// 前台模块 ID
        module_id: String,
        /// 损坏原因
        reason: BrokenReason,
    },
}

impl ActiveView {
    /// 前台模块 ID
    pub fn module_id(&self) -> &str {
        match self {
            ActiveView::Module { module_id, .. } | ActiveView::Broken { module_id, .. } => {
                module_id
            }
        }
    }

    /// 是否为损坏占位视图
    pub fn is_broken(&self) -> bool {
        matches!(self, ActiveView::Broken { .. })
    }

    /// 正常视图的引用
    pub fn view(&self) -> Option<&ViewRef> {
        match self {
            ActiveView::Module { view, .. } => Some(view),
            ActiveView::Broken { .. } => None,
        }
    }
}

/// 宿主视图工厂
///
/// 宿主把运行时给出的 [`ActiveView`] 转换为自己的视图类型。
pub trait ViewFactory {
    /// 宿主视图类型
    type View;

    /// 构建正常模块视图
    fn build(&self, module_id: &str, view: &ViewRef) -> Self::View;

    /// 构建损坏占位视图
    fn broken(&self, module_id: &str, reason: &BrokenReason) -> Self::View;

    /// 根据前台状态分派
    fn render(&self, active: &ActiveView) -> Self::View {
        match active {
            ActiveView::Module { module_id, view, .. } => self.build(module_id, view),
            ActiveView::Broken { module_id, reason } => self.broken(module_id, reason),
        }
    }
}
