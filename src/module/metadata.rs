//! 模块元数据定义
//!
//! 定义模块描述符（代码身份）与扩展清单（声明式配置）两套数据结构。
//! 两者按各自的键分别存放，注册表不会自动合并它们。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::view::ViewRef;

/// 未声明排序的描述符在注册表中的排序值
pub const DEFAULT_SORT_ORDER: i32 = 99;

/// Dock 元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockMeta {
    /// 显示名称
    pub label: String,

    /// 图标（RemixIcon 类名）
    pub icon: String,

    /// 排序键
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl DockMeta {
    /// 排序键，未声明时为低优先级
    pub fn sort_key(&self) -> i32 {
        self.order.unwrap_or(DEFAULT_SORT_ORDER)
    }
}

/// 头部声明式动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderAction {
    /// 动作 ID
    pub id: String,
    /// 显示名称
    pub label: String,
    /// 图标
    #[serde(default)]
    pub icon: String,
}

/// 头部元数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMeta {
    /// 标题
    pub title: String,
    /// 图标
    #[serde(default)]
    pub icon: String,
    /// 动作列表
    #[serde(default)]
    pub actions: Vec<HeaderAction>,
}

/// 能力标志
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// 参与文章解析
    #[serde(default)]
    pub article_parser: bool,

    /// 支持响应式上下文
    #[serde(default)]
    pub reactive_context: bool,

    /// 其他能力
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, bool>,
}

impl Capabilities {
    /// 查询能力
    pub fn has(&self, name: &str) -> bool {
        match name {
            "article_parser" => self.article_parser,
            "reactive_context" => self.reactive_context,
            other => self.extra.get(other).copied().unwrap_or(false),
        }
    }

    /// 设置能力
    pub fn set(&mut self, name: &str, enabled: bool) {
        match name {
            "article_parser" => self.article_parser = enabled,
            "reactive_context" => self.reactive_context = enabled,
            other => {
                self.extra.insert(other.to_string(), enabled);
            }
        }
    }
}

/// 模块描述符
///
/// 启动时注册一次，之后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// 模块唯一标识（即渲染器 ID）
    pub id: String,

    /// Dock 元数据
    pub dock: DockMeta,

    /// 头部元数据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderMeta>,

    /// 能力标志
    #[serde(default)]
    pub capabilities: Capabilities,

    /// 视图引用
    pub view: ViewRef,
}

impl ModuleDescriptor {
    /// 创建描述符，视图引用默认与 ID 相同
    pub fn new(id: impl Into<String>, label: impl Into<String>, icon: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            view: ViewRef::new(id.clone()),
            id,
            dock: DockMeta {
                label: label.into(),
                icon: icon.into(),
                order: None,
            },
            header: None,
            capabilities: Capabilities::default(),
        }
    }

    /// 设置 Dock 排序
    pub fn with_order(mut self, order: i32) -> Self {
        self.dock.order = Some(order);
        self
    }

    /// 设置头部元数据
    pub fn with_header(mut self, title: impl Into<String>, icon: impl Into<String>) -> Self {
        self.header = Some(HeaderMeta {
            title: title.into(),
            icon: icon.into(),
            actions: Vec::new(),
        });
        self
    }

    /// 开启能力
    pub fn with_capability(mut self, name: &str) -> Self {
        self.capabilities.set(name, true);
        self
    }

    /// 设置视图引用
    pub fn with_view(mut self, view: ViewRef) -> Self {
        self.view = view;
        self
    }

    /// 验证描述符
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = vec![];

        if self.id.trim().is_empty() {
            errors.push("模块 ID 不能为空".to_string());
        }
        if self.dock.label.trim().is_empty() {
            errors.push(format!("模块 {} 的 Dock 名称不能为空", self.id));
        }
        if self.view.as_str().is_empty() {
            errors.push(format!("模块 {} 缺少视图引用", self.id));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// 名称策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LabelStrategy {
    /// 固定使用模块名称
    Static,
    /// 使用目录条目标题
    #[default]
    Dynamic,
}

/// 清单身份信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestIdentity {
    /// 图标
    pub icon: String,
    /// 名称策略
    #[serde(default)]
    pub label_strategy: LabelStrategy,
    /// 主题色标记
    #[serde(default)]
    pub color_theme: String,
}

/// 清单视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestView {
    /// 视图引用
    pub component: ViewRef,
    /// 重置状态时的默认路由参数
    #[serde(default)]
    pub default_route_params: BTreeMap<String, serde_json::Value>,
}

/// 设置项类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    /// 开关
    Toggle,
    /// 文本
    Text,
    /// 下拉选择
    Select,
    /// 数值范围
    Range,
}

/// 设置项选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingOption {
    /// 显示名称
    pub label: String,
    /// 取值
    pub value: serde_json::Value,
}

/// 设置项（由系统渲染，运行时不解释）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingField {
    /// 键
    pub key: String,
    /// 类型
    #[serde(rename = "type")]
    pub field_type: SettingType,
    /// 显示名称
    pub label: String,
    /// 默认值
    #[serde(rename = "default_value")]
    pub default: serde_json::Value,
    /// 可选项
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SettingOption>>,
}

/// 清单能力标志
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestCapabilities {
    /// 支持全局搜索
    #[serde(default)]
    pub has_global_search: bool,
    /// 支持导出
    #[serde(default)]
    pub has_export: bool,
    /// 支持自动分组
    #[serde(default)]
    pub supports_auto_grouping: bool,
}

/// 模块扩展清单
///
/// 与描述符不同，清单是声明式配置，可以安全覆盖。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// 渲染器 ID
    pub sys_id: String,
    /// 身份信息
    pub identity: ManifestIdentity,
    /// 视图
    pub view: ManifestView,
    /// 设置项（保持声明顺序）
    #[serde(default)]
    pub settings: Vec<SettingField>,
    /// 能力标志
    #[serde(default)]
    pub capabilities: ManifestCapabilities,
}

impl ModuleManifest {
    /// 设置项默认值
    pub fn default_settings(&self) -> BTreeMap<String, serde_json::Value> {
        self.settings
            .iter()
            .map(|field| (field.key.clone(), field.default.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let descriptor = ModuleDescriptor::new("math", "Math", "ri-function-line")
            .with_order(30)
            .with_header("Math Knowledge Base", "ri-function-line")
            .with_capability("article_parser");

        assert_eq!(descriptor.dock.sort_key(), 30);
        assert!(descriptor.capabilities.has("article_parser"));
        assert!(!descriptor.capabilities.has("reactive_context"));
        assert_eq!(descriptor.view.as_str(), "math");
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn test_missing_order_sorts_last() {
        let descriptor = ModuleDescriptor::new("misc", "Misc", "ri-box-line");
        assert_eq!(descriptor.dock.sort_key(), DEFAULT_SORT_ORDER);
    }

    #[test]
    fn test_descriptor_validation() {
        let descriptor = ModuleDescriptor::new("  ", "", "");
        let errors = descriptor.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_extra_capabilities() {
        let mut caps = Capabilities::default();
        caps.set("offline", true);
        assert!(caps.has("offline"));
        assert!(!caps.has("unknown"));
    }

    #[test]
    fn test_manifest_deserialization() {
        let json = serde_json::json!({
            "sys_id": "vrkb",
            "identity": {
                "icon": "ri-shield-keyhole-line",
                "label_strategy": "static",
                "color_theme": "text-red-500"
            },
            "view": {
                "component": "VrkbModule",
                "default_route_params": { "view": "lifecycle" }
            },
            "settings": [
                {
                    "key": "scan_interval",
                    "type": "select",
                    "label": "Auto-Scan Interval",
                    "default_value": "daily",
                    "options": [{ "label": "Daily", "value": "daily" }]
                }
            ],
            "capabilities": { "has_export": true }
        });

        let manifest: ModuleManifest = serde_json::from_value(json).unwrap();
        assert_eq!(manifest.identity.label_strategy, LabelStrategy::Static);
        assert_eq!(manifest.settings[0].field_type, SettingType::Select);
        assert!(manifest.capabilities.has_export);
        assert!(!manifest.capabilities.has_global_search);
        assert_eq!(
            manifest.default_settings().get("scan_interval"),
            Some(&serde_json::json!("daily"))
        );
    }
}
