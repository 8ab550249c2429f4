//! 内置模块表
//!
//! 宿主启动时通过 [`register_builtin_modules`] 一次性注册。

use std::collections::BTreeMap;

use serde_json::json;
use tracing::info;

use super::metadata::{
    LabelStrategy, ManifestCapabilities, ManifestIdentity, ManifestView, ModuleDescriptor,
    ModuleManifest, SettingField, SettingOption, SettingType,
};
use super::registry::ModuleRegistry;
use super::view::ViewRef;

/// 内置描述符
pub fn builtin_descriptors() -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor::new("articles", "Articles", "ri-article-line")
            .with_order(10)
            .with_header("Articles", "ri-article-line")
            .with_capability("article_parser"),
        ModuleDescriptor::new("knowledge", "Knowledge", "ri-brain-line")
            .with_order(20)
            .with_header("Knowledge Base", "ri-brain-line"),
        ModuleDescriptor::new("math", "Math", "ri-function-line")
            .with_order(30)
            .with_header("Math Knowledge Base", "ri-function-line")
            .with_capability("article_parser"),
        ModuleDescriptor::new("memos", "Memos", "ri-sticky-note-line")
            .with_order(30)
            .with_header("Memos & Quick Capture", "ri-sticky-note-line"),
        ModuleDescriptor::new("vocabulary", "Vocabulary", "ri-book-read-line")
            .with_order(40)
            .with_header("Vocabulary", "ri-book-read-line"),
        ModuleDescriptor::new("vrkb", "Vulnerability Research", "ri-shield-keyhole-line")
            .with_order(50)
            .with_header("Vulnerability Research", "ri-shield-keyhole-line"),
        ModuleDescriptor::new("prkb", "Paper Research", "ri-article-line")
            .with_order(60)
            .with_header("Paper Research", "ri-article-line"),
        ModuleDescriptor::new("admin_system", "Admin", "ri-shield-star-line")
            .with_order(99)
            .with_header("System Administrator", "ri-shield-star-line"),
    ]
}

fn select(key: &str, label: &str, default: &str, options: &[(&str, &str)]) -> SettingField {
    SettingField {
        key: key.to_string(),
        field_type: SettingType::Select,
        label: label.to_string(),
        default: json!(default),
        options: Some(
            options
                .iter()
                .map(|(label, value)| SettingOption {
                    label: label.to_string(),
                    value: json!(value),
                })
                .collect(),
        ),
    }
}

/// 漏洞研究模块的扩展清单
pub fn vrkb_manifest() -> ModuleManifest {
    let mut route_params = BTreeMap::new();
    route_params.insert("view".to_string(), json!("lifecycle"));

    ModuleManifest {
        sys_id: "vrkb".to_string(),
        identity: ManifestIdentity {
            icon: "ri-shield-keyhole-line".to_string(),
            label_strategy: LabelStrategy::Static,
            color_theme: "text-red-500".to_string(),
        },
        view: ManifestView {
            component: ViewRef::new("vrkb"),
            default_route_params: route_params,
        },
        settings: vec![
            select(
                "scan_interval",
                "Auto-Scan Interval",
                "daily",
                &[("Daily", "daily"), ("Weekly", "weekly"), ("Manual Only", "manual")],
            ),
            select(
                "severity_threshold",
                "Severity Threshold",
                "medium",
                &[("Low+", "low"), ("Medium+", "medium"), ("High+", "high")],
            ),
        ],
        capabilities: ManifestCapabilities {
            has_global_search: true,
            has_export: true,
            supports_auto_grouping: true,
        },
    }
}

/// 注册全部内置模块与清单
///
/// # Returns
///
/// 实际插入的描述符数量
pub async fn register_builtin_modules(registry: &ModuleRegistry) -> usize {
    let mut inserted = 0;
    for descriptor in builtin_descriptors() {
        if registry.register(descriptor).await {
            inserted += 1;
        }
    }
    registry.register_manifest(vrkb_manifest()).await;

    info!(count = inserted, "内置模块注册完成");
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_builtin_modules() {
        let registry = ModuleRegistry::new();
        let inserted = register_builtin_modules(&registry).await;

        assert_eq!(inserted, builtin_descriptors().len());
        let ids = registry.ids().await;
        assert_eq!(ids.first().map(String::as_str), Some("articles"));
        assert_eq!(ids.last().map(String::as_str), Some("admin_system"));
        assert!(registry.get_manifest("vrkb").await.is_some());
    }

    #[tokio::test]
    async fn test_register_twice_is_idempotent() {
        let registry = ModuleRegistry::new();
        register_builtin_modules(&registry).await;
        let second = register_builtin_modules(&registry).await;

        assert_eq!(second, 0);
        assert_eq!(registry.count().await, builtin_descriptors().len());
    }

    #[test]
    fn test_vrkb_manifest_defaults() {
        let manifest = vrkb_manifest();
        let defaults = manifest.default_settings();
        assert_eq!(defaults.get("severity_threshold"), Some(&json!("medium")));
        assert_eq!(
            manifest.view.default_route_params.get("view"),
            Some(&json!("lifecycle"))
        );
    }
}
