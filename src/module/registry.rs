//! 模块注册表
//!
//! 管理所有已注册的模块描述符与扩展清单，提供注册、解析和查询功能。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::module::metadata::{ModuleDescriptor, ModuleManifest};

/// 规范化模块 / 渲染器 ID（去除首尾空白并转小写）
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Default, Clone)]
struct RegistryState {
    /// 按 (order, 注册顺序) 排序的描述符
    descriptors: Vec<ModuleDescriptor>,
    /// 扩展清单：sys_id -> ModuleManifest
    manifests: HashMap<String, ModuleManifest>,
}

impl RegistryState {
    fn find(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    fn ids(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.id.clone()).collect()
    }

    fn resolve(&self, renderer_id: &str) -> Option<&ModuleDescriptor> {
        let normalized = normalize_id(renderer_id);
        let found = self.find(&normalized);
        if found.is_none() {
            warn!(
                renderer_id = %normalized,
                known = ?self.ids(),
                "渲染器未注册，请检查模块映射"
            );
        }
        found
    }
}

/// 模块注册表
///
/// 克隆得到的句柄共享同一份数据。
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl ModuleRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册描述符
    ///
    /// ID 已存在时记录警告并保留原注册（幂等但有提示）。每次成功插入
    /// 后按 `order` 升序稳定排序。
    ///
    /// # Returns
    ///
    /// 是否实际插入
    pub async fn register(&self, mut descriptor: ModuleDescriptor) -> bool {
        if let Err(errors) = descriptor.validate() {
            warn!(module_id = %descriptor.id, errors = ?errors, "描述符无效，忽略注册");
            return false;
        }
        descriptor.id = normalize_id(&descriptor.id);

        let mut state = self.state.write().await;
        if state.find(&descriptor.id).is_some() {
            warn!(module_id = %descriptor.id, "模块已注册，忽略重复注册");
            return false;
        }

        debug!(module_id = %descriptor.id, order = descriptor.dock.sort_key(), "注册模块");
        state.descriptors.push(descriptor);
        state.descriptors.sort_by_key(|d| d.dock.sort_key());
        true
    }

    /// 注册或覆盖扩展清单
    pub async fn register_manifest(&self, mut manifest: ModuleManifest) {
        manifest.sys_id = normalize_id(&manifest.sys_id);
        let mut state = self.state.write().await;
        if state.manifests.insert(manifest.sys_id.clone(), manifest).is_some() {
            debug!("扩展清单已覆盖");
        }
    }

    /// 解析渲染器
    ///
    /// 输入先规范化再精确匹配；未命中时输出包含全部已知 ID 的诊断日志。
    pub async fn resolve(&self, renderer_id: &str) -> Option<ModuleDescriptor> {
        let state = self.state.read().await;
        state.resolve(renderer_id).cloned()
    }

    /// 按 ID 获取描述符（无副作用）
    pub async fn get(&self, id: &str) -> Option<ModuleDescriptor> {
        let state = self.state.read().await;
        state.find(id).cloned()
    }

    /// 按 sys_id 获取扩展清单
    pub async fn get_manifest(&self, sys_id: &str) -> Option<ModuleManifest> {
        let state = self.state.read().await;
        state.manifests.get(sys_id).cloned()
    }

    /// 获取排序后的描述符列表
    pub async fn list(&self) -> Vec<ModuleDescriptor> {
        self.state.read().await.descriptors.clone()
    }

    /// 获取所有模块 ID（按排序）
    pub async fn ids(&self) -> Vec<String> {
        self.state.read().await.ids()
    }

    /// 已注册描述符数量
    pub async fn count(&self) -> usize {
        self.state.read().await.descriptors.len()
    }

    /// 生成只读快照，供纯函数调和使用
    pub async fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            state: self.state.read().await.clone(),
        }
    }
}

/// 注册表只读快照
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    state: RegistryState,
}

impl RegistrySnapshot {
    /// 解析渲染器（未命中时输出诊断日志）
    pub fn resolve(&self, renderer_id: &str) -> Option<&ModuleDescriptor> {
        self.state.resolve(renderer_id)
    }

    /// 按 ID 获取描述符
    pub fn get(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.state.find(id)
    }

    /// 按 sys_id 获取扩展清单
    pub fn get_manifest(&self, sys_id: &str) -> Option<&ModuleManifest> {
        self.state.manifests.get(sys_id)
    }

    /// 所有模块 ID
    pub fn ids(&self) -> Vec<String> {
        self.state.ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::metadata::{
        LabelStrategy, ManifestCapabilities, ManifestIdentity, ManifestView,
    };
    use crate::module::view::ViewRef;

    fn descriptor(id: &str, order: Option<i32>) -> ModuleDescriptor {
        let d = ModuleDescriptor::new(id, id.to_uppercase(), "ri-box-line");
        match order {
            Some(o) => d.with_order(o),
            None => d,
        }
    }

    fn manifest(sys_id: &str, icon: &str) -> ModuleManifest {
        ModuleManifest {
            sys_id: sys_id.to_string(),
            identity: ManifestIdentity {
                icon: icon.to_string(),
                label_strategy: LabelStrategy::Static,
                color_theme: String::new(),
            },
            view: ManifestView {
                component: ViewRef::new(sys_id),
                default_route_params: Default::default(),
            },
            settings: vec![],
            capabilities: ManifestCapabilities::default(),
        }
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = ModuleRegistry::new();
        assert!(registry.register(descriptor("math", Some(30))).await);

        assert_eq!(registry.count().await, 1);
        assert!(registry.get("math").await.is_some());
        assert!(registry.get("memos").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_register_is_noop() {
        let registry = ModuleRegistry::new();
        assert!(registry.register(descriptor("math", Some(30))).await);

        let mut replacement = descriptor("math", Some(1));
        replacement.dock.label = "Other".to_string();
        assert!(!registry.register(replacement).await);

        let kept = registry.get("math").await.unwrap();
        assert_eq!(kept.dock.label, "MATH");
        assert_eq!(kept.dock.order, Some(30));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_sort_is_stable_with_default_order() {
        let registry = ModuleRegistry::new();
        registry.register(descriptor("late", None)).await;
        registry.register(descriptor("memos", Some(30))).await;
        registry.register(descriptor("math", Some(30))).await;
        registry.register(descriptor("knowledge", Some(20))).await;
        registry.register(descriptor("other", None)).await;

        assert_eq!(
            registry.ids().await,
            vec!["knowledge", "memos", "math", "late", "other"]
        );
    }

    #[tokio::test]
    async fn test_resolve_normalizes_input() {
        let registry = ModuleRegistry::new();
        registry.register(descriptor("vocabulary", Some(40))).await;

        assert!(registry.resolve("  Vocabulary ").await.is_some());
        assert!(registry.resolve("vocab").await.is_none());
    }

    #[tokio::test]
    async fn test_manifest_upsert_is_separate_from_descriptors() {
        let registry = ModuleRegistry::new();
        registry.register_manifest(manifest("vrkb", "ri-a")).await;
        registry.register_manifest(manifest("vrkb", "ri-b")).await;

        let stored = registry.get_manifest("vrkb").await.unwrap();
        assert_eq!(stored.identity.icon, "ri-b");
        assert!(registry.get("vrkb").await.is_none());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_descriptor_rejected() {
        let registry = ModuleRegistry::new();
        assert!(!registry.register(ModuleDescriptor::new("", "", "")).await);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = ModuleRegistry::new();
        registry.register(descriptor("math", Some(30))).await;
        let snapshot = registry.snapshot().await;

        registry.register(descriptor("memos", Some(30))).await;

        assert!(snapshot.resolve("math").is_some());
        assert!(snapshot.get("memos").is_none());
        assert_eq!(snapshot.ids(), vec!["math"]);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let registry = ModuleRegistry::new();
        let cloned = registry.clone();
        registry.register(descriptor("math", Some(30))).await;
        assert!(cloned.get("math").await.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let registry = ModuleRegistry::new();
        let mut handles = vec![];
        for i in 0..10 {
            let reg = registry.clone();
            handles.push(tokio::spawn(async move {
                reg.register(descriptor(&format!("module-{}", i), Some(i))).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(registry.count().await, 10);
    }
}
