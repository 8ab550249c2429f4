//! Dock 调和与模块切换集成测试
//!
//! 通过 SelfSpace 公共接口验证完整的打开 / 关闭 / 崩溃流程

use std::sync::Arc;

use selfspace_core::{
    ActiveView, BrokenReason, CatalogEntry, DockItem, MemoryStore, PinnedPreferences,
    RuntimeConfig, RuntimeError, SelfSpace, StaticCatalog, ViewFactory, ViewRef, LIBRARY_ID,
};

fn kb(id: &str, renderer: &str, title: &str) -> CatalogEntry {
    CatalogEntry::new(id, Some(renderer), title)
}

async fn boot(entries: Vec<CatalogEntry>, pinned: &[&str]) -> (SelfSpace, StaticCatalog) {
    let catalog = StaticCatalog::new(entries);
    let space = SelfSpace::with_preferences(
        RuntimeConfig::default(),
        Arc::new(catalog.clone()),
        Arc::new(MemoryStore::new()),
        PinnedPreferences::with_pinned(pinned.iter().copied()),
    );
    space.register_builtin_modules().await;
    space.initialize().await.unwrap();
    (space, catalog)
}

fn ids(items: &[DockItem]) -> Vec<&str> {
    items.iter().map(|i| i.id.as_str()).collect()
}

/// 两个词汇知识库：A 固定，B 运行 → 只保留 A，并合并运行标志
#[tokio::test]
async fn test_vocabulary_pair_collapses_into_pinned_entry() {
    let (space, _) = boot(
        vec![kb("A", "vocabulary", "Vocab A"), kb("B", "vocabulary", "Vocab B")],
        &["A"],
    )
    .await;

    space.switch_to("B").await.unwrap();
    let dock = space.dock_items().await;

    assert_eq!(ids(&dock), vec![LIBRARY_ID, "A"]);
    assert!(dock[1].pinned);
    assert!(dock[1].is_running);
}

/// 每个单例渲染器最多占一个位置
#[tokio::test]
async fn test_singleton_invariant_holds_after_many_opens() {
    let (space, _) = boot(
        vec![
            kb("m1", "math", "Calc"),
            kb("m2", "math", "Algebra"),
            kb("v1", "vrkb", "Board 1"),
            kb("v2", "vrkb", "Board 2"),
            kb("k1", "knowledge", "Notes"),
        ],
        &[],
    )
    .await;

    for id in ["m1", "m2", "v1", "v2", "k1"] {
        space.switch_to(id).await.unwrap();
    }

    let dock = space.dock_items().await;
    let config = space.config();
    for renderer in &config.dock.singleton_renderers {
        let count = dock.iter().filter(|i| &i.renderer_id == renderer).count();
        assert!(count <= 1, "渲染器 {} 出现 {} 次", renderer, count);
    }
    assert_eq!(ids(&dock), vec![LIBRARY_ID, "m1", "v1", "k1"]);
}

/// Library 始终位于第一位且固定
#[tokio::test]
async fn test_library_permanence() {
    let (space, _) = boot(vec![kb("m", "math", "Calc")], &["m"]).await;

    space.switch_to("m").await.unwrap();
    space.close("m").await;
    space.close(LIBRARY_ID).await;
    space.crash("m", Some("boom"), None).await;

    let dock = space.dock_items().await;
    assert_eq!(dock[0].id, LIBRARY_ID);
    assert!(dock[0].pinned);
    assert!(dock[0].is_running);
}

/// 没有变化时重复同步结果不变
#[tokio::test]
async fn test_sync_is_idempotent() {
    let (space, _) = boot(
        vec![
            kb("a", "vocabulary", "A"),
            kb("b", "memos", "B"),
            kb("sys", "admin_system", "System"),
        ],
        &["b"],
    )
    .await;
    space.switch_to("a").await.unwrap();

    let first = space.orchestrator().sync_dock().await;
    let second = space.orchestrator().sync_dock().await;
    assert_eq!(first, second);
    assert_eq!(ids(&first), vec![LIBRARY_ID, "b", "sys", "a"]);
}

/// system 别名解析到系统管理条目
#[tokio::test]
async fn test_switch_to_system_alias() {
    let (space, _) = boot(
        vec![kb("kb-1", "math", "Calc"), kb("sys-uuid", "admin_system", "System")],
        &[],
    )
    .await;

    let active = space.switch_to("system").await.unwrap();
    assert_eq!(active, "sys-uuid");
    assert_eq!(space.lifecycle().active_id().await, "sys-uuid");

    match space.current_view().await {
        ActiveView::Module { renderer_id, .. } => assert_eq!(renderer_id, "admin_system"),
        other => panic!("unexpected view: {:?}", other),
    }
}

/// 无法解析时返回错误，前台保持不变
#[tokio::test]
async fn test_unresolvable_switch_keeps_active() {
    let (space, _) = boot(vec![kb("m", "math", "Calc")], &[]).await;
    space.switch_to("m").await.unwrap();

    let err = space.switch_to("does-not-exist").await.unwrap_err();
    assert!(matches!(err, RuntimeError::ModuleNotFound(ref id) if id == "does-not-exist"));
    assert_eq!(space.lifecycle().active_id().await, "m");

    let status = space.status().await;
    assert_eq!(status.last_error.unwrap().code, "MODULE-001");
}

/// 目录晚到时切换会刷新目录
#[tokio::test]
async fn test_switch_refreshes_late_catalog() {
    let (space, catalog) = boot(vec![], &[]).await;
    catalog.push(kb("fresh", "memos", "Fresh")).await;

    assert_eq!(space.switch_to("fresh").await.unwrap(), "fresh");
    assert_eq!(space.orchestrator().catalog().await.len(), 1);
}

/// 崩溃后保持占位视图，直到重新打开
#[tokio::test]
async fn test_crash_shows_broken_until_reopened() {
    let (space, _) = boot(vec![kb("m", "math", "Calc")], &[]).await;
    space.switch_to("m").await.unwrap();
    space
        .crash("m", Some("render failed"), Some("stack".to_string()))
        .await;

    // 崩溃不影响运行状态
    assert!(space.lifecycle().is_running("m").await);
    assert!(matches!(
        space.current_view().await,
        ActiveView::Broken { reason: BrokenReason::Crashed(_), .. }
    ));

    space.switch_to(LIBRARY_ID).await.unwrap();
    assert!(space.crash_record("m").await.is_some());

    space.switch_to("m").await.unwrap();
    assert!(space.crash_record("m").await.is_none());
    assert!(!space.current_view().await.is_broken());
}

struct LabelFactory;

impl ViewFactory for LabelFactory {
    type View = String;

    fn build(&self, module_id: &str, view: &ViewRef) -> String {
        format!("{}@{}", view, module_id)
    }

    fn broken(&self, module_id: &str, reason: &BrokenReason) -> String {
        match reason {
            BrokenReason::Crashed(record) => format!("crashed:{}:{}", module_id, record.message),
            BrokenReason::LibraryMissing => "library-missing".to_string(),
            BrokenReason::RendererMissing { renderer_id } => format!("missing:{}", renderer_id),
        }
    }
}

/// 宿主视图工厂接收解析后的前台视图
#[tokio::test]
async fn test_render_through_view_factory() {
    let (space, _) = boot(vec![kb("g", "ghost", "Ghost"), kb("m", "math", "Calc")], &[]).await;

    assert_eq!(space.render(&LabelFactory).await, "knowledge@library");

    space.switch_to("g").await.unwrap();
    assert_eq!(space.render(&LabelFactory).await, "missing:ghost");

    let dock = space.dock_items().await;
    let ghost = dock.iter().find(|i| i.id == "g").unwrap();
    assert_eq!(ghost.dock.icon, "ri-error-warning-fill");

    space.switch_to("m").await.unwrap();
    assert_eq!(space.render(&LabelFactory).await, "math@m");
}

/// 关闭未固定模块后从 Dock 消失，固定模块保留
#[tokio::test]
async fn test_close_pinned_and_unpinned() {
    let (space, _) = boot(vec![kb("m", "math", "Calc"), kb("n", "memos", "Memo")], &["n"]).await;
    space.switch_to("m").await.unwrap();
    space.switch_to("n").await.unwrap();

    let dock = space.close("m").await;
    assert_eq!(ids(&dock), vec![LIBRARY_ID, "n"]);

    let dock = space.close("n").await;
    assert_eq!(ids(&dock), vec![LIBRARY_ID, "n"]);
    assert!(!dock[1].is_running);
    assert_eq!(space.lifecycle().active_id().await, LIBRARY_ID);

    assert_eq!(space.pinned_dock_items().await.len(), 2);
    assert!(space.running_dock_items().await.is_empty());
}
