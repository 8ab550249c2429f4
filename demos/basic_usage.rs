//! 基本使用示例
//!
//! 本示例展示了 Self Space 运行时的基本使用方法，包括：
//!
//! - 注册内置模块并初始化
//! - 打开、切换、关闭模块
//! - 固定偏好对 Dock 的影响
//! - 模块崩溃与恢复
//! - 导航历史
//!
//! # 运行示例
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;

use selfspace_core::{
    ActiveView, CatalogEntry, MemoryStore, PinnedPreferences, RuntimeConfig, SelfSpace,
    StaticCatalog,
};

async fn print_dock(space: &SelfSpace) {
    for item in space.dock_items().await {
        println!(
            "   - {:<16} {:<12} 固定={} 运行={}",
            item.dock.label, item.renderer_id, item.pinned, item.is_running
        );
    }
}

/// 主函数
///
/// 演示 Self Space 运行时的基本用法。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Self Space 基本使用示例 ===\n");

    // -------------------------------------------------------------------------
    // 1. 创建运行时
    // -------------------------------------------------------------------------
    println!("1. 创建运行时...");

    let catalog = StaticCatalog::new(vec![
        CatalogEntry::new("vocab-en", Some("vocabulary"), "英语词汇"),
        CatalogEntry::new("vocab-jp", Some("vocabulary"), "日语词汇"),
        CatalogEntry::new("calc", Some("math"), "微积分"),
        CatalogEntry::new("notes", Some("memos"), "随手记"),
        CatalogEntry::new("sys", Some("admin_system"), "系统管理"),
    ]);
    let space = SelfSpace::with_preferences(
        RuntimeConfig::default(),
        Arc::new(catalog),
        Arc::new(MemoryStore::new()),
        PinnedPreferences::with_pinned(["vocab-en"]),
    );
    let count = space.register_builtin_modules().await;
    space.initialize().await?;
    println!("   已注册 {} 个内置模块", count);
    print_dock(&space).await;
    println!("   ✅ 初始化完成\n");

    // -------------------------------------------------------------------------
    // 2. 打开模块
    // -------------------------------------------------------------------------
    println!("2. 打开模块...");
    space.switch_to("vocab-jp").await?;
    space.switch_to("calc").await?;
    space.switch_to("system").await?;
    println!("   前台模块: {}", space.lifecycle().active_id().await);
    print_dock(&space).await;
    println!("   词汇渲染器只占一个位置，并继承运行标志\n");

    // -------------------------------------------------------------------------
    // 3. 固定与关闭
    // -------------------------------------------------------------------------
    println!("3. 固定 calc 后关闭...");
    space.toggle_pin("calc").await;
    space.close("calc").await;
    print_dock(&space).await;
    println!();

    // -------------------------------------------------------------------------
    // 4. 崩溃与恢复
    // -------------------------------------------------------------------------
    println!("4. 模块崩溃...");
    space.switch_to("notes").await?;
    space.crash("notes", Some("渲染失败"), None).await;
    if let ActiveView::Broken { module_id, reason } = space.current_view().await {
        println!("   {} 显示占位视图: {:?}", module_id, reason);
    }
    space.switch_to("notes").await?;
    println!("   重新打开后崩溃记录: {:?}\n", space.crash_record("notes").await);

    // -------------------------------------------------------------------------
    // 5. 导航历史
    // -------------------------------------------------------------------------
    println!("5. 导航历史...");
    let history = space.history();
    history.push_route("notes", "/notes").await;
    history.push_route("notes", "/notes/42").await;
    println!("   最近路径: {:?}", history.get_last_route("notes").await);
    println!("   返回到: {:?}\n", history.pop_route("notes").await);

    // -------------------------------------------------------------------------
    // 6. 状态与关闭
    // -------------------------------------------------------------------------
    let status = space.status().await;
    println!("6. 运行状态:");
    println!("   - 前台: {}", status.active_id);
    println!("   - 运行中: {}", status.running_count);
    println!("   - Dock 条目: {}", status.dock_len);
    space.shutdown().await;

    println!("\n=== 示例结束 ===");
    Ok(())
}
