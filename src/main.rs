//! Self Space 命令行入口
//!
//! 用于检查配置、查看内置模块以及离线演练 Dock 调和与模块切换。
//!
//! # 命令概览
//!
//! - `version` - 显示版本信息
//! - `check-config` - 验证配置文件
//! - `modules` - 列出内置模块与扩展清单
//! - `dock` - 根据目录文件计算 Dock 队列
//! - `switch` - 演练一次模块切换并显示前台视图
//!
//! # 使用示例
//!
//! ```bash
//! # 检查配置文件
//! selfspace check-config -c config.yaml
//!
//! # 使用目录文件计算 Dock，固定 math 并打开两个知识库
//! selfspace dock --catalog kbs.json --pin math --open kb-1 --open kb-2
//!
//! # 通过系统别名切换
//! selfspace switch system --catalog kbs.json
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use selfspace_core::catalog::demo_catalog;
use selfspace_core::module::builtin::{builtin_descriptors, vrkb_manifest};
use selfspace_core::{
    ActiveView, CatalogSource, JsonFileCatalog, JsonFileStore, Logger, LoggerConfig,
    MemoryStore, PersistenceStore, PinnedPreferences, RuntimeConfig, SelfSpace, StaticCatalog,
};

/// Self Space - 多应用运行时
#[derive(Parser)]
#[command(name = "selfspace")]
#[command(version, about = "Self Space 多应用运行时工具", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// 开发模式（显示文件名与行号）
    #[arg(long, global = true)]
    dev: bool,

    /// 子命令
    #[command(subcommand)]
    command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
enum Commands {
    /// 查看版本信息
    Version,

    /// 验证配置文件
    ///
    /// 检查配置文件是否有效，并显示解析后的配置内容。
    CheckConfig {
        /// 配置文件路径（不指定则使用全局 -c 选项）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 列出内置模块
    Modules,

    /// 计算 Dock 队列
    Dock {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// 切换到指定模块
    Switch {
        /// 目标 ID（目录 ID、旧渲染器 ID 或 system / admin 别名）
        target: String,

        #[command(flatten)]
        session: SessionArgs,
    },
}

/// 演练会话参数
#[derive(clap::Args)]
struct SessionArgs {
    /// 目录文件（JSON 数组），不指定时使用演示目录
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// 固定的 ID（可重复）
    #[arg(long = "pin")]
    pinned: Vec<String>,

    /// 预先打开的 ID（可重复）
    #[arg(long = "open")]
    open: Vec<String>,
}

/// 加载配置文件
async fn load_config(config_path: &Path, dev_mode: bool) -> anyhow::Result<RuntimeConfig> {
    let mut config = if config_path.exists() {
        let config = RuntimeConfig::from_file(config_path)
            .await
            .with_context(|| format!("无法加载配置文件 {}", config_path.display()))?;
        info!("已加载配置文件: {}", config_path.display());
        config
    } else {
        RuntimeConfig::default()
    };
    if dev_mode {
        config.dev_mode = true;
    }
    Ok(config)
}

/// 按参数构建运行时
async fn build_space(config: RuntimeConfig, args: &SessionArgs) -> anyhow::Result<SelfSpace> {
    let catalog: Arc<dyn CatalogSource> = match args.catalog {
        Some(ref path) => Arc::new(JsonFileCatalog::new(path)),
        None => Arc::new(StaticCatalog::new(demo_catalog())),
    };
    let store: Arc<dyn PersistenceStore> = match config.storage.data_dir {
        Some(ref dir) => Arc::new(JsonFileStore::new(dir)),
        None => Arc::new(MemoryStore::new()),
    };

    let space = SelfSpace::with_preferences(
        config,
        catalog,
        store,
        PinnedPreferences::with_pinned(args.pinned.iter().cloned()),
    );
    space.register_builtin_modules().await;
    space.initialize().await?;

    for id in &args.open {
        if let Err(e) = space.switch_to(id).await {
            println!("⚠️  无法打开 {}: {}", id, e);
        }
    }
    Ok(space)
}

/// 打印 Dock 队列
async fn print_dock(space: &SelfSpace) {
    let active = space.lifecycle().active_id().await;
    println!("Dock 队列");
    println!("────────────────────────────────────────");
    for item in space.dock_items().await {
        let marker = if item.id == active { "▶" } else { " " };
        println!(
            "{} {:<24} {:<28} {:<14} {}{}",
            marker,
            item.dock.label,
            item.dock.icon,
            item.renderer_id,
            if item.pinned { "[固定]" } else { "" },
            if item.is_running { "[运行]" } else { "" },
        );
    }
    println!("────────────────────────────────────────");
}

/// 检查配置文件
async fn check_config(path: &Path) -> anyhow::Result<()> {
    println!("检查配置文件: {}", path.display());
    println!();

    let config = if path.exists() {
        match RuntimeConfig::from_file(path).await {
            Ok(config) => {
                println!("✅ 配置文件有效！");
                config
            }
            Err(e) => {
                println!("❌ 配置文件无效: {}", e);
                return Err(e.into());
            }
        }
    } else {
        println!("⚠️  警告: 配置文件不存在，将使用默认配置");
        RuntimeConfig::default()
    };

    println!();
    println!("配置内容:");
    println!("────────────────────────────────────────");
    println!("  [日志配置]");
    println!("    日志级别:       {}", config.logging.level);
    println!("    文件输出:       {}", if config.logging.file_output { "是" } else { "否" });
    println!("    JSON 格式:      {}", if config.logging.json_format { "是" } else { "否" });
    println!();
    println!("  [Dock 配置]");
    println!("    单例渲染器:     {:?}", config.dock.singleton_renderers);
    println!("    Library 渲染器: {}", config.dock.library_renderer);
    println!("    系统渲染器:     {}", config.dock.system_renderer);
    println!("    系统别名:       {:?}", config.dock.system_aliases);
    println!();
    println!("  [持久化]");
    println!("    历史作用域:     {}/{}", config.history.scope, config.history.key);
    println!("    会话有效期:     {} 天", config.session.ttl_days);
    if let Some(ref data_dir) = config.storage.data_dir {
        println!("    数据目录:       {}", data_dir.display());
    }
    println!("────────────────────────────────────────");
    Ok(())
}

/// 打印版本信息
fn print_version() {
    println!();
    println!("Self Space Core");
    println!("═══════════════════════════════════════");
    println!("  版本:             {}", selfspace_core::VERSION);
    println!("  目标平台:         {}", std::env::consts::ARCH);
    println!("  操作系统:         {}", std::env::consts::OS);
    println!("═══════════════════════════════════════");
    println!();
}

/// 列出内置模块
fn list_modules() {
    println!();
    println!("内置模块");
    println!("═══════════════════════════════════════");
    for descriptor in builtin_descriptors() {
        println!(
            "  {:<14} {:<24} order={:<4} {}",
            descriptor.id,
            descriptor.dock.label,
            descriptor.dock.sort_key(),
            descriptor.dock.icon
        );
    }
    let manifest = vrkb_manifest();
    println!();
    println!("扩展清单");
    println!("  {:<14} 设置项 {} 个", manifest.sys_id, manifest.settings.len());
    println!("═══════════════════════════════════════");
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Version 和 CheckConfig 命令不需要日志
    let _log_guard = match cli.command {
        Commands::Version | Commands::CheckConfig { .. } => None,
        _ => {
            let config = load_config(&cli.config, cli.dev).await?;
            let mut logger_config = LoggerConfig::from_runtime_config(&config);
            if let Some(ref level) = cli.log_level {
                logger_config.level = level.clone();
            }
            Some(Logger::try_init(logger_config))
        }
    };

    match cli.command {
        Commands::Version => print_version(),

        Commands::CheckConfig { ref config } => {
            let path = config.clone().unwrap_or_else(|| cli.config.clone());
            check_config(&path).await?;
        }

        Commands::Modules => list_modules(),

        Commands::Dock { ref session } => {
            let config = load_config(&cli.config, cli.dev).await?;
            let space = build_space(config, session).await?;
            print_dock(&space).await;
            space.shutdown().await;
        }

        Commands::Switch {
            ref target,
            ref session,
        } => {
            let config = load_config(&cli.config, cli.dev).await?;
            let space = build_space(config, session).await?;
            match space.switch_to(target).await {
                Ok(id) => println!("✅ 已切换到 {}", id),
                Err(e) => println!("❌ 切换失败 [{}]: {}", e.error_code(), e),
            }
            match space.current_view().await {
                ActiveView::Module {
                    module_id,
                    renderer_id,
                    view,
                } => println!("前台视图: {} ({} → {})", module_id, renderer_id, view),
                ActiveView::Broken { module_id, reason } => {
                    println!("前台视图: {} 已损坏 {:?}", module_id, reason)
                }
            }
            print_dock(&space).await;
            space.shutdown().await;
        }
    }

    Ok(())
}
