//! 日志系统
//!
//! 基于 tracing 生态初始化运行时日志：
//!
//! - 控制台输出（Pretty / JSON）
//! - 文件输出（tracing-appender 非阻塞写入，按时间轮转）
//! - EnvFilter 过滤（`RUST_LOG` 优先）
//!
//! # 示例
//!
//! ```rust,no_run
//! use selfspace_core::utils::logger::{Logger, LoggerConfig, RotationStrategy};
//!
//! let config = LoggerConfig::builder()
//!     .level("debug")
//!     .file_output("./logs")
//!     .rotation(RotationStrategy::Daily)
//!     .build();
//! let _guard = Logger::init(config).unwrap();
//!
//! tracing::info!(module_id = "vocabulary", "切换模块");
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::core::config::{LogConfig, RuntimeConfig};
use crate::utils::{Result, RuntimeError};

/// 日志文件默认前缀
const DEFAULT_FILE_PREFIX: &str = "selfspace";

/// 日志轮转策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    /// 不轮转
    Never,
    /// 每小时轮转
    Hourly,
    /// 每天轮转（默认）
    #[default]
    Daily,
}

impl RotationStrategy {
    fn to_rotation(self) -> Rotation {
        match self {
            RotationStrategy::Never => Rotation::NEVER,
            RotationStrategy::Hourly => Rotation::HOURLY,
            RotationStrategy::Daily => Rotation::DAILY,
        }
    }

    /// 从字符串解析轮转策略，无法识别时回退到每天轮转
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "never" | "none" => RotationStrategy::Never,
            "hourly" | "hour" => RotationStrategy::Hourly,
            _ => RotationStrategy::Daily,
        }
    }
}

impl std::fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationStrategy::Never => write!(f, "never"),
            RotationStrategy::Hourly => write!(f, "hourly"),
            RotationStrategy::Daily => write!(f, "daily"),
        }
    }
}

/// 日志系统配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 默认日志级别
    pub level: String,
    /// 是否使用 JSON 格式输出
    pub json_format: bool,
    /// 是否输出到控制台
    pub console_output: bool,
    /// 文件输出目录（None 表示不输出到文件）
    pub file_output: Option<PathBuf>,
    /// 日志文件名前缀
    pub file_prefix: String,
    /// 日志轮转策略
    pub rotation: RotationStrategy,
    /// 是否显示目标模块
    pub show_target: bool,
    /// 是否显示文件名和行号
    pub show_file_line: bool,
    /// 自定义过滤指令（EnvFilter 格式），例如 "selfspace_core::dock=trace"
    pub filter_directives: Option<String>,
    /// 控制台是否启用 ANSI 颜色
    pub ansi_colors: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            rotation: RotationStrategy::Daily,
            show_target: true,
            show_file_line: false,
            filter_directives: None,
            ansi_colors: true,
        }
    }
}

impl LoggerConfig {
    /// 创建配置构建器
    pub fn builder() -> LoggerConfigBuilder {
        LoggerConfigBuilder::new()
    }

    /// 从配置文件中的 `logging` 段创建
    pub fn from_log_config(log_config: &LogConfig) -> Self {
        Self {
            level: log_config.level.clone(),
            json_format: log_config.json_format,
            file_output: if log_config.file_output {
                log_config.log_dir.clone()
            } else {
                None
            },
            rotation: RotationStrategy::parse(&log_config.rotation),
            ..Default::default()
        }
    }

    /// 从完整的运行时配置创建，开发模式下显示文件名与行号
    pub fn from_runtime_config(config: &RuntimeConfig) -> Self {
        Self {
            show_file_line: config.dev_mode,
            ..Self::from_log_config(&config.logging)
        }
    }

    fn parse_level(&self) -> Level {
        match self.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// 日志配置构建器
#[derive(Debug, Default)]
pub struct LoggerConfigBuilder {
    config: LoggerConfig,
}

impl LoggerConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    /// 设置日志级别
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// 启用 JSON 格式输出
    pub fn json_format(mut self, enable: bool) -> Self {
        self.config.json_format = enable;
        self
    }

    /// 设置控制台输出
    pub fn console_output(mut self, enable: bool) -> Self {
        self.config.console_output = enable;
        self
    }

    /// 设置文件输出目录
    pub fn file_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.file_output = Some(dir.into());
        self
    }

    /// 设置日志文件前缀
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// 设置轮转策略
    pub fn rotation(mut self, strategy: RotationStrategy) -> Self {
        self.config.rotation = strategy;
        self
    }

    /// 显示目标模块
    pub fn show_target(mut self, enable: bool) -> Self {
        self.config.show_target = enable;
        self
    }

    /// 显示文件名和行号
    pub fn show_file_line(mut self, enable: bool) -> Self {
        self.config.show_file_line = enable;
        self
    }

    /// 设置过滤指令
    pub fn filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.config.filter_directives = Some(directives.into());
        self
    }

    /// 启用 ANSI 颜色
    pub fn ansi_colors(mut self, enable: bool) -> Self {
        self.config.ansi_colors = enable;
        self
    }

    /// 构建配置
    pub fn build(self) -> LoggerConfig {
        self.config
    }
}

/// 日志系统守卫
///
/// 持有非阻塞写入器的 WorkerGuard，丢弃时刷新挂起的日志。
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

impl LogGuard {
    fn empty() -> Self {
        Self { _guards: Vec::new() }
    }

    /// 守卫持有的写入器数量
    pub fn writer_count(&self) -> usize {
        self._guards.len()
    }
}

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// 日志系统
pub struct Logger;

impl Logger {
    /// 初始化日志系统
    ///
    /// 返回的 `LogGuard` 必须保持存活直到程序退出。重复初始化返回
    /// `InitFailed`。
    pub fn init(config: LoggerConfig) -> Result<LogGuard> {
        if LOGGER_INITIALIZED.get().is_some() {
            return Err(RuntimeError::InitFailed(
                "日志系统已初始化，不能重复初始化".to_string(),
            ));
        }

        let env_filter = Self::create_env_filter(&config);
        let mut guard = LogGuard::empty();
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        if config.console_output {
            let (writer, console_guard) = tracing_appender::non_blocking(io::stdout());
            guard._guards.push(console_guard);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(config.show_target)
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line);
            if config.json_format {
                layers.push(layer.json().with_ansi(false).boxed());
            } else {
                layers.push(layer.with_ansi(config.ansi_colors).boxed());
            }
        }

        if let Some(ref log_dir) = config.file_output {
            let appender = RollingFileAppender::new(
                config.rotation.to_rotation(),
                log_dir,
                format!("{}.log", config.file_prefix),
            );
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard._guards.push(file_guard);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(config.show_target)
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line)
                .with_ansi(false);
            if config.json_format {
                layers.push(layer.json().boxed());
            } else {
                layers.push(layer.boxed());
            }
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| RuntimeError::InitFailed(format!("日志系统初始化失败: {}", e)))?;

        let _ = LOGGER_INITIALIZED.set(());
        Ok(guard)
    }

    /// 尝试初始化日志系统，已初始化时返回空守卫
    pub fn try_init(config: LoggerConfig) -> LogGuard {
        Self::init(config).unwrap_or_else(|_| LogGuard::empty())
    }

    fn create_env_filter(config: &LoggerConfig) -> EnvFilter {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.parse_level().as_str()));

        match config.filter_directives {
            Some(ref directives) => directives
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .fold(filter, |f, directive| match directive.parse() {
                    Ok(d) => f.add_directive(d),
                    Err(_) => f,
                }),
            None => filter,
        }
    }
}

/// 标准日志字段名称
pub mod fields {
    /// 模块 ID
    pub const MODULE_ID: &str = "module_id";
    /// 渲染器 ID
    pub const RENDERER_ID: &str = "renderer_id";
    /// 当前前台模块
    pub const ACTIVE_ID: &str = "active_id";
    /// 目录条目数
    pub const CATALOG_SIZE: &str = "catalog_size";
    /// Dock 队列长度
    pub const QUEUE_LEN: &str = "queue_len";
    /// 持久化作用域
    pub const SCOPE: &str = "scope";
    /// 持久化键
    pub const RECORD_KEY: &str = "record_key";
    /// 错误码
    pub const ERROR_CODE: &str = "error_code";
}
