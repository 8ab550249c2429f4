//! 运行时配置
//!
//! 定义运行时的配置结构和加载逻辑。默认值与线上前端保持一致。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::{Result, RuntimeError};

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
        }
    }
}

/// Dock 调和配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockConfig {
    /// 单例渲染器：同一渲染器在 Dock 中最多占一个位置
    #[serde(default = "default_singleton_renderers")]
    pub singleton_renderers: Vec<String>,

    /// Library 锚点使用的渲染器
    #[serde(default = "default_library_renderer")]
    pub library_renderer: String,

    /// Library 锚点显示名称
    #[serde(default = "default_library_label")]
    pub library_label: String,

    /// 系统控制台渲染器（存在即强制固定）
    #[serde(default = "default_system_renderer")]
    pub system_renderer: String,

    /// 解析为系统控制台的旧别名
    #[serde(default = "default_system_aliases")]
    pub system_aliases: Vec<String>,

    /// 可被系统别名命中的渲染器
    #[serde(default = "default_system_alias_renderers")]
    pub system_alias_renderers: Vec<String>,

    /// 描述符未声明排序时的 Dock 排序值
    #[serde(default = "default_dock_order")]
    pub default_order: i32,

    /// 图标配置
    #[serde(default)]
    pub icons: DockIcons,
}

/// Dock 图标配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockIcons {
    /// Library 锚点的兜底图标
    #[serde(default = "default_library_icon")]
    pub library: String,

    /// 插件存在但未声明图标
    #[serde(default = "default_generic_icon")]
    pub generic: String,

    /// 插件缺失（醒目的错误图标）
    #[serde(default = "default_error_icon")]
    pub error: String,
}

fn default_singleton_renderers() -> Vec<String> {
    ["math", "system", "admin_system", "admin", "vocabulary", "memo", "vrkb"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_library_renderer() -> String {
    "knowledge".to_string()
}

fn default_library_label() -> String {
    "Library".to_string()
}

fn default_system_renderer() -> String {
    "admin_system".to_string()
}

fn default_system_aliases() -> Vec<String> {
    vec!["system".to_string(), "admin".to_string()]
}

fn default_system_alias_renderers() -> Vec<String> {
    vec![
        "admin".to_string(),
        "system".to_string(),
        "admin_system".to_string(),
    ]
}

fn default_dock_order() -> i32 {
    10
}

fn default_library_icon() -> String {
    "ri-apps-2-line".to_string()
}

fn default_generic_icon() -> String {
    "ri-book-2-line".to_string()
}

fn default_error_icon() -> String {
    "ri-error-warning-fill".to_string()
}

impl Default for DockIcons {
    fn default() -> Self {
        Self {
            library: default_library_icon(),
            generic: default_generic_icon(),
            error: default_error_icon(),
        }
    }
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            singleton_renderers: default_singleton_renderers(),
            library_renderer: default_library_renderer(),
            library_label: default_library_label(),
            system_renderer: default_system_renderer(),
            system_aliases: default_system_aliases(),
            system_alias_renderers: default_system_alias_renderers(),
            default_order: default_dock_order(),
            icons: DockIcons::default(),
        }
    }
}

/// 导航历史持久化配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// 持久化作用域
    #[serde(default = "default_history_scope")]
    pub scope: String,

    /// 持久化记录键
    #[serde(default = "default_history_key")]
    pub key: String,
}

fn default_history_scope() -> String {
    "navigation".to_string()
}

fn default_history_key() -> String {
    "stacks".to_string()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            scope: default_history_scope(),
            key: default_history_key(),
        }
    }
}

/// 页面会话状态配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 持久化作用域
    #[serde(default = "default_session_scope")]
    pub scope: String,

    /// 记录过期天数
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: u32,
}

fn default_session_scope() -> String {
    "session".to_string()
}

fn default_session_ttl_days() -> u32 {
    7
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scope: default_session_scope(),
            ttl_days: default_session_ttl_days(),
        }
    }
}

/// 持久化存储配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 数据目录（None 时使用内存存储）
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// 运行时配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// 配置文件路径
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,

    /// Dock 调和配置
    #[serde(default)]
    pub dock: DockConfig,

    /// 导航历史配置
    #[serde(default)]
    pub history: HistoryConfig,

    /// 页面会话配置
    #[serde(default)]
    pub session: SessionConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 是否为开发模式
    #[serde(default)]
    pub dev_mode: bool,
}

impl RuntimeConfig {
    /// 创建配置构建器
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::new()
    }

    /// 从文件加载配置（`.json` 按 JSON 解析，其余按 YAML）
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            RuntimeError::ConfigLoadFailed(format!("{}: {}", path.display(), e))
        })?;

        let mut config: RuntimeConfig = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;

        config.config_path = Some(path);
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.dock.library_renderer.trim().is_empty() {
            return Err(RuntimeError::InvalidConfigValue {
                key: "dock.library_renderer".to_string(),
                reason: "不能为空".to_string(),
            });
        }
        if self.history.scope.trim().is_empty() || self.history.key.trim().is_empty() {
            return Err(RuntimeError::InvalidConfigValue {
                key: "history".to_string(),
                reason: "scope 与 key 不能为空".to_string(),
            });
        }
        if self.session.ttl_days == 0 {
            return Err(RuntimeError::InvalidConfigValue {
                key: "session.ttl_days".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// 判断渲染器是否为单例
    pub fn is_singleton(&self, renderer_id: &str) -> bool {
        self.dock.is_singleton(renderer_id)
    }

    /// 合并另一个配置（只覆盖非默认值）
    pub fn merge(&mut self, other: RuntimeConfig) {
        if other.logging.level != default_log_level() {
            self.logging.level = other.logging.level;
        }
        if other.logging.file_output {
            self.logging.file_output = true;
            self.logging.log_dir = other.logging.log_dir;
        }
        if other.logging.json_format {
            self.logging.json_format = true;
        }
        for renderer in other.dock.singleton_renderers {
            if !self.dock.singleton_renderers.contains(&renderer) {
                self.dock.singleton_renderers.push(renderer);
            }
        }
        if other.dock.system_renderer != default_system_renderer() {
            self.dock.system_renderer = other.dock.system_renderer;
        }
        if other.dock.library_renderer != default_library_renderer() {
            self.dock.library_renderer = other.dock.library_renderer;
        }
        if other.session.ttl_days != default_session_ttl_days() {
            self.session.ttl_days = other.session.ttl_days;
        }
        if other.storage.data_dir.is_some() {
            self.storage.data_dir = other.storage.data_dir;
        }
        if other.dev_mode {
            self.dev_mode = true;
        }
    }
}

impl DockConfig {
    /// 判断渲染器是否为单例
    pub fn is_singleton(&self, renderer_id: &str) -> bool {
        self.singleton_renderers.iter().any(|r| r == renderer_id)
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
        }
    }

    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用文件日志
    pub fn file_logging(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.logging.file_output = true;
        self.config.logging.log_dir = Some(log_dir.into());
        self
    }

    /// 覆盖单例渲染器集合
    pub fn singleton_renderers<I, S>(mut self, renderers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.dock.singleton_renderers = renderers.into_iter().map(Into::into).collect();
        self
    }

    /// 设置系统控制台渲染器
    pub fn system_renderer(mut self, renderer: impl Into<String>) -> Self {
        self.config.dock.system_renderer = renderer.into();
        self
    }

    /// 设置会话记录过期天数
    pub fn session_ttl_days(mut self, days: u32) -> Self {
        self.config.session.ttl_days = days;
        self
    }

    /// 设置数据目录
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage.data_dir = Some(dir.into());
        self
    }

    /// 启用开发模式
    pub fn dev_mode(mut self) -> Self {
        self.config.dev_mode = true;
        self
    }

    /// 构建配置
    pub fn build(self) -> RuntimeConfig {
        self.config
    }
}
