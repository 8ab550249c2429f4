//! 运行时错误类型定义
//!
//! 本模块定义了 Self Space 运行时中使用的所有错误类型。

use thiserror::Error;

/// 运行时核心错误类型
#[derive(Error, Debug)]
pub enum RuntimeError {
    // ==================== 解析错误 ====================

    /// 模块未找到（注册表与目录均无法解析）
    #[error("模块未找到: '{0}'")]
    ModuleNotFound(String),

    // ==================== 目录错误 ====================

    /// 目录拉取失败
    #[error("目录拉取失败: {0}")]
    CatalogFetchFailed(String),

    // ==================== 持久化错误 ====================

    /// 持久化写入失败
    #[error("持久化写入失败: '{scope}/{key}' - {reason}")]
    PersistenceWrite {
        scope: String,
        key: String,
        reason: String,
    },

    /// 持久化读取失败
    #[error("持久化读取失败: '{scope}/{key}' - {reason}")]
    PersistenceRead {
        scope: String,
        key: String,
        reason: String,
    },

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        key: String,
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ==================== 通用错误 ====================

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 运行时操作结果类型别名
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// 错误码常量
pub mod error_code {
    // 模块错误 (MODULE-xxx)
    pub const MODULE_NOT_FOUND: &str = "MODULE-001";

    // 目录错误 (CATALOG-xxx)
    pub const CATALOG_FETCH_FAILED: &str = "CATALOG-001";

    // 持久化错误 (STORAGE-xxx)
    pub const STORAGE_WRITE_FAILED: &str = "STORAGE-001";
    pub const STORAGE_READ_FAILED: &str = "STORAGE-002";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    // 核心错误 (CORE-xxx)
    pub const CORE_INIT_FAILED: &str = "CORE-001";
    pub const CORE_IO: &str = "CORE-002";
    pub const CORE_SERIALIZATION: &str = "CORE-003";
}

impl RuntimeError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            RuntimeError::ModuleNotFound(_) => error_code::MODULE_NOT_FOUND,
            RuntimeError::CatalogFetchFailed(_) => error_code::CATALOG_FETCH_FAILED,
            RuntimeError::PersistenceWrite { .. } => error_code::STORAGE_WRITE_FAILED,
            RuntimeError::PersistenceRead { .. } => error_code::STORAGE_READ_FAILED,
            RuntimeError::ConfigLoadFailed(_) => error_code::CONFIG_LOAD_FAILED,
            RuntimeError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            RuntimeError::InitFailed(_) => error_code::CORE_INIT_FAILED,
            RuntimeError::Io(_) => error_code::CORE_IO,
            RuntimeError::Json(_) | RuntimeError::Yaml(_) => error_code::CORE_SERIALIZATION,
            RuntimeError::Other(_) => "UNKNOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::ModuleNotFound("vocabulary".to_string());
        assert!(err.to_string().contains("vocabulary"));
    }

    #[test]
    fn test_error_code() {
        let err = RuntimeError::ModuleNotFound("x".to_string());
        assert_eq!(err.error_code(), error_code::MODULE_NOT_FOUND);

        let err = RuntimeError::CatalogFetchFailed("timeout".to_string());
        assert_eq!(err.error_code(), error_code::CATALOG_FETCH_FAILED);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RuntimeError = io_err.into();
        assert!(matches!(err, RuntimeError::Io(_)));
        assert_eq!(err.error_code(), error_code::CORE_IO);
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: RuntimeError = anyhow::anyhow!("宿主回调失败").into();
        assert_eq!(err.error_code(), "UNKNOWN");
        assert_eq!(err.to_string(), "宿主回调失败");
    }
}
