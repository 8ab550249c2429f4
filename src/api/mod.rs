//! API 模块
//!
//! 包含对外提供的 SDK 接口。
//!
//! - `sdk`: SelfSpace 主接口，组合运行时的全部组件

pub mod sdk;

// 重导出主要类型
pub use sdk::{SelfSpace, StatusInfo};
