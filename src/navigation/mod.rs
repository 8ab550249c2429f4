//! 导航模块
//!
//! - `history`: 每个模块独立的导航历史栈
//! - `session`: 按标签页与路由保存的界面状态

pub mod history;
pub mod session;

pub use history::NavigationHistoryStore;
pub use session::{RouteState, SessionService};
