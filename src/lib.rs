//! Rainbow 博客平台的通知会话客户端
//!
//! 维护当前登录用户的通知列表、未读计数和分页状态，
//! 通过REST接口分页拉取，并通过WebSocket推送通道接收实时通知。

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::{Notification, NotificationKind, NotificationView, Session, SessionEvent, SessionPhase, SessionToken, UserSummary};
pub use services::NotificationService;
