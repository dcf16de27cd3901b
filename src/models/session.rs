use std::fmt;

use serde::Serialize;

use crate::{
    error::{AppError, Result},
    models::notification::{Notification, UserSummary},
};

/// 登录会话的Bearer令牌
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn parse(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::unauthorized("Session token is empty"));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// 由外部认证层注入的会话信息
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    /// 只有用户信息也就绪时才会打开推送通道
    pub user: Option<UserSummary>,
}

impl Session {
    pub fn new(token: SessionToken, user: Option<UserSummary>) -> Self {
        Self { token, user }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Uninitialized,
    LoadingInitial,
    Ready,
}

/// 提供给展示层的只读快照
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub phase: SessionPhase,
    pub user: Option<UserSummary>,
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
    pub has_more: bool,
    pub loading: bool,
}

impl NotificationView {
    /// 未读角标文本，超过99显示 "99+"
    pub fn badge_label(&self) -> Option<String> {
        match self.unread_count {
            0 => None,
            n if n > 99 => Some("99+".to_string()),
            n => Some(n.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// 首屏数据已加载（登录或手动刷新）
    Loaded,
    Appended { count: usize },
    Pushed(Notification),
    /// 已读/删除等本地修改
    Updated,
    SignedOut,
}
