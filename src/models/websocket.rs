use serde::{Deserialize, Serialize};

use crate::models::notification::Notification;

/// 推送通道下发的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushFrame {
    Notification(Notification),
}

impl PushFrame {
    /// 解析入站文本帧；无法识别的消息返回 `None`
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn into_notification(self) -> Notification {
        match self {
            PushFrame::Notification(notification) => notification,
        }
    }
}
