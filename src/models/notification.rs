use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{serde_helpers::object_id, time::time_ago};

pub const POST_LIKE: &str = "post_like";
pub const COMMENT: &str = "comment";
pub const COMMENT_REPLY: &str = "comment_reply";
pub const COMMENT_LIKE: &str = "comment_like";

/// 通知发送者的用户摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id", alias = "id", with = "object_id")]
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRef {
    #[serde(rename = "_id", alias = "id", with = "object_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRef {
    #[serde(rename = "_id", alias = "id", with = "object_id")]
    pub id: String,
    #[serde(default)]
    pub content: String,
}

/// 通知类型，携带该类型相关的引用
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    PostLiked {
        post: Option<PostRef>,
    },
    PostCommented {
        post: Option<PostRef>,
        comment: Option<CommentRef>,
    },
    CommentReplied {
        post: Option<PostRef>,
        comment: Option<CommentRef>,
    },
    CommentLiked {
        post: Option<PostRef>,
        comment: Option<CommentRef>,
    },
    /// 客户端不认识的类型，原样保留
    Other {
        kind: String,
        post: Option<PostRef>,
        comment: Option<CommentRef>,
    },
}

impl NotificationKind {
    pub fn type_name(&self) -> &str {
        match self {
            NotificationKind::PostLiked { .. } => POST_LIKE,
            NotificationKind::PostCommented { .. } => COMMENT,
            NotificationKind::CommentReplied { .. } => COMMENT_REPLY,
            NotificationKind::CommentLiked { .. } => COMMENT_LIKE,
            NotificationKind::Other { kind, .. } => kind.as_str(),
        }
    }

    pub fn post(&self) -> Option<&PostRef> {
        match self {
            NotificationKind::PostLiked { post }
            | NotificationKind::PostCommented { post, .. }
            | NotificationKind::CommentReplied { post, .. }
            | NotificationKind::CommentLiked { post, .. }
            | NotificationKind::Other { post, .. } => post.as_ref(),
        }
    }

    pub fn comment(&self) -> Option<&CommentRef> {
        match self {
            NotificationKind::PostLiked { .. } => None,
            NotificationKind::PostCommented { comment, .. }
            | NotificationKind::CommentReplied { comment, .. }
            | NotificationKind::CommentLiked { comment, .. }
            | NotificationKind::Other { comment, .. } => comment.as_ref(),
        }
    }

    fn from_parts(kind: String, post: Option<PostRef>, comment: Option<CommentRef>) -> Self {
        match kind.as_str() {
            POST_LIKE => NotificationKind::PostLiked { post },
            COMMENT => NotificationKind::PostCommented { post, comment },
            COMMENT_REPLY => NotificationKind::CommentReplied { post, comment },
            COMMENT_LIKE => NotificationKind::CommentLiked { post, comment },
            _ => NotificationKind::Other { kind, post, comment },
        }
    }
}

/// 当前用户收到的一条通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NotificationDocument", into = "NotificationDocument")]
pub struct Notification {
    pub id: String,
    pub recipient_id: Option<String>,
    pub sender: UserSummary,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        !self.read
    }

    /// 面向用户的通知文案
    pub fn message(&self) -> String {
        let username = &self.sender.username;
        match &self.kind {
            NotificationKind::PostLiked { .. } => format!("{} liked your post", username),
            NotificationKind::PostCommented { .. } => format!("{} commented on your post", username),
            NotificationKind::CommentReplied { .. } => format!("{} replied to your comment", username),
            NotificationKind::CommentLiked { .. } => format!("{} liked your comment", username),
            NotificationKind::Other { .. } => "You have a new notification".to_string(),
        }
    }

    /// 关联文章的站内链接
    pub fn link(&self) -> Option<String> {
        self.kind.post().map(|post| format!("/posts/{}", post.slug))
    }

    pub fn time_ago(&self, now: DateTime<Utc>) -> String {
        time_ago(self.created_at, now)
    }
}

/// 后端返回的通知文档格式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationDocument {
    #[serde(rename = "_id", alias = "id", with = "object_id")]
    id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::utils::serde_helpers::object_id::option"
    )]
    recipient: Option<String>,
    sender: UserSummary,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    post: Option<PostRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<CommentRef>,
    #[serde(default)]
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationDocument> for Notification {
    fn from(doc: NotificationDocument) -> Self {
        Self {
            id: doc.id,
            recipient_id: doc.recipient,
            sender: doc.sender,
            kind: NotificationKind::from_parts(doc.kind, doc.post, doc.comment),
            read: doc.read,
            created_at: doc.created_at,
        }
    }
}

impl From<Notification> for NotificationDocument {
    fn from(notification: Notification) -> Self {
        let kind = notification.kind.type_name().to_string();
        let (post, comment) = match notification.kind {
            NotificationKind::PostLiked { post } => (post, None),
            NotificationKind::PostCommented { post, comment }
            | NotificationKind::CommentReplied { post, comment }
            | NotificationKind::CommentLiked { post, comment }
            | NotificationKind::Other { post, comment, .. } => (post, comment),
        };
        Self {
            id: notification.id,
            recipient: notification.recipient_id,
            sender: notification.sender,
            kind,
            post,
            comment,
            read: notification.read,
            created_at: notification.created_at,
        }
    }
}
