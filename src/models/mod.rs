pub mod notification;
pub mod response;
pub mod session;
pub mod websocket;

pub use notification::{CommentRef, Notification, NotificationKind, PostRef, UserSummary};
pub use session::{NotificationView, Session, SessionEvent, SessionPhase, SessionToken};
pub use websocket::PushFrame;
