pub mod alert;
pub mod api;
pub mod notification;
pub mod push;

// 重新导出常用类型
pub use alert::{AlertSink, LogAlertSink, NoopAlertSink};
pub use api::{HttpNotificationApi, NotificationApi};
pub use notification::NotificationService;
pub use push::{DisabledPushConnector, PushConnector, PushSubscription};

#[cfg(feature = "websocket")]
pub use push::WebSocketPushConnector;
