use crate::{error::Result, models::notification::Notification};
use tracing::info;

pub const ALERT_TITLE: &str = "New notification";

/// 系统级提醒（桌面通知等），尽力而为
///
/// 返回的错误只会被记录，不会影响通知列表状态。
pub trait AlertSink: Send + Sync {
    fn alert(&self, title: &str, body: &str) -> Result<()>;

    fn alert_notification(&self, notification: &Notification) -> Result<()> {
        self.alert(ALERT_TITLE, &notification.message())
    }
}

pub struct NoopAlertSink;

impl AlertSink for NoopAlertSink {
    fn alert(&self, _title: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}

/// 将提醒写入日志，供无界面环境使用
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn alert(&self, title: &str, body: &str) -> Result<()> {
        info!(target: "rainbow_notify::alert", "{}: {}", title, body);
        Ok(())
    }
}
