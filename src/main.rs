use std::sync::Arc;

use chrono::Utc;
use rainbow_notify::{
    config::Config,
    models::{Notification, NotificationView, Session, SessionEvent, SessionToken, UserSummary},
    services::{
        AlertSink, DisabledPushConnector, HttpNotificationApi, LogAlertSink, NoopAlertSink,
        NotificationService, PushConnector,
    },
};
use tokio::{
    sync::broadcast::error::RecvError,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化日志
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level));
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting Rainbow-Notify...");

    let session = session_from_env()?;
    let api = Arc::new(HttpNotificationApi::new(&config)?);
    let alerts: Arc<dyn AlertSink> = if config.enable_system_alerts {
        Arc::new(LogAlertSink)
    } else {
        Arc::new(NoopAlertSink)
    };
    let service = NotificationService::new(&config, api, push_connector(&config), alerts);
    let mut events = service.subscribe();

    if let Err(e) = service.sign_in(session).await {
        error!("Initial notification fetch failed: {}", e);
    }
    print_view(&service.snapshot().await);

    // 定期用服务端未读数校正本地计数
    let poll_secs = config.unread_poll_interval_secs.max(1);
    let mut poll = interval(Duration::from_secs(poll_secs));
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    poll.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down...");
                break;
            }
            _ = poll.tick(), if config.unread_poll_interval_secs > 0 => {
                if let Err(e) = service.refresh_unread_count().await {
                    warn!("Unread count refresh failed: {}", e);
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Pushed(notification)) => {
                    println!("{}", render_line(&notification));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} session events", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    service.sign_out().await;
    info!("Rainbow-Notify stopped");
    Ok(())
}

/// 从环境变量读取会话；用户信息齐全时才会启用推送通道
fn session_from_env() -> anyhow::Result<Session> {
    let token = SessionToken::parse(std::env::var("AUTH_TOKEN").unwrap_or_default())?;

    let user = match (std::env::var("AUTH_USER_ID"), std::env::var("AUTH_USERNAME")) {
        (Ok(id), Ok(username)) => Some(UserSummary {
            id,
            username,
            avatar: None,
        }),
        _ => {
            warn!("AUTH_USER_ID/AUTH_USERNAME not set, real-time notifications disabled");
            None
        }
    };

    Ok(Session::new(token, user))
}

#[cfg(feature = "websocket")]
fn push_connector(config: &Config) -> Arc<dyn PushConnector> {
    use rainbow_notify::services::WebSocketPushConnector;

    if config.enable_push {
        Arc::new(WebSocketPushConnector::new(config.ws_url.clone()))
    } else {
        Arc::new(DisabledPushConnector)
    }
}

#[cfg(not(feature = "websocket"))]
fn push_connector(_config: &Config) -> Arc<dyn PushConnector> {
    Arc::new(DisabledPushConnector)
}

fn print_view(view: &NotificationView) {
    match view.badge_label() {
        Some(badge) => println!("Notifications ({} unread)", badge),
        None => println!("Notifications"),
    }
    if view.notifications.is_empty() {
        println!("  No notifications yet");
    }
    for notification in &view.notifications {
        println!("{}", render_line(notification));
    }
    if view.has_more {
        println!("  …more available");
    }
}

fn render_line(notification: &Notification) -> String {
    let marker = if notification.is_unread() { "●" } else { " " };
    let mut line = format!(
        "{} {} · {}",
        marker,
        notification.message(),
        notification.time_ago(Utc::now())
    );
    if let Some(link) = notification.link() {
        line.push_str(&format!(" ({})", link));
    }
    line
}
