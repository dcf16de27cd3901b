use crate::{
    error::{AppError, Result},
    models::{notification::Notification, session::SessionToken},
};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use url::Url;

/// 一条已建立的推送连接
///
/// `events` 在连接断开时结束；发送 `shutdown` 或将其丢弃即关闭连接。
pub struct PushSubscription {
    pub events: mpsc::UnboundedReceiver<Notification>,
    pub shutdown: oneshot::Sender<()>,
}

#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self, token: &SessionToken) -> Result<PushSubscription>;
}

/// 推送关闭时使用，始终连接失败
pub struct DisabledPushConnector;

#[async_trait]
impl PushConnector for DisabledPushConnector {
    async fn connect(&self, _token: &SessionToken) -> Result<PushSubscription> {
        Err(AppError::PushChannel("Push channel is disabled".to_string()))
    }
}

/// 生成推送通道地址: `{base}/ws?token=...`
pub fn push_url(base_url: &str, token: &SessionToken) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.query_pairs_mut().clear().append_pair("token", token.as_str());
    Ok(url)
}

#[cfg(feature = "websocket")]
pub use self::websocket::WebSocketPushConnector;

#[cfg(feature = "websocket")]
mod websocket {
    use super::*;
    use crate::models::websocket::PushFrame;
    use futures_util::StreamExt;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tracing::{debug, info};

    pub struct WebSocketPushConnector {
        base_url: String,
    }

    impl WebSocketPushConnector {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                base_url: base_url.into(),
            }
        }
    }

    #[async_trait]
    impl PushConnector for WebSocketPushConnector {
        async fn connect(&self, token: &SessionToken) -> Result<PushSubscription> {
            let url = push_url(&self.base_url, token)?;
            let (mut stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
            info!("Push channel connected");

            let (events_tx, events) = mpsc::unbounded_channel();
            let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

            // 不自动重连：连接出错或关闭后任务结束，`events` 随之关闭
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = &mut shutdown_rx => {
                            let _ = stream.close(None).await;
                            debug!("Push channel closed by client");
                            break;
                        }
                        msg = stream.next() => match msg {
                            Some(Ok(WsMessage::Text(text))) => {
                                let Some(frame) = PushFrame::parse(&text) else {
                                    debug!("Ignoring unrecognized push frame");
                                    continue;
                                };
                                if events_tx.send(frame.into_notification()).is_err() {
                                    let _ = stream.close(None).await;
                                    break;
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                debug!("Push channel closed by server");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                debug!("Push channel error: {}", e);
                                break;
                            }
                        },
                    }
                }
            });

            Ok(PushSubscription { events, shutdown })
        }
    }
}
