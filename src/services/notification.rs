use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        notification::{Notification, UserSummary},
        session::{NotificationView, Session, SessionEvent, SessionPhase, SessionToken},
    },
    services::{
        alert::AlertSink,
        api::NotificationApi,
        push::{PushConnector, PushSubscription},
    },
};
use parking_lot::Mutex;
use std::{
    collections::HashSet,
    sync::{Arc, Weak},
};
use tokio::{
    sync::{broadcast, oneshot, RwLock},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

/// 通知会话管理器
///
/// 持有当前登录用户的通知列表、未读计数和分页游标，
/// 合并REST分页数据与推送通道的实时通知。
#[derive(Clone)]
pub struct NotificationService {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn NotificationApi>,
    push: Arc<dyn PushConnector>,
    alerts: Arc<dyn AlertSink>,
    page_size: usize,
    rollback_on_failure: bool,
    enable_push: bool,
    enable_system_alerts: bool,
    state: RwLock<SessionState>,
    connection: Mutex<Option<PushConnection>>,
    events: broadcast::Sender<SessionEvent>,
}

/// 后台推送任务：先建立连接，再把推送转交给会话
struct PushConnection {
    generation: u64,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PushConnection {
    fn close(self) {
        let _ = self.stop.send(());
    }

    fn is_live_for(&self, generation: u64) -> bool {
        self.generation == generation && !self.task.is_finished()
    }
}

impl NotificationService {
    pub fn new(
        config: &Config,
        api: Arc<dyn NotificationApi>,
        push: Arc<dyn PushConnector>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                api,
                push,
                alerts,
                page_size: config.notification_page_size.max(1),
                rollback_on_failure: config.rollback_on_failure,
                enable_push: config.enable_push,
                enable_system_alerts: config.enable_system_alerts,
                state: RwLock::new(SessionState::default()),
                connection: Mutex::new(None),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub async fn snapshot(&self) -> NotificationView {
        self.inner.state.read().await.view()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.state.read().await.phase
    }

    /// 会话变化入口：`None` 表示登出，令牌变化时重新登录
    pub async fn apply_session(&self, session: Option<Session>) -> Result<()> {
        let Some(session) = session else {
            self.sign_out().await;
            return Ok(());
        };

        let mut state = self.inner.state.write().await;
        if state.token.as_ref() == Some(&session.token) {
            // 同一令牌下用户信息晚到或被清除：只同步推送通道，不重新加载
            if state.user != session.user {
                debug!("Session user changed, updating push channel");
                state.user = session.user;
                self.sync_push(&state);
                drop(state);
                self.inner.emit(SessionEvent::Updated);
            }
            return Ok(());
        }
        drop(state);
        self.sign_in(session).await
    }

    /// 登录后加载首页通知与未读数，并在后台尝试打开推送通道
    ///
    /// 首次加载失败时会话仍然保留（`Ready`、空列表），错误返回给调用方，
    /// 之后的 `load_more` 会从偏移0重新拉取。推送连接不影响返回时机。
    pub async fn sign_in(&self, session: Session) -> Result<()> {
        if self.inner.state.read().await.phase != SessionPhase::Uninitialized {
            self.sign_out().await;
        }

        let token = session.token.clone();
        let generation = {
            let mut state = self.inner.state.write().await;
            let generation = state.begin(session);
            self.sync_push(&state);
            generation
        };
        info!("Notification session started (generation {})", generation);

        self.load_initial(generation, &token).await
    }

    /// 登出：关闭推送通道并清空全部会话状态
    pub async fn sign_out(&self) {
        let was_active = {
            let mut state = self.inner.state.write().await;
            let was_active = state.phase != SessionPhase::Uninitialized;
            state.reset();
            was_active
        };
        self.inner.close_push();

        if was_active {
            info!("Notification session ended");
            self.inner.emit(SessionEvent::SignedOut);
        }
    }

    /// 重新拉取首页和未读数，替换当前列表
    pub async fn refresh(&self) -> Result<()> {
        let (generation, token) = {
            let mut state = self.inner.state.write().await;
            let token = state.active_token()?;
            if state.phase != SessionPhase::Ready || state.loading_more {
                debug!("Refresh skipped: a fetch is already in flight");
                return Ok(());
            }
            state.phase = SessionPhase::LoadingInitial;
            (state.generation, token)
        };
        self.load_initial(generation, &token).await
    }

    /// 用服务端的未读数校正本地计数
    pub async fn refresh_unread_count(&self) -> Result<()> {
        let (generation, token) = {
            let state = self.inner.state.read().await;
            (state.generation, state.active_token()?)
        };

        let count = self.inner.api.unread_count(&token).await.map_err(|e| {
            warn!("Failed to fetch unread count: {}", e);
            e
        })?;

        let mut state = self.inner.state.write().await;
        if state.is_current(generation) {
            state.unread_count = count;
            drop(state);
            self.inner.emit(SessionEvent::Updated);
        }
        Ok(())
    }

    /// 加载下一页；不满足前置条件时为空操作
    pub async fn load_more(&self) -> Result<()> {
        let (generation, token, offset) = {
            let mut state = self.inner.state.write().await;
            if state.phase != SessionPhase::Ready || !state.has_more || state.loading_more {
                return Ok(());
            }
            let Some(token) = state.token.clone() else {
                return Ok(());
            };
            state.loading_more = true;
            (state.generation, token, state.notifications.len())
        };

        let result = self
            .inner
            .api
            .list(&token, self.inner.page_size, offset)
            .await;

        let mut state = self.inner.state.write().await;
        if !state.is_current(generation) {
            debug!("Discarding notification page for a stale session");
            return Ok(());
        }
        state.loading_more = false;

        match result {
            Ok(page) => {
                let count = state.append_page(page, self.inner.page_size);
                debug!("Loaded {} more notifications (has_more={})", count, state.has_more);
                drop(state);
                self.inner.emit(SessionEvent::Appended { count });
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load more notifications: {}", e);
                Err(e)
            }
        }
    }

    pub async fn mark_read(&self, id: &str) -> Result<()> {
        let (generation, token, change) = {
            let mut state = self.inner.state.write().await;
            let token = state.active_token()?;
            let change = state
                .mark_read(id)
                .ok_or_else(|| AppError::not_found("Notification"))?;
            (state.generation, token, change)
        };
        self.inner.emit(SessionEvent::Updated);

        match self.inner.api.mark_read(&token, id).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Failed to mark notification {} as read: {}", id, e);
                self.rollback(generation, |state| state.revert_read(id, change))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn mark_all_read(&self) -> Result<()> {
        let (generation, token, change) = {
            let mut state = self.inner.state.write().await;
            let token = state.active_token()?;
            let change = state.mark_all_read();
            (state.generation, token, change)
        };
        self.inner.emit(SessionEvent::Updated);

        match self.inner.api.mark_all_read(&token).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Failed to mark all notifications as read: {}", e);
                self.rollback(generation, |state| state.revert_all_read(change))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let (generation, token, removal) = {
            let mut state = self.inner.state.write().await;
            let token = state.active_token()?;
            let removal = state
                .remove(id)
                .ok_or_else(|| AppError::not_found("Notification"))?;
            (state.generation, token, removal)
        };
        self.inner.emit(SessionEvent::Updated);

        match self.inner.api.delete(&token, id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Failed to delete notification {}: {}", id, e);
                self.rollback(generation, |state| state.restore(removal))
                    .await;
                Err(e)
            }
        }
    }

    async fn rollback(&self, generation: u64, revert: impl FnOnce(&mut SessionState)) {
        if !self.inner.rollback_on_failure {
            return;
        }
        let mut state = self.inner.state.write().await;
        if state.is_current(generation) {
            revert(&mut *state);
            drop(state);
            self.inner.emit(SessionEvent::Updated);
        }
    }

    async fn load_initial(&self, generation: u64, token: &SessionToken) -> Result<()> {
        let page_size = self.inner.page_size;
        let result = tokio::try_join!(
            self.inner.api.list(token, page_size, 0),
            self.inner.api.unread_count(token)
        );

        let mut state = self.inner.state.write().await;
        if !state.is_current(generation) {
            debug!("Discarding initial notifications for a stale session");
            return Ok(());
        }

        match result {
            Ok((page, unread_count)) => {
                info!("Loaded {} notifications ({} unread)", page.len(), unread_count);
                state.apply_initial(page, unread_count, page_size);
                drop(state);
                self.inner.emit(SessionEvent::Loaded);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to fetch notifications: {}", e);
                state.phase = SessionPhase::Ready;
                Err(e)
            }
        }
    }

    /// 令牌和用户都存在时保持推送通道，否则关闭
    ///
    /// 调用方持有状态写锁，保证与登出的先后顺序。
    fn sync_push(&self, state: &SessionState) {
        let token = match &state.token {
            Some(token) if self.inner.enable_push && state.user.is_some() => token.clone(),
            _ => {
                self.inner.close_push();
                return;
            }
        };

        let live = self
            .inner
            .connection
            .lock()
            .as_ref()
            .map_or(false, |c| c.is_live_for(state.generation));
        if !live {
            self.spawn_push(state.generation, token);
        }
    }

    fn spawn_push(&self, generation: u64, token: SessionToken) {
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_push(
            Arc::downgrade(&self.inner),
            self.inner.push.clone(),
            token,
            generation,
            stop_rx,
        ));

        let connection = PushConnection {
            generation,
            stop,
            task,
        };
        let previous = self.inner.connection.lock().replace(connection);
        if let Some(previous) = previous {
            previous.close();
        }
    }
}

/// 推送通道是可选增强：连接失败只记录日志，连接过程可随时被 `stop` 取消
async fn run_push(
    weak: Weak<Inner>,
    connector: Arc<dyn PushConnector>,
    token: SessionToken,
    generation: u64,
    mut stop: oneshot::Receiver<()>,
) {
    let connected = tokio::select! {
        _ = &mut stop => {
            debug!("Push connection cancelled (generation {})", generation);
            return;
        }
        result = connector.connect(&token) => result,
    };
    let PushSubscription { mut events, shutdown } = match connected {
        Ok(subscription) => subscription,
        Err(e) => {
            debug!("Push channel unavailable, continuing without it: {}", e);
            return;
        }
    };

    loop {
        tokio::select! {
            _ = &mut stop => break,
            event = events.recv() => {
                let Some(notification) = event else { break };
                let Some(inner) = weak.upgrade() else { break };
                inner.ingest_push(generation, notification).await;
            }
        }
    }
    let _ = shutdown.send(());
    debug!("Push channel ended (generation {})", generation);
}

impl Inner {
    async fn ingest_push(&self, generation: u64, notification: Notification) {
        {
            let mut state = self.state.write().await;
            if !state.is_current(generation) {
                debug!("Dropping pushed notification for a stale session");
                return;
            }
            state.apply_push(notification.clone());
        }
        debug!("Received pushed notification {}", notification.id);

        if self.enable_system_alerts {
            if let Err(e) = self.alerts.alert_notification(&notification) {
                debug!("System alert failed: {}", e);
            }
        }
        self.emit(SessionEvent::Pushed(notification));
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn close_push(&self) {
        if let Some(connection) = self.connection.lock().take() {
            debug!("Closing push channel (generation {})", connection.generation);
            connection.close();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.close();
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ReadChange {
    was_unread: bool,
    decremented: bool,
}

#[derive(Debug)]
struct BulkReadChange {
    ids: HashSet<String>,
    cleared: u64,
}

#[derive(Debug)]
struct Removal {
    index: usize,
    notification: Notification,
    decremented: bool,
}

/// 单个会话内的内存状态；所有修改都是同步的
#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    /// 每次登录/登出递增，用于丢弃过期的异步结果
    generation: u64,
    token: Option<SessionToken>,
    user: Option<UserSummary>,
    notifications: Vec<Notification>,
    unread_count: u64,
    has_more: bool,
    loading_more: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            generation: 0,
            token: None,
            user: None,
            notifications: Vec::new(),
            unread_count: 0,
            has_more: true,
            loading_more: false,
        }
    }
}

impl SessionState {
    fn begin(&mut self, session: Session) -> u64 {
        self.reset();
        self.phase = SessionPhase::LoadingInitial;
        self.token = Some(session.token);
        self.user = session.user;
        self.generation
    }

    fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.phase != SessionPhase::Uninitialized
    }

    fn active_token(&self) -> Result<SessionToken> {
        match (&self.phase, &self.token) {
            (SessionPhase::Uninitialized, _) | (_, None) => {
                Err(AppError::unauthorized("No active notification session"))
            }
            (_, Some(token)) => Ok(token.clone()),
        }
    }

    fn apply_initial(&mut self, page: Vec<Notification>, unread_count: u64, page_size: usize) {
        self.has_more = page.len() == page_size;
        self.notifications = page;
        self.unread_count = unread_count;
        self.phase = SessionPhase::Ready;
    }

    fn append_page(&mut self, page: Vec<Notification>, page_size: usize) -> usize {
        let count = page.len();
        self.has_more = count > 0 && count == page_size;
        self.notifications.extend(page);
        count
    }

    /// 推送的通知总是未读的，不与分页结果去重
    fn apply_push(&mut self, notification: Notification) {
        self.notifications.insert(0, notification);
        self.unread_count += 1;
    }

    fn mark_read(&mut self, id: &str) -> Option<ReadChange> {
        let record = self.notifications.iter_mut().find(|n| n.id == id)?;
        let was_unread = !record.read;
        record.read = true;

        let decremented = was_unread && self.unread_count > 0;
        if decremented {
            self.unread_count -= 1;
        }
        Some(ReadChange {
            was_unread,
            decremented,
        })
    }

    fn revert_read(&mut self, id: &str, change: ReadChange) {
        if !change.was_unread {
            return;
        }
        if let Some(record) = self.notifications.iter_mut().find(|n| n.id == id) {
            if record.read {
                record.read = false;
                if change.decremented {
                    self.unread_count += 1;
                }
            }
        }
    }

    fn mark_all_read(&mut self) -> BulkReadChange {
        let ids = self
            .notifications
            .iter_mut()
            .filter(|n| !n.read)
            .map(|n| {
                n.read = true;
                n.id.clone()
            })
            .collect();
        let cleared = std::mem::take(&mut self.unread_count);
        BulkReadChange { ids, cleared }
    }

    fn revert_all_read(&mut self, change: BulkReadChange) {
        let mut present = 0;
        for record in self.notifications.iter_mut() {
            if change.ids.contains(&record.id) {
                present += 1;
                record.read = false;
            }
        }
        // 请求期间被删除的记录不再计入
        let missing = (change.ids.len() as u64).saturating_sub(present);
        self.unread_count += change.cleared.saturating_sub(missing);
    }

    fn remove(&mut self, id: &str) -> Option<Removal> {
        let index = self.notifications.iter().position(|n| n.id == id)?;
        let notification = self.notifications.remove(index);

        let decremented = notification.is_unread() && self.unread_count > 0;
        if decremented {
            self.unread_count -= 1;
        }
        Some(Removal {
            index,
            notification,
            decremented,
        })
    }

    fn restore(&mut self, removal: Removal) {
        if self
            .notifications
            .iter()
            .any(|n| n.id == removal.notification.id)
        {
            return;
        }
        let index = removal.index.min(self.notifications.len());
        self.notifications.insert(index, removal.notification);
        if removal.decremented {
            self.unread_count += 1;
        }
    }

    fn view(&self) -> NotificationView {
        NotificationView {
            phase: self.phase,
            user: self.user.clone(),
            notifications: self.notifications.clone(),
            unread_count: self.unread_count,
            has_more: self.has_more,
            loading: self.phase == SessionPhase::LoadingInitial || self.loading_more,
        }
    }
}
