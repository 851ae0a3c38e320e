// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::PollerSettings;
use crate::domain::models::queue::{PurgeReport, QueueSnapshot};
use crate::domain::repositories::{ApiError, QueueRepository};
use crate::domain::services::ui_hooks::{Notice, Notifier, TracingNotifier};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

const FETCH_FAILED: &str = "Failed to fetch queue status";
const PURGE_FAILED: &str = "Failed to purge queue";

/// 轮询器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// 有待处理工作时的轮询周期
    pub interval: Duration,
    /// 清空队列后确认性拉取的延迟
    pub purge_confirm_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            purge_confirm_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&PollerSettings> for PollerConfig {
    fn from(settings: &PollerSettings) -> Self {
        Self {
            interval: settings.interval(),
            purge_confirm_delay: settings.purge_confirm_delay(),
        }
    }
}

/// 轮询阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerPhase {
    /// 没有周期定时器，只响应外部刷新
    #[default]
    Idle,
    /// 按固定周期轮询
    Polling,
}

/// 轮询器对外发布的状态
#[derive(Debug, Clone, Default)]
pub struct PollerStatus {
    pub phase: PollerPhase,
    /// 最近一次成功拉取的快照，拉取失败时保留
    pub snapshot: Option<Arc<QueueSnapshot>>,
    /// 最近一次拉取失败的信息，成功拉取后清除
    pub error: Option<String>,
    pub loading: bool,
}

/// 外部刷新信号
///
/// 可以克隆后交给任意组件，触发一次带外拉取。轮询器空闲时同样生效。
#[derive(Debug, Clone, Default)]
pub struct RefreshSignal {
    notify: Arc<Notify>,
}

impl RefreshSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.notify.notify_one();
    }

    async fn triggered(&self) {
        self.notify.notified().await;
    }
}

struct Shared<R: QueueRepository> {
    repository: Arc<R>,
    config: PollerConfig,
    status: watch::Sender<PollerStatus>,
    refresh: RefreshSignal,
    confirm_at: Mutex<Option<Instant>>,
}

impl<R: QueueRepository> Shared<R> {
    /// 拉取一次状态并返回下一次周期拉取的时间点
    async fn poll_once(&self) -> Option<Instant> {
        self.status.send_modify(|status| status.loading = true);

        match self.repository.fetch_status().await {
            Ok(snapshot) => {
                let active = snapshot.is_active();
                let phase = if active {
                    PollerPhase::Polling
                } else {
                    PollerPhase::Idle
                };
                self.status.send_modify(|status| {
                    if status.phase != phase {
                        debug!(?phase, "Queue poller phase changed");
                    }
                    status.phase = phase;
                    status.snapshot = Some(Arc::new(snapshot));
                    status.error = None;
                    status.loading = false;
                });
                active.then(|| Instant::now() + self.config.interval)
            }
            Err(err) => {
                error!("{}: {}", FETCH_FAILED, err);
                let mut phase = PollerPhase::Idle;
                self.status.send_modify(|status| {
                    status.error = Some(err.user_message(FETCH_FAILED));
                    status.loading = false;
                    phase = status.phase;
                });
                (phase == PollerPhase::Polling).then(|| Instant::now() + self.config.interval)
            }
        }
    }

    async fn drive(self: Arc<Self>) {
        info!(interval_ms = self.config.interval.as_millis() as u64, "Queue poller started");

        loop {
            let next_tick = self.poll_once().await;
            let confirm_at = *self.confirm_at.lock();
            let deadline = match (next_tick, confirm_at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };

            tokio::select! {
                _ = sleep_until_opt(deadline) => {}
                _ = self.refresh.triggered() => {
                    debug!("Queue refresh triggered");
                }
            }

            {
                let now = Instant::now();
                let mut confirm_at = self.confirm_at.lock();
                if confirm_at.is_some_and(|at| at <= now) {
                    *confirm_at = None;
                }
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// 队列状态轮询器
///
/// 只有一个驱动任务负责拉取，因此任意时刻最多只有一个请求在途。
/// 快照显示仍有工作时按周期轮询，否则停在空闲状态，
/// 直到收到外部刷新信号或清空队列。
pub struct QueueStatusPoller<R: QueueRepository + 'static> {
    shared: Arc<Shared<R>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    notifier: Arc<dyn Notifier>,
}

impl<R: QueueRepository + 'static> QueueStatusPoller<R> {
    pub fn new(repository: Arc<R>, config: PollerConfig) -> Self {
        let (status, _) = watch::channel(PollerStatus::default());
        Self {
            shared: Arc::new(Shared {
                repository,
                config,
                status,
                refresh: RefreshSignal::new(),
                confirm_at: Mutex::new(None),
            }),
            driver: Mutex::new(None),
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// 启动驱动任务并立即拉取一次，已在运行时不做任何事
    pub fn start(&self) {
        let mut driver = self.driver.lock();
        if driver.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        *driver = Some(tokio::spawn(self.shared.clone().drive()));
    }

    /// 停止驱动任务，保留最近的快照
    pub fn stop(&self) {
        if let Some(handle) = self.driver.lock().take() {
            handle.abort();
            self.shared.status.send_modify(|status| {
                status.phase = PollerPhase::Idle;
                status.loading = false;
            });
            info!("Queue poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.driver
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 请求一次带外拉取
    pub fn refresh(&self) {
        self.shared.refresh.trigger();
    }

    /// 可交给其他组件的刷新信号
    pub fn refresh_signal(&self) -> RefreshSignal {
        self.shared.refresh.clone()
    }

    pub fn status(&self) -> PollerStatus {
        self.shared.status.borrow().clone()
    }

    /// 订阅状态变更
    pub fn subscribe(&self) -> watch::Receiver<PollerStatus> {
        self.shared.status.subscribe()
    }

    /// 清空队列
    ///
    /// 成功后通知清除的任务数，立即刷新一次，并在确认延迟后再拉取一次，
    /// 以反映撤销操作最终生效后的状态。
    ///
    /// 轮询器已停止时只在当前任务中拉取一次，不安排确认拉取，阶段保持空闲。
    pub async fn purge(&self) -> Result<PurgeReport, ApiError> {
        match self.shared.repository.purge().await {
            Ok(report) => {
                info!(
                    purged = report.purged_tasks,
                    revoked = report.revoked_tasks,
                    total = report.total_cleared,
                    "Queue purged"
                );
                self.notifier.notify(Notice::success(report.confirmation()));
                if self.is_running() {
                    *self.shared.confirm_at.lock() =
                        Some(Instant::now() + self.shared.config.purge_confirm_delay);
                    self.shared.refresh.trigger();
                } else {
                    self.shared.poll_once().await;
                    self.shared
                        .status
                        .send_modify(|status| status.phase = PollerPhase::Idle);
                }
                Ok(report)
            }
            Err(err) => {
                warn!("{}: {}", PURGE_FAILED, err);
                self.notifier
                    .notify(Notice::error(err.user_message(PURGE_FAILED)));
                Err(err)
            }
        }
    }
}

impl<R: QueueRepository + 'static> Drop for QueueStatusPoller<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "queue_poller_test.rs"]
mod tests;
