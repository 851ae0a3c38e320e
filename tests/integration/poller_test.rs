// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::mock_backend::{
    active_snapshot, rejected, MockQueueBackend, MockScheduleBackend, RecordingNotifier, TICK,
};
use crawlsync::domain::models::queue::PurgeReport;
use crawlsync::domain::repositories::ApiError;
use crawlsync::domain::services::queue_poller::{PollerConfig, PollerPhase, QueueStatusPoller};
use crawlsync::domain::services::schedule_store::ScheduleConfigStore;
use crawlsync::domain::services::ui_hooks::NoticeLevel;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const SETTLE: Duration = Duration::from_millis(10);

fn poller(backend: &Arc<MockQueueBackend>) -> QueueStatusPoller<MockQueueBackend> {
    QueueStatusPoller::new(backend.clone(), PollerConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_polls_while_active_then_goes_idle() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.push_active(2);
    let poller = poller(&backend);

    poller.start();
    sleep(SETTLE).await;
    assert_eq!(backend.fetches(), 1);
    assert_eq!(poller.status().phase, PollerPhase::Polling);
    assert!(poller.status().snapshot.unwrap().is_active());

    sleep(TICK).await;
    assert_eq!(backend.fetches(), 2);
    assert_eq!(poller.status().phase, PollerPhase::Polling);

    sleep(TICK).await;
    assert_eq!(backend.fetches(), 3);
    assert_eq!(poller.status().phase, PollerPhase::Idle);

    // No timer while idle
    sleep(TICK * 10).await;
    assert_eq!(backend.fetches(), 3);
    assert!(poller.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_keeps_polling() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.push(Ok(active_snapshot()));
    backend.push(Err(ApiError::Transport("connection reset".to_string())));
    backend.push(Ok(active_snapshot()));
    let poller = poller(&backend);

    poller.start();
    sleep(SETTLE).await;
    sleep(TICK).await;

    let status = poller.status();
    assert_eq!(backend.fetches(), 2);
    assert_eq!(status.phase, PollerPhase::Polling);
    assert_eq!(status.error.as_deref(), Some("Failed to fetch queue status"));
    // The last good snapshot is kept
    assert!(status.snapshot.is_some());

    sleep(TICK).await;
    assert_eq!(backend.fetches(), 3);
    assert_eq!(poller.status().error, None);
}

#[tokio::test(start_paused = true)]
async fn test_failure_while_idle_waits_for_trigger() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.push(Err(rejected("Celery unavailable")));
    let poller = poller(&backend);

    poller.start();
    sleep(SETTLE).await;
    assert_eq!(poller.status().phase, PollerPhase::Idle);
    assert_eq!(
        poller.status().error.as_deref(),
        Some("Celery unavailable")
    );

    sleep(TICK * 5).await;
    assert_eq!(backend.fetches(), 1);

    poller.refresh();
    sleep(SETTLE).await;
    assert_eq!(backend.fetches(), 2);
    assert_eq!(poller.status().error, None);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_supersedes_scheduled_tick() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.push_active(3);
    let poller = poller(&backend);

    poller.start();
    sleep(SETTLE).await;
    sleep(Duration::from_millis(500)).await;
    poller.refresh();
    sleep(SETTLE).await;
    assert_eq!(backend.fetches(), 2);

    let times = backend.fetch_times();
    assert_eq!(times[1] - times[0], Duration::from_millis(510));

    // The next tick is measured from the out-of-band fetch
    sleep(TICK).await;
    let times = backend.fetch_times();
    assert_eq!(times.len(), 3);
    assert_eq!(times[2] - times[1], TICK);
}

#[tokio::test(start_paused = true)]
async fn test_purge_schedules_confirmatory_fetch() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.set_purge_result(Ok(PurgeReport {
        status: "success".to_string(),
        message: "Queue purged".to_string(),
        purged_tasks: 4,
        revoked_tasks: 1,
        total_cleared: 5,
    }));
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(&backend).with_notifier(notifier.clone());

    poller.start();
    sleep(SETTLE).await;
    assert_eq!(backend.fetches(), 1);

    let report = poller.purge().await.unwrap();
    assert_eq!(report.total_cleared, 5);
    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert!(notices[0].message.contains('5'));

    sleep(SETTLE).await;
    assert_eq!(backend.fetches(), 2);

    sleep(Duration::from_millis(1000)).await;
    let times = backend.fetch_times();
    assert_eq!(times.len(), 3);
    assert_eq!(times[2] - times[1], Duration::from_millis(1000));

    // Idle again after the confirmation
    sleep(TICK * 5).await;
    assert_eq!(backend.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_purge_failure_notifies_without_refresh() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.set_purge_result(Err(rejected("Broker unreachable")));
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(&backend).with_notifier(notifier.clone());

    poller.start();
    sleep(SETTLE).await;

    assert!(poller.purge().await.is_err());
    sleep(TICK).await;

    assert_eq!(backend.purges(), 1);
    assert_eq!(backend.fetches(), 1);
    assert_eq!(
        notifier.errors(),
        vec!["Broker unreachable".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_purge_while_stopped_fetches_once() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.push_active(3);
    let poller = poller(&backend);

    poller.purge().await.unwrap();
    assert_eq!(backend.purges(), 1);
    assert_eq!(backend.fetches(), 1);
    let status = poller.status();
    assert!(status.snapshot.is_some());
    assert_eq!(status.phase, PollerPhase::Idle);
    assert!(!poller.is_running());

    // No confirmation fetch without a running driver
    sleep(TICK * 3).await;
    assert_eq!(backend.fetches(), 1);

    // Nothing left pending for the next start
    poller.start();
    sleep(SETTLE).await;
    assert_eq!(backend.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_keeps_single_timer() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.push_active(10);
    let poller = poller(&backend);

    poller.start();
    poller.start();
    sleep(SETTLE).await;
    sleep(TICK).await;

    assert_eq!(backend.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_timer() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.push_active(10);
    let poller = poller(&backend);

    poller.start();
    sleep(SETTLE).await;
    poller.stop();

    assert!(!poller.is_running());
    assert_eq!(poller.status().phase, PollerPhase::Idle);
    sleep(TICK * 3).await;
    assert_eq!(backend.fetches(), 1);
    // Snapshot survives the stop
    assert!(poller.status().snapshot.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_timer() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.push_active(10);

    {
        let poller = poller(&backend);
        poller.start();
        sleep(SETTLE).await;
    }
    sleep(TICK * 3).await;

    assert_eq!(backend.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_store_mutation_pokes_idle_poller() {
    let queue = Arc::new(MockQueueBackend::new());
    let poller = poller(&queue);
    let schedule = Arc::new(MockScheduleBackend::new());
    let folder_id = schedule.seed_folder("Dept Sites", true);
    let site_id = schedule.seed_site(folder_id, "Docs", true);
    let store = ScheduleConfigStore::new(schedule.clone())
        .with_refresh_signal(poller.refresh_signal());

    poller.start();
    store.load().await.unwrap();
    sleep(SETTLE).await;
    assert_eq!(queue.fetches(), 1);
    assert_eq!(poller.status().phase, PollerPhase::Idle);

    store.toggle_site(site_id).await.unwrap();
    sleep(SETTLE).await;
    assert_eq!(queue.fetches(), 2);

    store.execute_folder_now(folder_id).await.unwrap_err();
    sleep(SETTLE).await;
    // Rejected locally, no poke
    assert_eq!(queue.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_observe_snapshots() {
    let backend = Arc::new(MockQueueBackend::new());
    backend.push_active(1);
    let poller = poller(&backend);
    let mut status = poller.subscribe();

    poller.start();
    loop {
        status.changed().await.unwrap();
        let current = status.borrow_and_update().clone();
        if !current.loading {
            assert_eq!(current.phase, PollerPhase::Polling);
            assert_eq!(current.snapshot.unwrap().workers.online, 1);
            break;
        }
    }
}
