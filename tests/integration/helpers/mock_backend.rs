// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use crawlsync::domain::models::folder::{
    Folder, FolderPatch, FolderWithSites, NewFolder, NewSite, ScheduleType, Site, SitePatch,
};
use crawlsync::domain::models::queue::{CurrentActivity, PurgeReport, QueueSnapshot};
use crawlsync::domain::repositories::{ApiError, QueueRepository, ScheduleRepository};
use crawlsync::domain::services::ui_hooks::{
    Notice, NoticeLevel, Notifier, ViewportHook, ViewportPosition,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use uuid::Uuid;

/// 内存中的调度后端
///
/// 保存服务端真值，记录每种操作的调用次数，可以按操作挂起或注入失败
#[derive(Default)]
pub struct MockScheduleBackend {
    folders: Mutex<Vec<FolderWithSites>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    gates: Mutex<HashMap<&'static str, Arc<Semaphore>>>,
    failing_ops: Mutex<HashMap<&'static str, ApiError>>,
    failing_next: Mutex<HashMap<&'static str, ApiError>>,
    failing_sites: Mutex<HashSet<Uuid>>,
}

pub fn rejected(detail: &str) -> ApiError {
    ApiError::Rejected {
        status: 400,
        detail: detail.to_string(),
    }
}

impl MockScheduleBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在服务端添加一个每日调度的文件夹，返回其ID
    pub fn seed_folder(&self, name: &str, enabled: bool) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.folders.lock().unwrap().push(FolderWithSites {
            folder: Folder {
                id,
                name: name.to_string(),
                schedule_type: ScheduleType::Daily,
                schedule_time: NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
                schedule_day: None,
                max_depth: 2,
                enabled,
                created_at: now,
                updated_at: now,
            },
            sites: Vec::new(),
        });
        id
    }

    pub fn seed_site(&self, folder_id: Uuid, name: &str, enabled: bool) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut folders = self.folders.lock().unwrap();
        let folder = folders
            .iter_mut()
            .find(|f| f.folder.id == folder_id)
            .expect("seeded folder");
        folder.sites.push(Site {
            id,
            folder_id,
            name: name.to_string(),
            url: format!("https://{}.example.com", name.to_lowercase()),
            description: None,
            enabled,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// 服务端当前的站点状态
    pub fn server_site(&self, id: Uuid) -> Option<Site> {
        self.folders
            .lock()
            .unwrap()
            .iter()
            .flat_map(|f| f.sites.iter())
            .find(|s| s.id == id)
            .cloned()
    }

    /// 直接在服务端改名，不经过存储
    pub fn rename_folder(&self, id: Uuid, name: &str) {
        if let Some(entry) = self
            .folders
            .lock()
            .unwrap()
            .iter_mut()
            .find(|f| f.folder.id == id)
        {
            entry.folder.name = name.to_string();
        }
    }

    pub fn server_folders(&self) -> Vec<FolderWithSites> {
        self.folders.lock().unwrap().clone()
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    /// 让之后的 `op` 调用挂起，直到 `release` 或关闭返回的闸门
    pub fn hold(&self, op: &'static str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().insert(op, gate.clone());
        gate
    }

    /// 之后的 `op` 调用不再挂起，已挂起的调用继续等待原来的闸门
    pub fn open(&self, op: &'static str) {
        self.gates.lock().unwrap().remove(op);
    }

    pub fn release(&self, op: &'static str) {
        if let Some(gate) = self.gates.lock().unwrap().remove(op) {
            gate.close();
        }
    }

    pub fn fail(&self, op: &'static str, err: ApiError) {
        self.failing_ops.lock().unwrap().insert(op, err);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing_ops.lock().unwrap().remove(op);
    }

    /// 只让下一次 `op` 调用失败，失败在调用进入时决定
    pub fn fail_next(&self, op: &'static str, err: ApiError) {
        self.failing_next.lock().unwrap().insert(op, err);
    }

    /// 只让指定站点的更新失败
    pub fn fail_site(&self, id: Uuid) {
        self.failing_sites.lock().unwrap().insert(id);
    }

    /// 等待 `op` 至少被调用 `count` 次
    pub async fn wait_for_calls(&self, op: &str, count: usize) {
        while self.calls(op) < count {
            tokio::task::yield_now().await;
        }
    }

    async fn enter(&self, op: &'static str) -> Result<(), ApiError> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        let injected = self.failing_next.lock().unwrap().remove(op);
        let gate = self.gates.lock().unwrap().get(op).cloned();
        if let Some(gate) = gate {
            // Closed on release
            let _ = gate.acquire().await;
        }
        if let Some(err) = injected {
            return Err(err);
        }
        match self.failing_ops.lock().unwrap().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ScheduleRepository for MockScheduleBackend {
    async fn fetch_folders(&self) -> Result<Vec<FolderWithSites>, ApiError> {
        // Read before the gate so a held load returns stale data
        let snapshot = self.server_folders();
        self.enter("fetch_folders").await?;
        Ok(snapshot)
    }

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder, ApiError> {
        self.enter("create_folder").await?;
        let now = Utc::now();
        let created = Folder {
            id: Uuid::new_v4(),
            name: folder.name.clone(),
            schedule_type: folder.schedule_type,
            schedule_time: folder.schedule_time,
            schedule_day: folder.schedule_day,
            max_depth: folder.max_depth,
            enabled: folder.enabled,
            created_at: now,
            updated_at: now,
        };
        self.folders.lock().unwrap().push(FolderWithSites {
            folder: created.clone(),
            sites: Vec::new(),
        });
        Ok(created)
    }

    async fn update_folder(&self, id: Uuid, patch: &FolderPatch) -> Result<Folder, ApiError> {
        self.enter("update_folder").await?;
        let mut folders = self.folders.lock().unwrap();
        let entry = folders
            .iter_mut()
            .find(|f| f.folder.id == id)
            .ok_or_else(|| rejected("Folder not found"))?;
        let merged = patch
            .apply_to(&entry.folder)
            .map_err(|e| rejected(&e.to_string()))?;
        entry.folder = merged.clone();
        Ok(merged)
    }

    async fn delete_folder(&self, id: Uuid) -> Result<(), ApiError> {
        self.enter("delete_folder").await?;
        self.folders.lock().unwrap().retain(|f| f.folder.id != id);
        Ok(())
    }

    async fn create_site(&self, folder_id: Uuid, site: &NewSite) -> Result<Site, ApiError> {
        self.enter("create_site").await?;
        let now = Utc::now();
        let created = Site {
            id: Uuid::new_v4(),
            folder_id,
            name: site.name.clone(),
            url: site.url.clone(),
            description: site.description.clone(),
            enabled: site.enabled,
            created_at: now,
            updated_at: now,
        };
        let mut folders = self.folders.lock().unwrap();
        let folder = folders
            .iter_mut()
            .find(|f| f.folder.id == folder_id)
            .ok_or_else(|| rejected("Folder not found"))?;
        folder.sites.push(created.clone());
        Ok(created)
    }

    async fn update_site(&self, id: Uuid, patch: &SitePatch) -> Result<Site, ApiError> {
        self.enter("update_site").await?;
        if self.failing_sites.lock().unwrap().contains(&id) {
            return Err(ApiError::Transport("connection reset".to_string()));
        }
        let mut folders = self.folders.lock().unwrap();
        let site = folders
            .iter_mut()
            .flat_map(|f| f.sites.iter_mut())
            .find(|s| s.id == id)
            .ok_or_else(|| rejected("Site not found"))?;
        if let Some(enabled) = patch.enabled {
            site.enabled = enabled;
        }
        if let Some(name) = &patch.name {
            site.name = name.clone();
        }
        Ok(site.clone())
    }

    async fn delete_site(&self, id: Uuid) -> Result<(), ApiError> {
        self.enter("delete_site").await?;
        for folder in self.folders.lock().unwrap().iter_mut() {
            folder.sites.retain(|s| s.id != id);
        }
        Ok(())
    }

    async fn execute_folder(&self, id: Uuid) -> Result<String, ApiError> {
        self.enter("execute_folder").await?;
        Ok(format!("task-{}", id.simple()))
    }
}

/// 按脚本返回队列快照的后端
///
/// 脚本耗尽后一直返回空闲快照。记录每次拉取的时刻（tokio时钟）。
#[derive(Default)]
pub struct MockQueueBackend {
    script: Mutex<VecDeque<Result<QueueSnapshot, ApiError>>>,
    fetch_times: Mutex<Vec<Instant>>,
    purge_result: Mutex<Option<Result<PurgeReport, ApiError>>>,
    purges: AtomicUsize,
}

impl MockQueueBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: Result<QueueSnapshot, ApiError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn push_active(&self, count: usize) {
        for _ in 0..count {
            self.push(Ok(active_snapshot()));
        }
    }

    pub fn set_purge_result(&self, result: Result<PurgeReport, ApiError>) {
        *self.purge_result.lock().unwrap() = Some(result);
    }

    pub fn fetches(&self) -> usize {
        self.fetch_times.lock().unwrap().len()
    }

    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetch_times.lock().unwrap().clone()
    }

    pub fn purges(&self) -> usize {
        self.purges.load(Ordering::SeqCst)
    }
}

pub fn active_snapshot() -> QueueSnapshot {
    let mut snapshot = QueueSnapshot {
        current_activity: CurrentActivity {
            is_crawling: true,
            is_processing_embeddings: false,
            has_pending_work: true,
        },
        ..Default::default()
    };
    snapshot.queue_status.active_tasks = 1;
    snapshot.workers.online = 1;
    snapshot
}

#[async_trait]
impl QueueRepository for MockQueueBackend {
    async fn fetch_status(&self) -> Result<QueueSnapshot, ApiError> {
        self.fetch_times.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueueSnapshot::default()))
    }

    async fn purge(&self) -> Result<PurgeReport, ApiError> {
        self.purges.fetch_add(1, Ordering::SeqCst);
        self.purge_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(PurgeReport::default()))
    }
}

/// 记录所有通知的接收者
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.level == NoticeLevel::Error)
            .map(|n| n.message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// 模拟可滚动页面的视口
///
/// 每次捕获后页面内容“跳动”一段距离，只有恢复才能回到原位
pub struct ScrollViewport {
    offset: Mutex<f64>,
    pub captures: AtomicUsize,
    pub restores: AtomicUsize,
}

impl ScrollViewport {
    pub fn at(offset: f64) -> Self {
        Self {
            offset: Mutex::new(offset),
            captures: AtomicUsize::new(0),
            restores: AtomicUsize::new(0),
        }
    }

    pub fn offset(&self) -> f64 {
        *self.offset.lock().unwrap()
    }
}

impl ViewportHook for ScrollViewport {
    fn capture(&self) -> ViewportPosition {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let mut offset = self.offset.lock().unwrap();
        let position = ViewportPosition { offset: *offset };
        *offset += 48.0;
        position
    }

    fn restore(&self, position: ViewportPosition) {
        self.restores.fetch_add(1, Ordering::SeqCst);
        *self.offset.lock().unwrap() = position.offset;
    }
}

pub const TICK: Duration = Duration::from_millis(2000);
