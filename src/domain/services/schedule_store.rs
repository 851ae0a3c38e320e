// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::folder::{
    CollectionStats, DomainError, Folder, FolderPatch, FolderWithSites, NewFolder, NewSite, Site,
    SitePatch,
};
use crate::domain::repositories::{ApiError, ScheduleRepository};
use crate::domain::services::queue_poller::RefreshSignal;
use crate::domain::services::ui_hooks::{
    NoViewport, Notice, Notifier, TracingNotifier, ViewportHook,
};
use dashmap::DashMap;
use futures::future::join_all;
use icu_collator::options::{CollatorOptions, Strength};
use icu_collator::Collator;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const LOAD_FAILED: &str = "Failed to load folders";
const CREATE_FOLDER_FAILED: &str = "Failed to create folder";
const UPDATE_FOLDER_FAILED: &str = "Failed to update folder";
const DELETE_FOLDER_FAILED: &str = "Failed to delete folder";
const CREATE_SITE_FAILED: &str = "Failed to add site";
const DELETE_SITE_FAILED: &str = "Failed to delete site";
const TOGGLE_FOLDER_FAILED: &str = "Failed to change folder status";
const TOGGLE_SITE_FAILED: &str = "Failed to change site status";
const EXECUTE_FAILED: &str = "Failed to start crawl";
const NO_ENABLED_SITES: &str = "No enabled sites";

/// 存储层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 远程调用失败
    #[error(transparent)]
    Api(#[from] ApiError),
    /// 提交前的本地校验失败
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// 本地集合中没有该文件夹
    #[error("folder {0} not found")]
    FolderNotFound(Uuid),
    /// 本地集合中没有该站点
    #[error("site {0} not found")]
    SiteNotFound(Uuid),
    /// 文件夹中没有启用的站点
    #[error("no enabled sites")]
    NoEnabledSites,
}

impl StoreError {
    /// 面向操作员的信息
    ///
    /// 后端说明原样返回；传输失败使用给定的通用文本
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            StoreError::Api(err) => err.user_message(fallback),
            StoreError::Domain(err) => err.to_string(),
            StoreError::NoEnabledSites => NO_ENABLED_SITES.to_string(),
            other => format!("{}: {}", fallback, other),
        }
    }
}

/// 实体键，用于在途标记和乐观覆盖
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Folder(Uuid),
    Site(Uuid),
    /// 文件夹内全部站点的批量切换
    SitesOf(Uuid),
}

/// 切换操作的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// 已应用，值为新的启用状态
    Applied { enabled: bool },
    /// 同一实体的切换仍在进行中，本次请求被忽略
    Ignored,
}

/// 乐观覆盖
///
/// 记录切换开始和结束时的序号。加载只在切换结束之后开始时才信任服务端数据。
#[derive(Debug, Clone, Copy)]
struct Override {
    enabled: bool,
    started: u64,
    resolved: Option<u64>,
}

#[derive(Debug, Default)]
struct StoreState {
    folders: Vec<FolderWithSites>,
    loading: bool,
    error: Option<String>,
    overrides: HashMap<EntityKey, Override>,
    /// 最近一次被应用的加载的开始序号
    applied_load: u64,
    /// 最近一次开始的加载的序号
    latest_load: u64,
}

impl StoreState {
    fn folder_mut(&mut self, id: Uuid) -> Option<&mut FolderWithSites> {
        self.folders.iter_mut().find(|f| f.folder.id == id)
    }

    fn site_mut(&mut self, id: Uuid) -> Option<&mut Site> {
        self.folders
            .iter_mut()
            .flat_map(|f| f.sites.iter_mut())
            .find(|s| s.id == id)
    }

    fn set_enabled(&mut self, key: EntityKey, enabled: bool) -> Option<bool> {
        match key {
            EntityKey::Folder(id) => self.folder_mut(id).map(|f| {
                let previous = f.folder.enabled;
                f.folder.enabled = enabled;
                previous
            }),
            EntityKey::Site(id) => self.site_mut(id).map(|s| {
                let previous = s.enabled;
                s.enabled = enabled;
                previous
            }),
            EntityKey::SitesOf(_) => None,
        }
    }

    fn resolve(&mut self, key: EntityKey, started: u64, resolved: u64) {
        if let Some(entry) = self.overrides.get_mut(&key) {
            if entry.started == started {
                entry.resolved = Some(resolved);
            }
        }
    }

    /// 失败的切换回滚到切换前的值
    ///
    /// 只有记录仍属于这次切换时才恢复；已被后来的切换接管时保持现值。
    fn rollback(&mut self, key: EntityKey, started: u64, previous: bool) -> bool {
        if !self
            .overrides
            .get(&key)
            .is_some_and(|entry| entry.started == started)
        {
            return false;
        }
        self.overrides.remove(&key);
        self.set_enabled(key, previous);
        true
    }

    fn discard(&mut self, key: EntityKey, started: u64) {
        if self
            .overrides
            .get(&key)
            .is_some_and(|entry| entry.started == started)
        {
            self.overrides.remove(&key);
        }
    }
}

/// 在途标记，离开作用域时自动清除
struct InFlight<'a> {
    map: &'a DashMap<EntityKey, ()>,
    key: EntityKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

/// 按名称做区域感知排序，文件夹内的站点同样排序
fn sort_folders(folders: &mut [FolderWithSites]) {
    let mut options = CollatorOptions::default();
    options.strength = Some(Strength::Primary);

    match Collator::try_new(Default::default(), options) {
        Ok(collator) => {
            folders.sort_by(|a, b| collator.compare(&a.folder.name, &b.folder.name));
            for folder in folders.iter_mut() {
                folder.sites.sort_by(|a, b| collator.compare(&a.name, &b.name));
            }
        }
        Err(e) => {
            warn!("Collator unavailable, falling back to code point order: {}", e);
            folders.sort_by(|a, b| a.folder.name.cmp(&b.folder.name));
            for folder in folders.iter_mut() {
                folder.sites.sort_by(|a, b| a.name.cmp(&b.name));
            }
        }
    }
}

/// 调度配置存储
///
/// 文件夹/站点集合的唯一数据源。增删改在网络往返成功后整体重新加载；
/// 启用状态的切换是乐观的：先在本地翻转，失败时精确回滚。
///
/// 集合只在初次（及每次完整）加载时排序，之后的原地修改保持顺序不变。
pub struct ScheduleConfigStore<R: ScheduleRepository + 'static> {
    repository: Arc<R>,
    state: Mutex<StoreState>,
    in_flight: DashMap<EntityKey, ()>,
    sequence: AtomicU64,
    notifier: Arc<dyn Notifier>,
    viewport: Arc<dyn ViewportHook>,
    refresh: Option<RefreshSignal>,
}

impl<R: ScheduleRepository + 'static> ScheduleConfigStore<R> {
    /// 创建新的存储实例
    ///
    /// # 参数
    ///
    /// * `repository` - 远程调度仓库
    ///
    /// # 返回值
    ///
    /// 返回使用日志通知且没有视口的存储实例
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            state: Mutex::new(StoreState::default()),
            in_flight: DashMap::new(),
            sequence: AtomicU64::new(0),
            notifier: Arc::new(TracingNotifier),
            viewport: Arc::new(NoViewport),
            refresh: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_viewport(mut self, viewport: Arc<dyn ViewportHook>) -> Self {
        self.viewport = viewport;
        self
    }

    /// 成功的变更完成后触发队列轮询器的带外刷新
    pub fn with_refresh_signal(mut self, signal: RefreshSignal) -> Self {
        self.refresh = Some(signal);
        self
    }

    /// 当前集合的副本，顺序即显示顺序
    pub fn folders(&self) -> Vec<FolderWithSites> {
        self.state.lock().folders.clone()
    }

    pub fn folder(&self, id: Uuid) -> Option<FolderWithSites> {
        self.state
            .lock()
            .folders
            .iter()
            .find(|f| f.folder.id == id)
            .cloned()
    }

    pub fn site(&self, id: Uuid) -> Option<Site> {
        self.state
            .lock()
            .folders
            .iter()
            .flat_map(|f| f.sites.iter())
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn stats(&self) -> CollectionStats {
        CollectionStats::from_folders(&self.state.lock().folders)
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// 最近一次加载失败的信息，成功加载后清除
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn is_in_flight(&self, key: EntityKey) -> bool {
        self.in_flight.contains_key(&key)
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn begin(&self, key: EntityKey) -> Option<InFlight<'_>> {
        if self.in_flight.insert(key, ()).is_some() {
            return None;
        }
        Some(InFlight {
            map: &self.in_flight,
            key,
        })
    }

    /// 在视口捕获与恢复之间同步提交状态变更
    fn commit<T>(&self, apply: impl FnOnce(&mut StoreState) -> T) -> T {
        let position = self.viewport.capture();
        let result = {
            let mut state = self.state.lock();
            apply(&mut state)
        };
        self.viewport.restore(position);
        result
    }

    fn fail(&self, err: impl Into<StoreError>, fallback: &str) -> StoreError {
        let err = err.into();
        let message = err.user_message(fallback);
        match &err {
            StoreError::Api(ApiError::Rejected { .. }) | StoreError::Api(ApiError::Status(_)) => {
                warn!(error = %err, "{}", fallback)
            }
            StoreError::Api(_) => error!(error = %err, "{}", fallback),
            _ => warn!(error = %err, "{}", fallback),
        }
        self.notifier.notify(Notice::error(message));
        err
    }

    fn poke(&self) {
        if let Some(signal) = &self.refresh {
            signal.trigger();
        }
    }

    /// 从后端加载完整集合并替换本地状态
    ///
    /// 失败时记录错误并保留原有状态。对仍在途或在本次加载开始后才结束的
    /// 切换，保留其本地值，不被较早读取的服务端数据覆盖。
    pub async fn load(&self) -> Result<(), StoreError> {
        let started = self.next_sequence();
        {
            let mut state = self.state.lock();
            state.loading = true;
            state.latest_load = started;
            state.error = None;
        }
        debug!(sequence = started, "Loading folders");

        match self.repository.fetch_folders().await {
            Ok(mut folders) => {
                sort_folders(&mut folders);
                let applied = self.commit(|state| {
                    if started == state.latest_load {
                        state.loading = false;
                    }
                    if started < state.applied_load {
                        return false;
                    }
                    state
                        .overrides
                        .retain(|_, entry| !matches!(entry.resolved, Some(r) if r <= started));
                    state.folders = folders;
                    let overrides: Vec<(EntityKey, bool)> = state
                        .overrides
                        .iter()
                        .map(|(key, entry)| (*key, entry.enabled))
                        .collect();
                    for (key, enabled) in overrides {
                        state.set_enabled(key, enabled);
                    }
                    state.applied_load = started;
                    true
                });
                if applied {
                    info!(folders = self.state.lock().folders.len(), "Folders loaded");
                } else {
                    debug!(sequence = started, "Discarded stale folder load");
                }
                Ok(())
            }
            Err(err) => {
                {
                    let mut state = self.state.lock();
                    if started == state.latest_load {
                        state.loading = false;
                    }
                    state.error = Some(err.user_message(LOAD_FAILED));
                }
                Err(self.fail(err, LOAD_FAILED))
            }
        }
    }

    /// 成功变更后的收尾：重新加载并通知轮询器
    async fn reconcile(&self) {
        // Reload failures are reported by load itself
        let _ = self.load().await;
        self.poke();
    }

    pub async fn create_folder(&self, folder: NewFolder) -> Result<Folder, StoreError> {
        folder
            .check()
            .map_err(|e| self.fail(e, CREATE_FOLDER_FAILED))?;

        let created = self
            .repository
            .create_folder(&folder)
            .await
            .map_err(|e| self.fail(e, CREATE_FOLDER_FAILED))?;
        info!(folder_id = %created.id, name = %created.name, "Folder created");

        self.reconcile().await;
        Ok(created)
    }

    /// 部分更新文件夹
    ///
    /// 补丁先与本地副本合并并校验调度不变量，再发送到后端
    pub async fn update_folder(&self, id: Uuid, patch: FolderPatch) -> Result<Folder, StoreError> {
        let current = self
            .folder(id)
            .ok_or(StoreError::FolderNotFound(id))
            .map_err(|e| self.fail(e, UPDATE_FOLDER_FAILED))?;
        if patch.is_empty() {
            return Err(self.fail(
                DomainError::Validation("no fields to update".to_string()),
                UPDATE_FOLDER_FAILED,
            ));
        }
        patch
            .apply_to(&current.folder)
            .map_err(|e| self.fail(e, UPDATE_FOLDER_FAILED))?;

        let updated = self
            .repository
            .update_folder(id, &patch)
            .await
            .map_err(|e| self.fail(e, UPDATE_FOLDER_FAILED))?;
        info!(folder_id = %id, "Folder updated");

        self.reconcile().await;
        Ok(updated)
    }

    /// 删除文件夹，其站点由后端级联删除
    pub async fn delete_folder(&self, id: Uuid) -> Result<(), StoreError> {
        self.repository
            .delete_folder(id)
            .await
            .map_err(|e| self.fail(e, DELETE_FOLDER_FAILED))?;
        info!(folder_id = %id, "Folder deleted");

        self.reconcile().await;
        Ok(())
    }

    pub async fn create_site(&self, folder_id: Uuid, mut site: NewSite) -> Result<Site, StoreError> {
        site.folder_id = folder_id;
        site.check()
            .map_err(|e| self.fail(e, CREATE_SITE_FAILED))?;

        let created = self
            .repository
            .create_site(folder_id, &site)
            .await
            .map_err(|e| self.fail(e, CREATE_SITE_FAILED))?;
        info!(folder_id = %folder_id, site_id = %created.id, "Site created");

        self.reconcile().await;
        Ok(created)
    }

    pub async fn delete_site(&self, id: Uuid) -> Result<(), StoreError> {
        self.repository
            .delete_site(id)
            .await
            .map_err(|e| self.fail(e, DELETE_SITE_FAILED))?;
        info!(site_id = %id, "Site deleted");

        self.reconcile().await;
        Ok(())
    }

    /// 乐观切换文件夹的启用状态
    pub async fn toggle_folder(&self, id: Uuid) -> Result<ToggleOutcome, StoreError> {
        self.toggle(EntityKey::Folder(id), TOGGLE_FOLDER_FAILED).await
    }

    /// 乐观切换站点的启用状态
    pub async fn toggle_site(&self, id: Uuid) -> Result<ToggleOutcome, StoreError> {
        self.toggle(EntityKey::Site(id), TOGGLE_SITE_FAILED).await
    }

    async fn toggle(&self, key: EntityKey, fallback: &str) -> Result<ToggleOutcome, StoreError> {
        let Some(_guard) = self.begin(key) else {
            debug!(?key, "Toggle already in flight, ignoring");
            return Ok(ToggleOutcome::Ignored);
        };

        let started = self.next_sequence();
        let previous = self.commit(|state| {
            let previous = match key {
                EntityKey::Folder(id) => state.folder_mut(id).map(|f| f.folder.enabled),
                EntityKey::Site(id) => state.site_mut(id).map(|s| s.enabled),
                EntityKey::SitesOf(_) => None,
            }?;
            state.set_enabled(key, !previous);
            state.overrides.insert(
                key,
                Override {
                    enabled: !previous,
                    started,
                    resolved: None,
                },
            );
            Some(previous)
        });
        let previous = match (previous, key) {
            (Some(previous), _) => previous,
            (None, EntityKey::Site(id)) => {
                return Err(self.fail(StoreError::SiteNotFound(id), fallback))
            }
            (None, EntityKey::Folder(id) | EntityKey::SitesOf(id)) => {
                return Err(self.fail(StoreError::FolderNotFound(id), fallback))
            }
        };
        let target = !previous;

        let result = match key {
            EntityKey::Folder(id) => self
                .repository
                .update_folder(id, &FolderPatch::enabled(target))
                .await
                .map(|_| ()),
            EntityKey::Site(id) => self
                .repository
                .update_site(id, &SitePatch::enabled(target))
                .await
                .map(|_| ()),
            EntityKey::SitesOf(_) => Ok(()),
        };

        match result {
            Ok(()) => {
                let resolved = self.next_sequence();
                self.state.lock().resolve(key, started, resolved);
                debug!(?key, enabled = target, "Toggle confirmed");
                self.poke();
                Ok(ToggleOutcome::Applied { enabled: target })
            }
            Err(err) => {
                if self.commit(|state| state.rollback(key, started, previous)) {
                    warn!(?key, "Toggle failed, rolled back to {}", previous);
                } else {
                    warn!(?key, "Toggle failed, value owned by a later toggle");
                }
                Err(self.fail(err, fallback))
            }
        }
    }

    /// 批量切换文件夹内全部站点
    ///
    /// 若并非全部启用则全部启用，否则全部停用。所有站点补丁并发发送；
    /// 任意一个失败时放弃乐观结果并完整重新加载，不做逐项回滚。
    pub async fn toggle_all_sites_in_folder(
        &self,
        folder_id: Uuid,
    ) -> Result<ToggleOutcome, StoreError> {
        let Some(_guard) = self.begin(EntityKey::SitesOf(folder_id)) else {
            debug!(%folder_id, "Bulk toggle already in flight, ignoring");
            return Ok(ToggleOutcome::Ignored);
        };

        let started = self.next_sequence();
        let planned = self.commit(|state| {
            let folder = state.folder_mut(folder_id)?;
            let target = !folder.all_sites_enabled();
            let site_ids: Vec<Uuid> = folder
                .sites
                .iter_mut()
                .map(|site| {
                    site.enabled = target;
                    site.id
                })
                .collect();
            for id in &site_ids {
                state.overrides.insert(
                    EntityKey::Site(*id),
                    Override {
                        enabled: target,
                        started,
                        resolved: None,
                    },
                );
            }
            Some((target, site_ids))
        });
        let Some((target, site_ids)) = planned else {
            return Err(self.fail(StoreError::FolderNotFound(folder_id), TOGGLE_SITE_FAILED));
        };

        let patch = SitePatch::enabled(target);
        let results = join_all(
            site_ids
                .iter()
                .map(|id| self.repository.update_site(*id, &patch)),
        )
        .await;

        if let Some(err) = results.into_iter().find_map(Result::err) {
            {
                let mut state = self.state.lock();
                for id in &site_ids {
                    state.discard(EntityKey::Site(*id), started);
                }
            }
            warn!(%folder_id, "Bulk site toggle failed, reloading");
            let _ = self.load().await;
            return Err(self.fail(err, TOGGLE_SITE_FAILED));
        }

        let resolved = self.next_sequence();
        {
            let mut state = self.state.lock();
            for id in &site_ids {
                state.resolve(EntityKey::Site(*id), started, resolved);
            }
        }
        info!(%folder_id, sites = site_ids.len(), enabled = target, "Bulk site toggle confirmed");
        self.poke();
        Ok(ToggleOutcome::Applied { enabled: target })
    }

    /// 立即爬取文件夹中已启用的站点
    ///
    /// # 返回值
    ///
    /// * `Ok(String)` - 后端返回的任务ID
    /// * `Err(StoreError::NoEnabledSites)` - 没有启用的站点，不发起网络请求
    pub async fn execute_folder_now(&self, folder_id: Uuid) -> Result<String, StoreError> {
        let folder = self
            .folder(folder_id)
            .ok_or(StoreError::FolderNotFound(folder_id))
            .map_err(|e| self.fail(e, EXECUTE_FAILED))?;
        let enabled_sites = folder.enabled_site_count();
        if enabled_sites == 0 {
            return Err(self.fail(StoreError::NoEnabledSites, EXECUTE_FAILED));
        }

        let task_id = self
            .repository
            .execute_folder(folder_id)
            .await
            .map_err(|e| self.fail(e, EXECUTE_FAILED))?;
        info!(%folder_id, %task_id, enabled_sites, "Folder crawl started");
        self.notifier.notify(Notice::info(format!(
            "Crawl started for {} site(s): {}",
            enabled_sites, task_id
        )));

        self.poke();
        Ok(task_id)
    }
}

#[cfg(test)]
#[path = "schedule_store_test.rs"]
mod tests;
