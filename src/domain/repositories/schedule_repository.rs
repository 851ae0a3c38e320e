// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::api_error::ApiError;
use crate::domain::models::folder::{
    Folder, FolderPatch, FolderWithSites, NewFolder, NewSite, Site, SitePatch,
};
use async_trait::async_trait;
use uuid::Uuid;

/// 调度配置仓库特质
///
/// 定义文件夹与站点的远程访问接口。所有部分更新在资源层面都是幂等的。
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// 获取全部文件夹及其站点
    async fn fetch_folders(&self) -> Result<Vec<FolderWithSites>, ApiError>;

    /// 创建文件夹
    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder, ApiError>;

    /// 部分更新文件夹
    async fn update_folder(&self, id: Uuid, patch: &FolderPatch) -> Result<Folder, ApiError>;

    /// 删除文件夹，级联删除其下所有站点
    async fn delete_folder(&self, id: Uuid) -> Result<(), ApiError>;

    /// 在文件夹下创建站点
    async fn create_site(&self, folder_id: Uuid, site: &NewSite) -> Result<Site, ApiError>;

    /// 部分更新站点
    async fn update_site(&self, id: Uuid, patch: &SitePatch) -> Result<Site, ApiError>;

    /// 删除站点
    async fn delete_site(&self, id: Uuid) -> Result<(), ApiError>;

    /// 立即爬取文件夹中已启用的站点
    ///
    /// # 返回值
    ///
    /// * `Ok(String)` - 后端分配的任务ID
    /// * `Err(ApiError)` - 请求失败
    async fn execute_folder(&self, id: Uuid) -> Result<String, ApiError>;
}
