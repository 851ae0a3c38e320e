// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::time_of_day;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// 默认最大爬取深度
pub const DEFAULT_MAX_DEPTH: u8 = 2;

fn default_max_depth() -> u8 {
    DEFAULT_MAX_DEPTH
}

/// 调度类型枚举
///
/// 决定文件夹内站点的重复爬取周期。只有 `Weekly` 需要指定星期几。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    /// 每天
    #[default]
    Daily,
    /// 每周
    Weekly,
    /// 每月（固定为1号）
    Monthly,
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScheduleType::Daily => write!(f, "daily"),
            ScheduleType::Weekly => write!(f, "weekly"),
            ScheduleType::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for ScheduleType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(ScheduleType::Daily),
            "weekly" => Ok(ScheduleType::Weekly),
            "monthly" => Ok(ScheduleType::Monthly),
            other => Err(DomainError::Validation(format!(
                "unknown schedule type '{}'",
                other
            ))),
        }
    }
}

/// 领域错误类型
///
/// 表示在提交到后端之前即可发现的输入或不变量错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 每周调度缺少星期几
    #[error("schedule_day is required for weekly schedule")]
    MissingScheduleDay,
    /// 非每周调度却设置了星期几
    #[error("schedule_day should only be set for weekly schedule, not {0}")]
    UnexpectedScheduleDay(ScheduleType),
    /// 星期几超出 0-6 范围
    #[error("schedule_day must be between 0 and 6, got {0}")]
    InvalidScheduleDay(u8),
    /// 无法解析的时刻
    #[error("invalid schedule time '{0}'")]
    InvalidTime(String),
    /// 字段校验失败
    #[error("validation error: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::Validation(errors.to_string())
    }
}

/// 校验调度类型与星期几的组合
///
/// 当且仅当调度类型为 `Weekly` 时必须设置 `schedule_day`
pub fn check_schedule(schedule_type: ScheduleType, day: Option<u8>) -> Result<(), DomainError> {
    match (schedule_type, day) {
        (ScheduleType::Weekly, None) => Err(DomainError::MissingScheduleDay),
        (ScheduleType::Weekly, Some(day)) if day > 6 => Err(DomainError::InvalidScheduleDay(day)),
        (ScheduleType::Weekly, Some(_)) => Ok(()),
        (other, Some(_)) => Err(DomainError::UnexpectedScheduleDay(other)),
        (_, None) => Ok(()),
    }
}

fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::new("http_url")),
    }
}

/// 爬取文件夹实体
///
/// 一组共享同一调度周期的爬取目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// 文件夹唯一标识符
    pub id: Uuid,
    /// 文件夹名称
    pub name: String,
    /// 调度类型
    pub schedule_type: ScheduleType,
    /// 调度时刻，秒级精度
    #[serde(with = "time_of_day::wire")]
    pub schedule_time: NaiveTime,
    /// 星期几（0=周日），仅每周调度设置
    pub schedule_day: Option<u8>,
    /// 最大爬取深度
    #[serde(default = "default_max_depth")]
    pub max_depth: u8,
    /// 是否启用
    pub enabled: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// 校验该文件夹的调度不变量
    pub fn validate_schedule(&self) -> Result<(), DomainError> {
        check_schedule(self.schedule_type, self.schedule_day)
    }
}

/// 爬取站点实体
///
/// 单个爬取目标，独占地归属于一个文件夹
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// 站点唯一标识符
    pub id: Uuid,
    /// 所属文件夹ID
    pub folder_id: Uuid,
    /// 站点名称
    pub name: String,
    /// 站点URL
    pub url: String,
    /// 站点描述
    #[serde(default)]
    pub description: Option<String>,
    /// 是否启用
    pub enabled: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 带站点列表的文件夹，对应一次完整加载的返回项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderWithSites {
    #[serde(flatten)]
    pub folder: Folder,
    #[serde(default)]
    pub sites: Vec<Site>,
}

impl FolderWithSites {
    pub fn enabled_site_count(&self) -> usize {
        self.sites.iter().filter(|site| site.enabled).count()
    }

    /// 所有站点是否均已启用，空文件夹视为全部启用
    pub fn all_sites_enabled(&self) -> bool {
        self.sites.iter().all(|site| site.enabled)
    }

    pub fn site(&self, site_id: Uuid) -> Option<&Site> {
        self.sites.iter().find(|site| site.id == site_id)
    }
}

/// 文件夹集合的统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollectionStats {
    /// 已启用的文件夹数量
    pub enabled_folders: usize,
    /// 文件夹总数
    pub total_folders: usize,
}

impl CollectionStats {
    pub fn from_folders(folders: &[FolderWithSites]) -> Self {
        Self {
            enabled_folders: folders.iter().filter(|f| f.folder.enabled).count(),
            total_folders: folders.len(),
        }
    }
}

/// 创建文件夹请求
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct NewFolder {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub schedule_type: ScheduleType,
    #[serde(with = "time_of_day::wire")]
    pub schedule_time: NaiveTime,
    #[validate(range(min = 0, max = 6))]
    pub schedule_day: Option<u8>,
    #[validate(range(min = 1, max = 5))]
    pub max_depth: u8,
    pub enabled: bool,
}

impl NewFolder {
    /// 创建一个新的文件夹请求，使用默认深度并默认启用
    ///
    /// # 参数
    ///
    /// * `name` - 文件夹名称
    /// * `schedule_type` - 调度类型
    /// * `schedule_time` - 调度时刻
    /// * `schedule_day` - 星期几，仅每周调度需要
    ///
    /// # 返回值
    ///
    /// * `Ok(NewFolder)` - 满足所有约束的请求
    /// * `Err(DomainError)` - 字段或调度不变量校验失败
    pub fn new(
        name: impl Into<String>,
        schedule_type: ScheduleType,
        schedule_time: NaiveTime,
        schedule_day: Option<u8>,
    ) -> Result<Self, DomainError> {
        let folder = Self {
            name: name.into(),
            schedule_type,
            schedule_time,
            schedule_day,
            max_depth: DEFAULT_MAX_DEPTH,
            enabled: true,
        };
        folder.check()?;
        Ok(folder)
    }

    pub fn with_max_depth(mut self, max_depth: u8) -> Result<Self, DomainError> {
        self.max_depth = max_depth;
        self.check()?;
        Ok(self)
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// 执行字段校验和调度不变量校验
    pub fn check(&self) -> Result<(), DomainError> {
        self.validate()?;
        check_schedule(self.schedule_type, self.schedule_day)
    }
}

/// 文件夹部分更新请求
///
/// `schedule_day` 使用双层 `Option`：外层 `None` 表示不修改，
/// `Some(None)` 表示显式清空。
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FolderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_type: Option<ScheduleType>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "time_of_day::wire::option"
    )]
    pub schedule_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_day: Option<Option<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl FolderPatch {
    /// 只修改启用状态的补丁
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    /// 同时替换调度的三个字段
    pub fn schedule(schedule_type: ScheduleType, time: NaiveTime, day: Option<u8>) -> Self {
        Self {
            schedule_type: Some(schedule_type),
            schedule_time: Some(time),
            schedule_day: Some(day),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 将补丁合并到当前文件夹，返回合并后的结果
    ///
    /// 合并后的文件夹必须仍满足名称、深度和调度不变量
    pub fn apply_to(&self, folder: &Folder) -> Result<Folder, DomainError> {
        let mut merged = folder.clone();
        if let Some(name) = &self.name {
            if name.is_empty() || name.chars().count() > 100 {
                return Err(DomainError::Validation(
                    "name must be 1-100 characters".to_string(),
                ));
            }
            merged.name = name.clone();
        }
        if let Some(schedule_type) = self.schedule_type {
            merged.schedule_type = schedule_type;
        }
        if let Some(time) = self.schedule_time {
            merged.schedule_time = time;
        }
        if let Some(day) = self.schedule_day {
            merged.schedule_day = day;
        }
        if let Some(max_depth) = self.max_depth {
            if !(1..=5).contains(&max_depth) {
                return Err(DomainError::Validation(format!(
                    "max_depth must be between 1 and 5, got {}",
                    max_depth
                )));
            }
            merged.max_depth = max_depth;
        }
        if let Some(enabled) = self.enabled {
            merged.enabled = enabled;
        }
        merged.validate_schedule()?;
        Ok(merged)
    }
}

/// 创建站点请求
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct NewSite {
    pub folder_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom(function = "validate_http_url"))]
    pub url: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub enabled: bool,
}

impl NewSite {
    /// 创建一个默认启用的站点请求
    pub fn new(
        folder_id: Uuid,
        name: impl Into<String>,
        url: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, DomainError> {
        let site = Self {
            folder_id,
            name: name.into(),
            url: url.into(),
            description: description.filter(|d| !d.trim().is_empty()),
            enabled: true,
        };
        site.check()?;
        Ok(site)
    }

    pub fn check(&self) -> Result<(), DomainError> {
        self.validate()?;
        Ok(())
    }
}

/// 站点部分更新请求
#[derive(Debug, Clone, PartialEq, Default, Serialize, Validate)]
pub struct SitePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_http_url"))]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl SitePatch {
    /// 只修改启用状态的补丁
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }
}

/// 文件夹表单草稿
///
/// 操作员只输入到分钟 (`HH:MM`)；提交时转换为秒级精度。
#[derive(Debug, Clone, PartialEq)]
pub struct FolderDraft {
    pub name: String,
    pub schedule_type: ScheduleType,
    pub schedule_time: String,
    pub schedule_day: Option<u8>,
    pub max_depth: u8,
    pub enabled: bool,
}

impl Default for FolderDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            schedule_type: ScheduleType::Daily,
            schedule_time: "02:00".to_string(),
            schedule_day: None,
            max_depth: DEFAULT_MAX_DEPTH,
            enabled: true,
        }
    }
}

impl FolderDraft {
    /// 从已有文件夹预填表单，秒被截断
    pub fn from_folder(folder: &Folder) -> Self {
        Self {
            name: folder.name.clone(),
            schedule_type: folder.schedule_type,
            schedule_time: time_of_day::to_display(&folder.schedule_time),
            schedule_day: folder.schedule_day,
            max_depth: folder.max_depth,
            enabled: folder.enabled,
        }
    }

    fn parsed_time(&self) -> Result<NaiveTime, DomainError> {
        time_of_day::parse(&self.schedule_time)
            .map_err(|_| DomainError::InvalidTime(self.schedule_time.clone()))
    }

    pub fn to_new_folder(&self) -> Result<NewFolder, DomainError> {
        let folder = NewFolder {
            name: self.name.trim().to_string(),
            schedule_type: self.schedule_type,
            schedule_time: self.parsed_time()?,
            schedule_day: self.schedule_day,
            max_depth: self.max_depth,
            enabled: self.enabled,
        };
        folder.check()?;
        Ok(folder)
    }

    /// 转换为显式包含全部字段的更新补丁
    pub fn to_patch(&self) -> Result<FolderPatch, DomainError> {
        let time = self.parsed_time()?;
        check_schedule(self.schedule_type, self.schedule_day)?;
        Ok(FolderPatch {
            name: Some(self.name.trim().to_string()),
            schedule_type: Some(self.schedule_type),
            schedule_time: Some(time),
            schedule_day: Some(self.schedule_day),
            max_depth: Some(self.max_depth),
            enabled: Some(self.enabled),
        })
    }
}

#[cfg(test)]
#[path = "folder_test.rs"]
mod tests;
