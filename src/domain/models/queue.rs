// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 队列计数
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueCounts {
    /// 正在执行的任务数
    pub active_tasks: u64,
    /// 已计划（ETA）的任务数
    pub scheduled_tasks: u64,
    /// 已预留但尚未执行的任务数
    pub reserved_tasks: u64,
    /// 待处理任务总数
    #[serde(default)]
    pub total_pending: u64,
}

/// 工作进程池信息
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerPool {
    #[serde(rename = "max-concurrency", default)]
    pub max_concurrency: Option<u64>,
    #[serde(default)]
    pub implementation: Option<String>,
}

impl WorkerPool {
    /// 池实现的简称，例如 `celery.concurrency.prefork:TaskPool` 取冒号后部分
    pub fn implementation_name(&self) -> &str {
        self.implementation
            .as_deref()
            .and_then(|raw| raw.split(':').nth(1))
            .unwrap_or("unknown")
    }
}

/// 单个工作进程详情
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerDetail {
    #[serde(default)]
    pub pid: Option<u64>,
    /// 运行时间（秒）
    #[serde(default)]
    pub uptime: Option<u64>,
    #[serde(default)]
    pub pool: Option<WorkerPool>,
}

/// 工作进程概况
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkersInfo {
    /// 在线工作进程数
    pub online: u64,
    #[serde(default)]
    pub details: BTreeMap<String, WorkerDetail>,
}

/// 队列中的任务记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    /// 所在工作进程
    pub worker: String,
    /// 任务ID
    pub task_id: String,
    /// 任务名称
    pub name: String,
    /// 位置参数
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    /// 开始时间（Unix秒）
    #[serde(default)]
    pub time_start: Option<f64>,
    #[serde(default)]
    pub worker_pid: Option<u64>,
}

impl TaskDetail {
    /// 任务ID的前12个字符
    pub fn short_id(&self) -> &str {
        match self.task_id.char_indices().nth(12) {
            Some((idx, _)) => &self.task_id[..idx],
            None => &self.task_id,
        }
    }

    /// 第一个位置参数，爬取和嵌入任务都把目标URL放在这里
    pub fn target_url(&self) -> Option<&str> {
        self.args.first().and_then(|arg| arg.as_str())
    }
}

/// 活动任务与预留任务列表
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskDetails {
    #[serde(default)]
    pub active: Vec<TaskDetail>,
    #[serde(default)]
    pub reserved: Vec<TaskDetail>,
}

/// 单个工作进程的处理统计
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_processed: u64,
    pub uptime_seconds: f64,
    pub tasks_per_minute: f64,
    pub tasks_per_hour: f64,
}

impl ProcessingStats {
    pub fn uptime_minutes(&self) -> u64 {
        (self.uptime_seconds / 60.0).floor() as u64
    }
}

/// 当前活动标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrentActivity {
    pub is_crawling: bool,
    pub is_processing_embeddings: bool,
    pub has_pending_work: bool,
}

impl CurrentActivity {
    /// 三个标志中任意一个为真即表示队列仍有工作
    pub fn is_active(&self) -> bool {
        self.has_pending_work || self.is_crawling || self.is_processing_embeddings
    }
}

/// 队列快照
///
/// 一次轮询产生的不可变视图，每次轮询整体替换上一份快照。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub queue_status: QueueCounts,
    pub workers: WorkersInfo,
    #[serde(default)]
    pub task_details: TaskDetails,
    /// 工作进程 -> 处理统计
    #[serde(default)]
    pub processing_stats: BTreeMap<String, ProcessingStats>,
    /// 工作进程 -> 任务名 -> 完成计数
    #[serde(default)]
    pub total_stats: BTreeMap<String, BTreeMap<String, u64>>,
    pub current_activity: CurrentActivity,
    #[serde(default)]
    pub timestamp: String,
}

impl QueueSnapshot {
    pub fn is_active(&self) -> bool {
        self.current_activity.is_active()
    }
}

/// 清空队列的结果
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PurgeReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "queued_purged")]
    pub purged_tasks: u64,
    #[serde(default, alias = "active_revoked")]
    pub revoked_tasks: u64,
    #[serde(default)]
    pub total_cleared: u64,
}

impl PurgeReport {
    /// 展示给操作员的确认信息，包含清除的任务数
    pub fn confirmation(&self) -> String {
        let message = if self.message.is_empty() {
            "Queue purged"
        } else {
            self.message.as_str()
        };
        format!("{} (cleared tasks: {})", message, self.total_cleared)
    }
}

/// 立即执行文件夹的响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub task_id: String,
}
