// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::BTreeMap;
use std::fmt;

/// 爬取任务名
pub const CRAWL_TASK: &str = "crawl_website";
/// 智能嵌入任务名（检测内容变化后替换已有数据）
pub const SMART_EMBEDDING_TASK: &str = "process_url_for_embedding_smart";
/// 普通嵌入任务名（不做去重检查）
pub const PLAIN_EMBEDDING_TASK: &str = "process_url_for_embedding";

/// 任务分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// 爬取：分析页面结构并收集链接
    Crawl,
    /// 智能嵌入
    SmartEmbedding,
    /// 普通嵌入
    PlainEmbedding,
    /// 无法识别
    Unknown,
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Crawl => "Crawl",
            TaskKind::SmartEmbedding => "Smart embedding",
            TaskKind::PlainEmbedding => "Embedding",
            TaskKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 将原始任务名映射到任务分类
///
/// 先匹配已知的短名称，再按子串匹配带模块前缀的全名
/// （例如 `tasks.crawler.crawl_website`）。
pub fn classify(task_name: &str) -> TaskKind {
    let short = task_name.rsplit('.').next().unwrap_or(task_name);
    match short {
        CRAWL_TASK => return TaskKind::Crawl,
        SMART_EMBEDDING_TASK => return TaskKind::SmartEmbedding,
        PLAIN_EMBEDDING_TASK => return TaskKind::PlainEmbedding,
        _ => {}
    }

    let lowered = short.to_ascii_lowercase();
    if lowered.contains("crawl") {
        TaskKind::Crawl
    } else if lowered.contains("embedding") && lowered.contains("smart") {
        TaskKind::SmartEmbedding
    } else if lowered.contains("embedding") {
        TaskKind::PlainEmbedding
    } else {
        TaskKind::Unknown
    }
}

/// 任务的显示名称，未识别的任务使用原始名称
pub fn display_name(task_name: &str) -> &str {
    match classify(task_name) {
        TaskKind::Unknown => task_name,
        kind => kind.label(),
    }
}

/// 对所有工作进程累加某个统计键，缺失视为0
pub fn sum_stat(stats: &BTreeMap<String, BTreeMap<String, u64>>, key: &str) -> u64 {
    stats
        .values()
        .map(|worker| worker.get(key).copied().unwrap_or(0))
        .sum()
}

/// 按任务分类汇总的完成计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskTotals {
    pub crawl: u64,
    pub smart_embedding: u64,
    pub plain_embedding: u64,
    pub unknown: u64,
}

impl TaskTotals {
    /// 从 `工作进程 -> 任务名 -> 计数` 映射汇总
    pub fn from_stats(stats: &BTreeMap<String, BTreeMap<String, u64>>) -> Self {
        let mut totals = Self::default();
        for (task_name, count) in stats.values().flat_map(|worker| worker.iter()) {
            match classify(task_name) {
                TaskKind::Crawl => totals.crawl += count,
                TaskKind::SmartEmbedding => totals.smart_embedding += count,
                TaskKind::PlainEmbedding => totals.plain_embedding += count,
                TaskKind::Unknown => totals.unknown += count,
            }
        }
        totals
    }

    pub fn get(&self, kind: TaskKind) -> u64 {
        match kind {
            TaskKind::Crawl => self.crawl,
            TaskKind::SmartEmbedding => self.smart_embedding,
            TaskKind::PlainEmbedding => self.plain_embedding,
            TaskKind::Unknown => self.unknown,
        }
    }
}

#[cfg(test)]
#[path = "task_classifier_test.rs"]
mod tests;
