// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 调度配置存储（schedule_store）：文件夹/站点集合、乐观切换与回滚
/// - 队列状态轮询器（queue_poller）：自适应轮询、外部刷新、清空队列
/// - 重复规则描述（recurrence）：把调度配置渲染为可读文本
/// - 任务分类（task_classifier）：把任务名归类为爬取或嵌入
/// - 界面接缝（ui_hooks）：通知和视口钩子
pub mod queue_poller;
pub mod recurrence;
pub mod schedule_store;
pub mod task_classifier;
pub mod ui_hooks;
