// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了控制台同步核心的数据结构，包括：
/// - 文件夹与站点（folder）：共享调度周期的爬取目标集合
/// - 队列快照（queue）：远程任务队列在某一时刻的视图
pub mod folder;
pub mod queue;
