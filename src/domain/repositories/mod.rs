// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了远程爬取后端的抽象访问接口，遵循依赖倒置原则。
/// 具体实现由基础设施层的HTTP客户端提供，测试中可替换为内存实现。
///
/// 包含的仓库接口：
/// - 调度仓库（schedule_repository）：文件夹与站点的增删改查及立即执行
/// - 队列仓库（queue_repository）：队列快照获取与清空
pub mod api_error;
pub mod queue_repository;
pub mod schedule_repository;

pub use api_error::ApiError;
pub use queue_repository::QueueRepository;
pub use schedule_repository::ScheduleRepository;
