// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含同步核心的业务逻辑，包括：
/// - 领域模型（models）：文件夹、站点和队列快照
/// - 仓库接口（repositories）：远程后端的抽象访问接口
/// - 服务（services）：调度配置存储、队列轮询、调度描述与任务分类
///
/// 领域层不依赖于具体的HTTP实现。
pub mod models;
pub mod repositories;
pub mod services;
