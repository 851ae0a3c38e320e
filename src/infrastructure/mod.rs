// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 提供领域仓库接口的具体实现。
///
/// 包含的子模块：
/// - API客户端（api_client）：基于reqwest的后端HTTP客户端，
///   同时实现调度仓库和队列仓库
pub mod api_client;
