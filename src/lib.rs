// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理控制台的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含文件夹/站点实体、队列快照以及同步核心服务
pub mod domain;

/// 基础设施模块
///
/// 提供远程爬取后端的HTTP客户端实现
pub mod infrastructure;

/// 表示层模块
///
/// 将存储和轮询器的状态渲染为控制台输出
pub mod presentation;

/// 工具模块
///
/// 提供日志初始化和时间格式等通用辅助功能
pub mod utils;
