// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理控制台的配置设置，包括后端地址和轮询参数
pub mod settings;
