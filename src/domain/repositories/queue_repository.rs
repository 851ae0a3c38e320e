// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::api_error::ApiError;
use crate::domain::models::queue::{PurgeReport, QueueSnapshot};
use async_trait::async_trait;

/// 任务队列仓库特质
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// 获取队列快照
    async fn fetch_status(&self) -> Result<QueueSnapshot, ApiError>;

    /// 清空队列并撤销正在执行的任务
    async fn purge(&self) -> Result<PurgeReport, ApiError>;
}
