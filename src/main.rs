// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crawlsync::config::settings::Settings;
use crawlsync::domain::services::queue_poller::{PollerConfig, QueueStatusPoller};
use crawlsync::domain::services::schedule_store::ScheduleConfigStore;
use crawlsync::infrastructure::api_client::HttpApiClient;
use crawlsync::presentation::console::{self, ConsoleNotifier};
use crawlsync::utils::telemetry;
use std::sync::Arc;
use tracing::{info, warn};

/// 主函数
///
/// 加载配置，创建后端客户端、调度存储和队列轮询器，
/// 在每次队列状态变化时重新渲染，直到收到 Ctrl-C
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting crawlsync...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!(base_url = %settings.api.base_url, "Configuration loaded");

    // 3. Backend client shared by store and poller
    let client = Arc::new(HttpApiClient::new(
        &settings.api.base_url,
        settings.api.request_timeout(),
    )?);
    let notifier = Arc::new(ConsoleNotifier);

    let poller = QueueStatusPoller::new(client.clone(), PollerConfig::from(&settings.poller))
        .with_notifier(notifier.clone());
    let store = ScheduleConfigStore::new(client)
        .with_notifier(notifier)
        .with_refresh_signal(poller.refresh_signal());

    // 4. Initial folder load; failures are reported and the console keeps running
    if let Err(e) = store.load().await {
        warn!("Initial folder load failed: {}", e);
    }
    println!("{}", console::render_folders(&store.folders(), store.stats()));

    // 5. Queue monitor
    let mut status = poller.subscribe();
    poller.start();

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                if !current.loading {
                    println!("{}", console::render_queue(&current));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    poller.stop();
    info!("crawlsync stopped");
    Ok(())
}
