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

use harvestrs::config::settings::Settings;
use harvestrs::infrastructure::storage::FsHarvestStore;
use harvestrs::queue::audit::AuditLog;
use harvestrs::queue::task_queue::RedisTaskQueue;
use harvestrs::session::driver::HttpDriverProvider;
use harvestrs::session::intervention::StdinGate;
use harvestrs::session::parser::TiebaParser;
use harvestrs::utils::telemetry;
use harvestrs::workers::HarvestWorker;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 主函数
///
/// 工作进程入口点：初始化组件并驱动采集循环直到队列耗尽
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting harvestrs worker...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Connect to the shared task queue
    let audit = AuditLog::new(&settings.queue.claimed_log, &settings.queue.done_log);
    let queue = Arc::new(RedisTaskQueue::new(
        &settings.queue.redis_url,
        &settings.queue.tasks_key,
        audit,
    )?);
    info!(key = %settings.queue.tasks_key, "Task queue connected");

    // 4. Initialize result storage
    let store = Arc::new(FsHarvestStore::new(&settings.harvest.output_dir));

    // 5. Initialize the session driver and forum parser
    let provider = Arc::new(HttpDriverProvider::new(
        settings.forum.user_agent.clone(),
        Duration::from_secs(settings.forum.navigate_timeout_secs),
    ));
    let parser = Arc::new(TiebaParser);

    // 6. Run the worker until the queue drains
    let worker = HarvestWorker::new(
        settings,
        queue,
        store,
        provider,
        parser,
        Arc::new(StdinGate),
    );
    let summary = worker.run().await?;

    info!(
        tasks_completed = summary.tasks_completed,
        tasks_abandoned = summary.tasks_abandoned,
        threads_saved = summary.threads_saved,
        threads_skipped = summary.threads_skipped,
        credentials_rotated = summary.credentials_rotated,
        "Worker finished"
    );

    Ok(())
}
