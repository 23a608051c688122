// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use harvestrs::config::settings::Settings;
use harvestrs::domain::models::HarvestTask;
use harvestrs::queue::audit::AuditLog;
use harvestrs::queue::task_queue::{RedisTaskQueue, TaskQueue};
use harvestrs::utils::telemetry;
use std::sync::Arc;
use tracing::{info, warn};

/// 任务导入工具
///
/// 把任务文件（每行一个JSON对象）整批导入共享任务队列。
/// 先清空队列键再导入，避免残留任务与新批次混在一起。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry();

    let path = std::env::args().nth(1).unwrap_or_else(|| "tasks.txt".to_string());
    let settings = Arc::new(Settings::new()?);

    let audit = AuditLog::new(&settings.queue.claimed_log, &settings.queue.done_log);
    let queue = RedisTaskQueue::new(&settings.queue.redis_url, &settings.queue.tasks_key, audit)?;

    let content = tokio::fs::read_to_string(&path).await?;
    queue.clear().await?;
    info!(key = %settings.queue.tasks_key, "queue cleared");

    let mut seeded = 0usize;
    for (no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match HarvestTask::parse_line(line) {
            Ok(task) => {
                queue.enqueue(&task).await?;
                seeded += 1;
            }
            Err(e) => {
                warn!(line_no = no + 1, error = %e, "skipping malformed task line");
            }
        }
    }

    let len = queue.len().await?;
    info!(seeded, queue_len = len, file = %path, "task seeding finished");
    Ok(())
}
