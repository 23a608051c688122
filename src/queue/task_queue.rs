// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::HarvestTask;
use crate::queue::audit::AuditLog;
use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::debug;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 队列存储不可达——对当前工作进程是致命错误，绝不当作队列耗尽处理
    #[error("Queue store unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),

    /// 审计日志写入失败
    #[error("Audit log error: {0}")]
    Audit(#[from] std::io::Error),

    /// 队列中的任务行无法解析
    #[error("Malformed task line: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// 任务队列特质
///
/// 多生产者多消费者的共享FIFO之上的领取/登记协议。
/// 队列对工作进程是只出不进的：任何任务都不会被推回。
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// 原子领取队头任务
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(HarvestTask))` - 成功领取的任务
    /// * `Ok(None)` - 队列已空，全局工作耗尽（不是错误）
    /// * `Err(QueueError)` - 领取失败
    async fn claim(&self) -> Result<Option<HarvestTask>, QueueError>;

    /// 入队任务
    async fn enqueue(&self, task: &HarvestTask) -> Result<(), QueueError>;

    /// 登记已领取任务到审计日志
    async fn record_claimed(&self, task: &HarvestTask) -> Result<(), QueueError>;

    /// 登记已完成任务到审计日志
    async fn record_completed(&self, task: &HarvestTask) -> Result<(), QueueError>;
}

/// Redis任务队列实现
///
/// 用列表键上的 `LPOP` 实现原子领取：出队对所有工作进程立即可见，
/// 同一个任务绝不会被发给两个工作进程。
pub struct RedisTaskQueue {
    client: redis::Client,
    tasks_key: String,
    audit: AuditLog,
}

impl RedisTaskQueue {
    /// 创建新的Redis任务队列实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    /// * `tasks_key` - 任务列表键
    /// * `audit` - 审计日志
    pub fn new(redis_url: &str, tasks_key: &str, audit: AuditLog) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            tasks_key: tasks_key.to_string(),
            audit,
        })
    }

    /// 清空任务队列（用于重新导入任务）
    pub async fn clear(&self) -> Result<(), QueueError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.del::<_, ()>(&self.tasks_key).await?;
        Ok(())
    }

    /// 当前队列长度
    pub async fn len(&self) -> Result<usize, QueueError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let len: usize = con.llen(&self.tasks_key).await?;
        Ok(len)
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn claim(&self) -> Result<Option<HarvestTask>, QueueError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let line: Option<String> = con.lpop(&self.tasks_key, None).await?;
        match line {
            Some(line) => {
                debug!(%line, "popped task line");
                Ok(Some(HarvestTask::parse_line(&line)?))
            }
            None => Ok(None),
        }
    }

    async fn enqueue(&self, task: &HarvestTask) -> Result<(), QueueError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.rpush::<_, _, ()>(&self.tasks_key, task.canonical_line())
            .await?;
        Ok(())
    }

    async fn record_claimed(&self, task: &HarvestTask) -> Result<(), QueueError> {
        self.audit.record_claimed(&task.canonical_line()).await?;
        Ok(())
    }

    async fn record_completed(&self, task: &HarvestTask) -> Result<(), QueueError> {
        self.audit.record_completed(&task.canonical_line()).await?;
        Ok(())
    }
}
