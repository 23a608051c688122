// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod harvest_worker;

pub use harvest_worker::{HarvestWorker, RunSummary, TaskOutcome};

use crate::infrastructure::checkpoint::CheckpointError;
use crate::infrastructure::storage::StorageError;
use crate::queue::task_queue::QueueError;
use crate::session::driver::DriverError;
use thiserror::Error;

/// 工作器错误类型
///
/// 只有这些错误能穿透恢复状态机终止进程；所有可恢复的故障类别
/// 都在编排器内部消化，绝不上抛。
#[derive(Error, Debug)]
pub enum HarvestError {
    /// 队列存储不可达（致命）
    #[error("Task queue error: {0}")]
    Queue(#[from] QueueError),

    /// 凭证池耗尽且补充等待超时（致命）
    #[error("Credential pool exhausted past replenishment window")]
    CredentialsExhausted,

    /// 全部出口冷却且超过等待轮数上限（致命）
    #[error("All egress identities cooling past configured bound")]
    EgressExhausted,

    /// 断点存储错误
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// 采集结果存储错误
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// 会话驱动无法建立
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 身份列表文件读取失败
    #[error("Identity list error: {0}")]
    Identity(#[from] std::io::Error),
}
