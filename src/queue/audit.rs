// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// 审计日志
///
/// 两个只追加的本地文件：已领取与已完成。多小时无人值守运行的
/// 唯一审计痕迹就是这两个文件加上运行日志。重复行无害，
/// 写入对重复是幂等的。
#[derive(Debug, Clone)]
pub struct AuditLog {
    claimed_path: PathBuf,
    done_path: PathBuf,
}

impl AuditLog {
    /// 创建审计日志实例
    pub fn new(claimed_path: impl Into<PathBuf>, done_path: impl Into<PathBuf>) -> Self {
        Self {
            claimed_path: claimed_path.into(),
            done_path: done_path.into(),
        }
    }

    /// 登记一条已领取任务
    pub async fn record_claimed(&self, line: &str) -> io::Result<()> {
        Self::append(&self.claimed_path, line).await
    }

    /// 登记一条已完成任务
    pub async fn record_completed(&self, line: &str) -> io::Result<()> {
        Self::append(&self.done_path, line).await
    }

    async fn append(path: &Path, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}
