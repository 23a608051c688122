// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::Checkpoint;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 断点存储错误类型
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint io error: {0}")]
    Io(#[from] io::Error),

    #[error("Checkpoint serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// 断点存储
///
/// 每个工作进程持有一份持久化的恢复位置，单个JSON对象原地覆盖写入。
/// 每完成一个工作单元（一个帖子采集完、一个列表页列完）就写一次——
/// 粒度刻意取细，崩溃最多丢一个在途单元，绝不丢整页或整个目标。
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// 创建断点存储实例
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 覆盖写入断点
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(checkpoint)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// 读取断点
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Checkpoint))` - 存在持久化断点
    /// * `Ok(None)` - 无断点，从任务起点开始
    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 删除断点（批次干净完成时调用）
    pub fn clear(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
