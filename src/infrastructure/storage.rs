// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 采集结果存储特质
///
/// 以 `(目标版块, 帖子标题)` 为键保存采集文本。
/// 键的存在性就是恢复时跳过重复采集的幂等检查。
#[async_trait]
pub trait HarvestStore: Send + Sync {
    /// 判断该键下是否已有输出
    async fn exists(&self, target: &str, title: &str) -> Result<bool, StorageError>;

    /// 保存采集文本
    async fn save(&self, target: &str, title: &str, text: &str) -> Result<(), StorageError>;
}

/// 本地文件系统存储
///
/// 输出布局：`<root>/<目标>/<标题>.txt`，目录名和文件名经过字符净化
pub struct FsHarvestStore {
    root: PathBuf,
}

impl FsHarvestStore {
    /// 创建本地存储实例
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, target: &str, title: &str) -> PathBuf {
        self.root
            .join(safe_filename(target))
            .join(format!("{}.txt", safe_filename(title)))
    }
}

#[async_trait]
impl HarvestStore for FsHarvestStore {
    async fn exists(&self, target: &str, title: &str) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.path_for(target, title)).await?)
    }

    async fn save(&self, target: &str, title: &str, text: &str) -> Result<(), StorageError> {
        let path = self.path_for(target, title);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, text).await?;
        Ok(())
    }
}

/// 将标题净化为安全的文件名
///
/// 替换 Windows 与 Unix 下均非法的路径字符
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}
