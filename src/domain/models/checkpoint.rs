// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 断点
///
/// 一个工作进程最小的可恢复位置，每完成一个单元后覆盖写入。
/// 不变式：`page` 和 `thread_index` 永远指向下一个待处理的单元，
/// 而不是已完成的单元——恢复时最多重做一个在途单元，绝不跳过。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// 批次内目标版块的下标
    pub target_index: usize,
    /// 下一个待处理的页码
    pub page: u32,
    /// 页内下一个待处理的帖子下标
    pub thread_index: usize,
}

impl Checkpoint {
    /// 批次起点
    pub fn start_of(page_start: u32) -> Self {
        Self {
            target_index: 0,
            page: page_start,
            thread_index: 0,
        }
    }
}
