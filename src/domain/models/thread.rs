// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 帖子引用
///
/// 列表页上按顺序出现的一个讨论帖。页内顺序是断点恢复契约的一部分。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    /// 帖子标题（与目标版块共同构成输出的幂等键）
    pub title: String,
    /// 帖子首页的绝对URL
    pub url: String,
}
