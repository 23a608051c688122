// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 采集任务
///
/// 表示共享队列中一个待采集的工作单元：某个目标版块的一段页码区间。
/// 任务一经领取即不可变；其规范化序列化形式就是任务身份，
/// 审计日志按该形式逐行登记。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestTask {
    /// 目标版块名
    pub target: String,
    /// 起始页码（含）
    pub page_start: u32,
    /// 结束页码（含）
    pub page_end: u32,
}

impl HarvestTask {
    /// 创建一个新的采集任务
    pub fn new(target: impl Into<String>, page_start: u32, page_end: u32) -> Self {
        Self {
            target: target.into(),
            page_start,
            page_end,
        }
    }

    /// 任务的规范化序列化形式
    ///
    /// 队列线格式：每行一个JSON对象，UTF-8编码。
    /// 审计日志按此行匹配任务身份。
    pub fn canonical_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// 从队列线格式解析任务
    pub fn parse_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

impl fmt::Display for HarvestTask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} p{}-{}", self.target, self.page_start, self.page_end)
    }
}
