// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::identity::credential_pool::read_entry_lines;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// 出口身份选取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextEgress {
    /// 可用的出口代理
    Entry(String),
    /// 未配置代理，直连
    Direct,
    /// 所有代理都在冷却中；携带距最近一个冷却到期的剩余时间
    Blocked(Duration),
}

/// 出口身份池
///
/// 有序的网络出口代理集合（每行一条），游标轮转前进。
/// 被牵连进风控事件的代理进入限时冷却；冷却到期表保存在内存中，
/// 不做持久化。所有代理同时冷却是系统里唯一与出口身份挂钩的
/// 阻塞背压点。
#[derive(Debug)]
pub struct EgressPool {
    path: PathBuf,
    entries: Vec<String>,
    cursor: usize,
    cooldowns: HashMap<String, Instant>,
}

impl EgressPool {
    /// 创建出口池（首次使用前需 `reload`）
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            cursor: 0,
            cooldowns: HashMap::new(),
        }
    }

    /// 重读后备文件（文件不存在视为空列表即直连模式）
    pub fn reload(&mut self) -> io::Result<()> {
        self.entries = read_entry_lines(&self.path)?;
        Ok(())
    }

    /// 当前出口
    pub fn current(&self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = self.cursor % self.entries.len();
        self.entries.get(idx).map(String::as_str)
    }

    /// 游标前进一位（轮转，列表为空时幂等）
    pub fn advance(&mut self) {
        self.cursor = self.cursor.wrapping_add(1);
    }

    /// 是否无可用出口（未配置任何代理）
    pub fn is_exhausted(&self) -> bool {
        self.entries.is_empty()
    }

    /// 将某个出口放入冷却
    pub fn cooldown(&mut self, entry: &str, duration: Duration) {
        self.cooldowns
            .insert(entry.to_string(), Instant::now() + duration);
    }

    /// 选取下一个可用出口
    ///
    /// 从游标位置起跳过仍在冷却中的条目；仅当全部条目都在冷却时
    /// 返回 `Blocked`，调用方应等待其中最短的剩余冷却后重试。
    pub fn next_available(&mut self) -> NextEgress {
        self.next_available_at(Instant::now())
    }

    fn next_available_at(&mut self, now: Instant) -> NextEgress {
        if self.entries.is_empty() {
            return NextEgress::Direct;
        }
        let len = self.entries.len();
        for offset in 0..len {
            let idx = (self.cursor + offset) % len;
            let entry = &self.entries[idx];
            let cooling = self
                .cooldowns
                .get(entry)
                .is_some_and(|expiry| *expiry > now);
            if !cooling {
                self.cursor += offset;
                return NextEgress::Entry(entry.clone());
            }
        }
        // Every entry is cooling; wait for the soonest expiry
        let soonest = self
            .cooldowns
            .values()
            .filter(|expiry| **expiry > now)
            .map(|expiry| *expiry - now)
            .min()
            .unwrap_or(Duration::ZERO);
        NextEgress::Blocked(soonest)
    }
}
