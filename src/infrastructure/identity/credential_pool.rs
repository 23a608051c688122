// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::io;
use std::path::PathBuf;

/// 凭证池
///
/// 从外部纯文本文件加载的有序会话凭证集合（每行一条Cookie串），
/// 每次工作进程运行持有一个单调前进的游标。凭证列表允许运维
/// 在进程运行期间向文件追加新条目，因此每次耗尽检查前都重读磁盘。
///
/// 不变式：游标绝不回退。被判定失效或验证未解的凭证永久弃用。
#[derive(Debug)]
pub struct CredentialPool {
    path: PathBuf,
    entries: Vec<String>,
    cursor: usize,
}

impl CredentialPool {
    /// 创建凭证池（首次使用前需 `reload`）
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            cursor: 0,
        }
    }

    /// 重读后备文件
    ///
    /// 文件不存在视为空列表。游标保持不变：
    /// 运维追加的新条目出现在游标之后即可被继续消费。
    pub fn reload(&mut self) -> io::Result<()> {
        self.entries = read_entry_lines(&self.path)?;
        Ok(())
    }

    /// 当前凭证
    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// 游标前进一位（已越过末尾时幂等）
    pub fn advance(&mut self) {
        self.cursor = self.cursor.saturating_add(1);
    }

    /// 是否已耗尽
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.entries.len()
    }

    /// 当前游标位置
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// 读取每行一条的身份列表文件，忽略空行
pub(crate) fn read_entry_lines(path: &std::path::Path) -> io::Result<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
