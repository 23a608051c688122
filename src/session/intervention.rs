// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// 人工介入门特质
///
/// 验证拦截时编排器打开一个限时介入窗口：
/// 本等待与截止定时器并发竞速，先完成者取消另一方。
#[async_trait]
pub trait InterventionGate: Send + Sync {
    /// 等待操作员完成验证
    ///
    /// # 返回值
    ///
    /// * `true` - 验证已解决，可用原会话继续
    /// * `false` - 无法等到解决信号（如输入通道关闭）
    async fn wait_for_solve(&self, url: &str) -> bool;
}

/// 标准输入介入门
///
/// 提示操作员在浏览器里手动完成验证后回车确认
pub struct StdinGate;

#[async_trait]
impl InterventionGate for StdinGate {
    async fn wait_for_solve(&self, url: &str) -> bool {
        info!(%url, "challenge detected; solve it manually in a browser, then press Enter");
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(n) if n > 0 => true,
            // EOF or error: no operator attached
            _ => false,
        }
    }
}
