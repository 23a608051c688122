// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::ThreadRef;
use crate::session::driver::{PageDriver, SessionIdentity};
use crate::session::faults::SessionFault;
use crate::session::markers::PageMarkers;
use crate::session::parser::ForumParser;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 会话抓取参数
#[derive(Debug, Clone)]
pub struct SessionTuning {
    /// 论坛根URL
    pub base_url: String,
    /// 每个列表页的帖子数（翻页偏移步长）
    pub threads_per_page: u32,
    /// 列表页延迟区间（毫秒）
    pub page_delay_ms: (u64, u64),
    /// 帖子页延迟区间（毫秒）
    pub thread_delay_ms: (u64, u64),
}

/// 采集会话
///
/// 绑定到一个 `(凭证, 出口)` 身份与一个页面驱动。对外只暴露两个
/// 抓取操作；故障以返回值形式上抛给编排器分类处理。
///
/// 每次抓取前和翻页之间都观察一次随机化的礼貌延迟——这是设计
/// 要求而非优化：固定间隔的请求节奏本身就是可检测的特征。
pub struct CrawlSession {
    driver: Box<dyn PageDriver>,
    identity: SessionIdentity,
    parser: Arc<dyn ForumParser>,
    markers: PageMarkers,
    tuning: SessionTuning,
}

impl CrawlSession {
    /// 创建采集会话
    pub fn new(
        driver: Box<dyn PageDriver>,
        identity: SessionIdentity,
        parser: Arc<dyn ForumParser>,
        markers: PageMarkers,
        tuning: SessionTuning,
    ) -> Self {
        Self {
            driver,
            identity,
            parser,
            markers,
            tuning,
        }
    }

    /// 当前绑定的会话身份
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// 列出目标版块某一页的帖子
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<ThreadRef>)` - 按页面顺序排列的帖子引用
    /// * `Err(SessionFault)` - 验证拦截、凭证失效或临时空页
    pub async fn list_threads(
        &self,
        target: &str,
        page: u32,
    ) -> Result<Vec<ThreadRef>, SessionFault> {
        let offset = page.saturating_sub(1) * self.tuning.threads_per_page;
        let url = format!(
            "{}/f?kw={}&pn={}",
            self.tuning.base_url,
            urlencoding::encode(target),
            offset
        );

        self.pause(self.tuning.page_delay_ms).await;
        let html = self.driver.navigate(&url).await?;
        self.inspect(&html, &url)?;

        let threads = self.parser.thread_list(&html, &self.tuning.base_url);
        debug!(target, page, count = threads.len(), "listed threads");
        if threads.is_empty() {
            return Err(SessionFault::EmptyPage { url });
        }
        Ok(threads)
    }

    /// 抓取一个帖子的全部楼层文本
    ///
    /// 内部沿 `?pn=N` 翻页，直到帖子的自然末尾或 `max_posts` 硬上限
    /// （防止病态长帖带来无界工作量）。
    pub async fn fetch_thread(
        &self,
        thread: &ThreadRef,
        max_posts: usize,
    ) -> Result<String, SessionFault> {
        let mut collected: Vec<String> = Vec::new();
        let mut pn = 1u32;

        loop {
            let url = format!("{}?pn={}", thread.url, pn);
            self.pause(self.tuning.thread_delay_ms).await;
            let html = self.driver.navigate(&url).await?;
            self.inspect(&html, &url)?;

            let posts = self.parser.posts(&html);
            if posts.is_empty() {
                if pn == 1 {
                    return Err(SessionFault::EmptyPage { url });
                }
                break;
            }

            for post in posts {
                collected.push(post);
                if collected.len() >= max_posts {
                    debug!(title = %thread.title, max_posts, "post cap reached");
                    return Ok(collected.join("\n"));
                }
            }

            if self.parser.has_next_page(&html) {
                pn += 1;
            } else {
                break;
            }
        }

        Ok(collected.join("\n"))
    }

    /// 标记检查：失效优先于验证，与目标站点的页面表现一致
    fn inspect(&self, html: &str, url: &str) -> Result<(), SessionFault> {
        if self.markers.looks_like_expired(html) {
            return Err(SessionFault::SessionExpired);
        }
        if self.markers.looks_like_challenge(html) {
            return Err(SessionFault::ChallengeDetected {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    async fn pause(&self, (lo, hi): (u64, u64)) {
        let ms = if hi > lo {
            rand::random_range(lo..=hi)
        } else {
            lo
        };
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}
