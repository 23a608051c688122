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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含队列、采集、身份池、礼貌延迟和人工验证等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 共享任务队列配置
    pub queue: QueueSettings,
    /// 采集配置
    pub harvest: HarvestSettings,
    /// 身份池配置（凭证与出口代理）
    pub identity: IdentitySettings,
    /// 礼貌延迟配置
    pub politeness: PolitenessSettings,
    /// 人工验证窗口配置
    pub challenge: ChallengeSettings,
    /// 目标论坛配置
    pub forum: ForumSettings,
}

/// 共享任务队列配置
#[derive(Debug, Deserialize)]
pub struct QueueSettings {
    /// Redis连接URL
    pub redis_url: String,
    /// 任务队列的列表键
    pub tasks_key: String,
    /// 已领取任务审计日志路径
    pub claimed_log: String,
    /// 已完成任务审计日志路径
    pub done_log: String,
}

/// 采集配置
#[derive(Debug, Deserialize)]
pub struct HarvestSettings {
    /// 断点文件路径
    pub checkpoint_path: String,
    /// 采集结果输出目录
    pub output_dir: String,
    /// 单个帖子的楼层上限
    pub max_posts_per_thread: usize,
    /// 同一单元的瞬时故障重试上限
    pub transient_retries: u32,
}

/// 身份池配置
#[derive(Debug, Deserialize)]
pub struct IdentitySettings {
    /// 凭证列表文件路径（每行一条）
    pub credentials_path: String,
    /// 出口代理列表文件路径（每行一条，可为空文件）
    pub proxies_path: String,
    /// 被风控后代理的冷却时间（秒）
    pub proxy_cooldown_secs: u64,
    /// 凭证耗尽后等待人工补充的总时限（秒）
    pub credential_wait_secs: u64,
    /// 凭证补充检查的轮询间隔（秒）
    pub credential_poll_secs: u64,
    /// 全部代理冷却时的最大等待轮数
    pub egress_block_rounds: u32,
}

/// 礼貌延迟配置
///
/// 固定间隔的请求节奏本身就是可检测的特征，
/// 所有延迟都从有界随机区间中抽取
#[derive(Debug, Deserialize)]
pub struct PolitenessSettings {
    /// 列表页抓取延迟下限（毫秒）
    pub page_delay_min_ms: u64,
    /// 列表页抓取延迟上限（毫秒）
    pub page_delay_max_ms: u64,
    /// 帖子抓取延迟下限（毫秒）
    pub thread_delay_min_ms: u64,
    /// 帖子抓取延迟上限（毫秒）
    pub thread_delay_max_ms: u64,
    /// 瞬时故障重试前的等待时间（秒）
    pub retry_delay_secs: u64,
}

/// 人工验证窗口配置
#[derive(Debug, Deserialize)]
pub struct ChallengeSettings {
    /// 等待人工完成验证的时限（秒）
    pub solve_timeout_secs: u64,
}

/// 目标论坛配置
#[derive(Debug, Deserialize)]
pub struct ForumSettings {
    /// 论坛根URL
    pub base_url: String,
    /// 每个列表页的帖子数（用于翻页偏移）
    pub threads_per_page: u32,
    /// 请求使用的浏览器User-Agent
    pub user_agent: String,
    /// 单次页面导航超时（秒）
    pub navigate_timeout_secs: u64,
    /// 覆盖默认的验证页标记关键词
    pub challenge_markers: Option<Vec<String>>,
    /// 覆盖默认的登录失效标记关键词
    pub expired_markers: Option<Vec<String>>,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Default queue settings
            .set_default("queue.redis_url", "redis://127.0.0.1:6379/0")?
            .set_default("queue.tasks_key", "harvest_tasks")?
            .set_default("queue.claimed_log", "tasks_inprogress.txt")?
            .set_default("queue.done_log", "tasks_done.txt")?
            // Default harvest settings
            .set_default("harvest.checkpoint_path", "resume_info.json")?
            .set_default("harvest.output_dir", "output")?
            .set_default("harvest.max_posts_per_thread", 200)?
            .set_default("harvest.transient_retries", 3)?
            // Default identity settings
            .set_default("identity.credentials_path", "cookies.txt")?
            .set_default("identity.proxies_path", "proxies.txt")?
            .set_default("identity.proxy_cooldown_secs", 600)?
            .set_default("identity.credential_wait_secs", 1200)?
            .set_default("identity.credential_poll_secs", 1)?
            .set_default("identity.egress_block_rounds", 10)?
            // Default politeness settings
            .set_default("politeness.page_delay_min_ms", 5000)?
            .set_default("politeness.page_delay_max_ms", 10000)?
            .set_default("politeness.thread_delay_min_ms", 3000)?
            .set_default("politeness.thread_delay_max_ms", 8000)?
            .set_default("politeness.retry_delay_secs", 30)?
            // Default challenge settings
            .set_default("challenge.solve_timeout_secs", 300)?
            // Default forum settings
            .set_default("forum.base_url", "https://tieba.baidu.com")?
            .set_default("forum.threads_per_page", 50)?
            .set_default(
                "forum.user_agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36 Edg/141.0.0.0",
            )?
            .set_default("forum.navigate_timeout_secs", 60)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("HARVESTRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}

impl PolitenessSettings {
    /// 列表页延迟区间（毫秒）
    pub fn page_delay(&self) -> (u64, u64) {
        (self.page_delay_min_ms, self.page_delay_max_ms)
    }

    /// 帖子延迟区间（毫秒）
    pub fn thread_delay(&self) -> (u64, u64) {
        (self.thread_delay_min_ms, self.thread_delay_max_ms)
    }

    /// 瞬时故障重试延迟
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
