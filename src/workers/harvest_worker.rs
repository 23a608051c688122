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

use crate::config::Settings;
use crate::domain::models::Checkpoint;
use crate::infrastructure::checkpoint::CheckpointStore;
use crate::infrastructure::identity::{CredentialPool, EgressPool, NextEgress};
use crate::infrastructure::storage::HarvestStore;
use crate::queue::task_queue::TaskQueue;
use crate::session::crawl_session::{CrawlSession, SessionTuning};
use crate::session::driver::{DriverProvider, SessionIdentity};
use crate::session::faults::{classify, FaultKind, SessionFault};
use crate::session::intervention::InterventionGate;
use crate::session::markers::PageMarkers;
use crate::session::parser::ForumParser;
use crate::workers::HarvestError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// 运行统计
///
/// 一次工作器运行的计数汇总，随 `run()` 返回
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// 已领取任务数
    pub tasks_claimed: u64,
    /// 已完成任务数
    pub tasks_completed: u64,
    /// 已放弃任务数
    pub tasks_abandoned: u64,
    /// 已保存帖子数
    pub threads_saved: u64,
    /// 因输出已存在而跳过的帖子数
    pub threads_skipped: u64,
    /// 凭证轮换次数
    pub credentials_rotated: u64,
    /// 人工验证成功次数
    pub challenges_solved: u64,
    /// 人工验证超时次数
    pub challenges_timed_out: u64,
    /// 瞬时故障重试次数
    pub transient_retries: u64,
}

/// 单个任务的结局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// 页码区间全部采完，已登记完成
    Completed,
    /// 无法归类的故障，任务被放弃（不登记完成）
    Abandoned,
}

/// 一轮会话驱动的结局
enum DriveOutcome {
    /// 批次全部采完
    BatchDone,
    /// 需要弃用当前会话身份并重建；`cooldown` 指示是否牵连出口
    Rotate { cooldown: bool },
    /// 放弃当前任务
    Abandon,
}

/// 单个故障的恢复动作
enum Recovery {
    /// 原地重试同一单元
    RetryUnit,
    /// 轮换会话身份
    Rotate { cooldown: bool },
    /// 放弃当前任务
    Abandon,
}

/// 采集工作器
///
/// 端到端编排循环：领取任务 → 绑定会话 → 逐页列帖 → 逐帖采集 →
/// 每个单元后写断点 → 故障先分类再恢复 → 队列耗尽则正常退出。
/// 单进程单线程驱动；跨进程仅通过共享队列的原子出队协调。
pub struct HarvestWorker {
    settings: Arc<Settings>,
    queue: Arc<dyn TaskQueue>,
    store: Arc<dyn HarvestStore>,
    provider: Arc<dyn DriverProvider>,
    parser: Arc<dyn ForumParser>,
    gate: Arc<dyn InterventionGate>,
    checkpoints: CheckpointStore,
    credentials: CredentialPool,
    proxies: EgressPool,
    markers: PageMarkers,
    summary: RunSummary,
}

impl HarvestWorker {
    /// 创建采集工作器
    pub fn new(
        settings: Arc<Settings>,
        queue: Arc<dyn TaskQueue>,
        store: Arc<dyn HarvestStore>,
        provider: Arc<dyn DriverProvider>,
        parser: Arc<dyn ForumParser>,
        gate: Arc<dyn InterventionGate>,
    ) -> Self {
        let checkpoints = CheckpointStore::new(&settings.harvest.checkpoint_path);
        let credentials = CredentialPool::new(&settings.identity.credentials_path);
        let proxies = EgressPool::new(&settings.identity.proxies_path);
        let markers = PageMarkers::with_overrides(
            settings.forum.challenge_markers.clone(),
            settings.forum.expired_markers.clone(),
        );
        Self {
            settings,
            queue,
            store,
            provider,
            parser,
            gate,
            checkpoints,
            credentials,
            proxies,
            markers,
            summary: RunSummary::default(),
        }
    }

    /// 运行工作器直到队列耗尽或遇到致命错误
    ///
    /// # 返回值
    ///
    /// * `Ok(RunSummary)` - 队列已空，正常退出
    /// * `Err(HarvestError)` - 致命错误，带有任务/页/帖上下文的日志已写出
    pub async fn run(mut self) -> Result<RunSummary, HarvestError> {
        info!("harvest worker started");

        loop {
            let task = match self.queue.claim().await {
                Ok(Some(task)) => task,
                Ok(None) => {
                    info!("task queue drained, worker exiting");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "task claim failed, terminating");
                    return Err(e.into());
                }
            };

            self.queue.record_claimed(&task).await?;
            self.summary.tasks_claimed += 1;
            info!(task = %task, "task claimed");

            let targets = vec![task.target.clone()];
            let outcome = match self
                .run_batch(&targets, task.page_start, task.page_end)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(task = %task, error = %e, "fatal error during task, terminating");
                    return Err(e);
                }
            };

            match outcome {
                TaskOutcome::Completed => {
                    self.queue.record_completed(&task).await?;
                    self.summary.tasks_completed += 1;
                    info!(task = %task, "task completed and recorded");
                }
                TaskOutcome::Abandoned => {
                    self.summary.tasks_abandoned += 1;
                    warn!(task = %task, "task abandoned");
                }
            }
        }

        Ok(self.summary)
    }

    /// 处理一批目标版块的给定页码区间
    ///
    /// 存在持久化断点时从断点位置恢复：断点永远指向下一个待处理
    /// 单元，恢复最多重做一个在途单元，绝不跳过。批次干净完成后
    /// 断点被删除。
    pub async fn run_batch(
        &mut self,
        targets: &[String],
        page_start: u32,
        page_end: u32,
    ) -> Result<TaskOutcome, HarvestError> {
        let mut checkpoint = match self.checkpoints.load()? {
            Some(cp) => {
                info!(
                    target_index = cp.target_index,
                    page = cp.page,
                    thread_index = cp.thread_index,
                    "resuming from persisted checkpoint"
                );
                cp
            }
            None => Checkpoint::start_of(page_start),
        };

        loop {
            let session = self.acquire_session().await?;
            match self
                .drive(&session, targets, page_start, page_end, &mut checkpoint)
                .await?
            {
                DriveOutcome::BatchDone => {
                    self.checkpoints.clear()?;
                    return Ok(TaskOutcome::Completed);
                }
                DriveOutcome::Rotate { cooldown } => {
                    // Persist the in-flight unit so nothing is skipped on the new session
                    self.checkpoints.save(&checkpoint)?;
                    if cooldown {
                        match &session.identity().egress {
                            Some(egress) => {
                                let duration =
                                    Duration::from_secs(self.settings.identity.proxy_cooldown_secs);
                                self.proxies.cooldown(egress, duration);
                                self.proxies.advance();
                                warn!(
                                    egress,
                                    cooldown_secs = duration.as_secs(),
                                    "egress implicated in block event, cooling down"
                                );
                            }
                            None => {
                                warn!("block event without proxy, rotating credential only");
                            }
                        }
                    }
                    self.credentials.advance();
                    self.summary.credentials_rotated += 1;
                }
                DriveOutcome::Abandon => {
                    self.checkpoints.clear()?;
                    return Ok(TaskOutcome::Abandoned);
                }
            }
        }
    }

    /// 用一个会话尽可能推进批次
    ///
    /// 页码严格递增、页内帖子严格按列出顺序处理——乱序会让断点的
    /// `(page, thread_index)` 恢复契约失效。
    async fn drive(
        &mut self,
        session: &CrawlSession,
        targets: &[String],
        page_start: u32,
        page_end: u32,
        cp: &mut Checkpoint,
    ) -> Result<DriveOutcome, HarvestError> {
        while cp.target_index < targets.len() {
            let target = targets[cp.target_index].clone();

            while cp.page <= page_end {
                let mut transient = 0u32;
                let threads = loop {
                    match session.list_threads(&target, cp.page).await {
                        Ok(threads) => break threads,
                        Err(fault) => match self.recover(fault, &mut transient, cp).await? {
                            Recovery::RetryUnit => continue,
                            Recovery::Rotate { cooldown } => {
                                return Ok(DriveOutcome::Rotate { cooldown })
                            }
                            Recovery::Abandon => return Ok(DriveOutcome::Abandon),
                        },
                    }
                };
                // Page listed: one completed unit
                self.checkpoints.save(cp)?;

                while cp.thread_index < threads.len() {
                    let thread = &threads[cp.thread_index];

                    if self.store.exists(&target, &thread.title).await? {
                        info!(target = %target, title = %thread.title, "output exists, skipping");
                        self.summary.threads_skipped += 1;
                        cp.thread_index += 1;
                        self.checkpoints.save(cp)?;
                        continue;
                    }

                    let mut transient = 0u32;
                    let text = loop {
                        let max_posts = self.settings.harvest.max_posts_per_thread;
                        match session.fetch_thread(thread, max_posts).await {
                            Ok(text) => break text,
                            Err(fault) => match self.recover(fault, &mut transient, cp).await? {
                                Recovery::RetryUnit => continue,
                                Recovery::Rotate { cooldown } => {
                                    return Ok(DriveOutcome::Rotate { cooldown })
                                }
                                Recovery::Abandon => return Ok(DriveOutcome::Abandon),
                            },
                        }
                    };

                    self.store.save(&target, &thread.title, &text).await?;
                    info!(target = %target, title = %thread.title, "thread harvested");
                    self.summary.threads_saved += 1;
                    cp.thread_index += 1;
                    self.checkpoints.save(cp)?;
                }

                cp.page += 1;
                cp.thread_index = 0;
                if cp.page <= page_end {
                    self.checkpoints.save(cp)?;
                }
            }

            cp.target_index += 1;
            cp.page = page_start;
            cp.thread_index = 0;
            if cp.target_index < targets.len() {
                self.checkpoints.save(cp)?;
            }
        }

        Ok(DriveOutcome::BatchDone)
    }

    /// 对一个会话故障分类并决定恢复动作
    async fn recover(
        &mut self,
        fault: SessionFault,
        transient: &mut u32,
        cp: &Checkpoint,
    ) -> Result<Recovery, HarvestError> {
        match classify(&fault) {
            FaultKind::Transient => {
                *transient += 1;
                let max = self.settings.harvest.transient_retries;
                if *transient > max {
                    error!(
                        fault = %fault,
                        retries = max,
                        target_index = cp.target_index,
                        page = cp.page,
                        thread_index = cp.thread_index,
                        "transient retries exhausted, escalating to unclassified"
                    );
                    return Ok(Recovery::Abandon);
                }
                warn!(fault = %fault, attempt = *transient, "transient fault, retrying unit");
                self.summary.transient_retries += 1;
                tokio::time::sleep(self.settings.politeness.retry_delay()).await;
                Ok(Recovery::RetryUnit)
            }
            FaultKind::Challenge { url } => {
                warn!(%url, "challenge detected, opening intervention window");
                let window = Duration::from_secs(self.settings.challenge.solve_timeout_secs);
                // Race the operator signal against the deadline; the first
                // completion cancels the other wait
                match tokio::time::timeout(window, self.gate.wait_for_solve(&url)).await {
                    Ok(true) => {
                        info!("challenge solved, resuming with the same session");
                        self.summary.challenges_solved += 1;
                        Ok(Recovery::RetryUnit)
                    }
                    Ok(false) | Err(_) => {
                        warn!(
                            page = cp.page,
                            thread_index = cp.thread_index,
                            "intervention window elapsed, rotating session identity"
                        );
                        self.summary.challenges_timed_out += 1;
                        Ok(Recovery::Rotate { cooldown: true })
                    }
                }
            }
            FaultKind::Expired => {
                warn!("session expired, rotating credential");
                Ok(Recovery::Rotate { cooldown: false })
            }
            FaultKind::Unclassified => {
                error!(
                    fault = %fault,
                    target_index = cp.target_index,
                    page = cp.page,
                    thread_index = cp.thread_index,
                    "unclassified fault, abandoning current task"
                );
                Ok(Recovery::Abandon)
            }
        }
    }

    /// 绑定新的会话身份
    ///
    /// 出口选取可能阻塞：全部代理冷却时睡到最近的冷却到期再试，
    /// 等待轮数有上限。凭证耗尽进入限时补充等待循环，每轮重读
    /// 后备文件；超时则整个工作进程终止。
    async fn acquire_session(&mut self) -> Result<CrawlSession, HarvestError> {
        let egress = {
            let mut rounds = 0u32;
            loop {
                self.proxies.reload()?;
                match self.proxies.next_available() {
                    NextEgress::Entry(entry) => break Some(entry),
                    NextEgress::Direct => break None,
                    NextEgress::Blocked(wait) => {
                        rounds += 1;
                        if rounds > self.settings.identity.egress_block_rounds {
                            error!(rounds, "egress wait bound exceeded, terminating");
                            return Err(HarvestError::EgressExhausted);
                        }
                        warn!(
                            wait_secs = wait.as_secs(),
                            round = rounds,
                            "all egress identities cooling, waiting for soonest expiry"
                        );
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        };

        let credential = {
            let poll = Duration::from_secs(self.settings.identity.credential_poll_secs);
            let deadline =
                Instant::now() + Duration::from_secs(self.settings.identity.credential_wait_secs);
            loop {
                self.credentials.reload()?;
                if let Some(credential) = self.credentials.current() {
                    break credential.to_string();
                }
                if Instant::now() >= deadline {
                    error!("credential pool exhausted past replenishment window, terminating");
                    return Err(HarvestError::CredentialsExhausted);
                }
                info!("credential pool exhausted, waiting for operator replenishment");
                tokio::time::sleep(poll).await;
            }
        };

        let identity = SessionIdentity { credential, egress };
        info!(
            egress = identity.egress.as_deref().unwrap_or("direct"),
            credential_index = self.credentials.cursor(),
            "binding new session identity"
        );

        let driver = self.provider.open(&identity).await?;
        let tuning = SessionTuning {
            base_url: self.settings.forum.base_url.clone(),
            threads_per_page: self.settings.forum.threads_per_page,
            page_delay_ms: self.settings.politeness.page_delay(),
            thread_delay_ms: self.settings.politeness.thread_delay(),
        };
        Ok(CrawlSession::new(
            driver,
            identity,
            self.parser.clone(),
            self.markers.clone(),
            tuning,
        ))
    }
}
