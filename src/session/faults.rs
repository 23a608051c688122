// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::session::driver::DriverError;
use thiserror::Error;

/// 会话故障
///
/// 抓取操作以返回值而非panic的方式上抛的故障。
/// 编排器对每个故障先分类再决定恢复动作。
#[derive(Error, Debug)]
pub enum SessionFault {
    /// 当前会话被人机验证拦截
    #[error("Challenge interstitial at {url}")]
    ChallengeDetected { url: String },

    /// 绑定的凭证已不再通过认证
    #[error("Session credential no longer authenticates")]
    SessionExpired,

    /// 页面解析结果为空（临时性空响应）
    #[error("Empty page source at {url}")]
    EmptyPage { url: String },

    /// 驱动层错误
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// 故障类别
///
/// 固定的故障分类法，是选出正确恢复动作所需的最小划分：
/// 混同这些类别要么在瞬时抖动上浪费凭证，要么对着永久封锁的
/// 会话无限重试。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// 人机验证：限时人工介入，或轮换会话
    Challenge { url: String },
    /// 凭证失效：只能前移凭证游标并换新会话
    Expired,
    /// 瞬时故障：礼貌延迟后原地重试同一单元，不轮换任何东西
    Transient,
    /// 无法归类：对当前任务致命（记录日志、放弃任务、继续下一个）
    Unclassified,
}

/// 故障分类器
///
/// 纯函数：把一个会话故障映射到固定分类法中的一类
pub fn classify(fault: &SessionFault) -> FaultKind {
    match fault {
        SessionFault::ChallengeDetected { url } => FaultKind::Challenge { url: url.clone() },
        SessionFault::SessionExpired => FaultKind::Expired,
        SessionFault::EmptyPage { .. } => FaultKind::Transient,
        SessionFault::Driver(e) if e.is_retryable() => FaultKind::Transient,
        SessionFault::Driver(_) => FaultKind::Unclassified,
    }
}
