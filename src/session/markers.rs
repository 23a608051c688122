// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 页面源码标记谓词
///
/// 对已知验证页/登录页关键词的成员测试。这是区分三类可恢复故障的
/// 唯一信号来源，关键词集必须与目标站点的实际文案保持一致。
#[derive(Debug, Clone)]
pub struct PageMarkers {
    challenge: Vec<String>,
    expired: Vec<String>,
}

impl Default for PageMarkers {
    fn default() -> Self {
        Self {
            challenge: [
                "安全验证",
                "人机验证",
                "请输入验证码",
                "系统检测到您的请求存在异常",
            ]
            .map(String::from)
            .to_vec(),
            expired: ["登录百度帐号", "请在手机上确认登录"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl PageMarkers {
    /// 用自定义关键词集创建标记谓词
    pub fn new(challenge: Vec<String>, expired: Vec<String>) -> Self {
        Self { challenge, expired }
    }

    /// 从配置的可选覆盖创建标记谓词，缺省项沿用内置关键词
    pub fn with_overrides(
        challenge: Option<Vec<String>>,
        expired: Option<Vec<String>>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            challenge: challenge.unwrap_or(defaults.challenge),
            expired: expired.unwrap_or(defaults.expired),
        }
    }

    /// 页面是否为人机验证拦截页
    pub fn looks_like_challenge(&self, text: &str) -> bool {
        self.challenge.iter().any(|word| text.contains(word))
    }

    /// 页面是否为登录失效页
    pub fn looks_like_expired(&self, text: &str) -> bool {
        self.expired.iter().any(|word| text.contains(word))
    }
}
