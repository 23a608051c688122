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

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use std::time::Duration;
use thiserror::Error;

/// 驱动错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 请求失败
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 导航超时
    #[error("Navigation timeout")]
    Timeout,
    /// 其他错误
    #[error("Driver error: {0}")]
    Other(String),
}

impl DriverError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        match self {
            DriverError::Request(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            DriverError::Timeout => true,
            DriverError::Other(_) => false,
        }
    }
}

/// 会话身份
///
/// 一条登录凭证与一个网络出口的配对，绑定到一个存活的采集会话。
/// 每个工作进程同一时刻至多一个活动身份；被判定失效或验证未解的
/// 身份即被弃用，绝不复用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// 登录凭证（Cookie串）
    pub credential: String,
    /// 出口代理，`None` 表示直连
    pub egress: Option<String>,
}

/// 页面驱动特质
///
/// 被排除在编排层之外的浏览器自动化协作方接口：
/// 导航到URL并返回页面源码文本。
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 导航到URL并返回页面源码
    async fn navigate(&self, url: &str) -> Result<String, DriverError>;
}

/// 驱动提供者特质
///
/// 为一个会话身份打开一个新的页面驱动
#[async_trait]
pub trait DriverProvider: Send + Sync {
    async fn open(&self, identity: &SessionIdentity) -> Result<Box<dyn PageDriver>, DriverError>;
}

/// HTTP驱动提供者
///
/// 基于reqwest的默认页面驱动实现。每个会话一个全新的客户端，
/// 绑定该身份的Cookie、代理和浏览器User-Agent。
pub struct HttpDriverProvider {
    user_agent: String,
    timeout: Duration,
}

impl HttpDriverProvider {
    /// 创建HTTP驱动提供者
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DriverProvider for HttpDriverProvider {
    async fn open(&self, identity: &SessionIdentity) -> Result<Box<dyn PageDriver>, DriverError> {
        let mut headers = HeaderMap::new();
        if let Ok(cookie) = HeaderValue::from_str(&identity.credential) {
            headers.insert(COOKIE, cookie);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .default_headers(headers)
            .timeout(self.timeout)
            .cookie_store(true);

        if let Some(proxy_url) = &identity.egress {
            let proxy = reqwest::Proxy::all(format!("http://{}", proxy_url))
                .map_err(|e| DriverError::Other(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;
        Ok(Box::new(HttpDriver { client }))
    }
}

/// HTTP页面驱动
pub struct HttpDriver {
    client: reqwest::Client,
}

#[async_trait]
impl PageDriver for HttpDriver {
    async fn navigate(&self, url: &str) -> Result<String, DriverError> {
        let response = self.client.get(url).send().await?;
        let text = response.text().await?;
        Ok(text)
    }
}
