//! HTTP可达性探测器实现
//!
//! 对规范化后的URL发起一次GET请求，并按分类策略给出结果

use crate::error::{ProbeFailure, ServerPulseError};
use crate::health::result::{ProbeResult, TargetStatus};
use crate::health::url::normalize;
use crate::target::MonitoredTarget;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// 默认的客户端标识
pub const DEFAULT_USER_AGENT: &str = "ServerPulse-HealthCheck/1.0";

/// TLS信任模式
///
/// 目标中包含自签名和内网证书，默认不校验证书。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TlsTrust {
    /// 校验对端证书
    Verify,
    /// 接受任何证书（包括自签名和过期证书）
    #[default]
    AcceptInvalidCerts,
}

/// 响应分类策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// 收到任何HTTP响应都算在线，传输失败记为 `error`
    AnyResponse,
    /// 只有2xx算在线，其余（包括传输失败）都记为 `offline`
    StrictSuccess,
}

impl ClassificationPolicy {
    /// 按策略对收到的状态码分类
    pub fn classify_response(&self, status: StatusCode) -> TargetStatus {
        match self {
            ClassificationPolicy::AnyResponse => TargetStatus::Online,
            ClassificationPolicy::StrictSuccess if status.is_success() => TargetStatus::Online,
            ClassificationPolicy::StrictSuccess => TargetStatus::Offline,
        }
    }

    /// 按策略对失败分类
    pub fn classify_failure(&self) -> TargetStatus {
        match self {
            ClassificationPolicy::AnyResponse => TargetStatus::Error,
            ClassificationPolicy::StrictSuccess => TargetStatus::Offline,
        }
    }
}

/// 调用点相关的探测参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeProfile {
    /// 单次请求超时时间
    pub timeout: Duration,
    /// 分类策略
    pub policy: ClassificationPolicy,
}

impl ProbeProfile {
    /// 定时巡检和单目标检测使用的参数：10秒超时，任意响应即在线
    pub fn scheduled() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            policy: ClassificationPolicy::AnyResponse,
        }
    }

    /// 批量检测使用的参数：5秒超时，只有2xx算在线
    pub fn bulk() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            policy: ClassificationPolicy::StrictSuccess,
        }
    }
}

/// 探测器trait，定义单目标探测接口
#[async_trait]
pub trait Prober: Send + Sync {
    /// 探测一个目标
    ///
    /// 所有失败都会转换为结果中的状态，永远不会返回错误。
    ///
    /// # 参数
    /// * `target` - 目标记录（不会被修改）
    /// * `profile` - 调用点相关的探测参数
    ///
    /// # 返回
    /// * `ProbeResult` - 探测结果
    async fn probe(&self, target: &MonitoredTarget, profile: &ProbeProfile) -> ProbeResult;
}

/// HTTP客户端参数
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// TLS信任模式
    pub tls_trust: TlsTrust,
    /// 请求头中的客户端标识
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            tls_trust: TlsTrust::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// HTTP探测器实现
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
    /// TLS信任模式
    tls_trust: TlsTrust,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// 客户端不经过任何代理。
    ///
    /// # 参数
    /// * `options` - 客户端参数
    ///
    /// # 返回
    /// * `Result<Self>` - 探测器实例
    pub fn new(options: ClientOptions) -> crate::error::Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent)
            .no_proxy()
            .danger_accept_invalid_certs(options.tls_trust == TlsTrust::AcceptInvalidCerts)
            .build()
            .map_err(|e| ServerPulseError::Other(anyhow::anyhow!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            tls_trust: options.tls_trust,
        })
    }

    /// 获取TLS信任模式
    pub fn tls_trust(&self) -> TlsTrust {
        self.tls_trust
    }

    /// 对已经规范化的URL执行一次请求
    async fn perform_request(&self, url: String, profile: &ProbeProfile) -> ProbeResult {
        let start_time = Instant::now();

        let request = self.client.get(&url).timeout(profile.timeout).send();
        let response_result = timeout(profile.timeout, request).await;

        let response_time = start_time.elapsed();

        match response_result {
            Ok(Ok(response)) => {
                let status_code = response.status();
                let status = profile.policy.classify_response(status_code);
                let result = ProbeResult::responded(
                    status,
                    url,
                    status_code.as_u16(),
                    response_time.as_millis() as u64,
                );

                if status.is_online() {
                    result
                } else {
                    result.with_error(format!(
                        "HTTP {} {}",
                        status_code.as_u16(),
                        status_code.canonical_reason().unwrap_or("Unknown")
                    ))
                }
            }
            Ok(Err(e)) => ProbeResult::failed(
                profile.policy.classify_failure(),
                url,
                &ProbeFailure::Transport(format_request_error(&e)),
            ),
            Err(_) => ProbeResult::failed(
                profile.policy.classify_failure(),
                url,
                &ProbeFailure::Transport("Request timeout".to_string()),
            ),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &MonitoredTarget, profile: &ProbeProfile) -> ProbeResult {
        match normalize(&target.url, target.endpoint.as_deref()) {
            Some(url) => self.perform_request(url, profile).await,
            None => ProbeResult::failed(
                profile.policy.classify_failure(),
                String::new(),
                &ProbeFailure::Configuration,
            ),
        }
    }
}

/// 格式化请求错误，保留底层原因
fn format_request_error(error: &reqwest::Error) -> String {
    let kind = if error.is_timeout() {
        "Request timeout"
    } else if error.is_connect() {
        "Connection failed"
    } else if error.is_request() {
        "Invalid request"
    } else if error.is_builder() {
        "Invalid URL"
    } else {
        "Request failed"
    };

    // reqwest 的顶层描述很笼统，真正的原因在 source 链里
    let mut detail = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }

    format!("{kind}: {detail}")
}
