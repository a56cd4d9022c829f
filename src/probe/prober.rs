//! HTTP接口探测器实现
//!
//! 对单个接口发起一次带超时上限的HTTP调用，分类后持久化结果

use crate::error::{ProbeError, Result};
use crate::logging::probe_log;
use crate::model::{Endpoint, Project};
use crate::probe::classifier::{classify, Transport};
use crate::probe::request::{build_request, ProbeRequest, RuntimeOverrides};
use crate::probe::result::{TestResult, TriggerType};
use crate::store::Store;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use uuid::Uuid;

/// 默认请求超时时间
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 默认响应体截断长度（字符）
pub const DEFAULT_MAX_BODY_CHARS: usize = 10_000;

/// 探测器trait，定义单次探测接口
#[async_trait]
pub trait EndpointProber: Send + Sync {
    /// 探测一个接口并持久化结果
    ///
    /// # 参数
    /// * `project` - 接口所属项目
    /// * `endpoint` - 目标接口
    /// * `trigger` - 触发来源
    /// * `schedule_id` - 触发的计划任务ID
    /// * `overrides` - 运行时覆盖值
    ///
    /// # 返回
    /// * `Result<TestResult>` - 已持久化的探测结果，只有存储失败时返回错误
    async fn probe(
        &self,
        project: &Project,
        endpoint: &Endpoint,
        trigger: TriggerType,
        schedule_id: Option<&str>,
        overrides: Option<&RuntimeOverrides>,
    ) -> Result<TestResult>;
}

/// 一次HTTP调用的原始观测值
struct Observation {
    transport: Transport,
    elapsed: Duration,
    error_message: Option<String>,
    body: Option<String>,
    headers: Option<BTreeMap<String, String>>,
}

/// 基于 reqwest 的探测器实现
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
    /// 结果存储
    store: Arc<dyn Store>,
    /// 超时上限
    timeout: Duration,
    /// 响应体截断长度
    max_body_chars: usize,
}

impl HttpProber {
    /// 创建新的探测器
    ///
    /// # 参数
    /// * `store` - 结果存储
    /// * `timeout` - 每次调用的超时上限
    /// * `max_body_chars` - 响应体截断长度
    pub fn new(store: Arc<dyn Store>, timeout: Duration, max_body_chars: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(ProbeError::ClientError)?;

        Ok(Self {
            client,
            store,
            timeout,
            max_body_chars,
        })
    }

    /// 使用默认超时和截断长度创建探测器
    pub fn with_defaults(store: Arc<dyn Store>) -> Result<Self> {
        Self::new(store, DEFAULT_REQUEST_TIMEOUT, DEFAULT_MAX_BODY_CHARS)
    }

    /// 将拼装好的请求头转换为 HeaderMap
    fn header_map(request: &ProbeRequest) -> std::result::Result<HeaderMap, ProbeError> {
        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ProbeError::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ProbeError::InvalidHeader { name: name.clone() })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }

    /// 执行HTTP调用，不会返回错误
    async fn perform_request(&self, request: &ProbeRequest) -> Observation {
        let start_time = Instant::now();

        let headers = match Self::header_map(request) {
            Ok(headers) => headers,
            Err(e) => {
                return Observation {
                    transport: Transport::Failed,
                    elapsed: start_time.elapsed(),
                    error_message: Some(e.to_string()),
                    body: None,
                    headers: None,
                }
            }
        };

        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let exchange = async {
            match builder.send().await {
                Ok(response) => self.read_response(response).await,
                Err(e) => Err(e),
            }
        };

        match timeout(self.timeout, exchange).await {
            Ok(Ok((status_code, headers, body))) => Observation {
                transport: Transport::Completed { status_code },
                elapsed: start_time.elapsed(),
                error_message: None,
                body: Some(body),
                headers: Some(headers),
            },
            Ok(Err(e)) if e.is_timeout() => self.timed_out(start_time.elapsed()),
            Ok(Err(e)) => Observation {
                transport: Transport::Failed,
                elapsed: start_time.elapsed(),
                error_message: Some(format_request_error(&e)),
                body: None,
                headers: None,
            },
            Err(_) => self.timed_out(start_time.elapsed()),
        }
    }

    /// 读取响应状态、响应头和截断后的响应体
    async fn read_response(
        &self,
        response: Response,
    ) -> std::result::Result<(u16, BTreeMap<String, String>, String), reqwest::Error> {
        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;
        Ok((status_code, headers, truncate_chars(body, self.max_body_chars)))
    }

    fn timed_out(&self, elapsed: Duration) -> Observation {
        Observation {
            transport: Transport::TimedOut,
            elapsed,
            error_message: Some(format!(
                "Request timed out after {} seconds",
                self.timeout.as_secs()
            )),
            body: None,
            headers: None,
        }
    }
}

#[async_trait]
impl EndpointProber for HttpProber {
    async fn probe(
        &self,
        project: &Project,
        endpoint: &Endpoint,
        trigger: TriggerType,
        schedule_id: Option<&str>,
        overrides: Option<&RuntimeOverrides>,
    ) -> Result<TestResult> {
        let request = build_request(project, endpoint, overrides);
        tracing::debug!(
            "探测接口 {} {} {}",
            endpoint.id,
            request.method,
            request.url
        );

        let observation = self.perform_request(&request).await;
        let status = classify(observation.transport, endpoint.expected_status);
        let status_code = observation.transport.status_code();

        let result = TestResult {
            id: Uuid::new_v4(),
            endpoint_id: endpoint.id.clone(),
            project_id: endpoint.project_id.clone(),
            method: endpoint.method,
            path: endpoint.path.clone(),
            request_url: request.url,
            status,
            status_code,
            response_time_ms: observation.elapsed.as_millis() as u64,
            error_message: observation.error_message,
            response_body: observation.body,
            response_headers: observation.headers,
            trigger,
            schedule_id: schedule_id.map(str::to_string),
            executed_at: Utc::now(),
        };

        probe_log(
            &result.endpoint_id,
            &result.request_url,
            result.status,
            result.response_time_ms,
        );

        self.store.append_result(&result).await?;
        Ok(result)
    }
}

/// 按字符截断响应体
fn truncate_chars(body: String, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((byte_index, _)) => body[..byte_index].to_string(),
        None => body,
    }
}

/// 格式化请求错误信息，使其更加清晰易读
fn format_request_error(error: &reqwest::Error) -> String {
    if error.is_connect() {
        format!("Connection failed: {}", error)
    } else if error.is_builder() || error.is_request() {
        format!("Invalid request: {}", error)
    } else if error.is_decode() || error.is_body() {
        format!("Response read error: {}", error)
    } else {
        let error_str = error.to_string();
        if error_str.contains("dns") || error_str.contains("DNS") {
            format!("DNS resolution failed: {}", error_str)
        } else if error_str.contains("certificate")
            || error_str.contains("tls")
            || error_str.contains("ssl")
        {
            format!("SSL/TLS certificate error: {}", error_str)
        } else {
            format!("Request failed: {}", error_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HttpMethod;

    #[test]
    fn test_truncate_by_chars_not_bytes() {
        let body = "数据".repeat(10);
        let truncated = truncate_chars(body, 3);
        assert_eq!(truncated, "数据数");

        let short = truncate_chars("abc".to_string(), 10);
        assert_eq!(short, "abc");
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let request = ProbeRequest {
            method: HttpMethod::Get,
            url: "http://localhost".to_string(),
            headers: vec![("bad header".to_string(), "v".to_string())],
            body: None,
        };
        let err = HttpProber::header_map(&request).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidHeader { name } if name == "bad header"));
    }

    #[test]
    fn test_valid_headers_are_converted() {
        let request = ProbeRequest {
            method: HttpMethod::Post,
            url: "http://localhost".to_string(),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-API-Key".to_string(), "k".to_string()),
            ],
            body: Some("{}".to_string()),
        };
        let headers = HttpProber::header_map(&request).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["x-api-key"], "k");
    }
}
