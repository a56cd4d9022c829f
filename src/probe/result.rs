//! 探测结果数据结构
//!
//! 定义单次探测结果、项目级汇总结果和统计信息

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::model::HttpMethod;

/// 探测结果分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    /// 状态码符合期望
    Success,
    /// 收到响应但状态码不符合期望
    Failed,
    /// 传输层错误
    Error,
    /// 请求超时
    Timeout,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Success => write!(f, "SUCCESS"),
            TestStatus::Failed => write!(f, "FAILED"),
            TestStatus::Error => write!(f, "ERROR"),
            TestStatus::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

impl TestStatus {
    /// 判断是否为成功
    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Success)
    }

    /// 判断是否计入失败数（FAILED 与 ERROR）
    pub fn counts_as_failed(&self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::Error)
    }
}

/// 触发来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    /// 手动触发
    Manual,
    /// 计划任务触发
    Scheduled,
}

/// 单次探测结果，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// 结果ID
    pub id: Uuid,
    /// 接口ID
    pub endpoint_id: String,
    /// 项目ID
    pub project_id: String,
    /// 接口方法
    pub method: HttpMethod,
    /// 接口路径模板
    pub path: String,
    /// 实际请求的URL
    pub request_url: String,
    /// 结果分类
    pub status: TestStatus,
    /// HTTP状态码，没有响应时为0
    pub status_code: u16,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
    /// 错误信息
    pub error_message: Option<String>,
    /// 响应体（已截断）
    pub response_body: Option<String>,
    /// 响应头
    pub response_headers: Option<BTreeMap<String, String>>,
    /// 触发来源
    pub trigger: TriggerType,
    /// 触发的计划任务ID
    pub schedule_id: Option<String>,
    /// 执行时间
    pub executed_at: DateTime<Utc>,
}

/// 项目级测试汇总
///
/// 序列化时附带总数和成功率。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "OutcomeRecord")]
pub struct ProjectTestOutcome {
    /// 项目ID
    pub project_id: String,
    /// 所有探测结果（无顺序保证）
    pub results: Vec<TestResult>,
    /// 成功数
    pub success_count: usize,
    /// 失败数（FAILED + ERROR）
    pub failed_count: usize,
    /// 超时数
    pub timeout_count: usize,
    /// 平均响应时间（毫秒）
    pub average_response_time_ms: u64,
}

/// 项目级测试汇总的序列化形式
#[derive(Serialize)]
struct OutcomeRecord {
    project_id: String,
    total_count: usize,
    success_count: usize,
    failed_count: usize,
    timeout_count: usize,
    success_rate: f64,
    average_response_time_ms: u64,
    results: Vec<TestResult>,
}

impl From<ProjectTestOutcome> for OutcomeRecord {
    fn from(outcome: ProjectTestOutcome) -> Self {
        Self {
            total_count: outcome.total_count(),
            success_rate: outcome.success_rate(),
            project_id: outcome.project_id,
            success_count: outcome.success_count,
            failed_count: outcome.failed_count,
            timeout_count: outcome.timeout_count,
            average_response_time_ms: outcome.average_response_time_ms,
            results: outcome.results,
        }
    }
}

impl ProjectTestOutcome {
    /// 没有可测试接口时的空结果
    pub fn empty(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            results: Vec::new(),
            success_count: 0,
            failed_count: 0,
            timeout_count: 0,
            average_response_time_ms: 0,
        }
    }

    /// 由探测结果聚合
    pub fn from_results(project_id: impl Into<String>, results: Vec<TestResult>) -> Self {
        let success_count = results.iter().filter(|r| r.status.is_success()).count();
        let failed_count = results
            .iter()
            .filter(|r| r.status.counts_as_failed())
            .count();
        let timeout_count = results
            .iter()
            .filter(|r| r.status == TestStatus::Timeout)
            .count();
        let average_response_time_ms = if results.is_empty() {
            0
        } else {
            results.iter().map(|r| r.response_time_ms).sum::<u64>() / results.len() as u64
        };

        Self {
            project_id: project_id.into(),
            results,
            success_count,
            failed_count,
            timeout_count,
            average_response_time_ms,
        }
    }

    /// 总数
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// 成功率（百分比）
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.success_count as f64 / self.results.len() as f64 * 100.0
        }
    }

    /// 是否存在失败（超时也视为失败）
    pub fn has_failures(&self) -> bool {
        self.failed_count > 0 || self.timeout_count > 0
    }

    /// 非成功的结果
    pub fn failing_results(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.status.is_success())
    }
}

/// 项目的历史测试统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestStats {
    /// 总测试次数
    pub total: usize,
    /// 成功次数
    pub success: usize,
    /// 失败次数
    pub failed: usize,
    /// 错误次数
    pub error: usize,
    /// 超时次数
    pub timeout: usize,
    /// 成功率（百分比）
    pub success_rate: f64,
    /// 平均响应时间（毫秒）
    pub average_response_time_ms: u64,
}

impl TestStats {
    /// 由历史结果计算统计
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a TestResult>) -> Self {
        let mut stats = TestStats::default();
        let mut total_time = 0u64;

        for result in results {
            stats.total += 1;
            total_time += result.response_time_ms;
            match result.status {
                TestStatus::Success => stats.success += 1,
                TestStatus::Failed => stats.failed += 1,
                TestStatus::Error => stats.error += 1,
                TestStatus::Timeout => stats.timeout += 1,
            }
        }

        if stats.total > 0 {
            stats.success_rate = stats.success as f64 / stats.total as f64 * 100.0;
            stats.average_response_time_ms = total_time / stats.total as u64;
        }

        stats
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// 构造测试用的探测结果
    pub fn result(endpoint_id: &str, status: TestStatus, status_code: u16, ms: u64) -> TestResult {
        TestResult {
            id: Uuid::new_v4(),
            endpoint_id: endpoint_id.to_string(),
            project_id: "p1".to_string(),
            method: HttpMethod::Get,
            path: format!("/{endpoint_id}"),
            request_url: format!("http://localhost/{endpoint_id}"),
            status,
            status_code,
            response_time_ms: ms,
            error_message: None,
            response_body: None,
            response_headers: None,
            trigger: TriggerType::Manual,
            schedule_id: None,
            executed_at: Utc::now(),
        }
    }
}
