//! 通知摘要
//!
//! 把项目测试结果整理为各渠道共用的展示数据

use crate::probe::result::{ProjectTestOutcome, TestResult, TestStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// webhook 消息中最多列出的失败接口数
pub const WEBHOOK_FAILURE_LIMIT: usize = 5;

/// 邮件中最多列出的失败接口数
pub const EMAIL_FAILURE_LIMIT: usize = 10;

/// 失败接口的展示信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailingEndpoint {
    pub method: String,
    pub path: String,
    pub status: TestStatus,
    pub status_code: u16,
}

impl FailingEndpoint {
    fn from_result(result: &TestResult) -> Self {
        Self {
            method: result.method.to_string(),
            path: result.path.clone(),
            status: result.status,
            status_code: result.status_code,
        }
    }

    /// webhook 中使用的 Markdown 行
    pub fn markdown_line(&self) -> String {
        format!(
            "• `{} {}` - {} ({})",
            self.method, self.path, self.status, self.status_code
        )
    }
}

/// 一次项目测试的通知摘要
#[derive(Debug, Clone, Serialize)]
pub struct NotificationSummary {
    pub project_name: String,
    pub has_failures: bool,
    pub total_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub timeout_count: usize,
    pub success_rate: f64,
    pub average_response_time_ms: u64,
    pub executed_at: DateTime<Utc>,
    /// 所有非成功的接口，按结果顺序排列
    pub failing: Vec<FailingEndpoint>,
}

impl NotificationSummary {
    /// 由项目测试结果构建摘要
    pub fn new(project_name: &str, outcome: &ProjectTestOutcome) -> Self {
        Self {
            project_name: project_name.to_string(),
            has_failures: outcome.has_failures(),
            total_count: outcome.total_count(),
            success_count: outcome.success_count,
            failed_count: outcome.failed_count,
            timeout_count: outcome.timeout_count,
            success_rate: outcome.success_rate(),
            average_response_time_ms: outcome.average_response_time_ms,
            executed_at: Utc::now(),
            failing: outcome
                .failing_results()
                .map(FailingEndpoint::from_result)
                .collect(),
        }
    }

    /// 保留一位小数的成功率
    pub fn success_rate_text(&self) -> String {
        format!("{:.1}%", self.success_rate)
    }

    /// 展示用的执行时间
    pub fn executed_at_text(&self) -> String {
        self.executed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }

    /// 总体状态文字
    pub fn status_text(&self) -> &'static str {
        if self.has_failures {
            "FAILED"
        } else {
            "SUCCESS"
        }
    }

    /// 前 `limit` 个失败接口的 Markdown 列表，没有失败时为 None
    pub fn failing_markdown(&self, limit: usize) -> Option<String> {
        if self.failing.is_empty() {
            return None;
        }
        Some(
            self.failing
                .iter()
                .take(limit)
                .map(FailingEndpoint::markdown_line)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}
