//! 消息模板模块
//!
//! 使用 Handlebars 渲染邮件正文

use crate::error::NotificationError;
use crate::notification::summary::{FailingEndpoint, NotificationSummary, EMAIL_FAILURE_LIMIT};
use handlebars::Handlebars;
use serde::Serialize;

const EMAIL_TEMPLATE_NAME: &str = "email_body";

/// 默认的邮件正文模板
pub fn default_email_template() -> &'static str {
    r#"API Pulse Test Results for: {{project_name}}

Summary:
  - Total APIs: {{total_count}}
  - Success: {{success_count}}
  - Failed: {{failed_count}}
  - Timeout: {{timeout_count}}
  - Success Rate: {{success_rate}}
  - Average Response Time: {{average_response_time_ms}}ms
  - Executed At: {{executed_at}}
{{#if failing}}

Failed Endpoints:
{{#each failing}}
  - {{method}} {{path}} - {{status}} ({{status_code}})
{{/each}}
{{/if}}

--
API Pulse - API Health Monitoring
"#
}

/// 模板上下文数据
#[derive(Debug, Serialize)]
struct EmailContext<'a> {
    project_name: &'a str,
    total_count: usize,
    success_count: usize,
    failed_count: usize,
    timeout_count: usize,
    success_rate: String,
    average_response_time_ms: u64,
    executed_at: String,
    failing: &'a [FailingEndpoint],
}

/// 邮件正文模板
pub struct EmailTemplate {
    registry: Handlebars<'static>,
}

impl EmailTemplate {
    /// 使用默认模板创建
    pub fn new() -> Result<Self, NotificationError> {
        Self::with_template(default_email_template())
    }

    /// 使用自定义模板创建
    ///
    /// 模板语法错误会在这里直接返回。
    pub fn with_template(template: &str) -> Result<Self, NotificationError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(EMAIL_TEMPLATE_NAME, template)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))?;

        Ok(Self { registry })
    }

    /// 渲染邮件正文，最多列出固定数量的失败接口
    pub fn render(&self, summary: &NotificationSummary) -> Result<String, NotificationError> {
        let failing_len = summary.failing.len().min(EMAIL_FAILURE_LIMIT);
        let context = EmailContext {
            project_name: &summary.project_name,
            total_count: summary.total_count,
            success_count: summary.success_count,
            failed_count: summary.failed_count,
            timeout_count: summary.timeout_count,
            success_rate: summary.success_rate_text(),
            average_response_time_ms: summary.average_response_time_ms,
            executed_at: summary.executed_at_text(),
            failing: &summary.failing[..failing_len],
        };

        self.registry
            .render(EMAIL_TEMPLATE_NAME, &context)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))
    }
}

/// 邮件主题，成功率取整数部分
pub fn email_subject(summary: &NotificationSummary) -> String {
    format!(
        "[API Pulse] {} - {} ({}% success)",
        summary.project_name,
        summary.status_text(),
        summary.success_rate as u32
    )
}
