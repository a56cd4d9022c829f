//! webhook 通知发送器模块
//!
//! 构建 Slack 风格和 Discord 风格的消息体，并以 JSON POST 发送

use crate::error::NotificationError;
use crate::model::ChannelType;
use crate::notification::summary::{NotificationSummary, WEBHOOK_FAILURE_LIMIT};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const SLACK_RED: &str = "#FF0000";
const SLACK_GREEN: &str = "#36A64F";
const DISCORD_RED: u32 = 0xFF0000;
const DISCORD_GREEN: u32 = 0x36A64F;

/// webhook 发送器
pub struct WebhookSender {
    /// HTTP客户端
    client: Client,
}

impl WebhookSender {
    /// 创建新的 webhook 发送器
    ///
    /// # 参数
    /// * `timeout` - 单次投递的超时时间
    pub fn new(timeout: Duration) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(|e| NotificationError::ConfigError(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self { client })
    }

    /// 按渠道类型构建消息体，邮件渠道返回 None
    pub fn build_payload(channel_type: ChannelType, summary: &NotificationSummary) -> Option<Value> {
        match channel_type {
            ChannelType::Slack => Some(slack_payload(summary)),
            ChannelType::Discord => Some(discord_payload(summary)),
            ChannelType::Email => None,
        }
    }

    /// 发送消息到 webhook
    pub async fn send(&self, webhook_url: &str, body: &Value) -> Result<(), NotificationError> {
        debug!("发送消息到webhook: {}", redact_url(webhook_url));

        let response = self
            .client
            .post(webhook_url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                NotificationError::SendError(format!("请求失败: {}", e.without_url()))
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(NotificationError::SendError(format!(
                "webhook 返回 {}: {}",
                status, text
            )))
        }
    }
}

/// 只保留地址的协议和主机部分，路径和查询中可能含有令牌
pub(crate) fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => format!("{}://{}", parsed.scheme(), host),
            None => parsed.scheme().to_string(),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}

/// 标题中使用的状态符号
fn headline(summary: &NotificationSummary, ok: &str, failed: &str) -> String {
    let emoji = if summary.has_failures { failed } else { ok };
    format!("{} API Pulse: {}", emoji, summary.project_name)
}

/// 构建 Slack 风格消息体
pub fn slack_payload(summary: &NotificationSummary) -> Value {
    let color = if summary.has_failures {
        SLACK_RED
    } else {
        SLACK_GREEN
    };

    let mut blocks = vec![
        json!({
            "type": "header",
            "text": {
                "type": "plain_text",
                "text": headline(summary, ":white_check_mark:", ":x:"),
                "emoji": true
            }
        }),
        json!({
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*Total APIs:*\n{}", summary.total_count) },
                { "type": "mrkdwn", "text": format!("*Success Rate:*\n{}", summary.success_rate_text()) },
                { "type": "mrkdwn", "text": format!("*Success:*\n{}", summary.success_count) },
                { "type": "mrkdwn", "text": format!("*Failed:*\n{}", summary.failed_count) },
                { "type": "mrkdwn", "text": format!("*Timeout:*\n{}", summary.timeout_count) },
                { "type": "mrkdwn", "text": format!("*Avg Response:*\n{}ms", summary.average_response_time_ms) },
                { "type": "mrkdwn", "text": format!("*Time:*\n{}", summary.executed_at_text()) }
            ]
        }),
    ];

    if let Some(details) = summary.failing_markdown(WEBHOOK_FAILURE_LIMIT) {
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*Failed Endpoints:*\n{}", details)
            }
        }));
    }

    json!({
        "attachments": [
            {
                "color": color,
                "blocks": blocks
            }
        ]
    })
}

/// 构建 Discord 风格消息体
pub fn discord_payload(summary: &NotificationSummary) -> Value {
    let color = if summary.has_failures {
        DISCORD_RED
    } else {
        DISCORD_GREEN
    };

    let mut fields = vec![
        json!({ "name": "Total APIs", "value": summary.total_count.to_string(), "inline": true }),
        json!({ "name": "Success Rate", "value": summary.success_rate_text(), "inline": true }),
        json!({ "name": "Avg Response", "value": format!("{}ms", summary.average_response_time_ms), "inline": true }),
        json!({ "name": "Success", "value": summary.success_count.to_string(), "inline": true }),
        json!({ "name": "Failed", "value": summary.failed_count.to_string(), "inline": true }),
        json!({ "name": "Timeout", "value": summary.timeout_count.to_string(), "inline": true }),
    ];

    if let Some(details) = summary.failing_markdown(WEBHOOK_FAILURE_LIMIT) {
        fields.push(json!({ "name": "Failed Endpoints", "value": details, "inline": false }));
    }

    json!({
        "embeds": [
            {
                "title": headline(summary, "✅", "❌"),
                "color": color,
                "fields": fields,
                "footer": { "text": crate::APP_DISPLAY_NAME },
                "timestamp": summary.executed_at.to_rfc3339()
            }
        ]
    })
}
