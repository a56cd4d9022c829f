//! 通知渠道模型

use crate::probe::result::ProjectTestOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 通知渠道类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Slack 风格 webhook
    Slack,
    /// Discord 风格 webhook
    Discord,
    /// 邮件
    Email,
}

impl ChannelType {
    /// 是否为 webhook 类渠道
    pub fn is_webhook(&self) -> bool {
        matches!(self, ChannelType::Slack | ChannelType::Discord)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Slack => write!(f, "slack"),
            ChannelType::Discord => write!(f, "discord"),
            ChannelType::Email => write!(f, "email"),
        }
    }
}

/// 已配置的通知渠道
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationChannel {
    /// 渠道ID
    pub id: String,
    /// 名称
    pub name: String,
    /// 类型
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    /// 投递目标：webhook URL 或收件人列表
    pub target: String,
    /// 是否启用
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 出现失败时通知
    #[serde(default = "default_true")]
    pub notify_on_failure: bool,
    /// 全部恢复时通知
    #[serde(default = "default_true")]
    pub notify_on_recovery: bool,
}

impl NotificationChannel {
    /// 判断该渠道是否需要接收本次测试结果
    pub fn should_notify(&self, outcome: &ProjectTestOutcome) -> bool {
        let has_failures = outcome.has_failures();
        (has_failures && self.notify_on_failure) || (!has_failures && self.notify_on_recovery)
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::result::fixtures::result;
    use crate::probe::result::TestStatus;

    fn channel(notify_on_failure: bool, notify_on_recovery: bool) -> NotificationChannel {
        NotificationChannel {
            id: "c1".to_string(),
            name: "c1".to_string(),
            channel_type: ChannelType::Slack,
            target: "https://hooks.example.com/c1".to_string(),
            enabled: true,
            notify_on_failure,
            notify_on_recovery,
        }
    }

    fn outcome(status: TestStatus) -> ProjectTestOutcome {
        ProjectTestOutcome::from_results(
            "p1",
            vec![
                result("ok", TestStatus::Success, 200, 10),
                result("other", status, 0, 10),
            ],
        )
    }

    #[test]
    fn test_should_notify_flag_combinations() {
        let failing = outcome(TestStatus::Failed);
        let clean = outcome(TestStatus::Success);

        let failure_only = channel(true, false);
        assert!(failure_only.should_notify(&failing));
        assert!(!failure_only.should_notify(&clean));

        let recovery_only = channel(false, true);
        assert!(!recovery_only.should_notify(&failing));
        assert!(recovery_only.should_notify(&clean));

        let both = channel(true, true);
        assert!(both.should_notify(&failing));
        assert!(both.should_notify(&clean));

        let neither = channel(false, false);
        assert!(!neither.should_notify(&failing));
        assert!(!neither.should_notify(&clean));
    }

    #[test]
    fn test_timeout_counts_as_failure() {
        let timed_out = outcome(TestStatus::Timeout);
        assert_eq!(timed_out.failed_count, 0);

        assert!(channel(true, false).should_notify(&timed_out));
        assert!(!channel(false, true).should_notify(&timed_out));
    }

    #[test]
    fn test_channel_type_display() {
        assert_eq!(ChannelType::Discord.to_string(), "discord");
        assert!(ChannelType::Slack.is_webhook());
        assert!(!ChannelType::Email.is_webhook());
    }
}
