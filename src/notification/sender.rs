//! 通知发送器模块
//!
//! 定义项目测试结果通知的trait和投递报告

use crate::model::ChannelType;
use crate::probe::result::ProjectTestOutcome;
use async_trait::async_trait;
use serde::Serialize;

/// 单个渠道的投递结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// 投递成功
    Delivered,
    /// 未投递
    Skipped { reason: String },
    /// 投递失败
    Failed { error: String },
}

/// 渠道投递记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelDelivery {
    /// 渠道ID
    pub channel_id: String,
    /// 渠道名称
    pub channel_name: String,
    /// 渠道类型
    pub channel_type: ChannelType,
    /// 投递结果
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

/// 一次通知分发的汇总报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub deliveries: Vec<ChannelDelivery>,
}

impl DispatchReport {
    /// 投递成功的渠道数
    pub fn delivered_count(&self) -> usize {
        self.count(|status| matches!(status, DeliveryStatus::Delivered))
    }

    /// 被跳过的渠道数
    pub fn skipped_count(&self) -> usize {
        self.count(|status| matches!(status, DeliveryStatus::Skipped { .. }))
    }

    /// 投递失败的渠道数
    pub fn failed_count(&self) -> usize {
        self.count(|status| matches!(status, DeliveryStatus::Failed { .. }))
    }

    /// 按渠道ID查找投递结果
    pub fn status_of(&self, channel_id: &str) -> Option<&DeliveryStatus> {
        self.deliveries
            .iter()
            .find(|d| d.channel_id == channel_id)
            .map(|d| &d.status)
    }

    fn count(&self, predicate: impl Fn(&DeliveryStatus) -> bool) -> usize {
        self.deliveries
            .iter()
            .filter(|d| predicate(&d.status))
            .count()
    }
}

/// 测试结果通知trait
///
/// 实现方必须隔离每个渠道的失败，且不向调用方返回错误。
#[async_trait]
pub trait OutcomeNotifier: Send + Sync {
    /// 把项目测试结果分发到所有符合条件的渠道
    ///
    /// # 参数
    /// * `project_name` - 项目名称
    /// * `outcome` - 项目测试结果
    ///
    /// # 返回
    /// * `DispatchReport` - 每个渠道的投递结果
    async fn notify(&self, project_name: &str, outcome: &ProjectTestOutcome) -> DispatchReport;
}

/// 空的通知器实现（用于测试或禁用通知）
pub struct NoOpNotifier;

#[async_trait]
impl OutcomeNotifier for NoOpNotifier {
    async fn notify(&self, _project_name: &str, _outcome: &ProjectTestOutcome) -> DispatchReport {
        DispatchReport::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(id: &str, status: DeliveryStatus) -> ChannelDelivery {
        ChannelDelivery {
            channel_id: id.to_string(),
            channel_name: id.to_string(),
            channel_type: ChannelType::Slack,
            status,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = DispatchReport {
            deliveries: vec![
                delivery("a", DeliveryStatus::Delivered),
                delivery(
                    "b",
                    DeliveryStatus::Skipped {
                        reason: "rule".to_string(),
                    },
                ),
                delivery(
                    "c",
                    DeliveryStatus::Failed {
                        error: "500".to_string(),
                    },
                ),
            ],
        };

        assert_eq!(report.delivered_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.status_of("a"), Some(&DeliveryStatus::Delivered));
        assert!(report.status_of("z").is_none());
    }

    #[test]
    fn test_noop_notifier_reports_nothing() {
        let outcome = ProjectTestOutcome::empty("p1");
        let report = tokio_test::block_on(NoOpNotifier.notify("Shop", &outcome));
        assert!(report.deliveries.is_empty());
    }

    #[test]
    fn test_delivery_serialization() {
        let json = serde_json::to_value(delivery(
            "c",
            DeliveryStatus::Failed {
                error: "boom".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert_eq!(json["channel_type"], "slack");
    }
}
