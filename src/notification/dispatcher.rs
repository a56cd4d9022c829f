//! 通知分发器
//!
//! 读取启用的渠道，按失败/恢复规则过滤后并发投递。
//! 单个渠道失败只记录在报告中，不影响其他渠道。

use crate::error::NotificationError;
use crate::logging::notification_log;
use crate::model::{ChannelType, NotificationChannel};
use crate::notification::email::{parse_recipients, MailMessage, MailTransport};
use crate::notification::sender::{ChannelDelivery, DeliveryStatus, DispatchReport, OutcomeNotifier};
use crate::notification::summary::NotificationSummary;
use crate::notification::template::{email_subject, EmailTemplate};
use crate::notification::webhook::WebhookSender;
use crate::probe::result::ProjectTestOutcome;
use crate::store::Store;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// webhook 投递的默认超时时间
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// 多渠道通知分发器
pub struct NotificationDispatcher {
    store: Arc<dyn Store>,
    webhook: WebhookSender,
    mailer: Option<Arc<dyn MailTransport>>,
    template: EmailTemplate,
}

impl NotificationDispatcher {
    /// 创建新的分发器
    ///
    /// # 参数
    /// * `store` - 渠道配置来源
    /// * `mailer` - 邮件传输，缺省时邮件渠道会被跳过
    /// * `webhook_timeout` - webhook 投递超时时间
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Option<Arc<dyn MailTransport>>,
        webhook_timeout: Duration,
    ) -> Result<Self, NotificationError> {
        Ok(Self {
            store,
            webhook: WebhookSender::new(webhook_timeout)?,
            mailer,
            template: EmailTemplate::new()?,
        })
    }

    /// 向单个渠道投递
    async fn deliver(
        &self,
        channel: &NotificationChannel,
        summary: &NotificationSummary,
    ) -> DeliveryStatus {
        let result = match channel.channel_type {
            ChannelType::Slack | ChannelType::Discord => {
                self.deliver_webhook(channel, summary).await
            }
            ChannelType::Email => match &self.mailer {
                Some(mailer) => self.deliver_email(mailer.as_ref(), channel, summary).await,
                None => {
                    warn!("未配置邮件传输，跳过邮件渠道: {}", channel.name);
                    return DeliveryStatus::Skipped {
                        reason: "mail transport not configured".to_string(),
                    };
                }
            },
        };

        match result {
            Ok(()) => {
                notification_log(
                    &channel.channel_type.to_string(),
                    &channel.id,
                    &channel.name,
                    true,
                    None,
                );
                DeliveryStatus::Delivered
            }
            Err(e) => {
                let message = e.to_string();
                notification_log(
                    &channel.channel_type.to_string(),
                    &channel.id,
                    &channel.name,
                    false,
                    Some(&message),
                );
                DeliveryStatus::Failed { error: message }
            }
        }
    }

    async fn deliver_webhook(
        &self,
        channel: &NotificationChannel,
        summary: &NotificationSummary,
    ) -> Result<(), NotificationError> {
        let payload = WebhookSender::build_payload(channel.channel_type, summary).ok_or_else(|| {
            NotificationError::ConfigError(format!("渠道类型 {} 不是webhook", channel.channel_type))
        })?;
        self.webhook.send(&channel.target, &payload).await
    }

    async fn deliver_email(
        &self,
        mailer: &dyn MailTransport,
        channel: &NotificationChannel,
        summary: &NotificationSummary,
    ) -> Result<(), NotificationError> {
        let to = parse_recipients(&channel.target);
        if to.is_empty() {
            return Err(NotificationError::ConfigError(format!(
                "邮件渠道 {} 没有有效的收件人",
                channel.name
            )));
        }

        let message = MailMessage {
            to,
            subject: email_subject(summary),
            body: self.template.render(summary)?,
        };
        mailer.send(&message).await
    }
}

#[async_trait]
impl OutcomeNotifier for NotificationDispatcher {
    async fn notify(&self, project_name: &str, outcome: &ProjectTestOutcome) -> DispatchReport {
        let channels = match self.store.find_enabled_channels().await {
            Ok(channels) => channels,
            Err(e) => {
                error!("读取通知渠道失败: {}", e);
                return DispatchReport::default();
            }
        };

        let eligible: Vec<NotificationChannel> = channels
            .into_iter()
            .filter(|channel| channel.should_notify(outcome))
            .collect();

        if eligible.is_empty() {
            debug!("项目 {} 没有需要通知的渠道", project_name);
            return DispatchReport::default();
        }

        let summary = NotificationSummary::new(project_name, outcome);
        let statuses = join_all(
            eligible
                .iter()
                .map(|channel| self.deliver(channel, &summary)),
        )
        .await;

        let deliveries: Vec<ChannelDelivery> = eligible
            .into_iter()
            .zip(statuses)
            .map(|(channel, status)| ChannelDelivery {
                channel_id: channel.id,
                channel_name: channel.name,
                channel_type: channel.channel_type,
                status,
            })
            .collect();

        let report = DispatchReport { deliveries };
        info!(
            "项目 {} 通知完成: 成功 {}, 跳过 {}, 失败 {}",
            project_name,
            report.delivered_count(),
            report.skipped_count(),
            report.failed_count()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::result::fixtures::result;
    use crate::probe::result::TestStatus;
    use crate::store::InMemoryStore;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<MailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingMailer {
        async fn send(&self, message: &MailMessage) -> Result<(), NotificationError> {
            if self.fail {
                return Err(NotificationError::MailError("smtp down".to_string()));
            }
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn channel(id: &str, channel_type: ChannelType, target: &str) -> NotificationChannel {
        NotificationChannel {
            id: id.to_string(),
            name: format!("{id}-channel"),
            channel_type,
            target: target.to_string(),
            enabled: true,
            notify_on_failure: true,
            notify_on_recovery: true,
        }
    }

    fn failing_outcome() -> ProjectTestOutcome {
        ProjectTestOutcome::from_results(
            "p1",
            vec![
                result("ok", TestStatus::Success, 200, 10),
                result("bad", TestStatus::Failed, 500, 10),
            ],
        )
    }

    fn dispatcher(
        store: Arc<InMemoryStore>,
        mailer: Option<Arc<dyn MailTransport>>,
    ) -> NotificationDispatcher {
        NotificationDispatcher::new(store, mailer, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_email_channel_receives_rendered_mail() {
        let store = Arc::new(InMemoryStore::new());
        store
            .put_channel(channel("mail", ChannelType::Email, "a@example.com; b@example.com"))
            .await;
        let mailer = Arc::new(RecordingMailer::default());

        let report = dispatcher(store, Some(mailer.clone() as Arc<dyn MailTransport>))
            .notify("Shop", &failing_outcome())
            .await;

        assert_eq!(report.delivered_count(), 1);
        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["a@example.com", "b@example.com"]);
        assert_eq!(sent[0].subject, "[API Pulse] Shop - FAILED (50% success)");
        assert!(sent[0].body.contains("GET /bad - FAILED (500)"));
    }

    #[tokio::test]
    async fn test_email_skipped_without_mailer() {
        let store = Arc::new(InMemoryStore::new());
        store
            .put_channel(channel("mail", ChannelType::Email, "a@example.com"))
            .await;

        let report = dispatcher(store, None).notify("Shop", &failing_outcome()).await;

        assert_eq!(report.skipped_count(), 1);
        assert!(matches!(
            report.status_of("mail"),
            Some(DeliveryStatus::Skipped { .. })
        ));
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_others() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/slack")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(InMemoryStore::new());
        store
            .put_channel(channel("mail", ChannelType::Email, "a@example.com"))
            .await;
        store
            .put_channel(channel(
                "slack",
                ChannelType::Slack,
                &format!("{}/slack", server.url()),
            ))
            .await;
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });

        let report = dispatcher(store, Some(mailer as Arc<dyn MailTransport>))
            .notify("Shop", &failing_outcome())
            .await;

        hook.assert_async().await;
        assert_eq!(report.status_of("slack"), Some(&DeliveryStatus::Delivered));
        assert!(matches!(
            report.status_of("mail"),
            Some(DeliveryStatus::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_rules_filter_channels() {
        let store = Arc::new(InMemoryStore::new());
        let mut failures_only = channel("failures", ChannelType::Email, "a@example.com");
        failures_only.notify_on_recovery = false;
        let mut disabled = channel("off", ChannelType::Email, "b@example.com");
        disabled.enabled = false;
        store.put_channel(failures_only).await;
        store.put_channel(disabled).await;
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = dispatcher(store, Some(mailer.clone() as Arc<dyn MailTransport>));

        let clean =
            ProjectTestOutcome::from_results("p1", vec![result("ok", TestStatus::Success, 200, 1)]);
        assert!(dispatcher.notify("Shop", &clean).await.deliveries.is_empty());

        let report = dispatcher.notify("Shop", &failing_outcome()).await;
        assert_eq!(report.deliveries.len(), 1);
        assert_eq!(mailer.sent.lock().await[0].to, vec!["a@example.com"]);
    }

    #[tokio::test]
    async fn test_clean_outcome_reaches_recovery_only_channel() {
        let store = Arc::new(InMemoryStore::new());
        let mut recovery_only = channel("recovery", ChannelType::Email, "ops@example.com");
        recovery_only.notify_on_failure = false;
        let mut failures_only = channel("failures", ChannelType::Email, "oncall@example.com");
        failures_only.notify_on_recovery = false;
        store.put_channel(recovery_only).await;
        store.put_channel(failures_only).await;
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = dispatcher(store, Some(mailer.clone() as Arc<dyn MailTransport>));

        let clean =
            ProjectTestOutcome::from_results("p1", vec![result("ok", TestStatus::Success, 200, 1)]);
        let report = dispatcher.notify("Shop", &clean).await;
        assert_eq!(report.deliveries.len(), 1);
        assert_eq!(report.status_of("recovery"), Some(&DeliveryStatus::Delivered));
        {
            let sent = mailer.sent.lock().await;
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].to, vec!["ops@example.com"]);
            assert_eq!(sent[0].subject, "[API Pulse] Shop - SUCCESS (100% success)");
        }

        let report = dispatcher.notify("Shop", &failing_outcome()).await;
        assert!(report.status_of("recovery").is_none());
        assert_eq!(report.status_of("failures"), Some(&DeliveryStatus::Delivered));
    }

    #[tokio::test]
    async fn test_webhook_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _hook = server
            .mock("POST", "/discord")
            .with_status(500)
            .create_async()
            .await;

        let store = Arc::new(InMemoryStore::new());
        store
            .put_channel(channel(
                "discord",
                ChannelType::Discord,
                &format!("{}/discord", server.url()),
            ))
            .await;

        let report = dispatcher(store, None).notify("Shop", &failing_outcome()).await;
        assert_eq!(report.failed_count(), 1);
    }
}
