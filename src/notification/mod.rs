//! 通知模块
//!
//! 提供 Slack/Discord webhook、邮件通知和消息模板功能

pub mod dispatcher;
pub mod email;
pub mod sender;
pub mod summary;
pub mod template;
pub mod webhook;

// 重新导出主要类型
pub use dispatcher::{NotificationDispatcher, DEFAULT_WEBHOOK_TIMEOUT};
pub use email::{MailMessage, MailTransport, SmtpMailer};
pub use sender::{ChannelDelivery, DeliveryStatus, DispatchReport, NoOpNotifier, OutcomeNotifier};
pub use summary::NotificationSummary;
pub use template::EmailTemplate;
pub use webhook::WebhookSender;
