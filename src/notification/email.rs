//! 邮件通知模块
//!
//! 邮件传输作为可选依赖注入，缺省时邮件渠道会被跳过

use crate::config::SmtpConfig;
use crate::error::NotificationError;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// 待发送的邮件
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    /// 收件人
    pub to: Vec<String>,
    /// 主题
    pub subject: String,
    /// 纯文本正文
    pub body: String,
}

/// 邮件传输trait
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// 发送一封邮件
    async fn send(&self, message: &MailMessage) -> Result<(), NotificationError>;
}

/// 解析收件人列表，支持逗号和分号分隔
pub fn parse_recipients(target: &str) -> Vec<String> {
    target
        .split([',', ';'])
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

/// 基于 SMTP 的邮件传输
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// 根据配置创建 SMTP 传输
    pub fn new(config: &SmtpConfig) -> Result<Self, NotificationError> {
        if !config.use_tls {
            tracing::warn!("SMTP TLS 已禁用，不建议在生产环境使用");
        }

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotificationError::ConfigError(format!("创建SMTP传输失败: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        }
        .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::ConfigError(format!("发件人地址无效: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), NotificationError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN);

        for recipient in &message.to {
            let mailbox = recipient
                .parse::<Mailbox>()
                .map_err(|e| NotificationError::MailError(format!("收件人地址无效 {recipient}: {e}")))?;
            builder = builder.to(mailbox);
        }

        let email = builder
            .body(message.body.clone())
            .map_err(|e| NotificationError::MailError(format!("构建邮件失败: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotificationError::MailError(format!("SMTP发送失败: {e}")))?;

        Ok(())
    }
}
