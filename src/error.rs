//! 错误处理模块
//!
//! 定义应用程序的统一错误类型。探测的分类结果（SUCCESS/FAILED/ERROR/TIMEOUT）
//! 属于数据而非错误，不会出现在这里。

use thiserror::Error;

/// API Pulse 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum ApiPulseError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 探测相关错误
    #[error("探测错误: {0}")]
    Probe(#[from] ProbeError),

    /// 调度相关错误
    #[error("调度错误: {0}")]
    Schedule(#[from] ScheduleError),

    /// 通知相关错误
    #[error("通知错误: {0}")]
    Notification(#[from] NotificationError),

    /// 存储相关错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 项目不存在
    #[error("项目不存在: {id}")]
    ProjectNotFound { id: String },

    /// 接口不存在
    #[error("接口不存在: {id}")]
    EndpointNotFound { id: String },

    /// 计划任务不存在
    #[error("计划任务不存在: {id}")]
    ScheduleNotFound { id: String },

    /// 项目没有可测试的接口
    #[error("项目 {project_id} 没有启用的接口")]
    NoEndpointsToTest { project_id: String },

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 探测错误类型
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP客户端错误
    #[error("HTTP客户端错误: {0}")]
    ClientError(#[from] reqwest::Error),

    /// 请求头无效
    #[error("无效的请求头: {name}")]
    InvalidHeader { name: String },
}

/// 调度错误类型
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// cron 表达式无效
    #[error("无效的cron表达式 '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    /// cron 表达式没有后续触发时间
    #[error("cron表达式 '{expression}' 没有后续触发时间")]
    NoUpcomingFire { expression: String },
}

/// 通知错误类型
#[derive(Error, Debug)]
pub enum NotificationError {
    /// 发送失败
    #[error("通知发送失败: {0}")]
    SendError(String),

    /// 模板渲染错误
    #[error("模板渲染失败: {0}")]
    TemplateError(String),

    /// 配置错误
    #[error("通知配置错误: {0}")]
    ConfigError(String),

    /// 邮件发送失败
    #[error("邮件发送失败: {0}")]
    MailError(String),
}

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 存储不可用
    #[error("存储不可用: {0}")]
    Unavailable(String),

    /// 记录不存在
    #[error("记录不存在: {kind} {id}")]
    Missing { kind: &'static str, id: String },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ApiPulseError>;
