//! API Pulse - API 接口监控引擎
//!
//! 这是一个用Rust编写的 API 接口监控引擎，支持：
//! - 根据接口模板合成探测请求并分类结果
//! - 项目级并发测试与结果汇总
//! - 基于 cron 表达式的计划测试
//! - Slack/Discord webhook 和邮件通知
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod notification;
pub mod probe;
pub mod scheduler;
pub mod service;
pub mod store;

// 重新导出主要类型
pub use config::{Config, GlobalConfig};
pub use error::ApiPulseError;
pub use probe::{ProjectTestOutcome, TestResult, TestStatus};
pub use service::{ApiPulse, ManualRunReport};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序展示名称
pub const APP_DISPLAY_NAME: &str = "API Pulse";

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
