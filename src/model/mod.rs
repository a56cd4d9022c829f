//! 领域模型模块
//!
//! 定义项目、接口、计划任务和通知渠道等记录类型。这些记录由外部的
//! CRUD 层维护，核心引擎只读取（计划任务的运行状态字段除外）。

pub mod channel;
pub mod endpoint;
pub mod project;
pub mod schedule;

// 重新导出主要类型
pub use channel::{ChannelType, NotificationChannel};
pub use endpoint::{Endpoint, HttpMethod, ParamSpec, ParamType};
pub use project::{AuthConfig, AuthType, Project};
pub use schedule::Schedule;
