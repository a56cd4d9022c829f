//! 计划任务调度模块
//!
//! 按 cron 表达式定期触发项目测试

pub mod cron;
mod job;
pub mod manager;

pub use self::cron::CronSpec;
pub use manager::{CronScheduler, SchedulerStats, DEFAULT_RECONCILE_INTERVAL};
