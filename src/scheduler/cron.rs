//! cron 表达式解析
//!
//! 使用秒在前的六段或七段格式（秒 分 时 日 月 周 [年]），时间按 UTC 计算。
//! `?` 与 `*` 等价。

use crate::error::ScheduleError;
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// 已校验的 cron 表达式
#[derive(Debug, Clone)]
pub struct CronSpec {
    expression: String,
    schedule: ::cron::Schedule,
}

impl CronSpec {
    /// 解析 cron 表达式
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let normalized = normalize(expression);
        let schedule =
            ::cron::Schedule::from_str(&normalized).map_err(|e| ScheduleError::InvalidCron {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// 原始表达式
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// 严格晚于 `after` 的下一次触发时间
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(after).next()
    }

    /// 从当前时间起的下一次触发时间
    pub fn next_from_now(&self) -> Option<DateTime<Utc>> {
        self.next_after(&Utc::now())
    }
}

/// 规范化表达式：合并空白，并把 `?` 替换为 `*`
fn normalize(expression: &str) -> String {
    expression
        .split_whitespace()
        .map(|field| if field == "?" { "*" } else { field })
        .collect::<Vec<_>>()
        .join(" ")
}
