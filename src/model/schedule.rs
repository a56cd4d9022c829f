//! 计划任务模型

use crate::probe::result::TestStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 按 cron 表达式定期测试一个项目的计划任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// 计划任务ID
    pub id: String,
    /// 所属项目ID
    pub project_id: String,
    /// 名称
    pub name: String,
    /// cron 表达式（秒 分 时 日 月 周 [年]）
    pub cron_expression: String,
    /// 是否启用
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 上次运行时间
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    /// 上次运行结果
    #[serde(default)]
    pub last_run_status: Option<TestStatus>,
    /// 下次运行时间
    #[serde(default)]
    pub next_run_at: Option<DateTime<Utc>>,
    /// 全部成功时是否通知
    #[serde(default)]
    pub notify_on_success: bool,
    /// 出现失败时是否通知
    #[serde(default = "default_true")]
    pub notify_on_failure: bool,
}

impl Schedule {
    /// 创建一个启用的计划任务
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        name: impl Into<String>,
        cron_expression: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            name: name.into(),
            cron_expression: cron_expression.into(),
            enabled: true,
            last_run_at: None,
            last_run_status: None,
            next_run_at: None,
            notify_on_success: false,
            notify_on_failure: true,
        }
    }

    /// 本次运行结果是否需要触发通知
    pub fn wants_notification(&self, has_failures: bool) -> bool {
        if has_failures {
            self.notify_on_failure
        } else {
            self.notify_on_success
        }
    }
}

fn default_true() -> bool {
    true
}
