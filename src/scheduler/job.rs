//! 计划任务的单次执行
//!
//! 负责运行项目测试、回写计划任务的运行状态，并以即发即弃的方式触发通知

use crate::model::Schedule;
use crate::notification::OutcomeNotifier;
use crate::probe::orchestrator::ProjectTester;
use crate::probe::result::{TestStatus, TriggerType};
use crate::store::Store;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 计划任务执行所需的依赖
pub(crate) struct JobContext {
    pub store: Arc<dyn Store>,
    pub tester: Arc<dyn ProjectTester>,
    pub notifier: Option<Arc<dyn OutcomeNotifier>>,
}

impl JobContext {
    /// 执行一次计划测试
    ///
    /// 测试失败不会向上抛出，只记录为 ERROR 运行状态。
    pub async fn run(self: Arc<Self>, schedule: Schedule) {
        info!(
            "执行计划任务 {} ({})，项目: {}",
            schedule.name, schedule.id, schedule.project_id
        );

        let outcome = match self
            .tester
            .test_project(&schedule.project_id, TriggerType::Scheduled, Some(&schedule.id))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("计划任务 {} 执行失败: {}", schedule.id, e);
                self.record_error(&schedule.id).await;
                return;
            }
        };

        let has_failures = outcome.has_failures();
        let status = if has_failures {
            TestStatus::Failed
        } else {
            TestStatus::Success
        };
        if let Err(e) = self
            .store
            .record_schedule_run(&schedule.id, Utc::now(), status)
            .await
        {
            warn!("记录计划任务 {} 运行状态失败: {}", schedule.id, e);
        }

        info!(
            "计划任务 {} 完成: {}/{} 通过",
            schedule.id,
            outcome.success_count,
            outcome.total_count()
        );

        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        if !schedule.wants_notification(has_failures) {
            return;
        }

        let project_name = match self.store.find_project(&schedule.project_id).await {
            Ok(Some(project)) => project.name,
            Ok(None) => schedule.project_id.clone(),
            Err(e) => {
                warn!("读取项目 {} 失败: {}", schedule.project_id, e);
                schedule.project_id.clone()
            }
        };

        tokio::spawn(async move {
            let report = notifier.notify(&project_name, &outcome).await;
            if report.failed_count() > 0 {
                warn!(
                    "项目 {} 的通知有 {} 个渠道投递失败",
                    project_name,
                    report.failed_count()
                );
            }
        });
    }

    /// 把计划任务的上次运行状态记为 ERROR
    pub async fn record_error(&self, schedule_id: &str) {
        if let Err(e) = self
            .store
            .record_schedule_run(schedule_id, Utc::now(), TestStatus::Error)
            .await
        {
            warn!("记录计划任务 {} 错误状态失败: {}", schedule_id, e);
        }
    }
}
