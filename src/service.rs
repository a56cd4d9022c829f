//! 服务门面模块
//!
//! 负责组件初始化和生命周期管理，并向调用方暴露手动测试、计划任务管理和统计查询操作。

use crate::config::Config;
use crate::error::{ApiPulseError, Result};
use crate::model::Schedule;
use crate::notification::{
    DispatchReport, MailTransport, NotificationDispatcher, OutcomeNotifier, SmtpMailer,
};
use crate::probe::{
    EndpointProber, HttpProber, ProjectTestOutcome, ProjectTester, RuntimeOverrides,
    TestOrchestrator, TestResult, TestStats, TriggerType,
};
use crate::scheduler::{CronScheduler, SchedulerStats};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 手动测试报告
#[derive(Debug, Clone, Serialize)]
pub struct ManualRunReport {
    /// 项目测试结果
    pub outcome: ProjectTestOutcome,
    /// 各渠道的投递结果，没有失败时不发送通知
    pub notifications: Option<DispatchReport>,
}

/// 组件依赖，便于在测试中替换探测器和通知器
pub struct Components {
    pub store: Arc<dyn Store>,
    pub prober: Arc<dyn EndpointProber>,
    pub notifier: Arc<dyn OutcomeNotifier>,
    pub max_concurrent_probes: usize,
    pub reconcile_interval: Duration,
}

/// API Pulse 引擎
pub struct ApiPulse {
    store: Arc<dyn Store>,
    prober: Arc<dyn EndpointProber>,
    orchestrator: Arc<TestOrchestrator>,
    notifier: Arc<dyn OutcomeNotifier>,
    scheduler: Arc<CronScheduler>,
}

impl ApiPulse {
    /// 根据配置初始化所有组件并启动调度器
    ///
    /// # 参数
    /// * `config` - 已验证的配置
    /// * `store` - 记录存储
    pub async fn bootstrap(config: &Config, store: Arc<dyn Store>) -> Result<Self> {
        info!("初始化服务组件...");
        let global = &config.global;

        let prober = Arc::new(HttpProber::new(
            Arc::clone(&store),
            global.request_timeout(),
            global.max_response_body_chars,
        )?);

        let mailer: Option<Arc<dyn MailTransport>> = match &global.smtp {
            Some(smtp) => Some(Arc::new(SmtpMailer::new(smtp)?)),
            None => {
                warn!("未配置SMTP，邮件渠道将被跳过");
                None
            }
        };

        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::clone(&store),
            mailer,
            global.request_timeout(),
        )?);

        Self::with_components(Components {
            store,
            prober,
            notifier: dispatcher,
            max_concurrent_probes: global.max_concurrent_probes,
            reconcile_interval: global.reconcile_interval(),
        })
        .await
    }

    /// 使用给定组件初始化引擎并启动调度器
    pub async fn with_components(components: Components) -> Result<Self> {
        let Components {
            store,
            prober,
            notifier,
            max_concurrent_probes,
            reconcile_interval,
        } = components;

        let orchestrator = Arc::new(TestOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&prober),
            max_concurrent_probes,
        ));

        let scheduler = CronScheduler::start(
            Arc::clone(&store),
            orchestrator.clone(),
            Some(Arc::clone(&notifier)),
            reconcile_interval,
        )
        .await?;

        Ok(Self {
            store,
            prober,
            orchestrator,
            notifier,
            scheduler,
        })
    }

    /// 手动测试单个接口
    ///
    /// # 参数
    /// * `endpoint_id` - 接口ID
    /// * `overrides` - 运行时覆盖值
    pub async fn test_endpoint(
        &self,
        endpoint_id: &str,
        overrides: Option<&RuntimeOverrides>,
    ) -> Result<TestResult> {
        let endpoint = self.store.find_endpoint(endpoint_id).await?.ok_or_else(|| {
            ApiPulseError::EndpointNotFound {
                id: endpoint_id.to_string(),
            }
        })?;
        let project = self
            .store
            .find_project(&endpoint.project_id)
            .await?
            .ok_or_else(|| ApiPulseError::ProjectNotFound {
                id: endpoint.project_id.clone(),
            })?;

        self.prober
            .probe(&project, &endpoint, TriggerType::Manual, None, overrides)
            .await
    }

    /// 手动测试项目下所有启用的接口，不发送通知
    pub async fn test_project(&self, project_id: &str) -> Result<ProjectTestOutcome> {
        self.orchestrator
            .test_project(project_id, TriggerType::Manual, None)
            .await
    }

    /// 手动运行项目测试
    ///
    /// 项目不存在或没有启用的接口时返回错误；存在失败时等待通知投递完成。
    pub async fn run_tests(&self, project_id: &str) -> Result<ManualRunReport> {
        let project = self.store.find_project(project_id).await?.ok_or_else(|| {
            ApiPulseError::ProjectNotFound {
                id: project_id.to_string(),
            }
        })?;

        if self.store.find_enabled_endpoints(project_id).await?.is_empty() {
            return Err(ApiPulseError::NoEndpointsToTest {
                project_id: project_id.to_string(),
            });
        }

        let outcome = self.test_project(project_id).await?;
        let notifications = if outcome.has_failures() {
            Some(self.notifier.notify(&project.name, &outcome).await)
        } else {
            None
        };

        Ok(ManualRunReport {
            outcome,
            notifications,
        })
    }

    /// 注册计划任务
    pub async fn register_schedule(&self, schedule: Schedule) -> Result<Option<DateTime<Utc>>> {
        self.scheduler.register(schedule).await
    }

    /// 更新计划任务
    pub async fn update_schedule(&self, schedule: Schedule) -> Result<Option<DateTime<Utc>>> {
        self.scheduler.update(schedule).await
    }

    /// 删除计划任务的定时器
    pub async fn delete_schedule(&self, schedule_id: &str) -> bool {
        self.scheduler.delete(schedule_id).await
    }

    /// 暂停计划任务
    pub async fn pause_schedule(&self, schedule_id: &str) -> Result<()> {
        self.scheduler.pause(schedule_id).await
    }

    /// 恢复计划任务
    pub async fn resume_schedule(&self, schedule_id: &str) -> Result<Option<DateTime<Utc>>> {
        self.scheduler.resume(schedule_id).await
    }

    /// 项目的历史测试统计
    pub async fn test_stats(&self, project_id: &str) -> Result<TestStats> {
        let results = self.store.find_results(project_id).await?;
        Ok(TestStats::from_results(&results))
    }

    /// 项目下每个接口的最近一次结果，按接口ID排序
    pub async fn latest_results(&self, project_id: &str) -> Result<Vec<TestResult>> {
        let mut latest: BTreeMap<String, TestResult> = BTreeMap::new();
        for result in self.store.find_results(project_id).await? {
            match latest.get(&result.endpoint_id) {
                Some(existing) if existing.executed_at > result.executed_at => {}
                _ => {
                    latest.insert(result.endpoint_id.clone(), result);
                }
            }
        }
        Ok(latest.into_values().collect())
    }

    /// 调度器统计
    pub async fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats().await
    }

    /// 计划任务的下次触发时间
    pub async fn next_fire(&self, schedule_id: &str) -> Option<DateTime<Utc>> {
        self.scheduler.next_fire(schedule_id).await
    }

    /// 停止调度器
    pub async fn shutdown(&self) {
        info!("正在停止服务...");
        self.scheduler.shutdown().await;
        info!("服务已停止");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Endpoint, HttpMethod, Project};
    use crate::notification::NoOpNotifier;
    use crate::probe::result::fixtures::result;
    use crate::probe::TestStatus;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;

    struct StaticProber;

    #[async_trait]
    impl EndpointProber for StaticProber {
        async fn probe(
            &self,
            _project: &Project,
            endpoint: &Endpoint,
            _trigger: TriggerType,
            _schedule_id: Option<&str>,
            _overrides: Option<&RuntimeOverrides>,
        ) -> Result<TestResult> {
            Ok(result(&endpoint.id, TestStatus::Success, 200, 5))
        }
    }

    async fn engine(store: Arc<InMemoryStore>) -> ApiPulse {
        ApiPulse::with_components(Components {
            store,
            prober: Arc::new(StaticProber),
            notifier: Arc::new(NoOpNotifier),
            max_concurrent_probes: 4,
            reconcile_interval: Duration::from_secs(3600),
        })
        .await
        .unwrap()
    }

    fn project() -> Project {
        Project {
            id: "p1".to_string(),
            name: "Shop".to_string(),
            base_url: "http://localhost".to_string(),
            auth: Default::default(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_run_tests_unknown_project() {
        let engine = engine(Arc::new(InMemoryStore::new())).await;
        let err = engine.run_tests("ghost").await.unwrap_err();
        assert!(matches!(err, ApiPulseError::ProjectNotFound { .. }));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_tests_without_endpoints() {
        let store = Arc::new(InMemoryStore::new());
        store.put_project(project()).await;
        let engine = engine(store).await;

        let err = engine.run_tests("p1").await.unwrap_err();
        assert!(matches!(err, ApiPulseError::NoEndpointsToTest { .. }));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_clean_run_skips_notification() {
        let store = Arc::new(InMemoryStore::new());
        store.put_project(project()).await;
        store
            .put_endpoint(Endpoint::new("e1", "p1", HttpMethod::Get, "/health"))
            .await;
        let engine = engine(store).await;

        let report = engine.run_tests("p1").await.unwrap();
        assert_eq!(report.outcome.success_count, 1);
        assert!(report.notifications.is_none());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_test_endpoint_unknown_id() {
        let engine = engine(Arc::new(InMemoryStore::new())).await;
        let err = engine.test_endpoint("missing", None).await.unwrap_err();
        assert!(matches!(err, ApiPulseError::EndpointNotFound { .. }));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_latest_results_keeps_newest_per_endpoint() {
        let store = Arc::new(InMemoryStore::new());
        store.put_project(project()).await;
        store
            .put_endpoint(Endpoint::new("a", "p1", HttpMethod::Get, "/a"))
            .await;
        store
            .put_endpoint(Endpoint::new("b", "p1", HttpMethod::Get, "/b"))
            .await;

        let mut old = result("a", TestStatus::Failed, 500, 1);
        old.executed_at = Utc::now() - chrono::Duration::minutes(5);
        let newer = result("a", TestStatus::Success, 200, 1);
        let other = result("b", TestStatus::Timeout, 0, 1);
        for r in [&newer, &old, &other] {
            store.append_result(r).await.unwrap();
        }

        let engine = engine(store).await;
        let latest = engine.latest_results("p1").await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].endpoint_id, "a");
        assert_eq!(latest[0].status, TestStatus::Success);
        assert_eq!(latest[1].status, TestStatus::Timeout);

        let stats = engine.test_stats("p1").await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.timeout, 1);
        assert_eq!(stats.failed, 1);
        engine.shutdown().await;
    }
}
