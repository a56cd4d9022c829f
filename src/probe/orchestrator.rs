//! 测试编排器
//!
//! 把项目下所有启用的接口并发分发给探测器，全部完成后再聚合统计

use crate::error::{ApiPulseError, Result};
use crate::model::{Endpoint, Project};
use crate::probe::prober::EndpointProber;
use crate::probe::result::{ProjectTestOutcome, TestResult, TriggerType};
use crate::store::Store;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// 默认同时进行的探测数量上限
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 50;

/// 项目级测试接口，计划任务和手动触发都通过它运行
#[async_trait]
pub trait ProjectTester: Send + Sync {
    /// 测试一个项目的所有启用接口
    ///
    /// 没有启用的接口时返回空结果而不是错误。
    async fn test_project(
        &self,
        project_id: &str,
        trigger: TriggerType,
        schedule_id: Option<&str>,
    ) -> Result<ProjectTestOutcome>;
}

/// 测试编排器
pub struct TestOrchestrator {
    /// 记录存储
    store: Arc<dyn Store>,
    /// 单接口探测器
    prober: Arc<dyn EndpointProber>,
    /// 全局并发上限，所有项目共享
    permits: Arc<Semaphore>,
}

impl TestOrchestrator {
    /// 创建新的编排器
    ///
    /// # 参数
    /// * `store` - 记录存储
    /// * `prober` - 单接口探测器
    /// * `max_concurrent_probes` - 同时进行的探测数量上限
    pub fn new(
        store: Arc<dyn Store>,
        prober: Arc<dyn EndpointProber>,
        max_concurrent_probes: usize,
    ) -> Self {
        Self {
            store,
            prober,
            permits: Arc::new(Semaphore::new(max_concurrent_probes.max(1))),
        }
    }

    /// 当前可用的探测许可数
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// 获取许可后探测单个接口
    async fn probe_with_permit(
        &self,
        project: &Project,
        endpoint: &Endpoint,
        trigger: TriggerType,
        schedule_id: Option<&str>,
    ) -> Result<TestResult> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| anyhow::anyhow!("探测许可已关闭: {}", e))?;
        self.prober
            .probe(project, endpoint, trigger, schedule_id, None)
            .await
    }
}

#[async_trait]
impl ProjectTester for TestOrchestrator {
    async fn test_project(
        &self,
        project_id: &str,
        trigger: TriggerType,
        schedule_id: Option<&str>,
    ) -> Result<ProjectTestOutcome> {
        let endpoints = self.store.find_enabled_endpoints(project_id).await?;
        if endpoints.is_empty() {
            tracing::info!("项目 {} 没有启用的接口，跳过测试", project_id);
            return Ok(ProjectTestOutcome::empty(project_id));
        }

        let project = self
            .store
            .find_project(project_id)
            .await?
            .ok_or_else(|| ApiPulseError::ProjectNotFound {
                id: project_id.to_string(),
            })?;

        tracing::info!(
            "开始测试项目 {}，共 {} 个接口（触发来源: {:?}）",
            project.name,
            endpoints.len(),
            trigger
        );

        let probes = endpoints
            .iter()
            .map(|endpoint| self.probe_with_permit(&project, endpoint, trigger, schedule_id));

        let results = futures::future::join_all(probes)
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let outcome = ProjectTestOutcome::from_results(project_id, results);
        tracing::info!(
            "项目 {} 测试完成: {}/{} 成功，{} 失败，{} 超时，平均 {}ms",
            project.name,
            outcome.success_count,
            outcome.total_count(),
            outcome.failed_count,
            outcome.timeout_count,
            outcome.average_response_time_ms
        );

        Ok(outcome)
    }
}
