//! 存储接口模块
//!
//! 持久化层由外部注入，核心引擎只依赖这里定义的查询与追加操作。

pub mod memory;

use crate::error::StoreError;
use crate::model::{Endpoint, NotificationChannel, Project, Schedule};
use crate::probe::result::{TestResult, TestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::InMemoryStore;

/// 存储操作结果
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 核心引擎使用的记录存储
#[async_trait]
pub trait Store: Send + Sync {
    /// 按ID查找项目
    async fn find_project(&self, id: &str) -> StoreResult<Option<Project>>;

    /// 按ID查找接口
    async fn find_endpoint(&self, id: &str) -> StoreResult<Option<Endpoint>>;

    /// 查找项目下所有启用的接口
    async fn find_enabled_endpoints(&self, project_id: &str) -> StoreResult<Vec<Endpoint>>;

    /// 按ID查找计划任务
    async fn find_schedule(&self, id: &str) -> StoreResult<Option<Schedule>>;

    /// 查找所有启用的计划任务
    async fn find_enabled_schedules(&self) -> StoreResult<Vec<Schedule>>;

    /// 查找所有启用的通知渠道
    async fn find_enabled_channels(&self) -> StoreResult<Vec<NotificationChannel>>;

    /// 追加一条探测结果
    async fn append_result(&self, result: &TestResult) -> StoreResult<()>;

    /// 查找项目的所有探测结果
    async fn find_results(&self, project_id: &str) -> StoreResult<Vec<TestResult>>;

    /// 记录计划任务的运行时间和结果
    async fn record_schedule_run(
        &self,
        id: &str,
        ran_at: DateTime<Utc>,
        status: TestStatus,
    ) -> StoreResult<()>;

    /// 更新计划任务的下次运行时间
    async fn set_schedule_next_run(
        &self,
        id: &str,
        next_run_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;

    /// 更新计划任务的启用状态
    async fn set_schedule_enabled(&self, id: &str, enabled: bool) -> StoreResult<()>;
}
