//! 内存存储实现
//!
//! 供命令行和测试使用，可由配置文件中的目录数据初始化。

use super::{Store, StoreResult};
use crate::config::Config;
use crate::error::StoreError;
use crate::model::{Endpoint, NotificationChannel, Project, Schedule};
use crate::probe::result::{TestResult, TestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// 默认保留的探测结果数量
pub const DEFAULT_MAX_STORED_RESULTS: usize = 10_000;

/// 基于 `RwLock<HashMap>` 的内存存储
///
/// 探测结果按写入顺序保存在有界队列中，超过上限时丢弃最旧的结果。
#[derive(Debug)]
pub struct InMemoryStore {
    projects: RwLock<HashMap<String, Project>>,
    endpoints: RwLock<HashMap<String, Endpoint>>,
    schedules: RwLock<HashMap<String, Schedule>>,
    channels: RwLock<HashMap<String, NotificationChannel>>,
    results: RwLock<VecDeque<TestResult>>,
    max_results: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_MAX_STORED_RESULTS)
    }
}

impl InMemoryStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建最多保留 `max_results` 条探测结果的空存储
    pub fn with_retention(max_results: usize) -> Self {
        Self {
            projects: RwLock::default(),
            endpoints: RwLock::default(),
            schedules: RwLock::default(),
            channels: RwLock::default(),
            results: RwLock::default(),
            max_results: max_results.max(1),
        }
    }

    /// 由配置中的目录数据初始化
    pub async fn from_config(config: &Config) -> Self {
        let store = Self::with_retention(config.global.max_stored_results);
        for project in &config.projects {
            store.put_project(project.clone()).await;
        }
        for endpoint in &config.endpoints {
            store.put_endpoint(endpoint.clone()).await;
        }
        for schedule in &config.schedules {
            store.put_schedule(schedule.clone()).await;
        }
        for channel in &config.channels {
            store.put_channel(channel.clone()).await;
        }
        store
    }

    /// 写入项目
    pub async fn put_project(&self, project: Project) {
        self.projects
            .write()
            .await
            .insert(project.id.clone(), project);
    }

    /// 写入接口
    pub async fn put_endpoint(&self, endpoint: Endpoint) {
        self.endpoints
            .write()
            .await
            .insert(endpoint.id.clone(), endpoint);
    }

    /// 写入计划任务
    pub async fn put_schedule(&self, schedule: Schedule) {
        self.schedules
            .write()
            .await
            .insert(schedule.id.clone(), schedule);
    }

    /// 写入通知渠道
    pub async fn put_channel(&self, channel: NotificationChannel) {
        self.channels
            .write()
            .await
            .insert(channel.id.clone(), channel);
    }

    /// 已保存的探测结果数量
    pub async fn result_count(&self) -> usize {
        self.results.read().await.len()
    }

    async fn update_schedule<F>(&self, id: &str, update: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Schedule),
    {
        let mut schedules = self.schedules.write().await;
        let schedule = schedules.get_mut(id).ok_or_else(|| StoreError::Missing {
            kind: "schedule",
            id: id.to_string(),
        })?;
        update(schedule);
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_project(&self, id: &str) -> StoreResult<Option<Project>> {
        Ok(self.projects.read().await.get(id).cloned())
    }

    async fn find_endpoint(&self, id: &str) -> StoreResult<Option<Endpoint>> {
        Ok(self.endpoints.read().await.get(id).cloned())
    }

    async fn find_enabled_endpoints(&self, project_id: &str) -> StoreResult<Vec<Endpoint>> {
        let endpoints = self.endpoints.read().await;
        let mut found: Vec<Endpoint> = endpoints
            .values()
            .filter(|e| e.project_id == project_id && e.enabled)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn find_schedule(&self, id: &str) -> StoreResult<Option<Schedule>> {
        Ok(self.schedules.read().await.get(id).cloned())
    }

    async fn find_enabled_schedules(&self) -> StoreResult<Vec<Schedule>> {
        let schedules = self.schedules.read().await;
        Ok(schedules.values().filter(|s| s.enabled).cloned().collect())
    }

    async fn find_enabled_channels(&self) -> StoreResult<Vec<NotificationChannel>> {
        let channels = self.channels.read().await;
        Ok(channels.values().filter(|c| c.enabled).cloned().collect())
    }

    async fn append_result(&self, result: &TestResult) -> StoreResult<()> {
        let known = self
            .endpoints
            .read()
            .await
            .contains_key(&result.endpoint_id);
        if !known {
            return Err(StoreError::Missing {
                kind: "endpoint",
                id: result.endpoint_id.clone(),
            });
        }
        let mut results = self.results.write().await;
        while results.len() >= self.max_results {
            results.pop_front();
        }
        results.push_back(result.clone());
        Ok(())
    }

    async fn find_results(&self, project_id: &str) -> StoreResult<Vec<TestResult>> {
        let results = self.results.read().await;
        Ok(results
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn record_schedule_run(
        &self,
        id: &str,
        ran_at: DateTime<Utc>,
        status: TestStatus,
    ) -> StoreResult<()> {
        self.update_schedule(id, |schedule| {
            schedule.last_run_at = Some(ran_at);
            schedule.last_run_status = Some(status);
        })
        .await
    }

    async fn set_schedule_next_run(
        &self,
        id: &str,
        next_run_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        self.update_schedule(id, |schedule| schedule.next_run_at = next_run_at)
            .await
    }

    async fn set_schedule_enabled(&self, id: &str, enabled: bool) -> StoreResult<()> {
        self.update_schedule(id, |schedule| schedule.enabled = enabled)
            .await
    }
}
