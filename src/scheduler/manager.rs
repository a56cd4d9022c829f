//! cron 调度器
//!
//! 每个启用的计划任务对应一个定时任务，统一登记在以计划任务ID为键的表中。
//! 所有注册、更新、暂停、恢复和删除操作都持有同一把锁完成，保证同一ID
//! 任何时刻最多只有一个存活的定时任务。
//!
//! 每个计划任务另有一把运行锁，在定时任务重装后依然保留。新的定时任务必须
//! 等上一轮尚未结束的执行释放运行锁后才会触发。

use crate::error::{ApiPulseError, Result};
use crate::model::Schedule;
use crate::notification::OutcomeNotifier;
use crate::probe::orchestrator::ProjectTester;
use crate::scheduler::cron::CronSpec;
use crate::scheduler::job::JobContext;
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 默认的下次运行时间同步间隔
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

/// 调度器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// 运行中的定时任务数量
    pub active_timers: usize,
    /// 已暂停的计划任务数量
    pub paused_timers: usize,
    /// 累计安装的定时任务数量
    pub timers_installed: u64,
    /// 累计取消的定时任务数量
    pub timers_cancelled: u64,
}

/// 定时任务状态
enum TimerState {
    /// 运行中
    Active {
        handle: JoinHandle<()>,
        next_fire: watch::Receiver<Option<DateTime<Utc>>>,
    },
    /// 已暂停
    Paused,
}

/// 同一计划任务跨定时任务共享的运行锁
type RunGuard = Arc<Mutex<()>>;

/// 登记表中的一项
struct TimerEntry {
    schedule: Schedule,
    state: TimerState,
}

/// cron 调度器
pub struct CronScheduler {
    /// 记录存储
    store: Arc<dyn Store>,
    /// 计划任务执行上下文
    job: Arc<JobContext>,
    /// 定时任务登记表
    timers: Mutex<HashMap<String, TimerEntry>>,
    /// 各计划任务的运行锁，取消定时任务时不会移除
    run_guards: Mutex<HashMap<String, RunGuard>>,
    /// 累计安装数
    installed: AtomicU64,
    /// 累计取消数
    cancelled: AtomicU64,
    /// 后台同步任务
    reconciler: JoinHandle<()>,
}

impl CronScheduler {
    /// 启动调度器
    ///
    /// 返回前会把存储中所有启用的计划任务各注册一次，单个计划任务注册失败只记录日志。
    ///
    /// # 参数
    /// * `store` - 记录存储
    /// * `tester` - 项目测试器
    /// * `notifier` - 通知分发器（可选）
    /// * `reconcile_interval` - 下次运行时间同步间隔
    pub async fn start(
        store: Arc<dyn Store>,
        tester: Arc<dyn ProjectTester>,
        notifier: Option<Arc<dyn OutcomeNotifier>>,
        reconcile_interval: Duration,
    ) -> Result<Arc<Self>> {
        let job = Arc::new(JobContext {
            store: Arc::clone(&store),
            tester,
            notifier,
        });

        let scheduler = Arc::new_cyclic(|weak: &Weak<CronScheduler>| Self {
            store,
            job,
            timers: Mutex::new(HashMap::new()),
            run_guards: Mutex::new(HashMap::new()),
            installed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            reconciler: tokio::spawn(reconcile_loop(weak.clone(), reconcile_interval)),
        });

        scheduler.load_schedules().await?;
        Ok(scheduler)
    }

    /// 注册存储中所有启用的计划任务
    async fn load_schedules(&self) -> Result<()> {
        let schedules = self.store.find_enabled_schedules().await?;
        let mut timers = self.timers.lock().await;
        let mut loaded = 0usize;

        for schedule in schedules {
            match self.install(&mut timers, schedule.clone()).await {
                Ok(_) => loaded += 1,
                Err(e) => error!("加载计划任务 {} 失败: {}", schedule.name, e),
            }
        }

        info!("已加载 {} 个计划任务", loaded);
        Ok(())
    }

    /// 注册计划任务
    ///
    /// 已存在的同ID定时任务会先被取消。返回下次触发时间，计划任务未启用时为 None。
    pub async fn register(&self, schedule: Schedule) -> Result<Option<DateTime<Utc>>> {
        let mut timers = self.timers.lock().await;
        self.install(&mut timers, schedule).await
    }

    /// 更新计划任务
    ///
    /// 在同一临界区内取消旧定时任务并按新的表达式和启用状态安装新任务。
    pub async fn update(&self, schedule: Schedule) -> Result<Option<DateTime<Utc>>> {
        let mut timers = self.timers.lock().await;
        self.install(&mut timers, schedule).await
    }

    /// 删除计划任务的定时任务，记录本身由调用方删除
    ///
    /// 返回是否存在被取消的登记项。
    pub async fn delete(&self, schedule_id: &str) -> bool {
        let mut timers = self.timers.lock().await;
        match timers.remove(schedule_id) {
            Some(entry) => {
                self.cancel(entry);
                info!("已删除计划任务定时器: {}", schedule_id);
                true
            }
            None => false,
        }
    }

    /// 暂停计划任务
    ///
    /// 取消定时任务并持久化 `enabled = false`，清空下次运行时间。
    pub async fn pause(&self, schedule_id: &str) -> Result<()> {
        let mut timers = self.timers.lock().await;

        let schedule = match timers.remove(schedule_id) {
            Some(entry) => {
                let schedule = entry.schedule.clone();
                self.cancel(entry);
                schedule
            }
            None => self.load_schedule(schedule_id).await?,
        };

        self.store.set_schedule_enabled(schedule_id, false).await?;
        self.store.set_schedule_next_run(schedule_id, None).await?;

        timers.insert(
            schedule_id.to_string(),
            TimerEntry {
                schedule: Schedule {
                    enabled: false,
                    next_run_at: None,
                    ..schedule
                },
                state: TimerState::Paused,
            },
        );

        info!("已暂停计划任务: {}", schedule_id);
        Ok(())
    }

    /// 恢复计划任务
    ///
    /// 持久化 `enabled = true`，下次运行时间从当前时间重新计算。
    pub async fn resume(&self, schedule_id: &str) -> Result<Option<DateTime<Utc>>> {
        let mut timers = self.timers.lock().await;

        let mut schedule = self.load_schedule(schedule_id).await?;
        CronSpec::parse(&schedule.cron_expression)?;
        self.store.set_schedule_enabled(schedule_id, true).await?;
        schedule.enabled = true;

        let next = self.install(&mut timers, schedule).await?;
        info!("已恢复计划任务: {}", schedule_id);
        Ok(next)
    }

    /// 同步所有运行中定时任务的下次运行时间到存储
    ///
    /// 尚未注册定时任务的计划任务直接跳过。返回同步的数量。
    pub async fn reconcile(&self) -> Result<usize> {
        let schedules = self.store.find_enabled_schedules().await?;
        let timers = self.timers.lock().await;
        let mut refreshed = 0usize;

        for schedule in schedules {
            let Some(TimerEntry {
                state: TimerState::Active { next_fire, .. },
                ..
            }) = timers.get(&schedule.id)
            else {
                debug!("计划任务 {} 尚未注册定时器，跳过同步", schedule.id);
                continue;
            };

            let next = *next_fire.borrow();
            if let Some(next) = next {
                self.store.set_schedule_next_run(&schedule.id, Some(next)).await?;
                refreshed += 1;
            }
        }

        Ok(refreshed)
    }

    /// 查询计划任务当前的下次触发时间
    pub async fn next_fire(&self, schedule_id: &str) -> Option<DateTime<Utc>> {
        let timers = self.timers.lock().await;
        match timers.get(schedule_id) {
            Some(TimerEntry {
                state: TimerState::Active { next_fire, .. },
                ..
            }) => *next_fire.borrow(),
            _ => None,
        }
    }

    /// 是否存在运行中的定时任务
    pub async fn is_active(&self, schedule_id: &str) -> bool {
        let timers = self.timers.lock().await;
        matches!(
            timers.get(schedule_id),
            Some(TimerEntry {
                state: TimerState::Active { .. },
                ..
            })
        )
    }

    /// 获取调度器统计信息
    pub async fn stats(&self) -> SchedulerStats {
        let timers = self.timers.lock().await;
        let active_timers = timers
            .values()
            .filter(|entry| matches!(entry.state, TimerState::Active { .. }))
            .count();

        SchedulerStats {
            active_timers,
            paused_timers: timers.len() - active_timers,
            timers_installed: self.installed.load(Ordering::SeqCst),
            timers_cancelled: self.cancelled.load(Ordering::SeqCst),
        }
    }

    /// 停止调度器，取消所有定时任务
    pub async fn shutdown(&self) {
        self.reconciler.abort();
        let mut timers = self.timers.lock().await;
        for (_, entry) in timers.drain() {
            self.cancel(entry);
        }
        info!("cron 调度器已停止");
    }

    /// 读取计划任务记录
    async fn load_schedule(&self, schedule_id: &str) -> Result<Schedule> {
        self.store
            .find_schedule(schedule_id)
            .await?
            .ok_or_else(|| ApiPulseError::ScheduleNotFound {
                id: schedule_id.to_string(),
            })
    }

    /// 获取计划任务的运行锁，不存在时创建
    async fn run_guard(&self, schedule_id: &str) -> RunGuard {
        let mut guards = self.run_guards.lock().await;
        Arc::clone(
            guards
                .entry(schedule_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// 在持有登记表锁的情况下替换定时任务
    async fn install(
        &self,
        timers: &mut HashMap<String, TimerEntry>,
        schedule: Schedule,
    ) -> Result<Option<DateTime<Utc>>> {
        let spec = if schedule.enabled {
            Some(CronSpec::parse(&schedule.cron_expression)?)
        } else {
            None
        };

        if let Some(previous) = timers.remove(&schedule.id) {
            self.cancel(previous);
        }

        let Some(spec) = spec else {
            self.store.set_schedule_next_run(&schedule.id, None).await?;
            debug!("计划任务 {} 未启用，不安装定时器", schedule.id);
            return Ok(None);
        };

        let next = spec.next_from_now();
        self.store.set_schedule_next_run(&schedule.id, next).await?;

        let Some(first_fire) = next else {
            warn!(
                "计划任务 {} 的表达式 '{}' 没有后续触发时间",
                schedule.id,
                spec.expression()
            );
            return Ok(None);
        };

        let (tx, rx) = watch::channel(Some(first_fire));
        let guard = self.run_guard(&schedule.id).await;
        let handle = tokio::spawn(timer_loop(
            Arc::clone(&self.job),
            schedule.clone(),
            spec,
            first_fire,
            guard,
            tx,
        ));
        self.installed.fetch_add(1, Ordering::SeqCst);

        info!(
            "已安装计划任务 {} ({})，表达式: {}，下次运行: {}",
            schedule.name, schedule.id, schedule.cron_expression, first_fire
        );

        timers.insert(
            schedule.id.clone(),
            TimerEntry {
                schedule,
                state: TimerState::Active {
                    handle,
                    next_fire: rx,
                },
            },
        );

        Ok(Some(first_fire))
    }

    /// 取消登记项对应的定时任务
    fn cancel(&self, entry: TimerEntry) {
        if let TimerState::Active { handle, .. } = entry.state {
            handle.abort();
            self.cancelled.fetch_add(1, Ordering::SeqCst);
            debug!("已取消计划任务定时器: {}", entry.schedule.id);
        }
    }
}

impl Drop for CronScheduler {
    fn drop(&mut self) {
        self.reconciler.abort();
        for (_, entry) in self.timers.get_mut().drain() {
            if let TimerState::Active { handle, .. } = entry.state {
                handle.abort();
            }
        }
    }
}

/// 单个计划任务的定时循环
///
/// 每次触发前先取得运行锁，锁随执行任务一起移交，定时任务被取消后仍由执行任务
/// 持有到结束，因此同一计划任务的两次运行不会重叠。执行中的 panic 会被捕获并记录为 ERROR。
async fn timer_loop(
    job: Arc<JobContext>,
    schedule: Schedule,
    spec: CronSpec,
    first_fire: DateTime<Utc>,
    guard: RunGuard,
    next_fire: watch::Sender<Option<DateTime<Utc>>>,
) {
    let mut fire_at = first_fire;

    loop {
        let wait = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;

        let running = Arc::clone(&guard).lock_owned().await;
        let job_for_run = Arc::clone(&job);
        let scheduled = schedule.clone();
        let run = tokio::spawn(async move {
            let _running = running;
            job_for_run.run(scheduled).await;
        });
        if let Err(e) = run.await {
            if e.is_panic() {
                error!("计划任务 {} 执行时发生panic", schedule.id);
                job.record_error(&schedule.id).await;
            }
        }

        // 以本次触发时间为下限，避免时钟抖动导致重复触发
        let base = std::cmp::max(Utc::now(), fire_at);
        let Some(next) = spec.next_after(&base) else {
            warn!("计划任务 {} 没有后续触发时间，定时器退出", schedule.id);
            let _ = next_fire.send(None);
            if let Err(e) = job.store.set_schedule_next_run(&schedule.id, None).await {
                warn!("更新计划任务 {} 下次运行时间失败: {}", schedule.id, e);
            }
            return;
        };

        fire_at = next;
        let _ = next_fire.send(Some(next));
        if let Err(e) = job.store.set_schedule_next_run(&schedule.id, Some(next)).await {
            warn!("更新计划任务 {} 下次运行时间失败: {}", schedule.id, e);
        }
    }
}

/// 后台同步循环，调度器被释放后自动退出
async fn reconcile_loop(scheduler: Weak<CronScheduler>, period: Duration) {
    let period = period.max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        ticker.tick().await;
        let Some(scheduler) = scheduler.upgrade() else {
            return;
        };
        match scheduler.reconcile().await {
            Ok(refreshed) => debug!("已同步 {} 个计划任务的下次运行时间", refreshed),
            Err(e) => warn!("同步计划任务下次运行时间失败: {}", e),
        }
    }
}
