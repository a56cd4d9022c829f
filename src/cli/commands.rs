//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{Config, ConfigLoader, TomlConfigLoader};
use crate::error::Result;
use crate::notification::{DeliveryStatus, DispatchReport};
use crate::probe::{ProjectTestOutcome, TestResult};
use crate::service::{ApiPulse, ManualRunReport};
use crate::store::InMemoryStore;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载并验证配置文件
pub async fn load_config(config_path: &Path) -> Result<Config> {
    let loader = TomlConfigLoader::new(true);
    loader.load_from_file(config_path).await
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand {
    config: Config,
}

impl ValidateCommand {
    /// 使用已加载的配置创建命令
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let verbose = matches!(args.command, Commands::Validate { verbose: true });
        let config = &self.config;
        println!("验证配置文件: {}", args.get_config_path().display());

        if verbose {
            println!("配置验证通过！");
            println!("全局配置:");
            println!("  日志级别: {}", config.global.log_level);
            println!("  请求超时: {}秒", config.global.request_timeout_seconds);
            println!("  最大并发: {}", config.global.max_concurrent_probes);
            println!(
                "  邮件传输: {}",
                config
                    .global
                    .smtp
                    .as_ref()
                    .map(|smtp| format!("{}:{}", smtp.host, smtp.port))
                    .unwrap_or_else(|| "未配置".to_string())
            );

            println!("项目配置:");
            for (i, project) in config.projects.iter().enumerate() {
                let endpoints = config
                    .endpoints
                    .iter()
                    .filter(|e| e.project_id == project.id)
                    .count();
                println!("  {}. {} ({})", i + 1, project.name, project.base_url);
                println!("     接口数: {}", endpoints);
            }

            println!("计划任务:");
            for schedule in &config.schedules {
                println!(
                    "  - {} [{}] 项目: {} 启用: {}",
                    schedule.name,
                    schedule.cron_expression,
                    schedule.project_id,
                    if schedule.enabled { "是" } else { "否" }
                );
            }

            println!("通知渠道:");
            for channel in &config.channels {
                println!("  - {} ({})", channel.name, channel.channel_type);
            }
        } else {
            println!("✓ 配置文件验证通过");
            println!(
                "✓ 找到 {} 个项目, {} 个接口, {} 个计划任务, {} 个通知渠道",
                config.projects.len(),
                config.endpoints.len(),
                config.schedules.len(),
                config.channels.len()
            );
        }

        Ok(())
    }
}

/// 运行命令：启动调度器直到收到 Ctrl+C
pub struct RunCommand {
    config: Config,
}

impl RunCommand {
    /// 使用已加载的配置创建命令
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, _args: &Args) -> Result<()> {
        let store = Arc::new(InMemoryStore::from_config(&self.config).await);
        let engine = ApiPulse::bootstrap(&self.config, store).await?;

        let stats = engine.scheduler_stats().await;
        info!(
            "{} v{} 已启动，活跃计划任务 {} 个",
            crate::APP_DISPLAY_NAME,
            crate::VERSION,
            stats.active_timers
        );

        info!("等待关闭信号...");
        tokio::signal::ctrl_c().await?;
        info!("收到关闭信号");

        engine.shutdown().await;
        Ok(())
    }
}

/// 手动测试命令
pub struct TestCommand {
    config: Config,
}

impl TestCommand {
    /// 使用已加载的配置创建命令
    ///
    /// 手动测试不需要运行计划任务，配置中的计划任务会被忽略。
    pub fn new(mut config: Config) -> Self {
        config.schedules.clear();
        Self { config }
    }
}

#[async_trait]
impl Command for TestCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Test {
            project_id,
            endpoint,
            format,
        } = &args.command
        else {
            return Ok(());
        };

        let store = Arc::new(InMemoryStore::from_config(&self.config).await);
        let engine = ApiPulse::bootstrap(&self.config, store).await?;

        let outcome = match endpoint {
            Some(endpoint_id) => engine
                .test_endpoint(endpoint_id, None)
                .await
                .map(|result| print_result(&result, *format)),
            None => engine
                .run_tests(project_id)
                .await
                .map(|report| print_report(&report, *format)),
        };

        engine.shutdown().await;
        outcome?
    }
}

fn print_result(result: &TestResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => println!("{}", result_line(result)),
    }
    Ok(())
}

fn print_report(report: &ManualRunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            print_outcome(&report.outcome);
            if let Some(notifications) = &report.notifications {
                print_notifications(notifications);
            }
        }
    }
    Ok(())
}

fn result_line(result: &TestResult) -> String {
    let mut line = format!(
        "{:<7} {:<8} {} {} ({}ms)",
        result.status.to_string(),
        result.method.to_string(),
        result.request_url,
        result.status_code,
        result.response_time_ms
    );
    if let Some(error) = &result.error_message {
        line.push_str(&format!(" - {}", error));
    }
    line
}

fn print_outcome(outcome: &ProjectTestOutcome) {
    println!("项目: {}", outcome.project_id);
    for result in &outcome.results {
        println!("  {}", result_line(result));
    }
    println!(
        "总计 {} | 成功 {} | 失败 {} | 超时 {} | 成功率 {:.1}% | 平均响应 {}ms",
        outcome.total_count(),
        outcome.success_count,
        outcome.failed_count,
        outcome.timeout_count,
        outcome.success_rate(),
        outcome.average_response_time_ms
    );
}

fn print_notifications(report: &DispatchReport) {
    println!("通知:");
    for delivery in &report.deliveries {
        let status = match &delivery.status {
            DeliveryStatus::Delivered => "已发送".to_string(),
            DeliveryStatus::Skipped { reason } => format!("已跳过 ({})", reason),
            DeliveryStatus::Failed { error } => format!("失败 ({})", error),
        };
        println!(
            "  {} [{}]: {}",
            delivery.channel_name, delivery.channel_type, status
        );
    }
}
