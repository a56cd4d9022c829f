//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::model::{Endpoint, NotificationChannel, Project, Schedule};
use crate::scheduler::cron::CronSpec;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

/// 主配置结构，包含全局配置和目录数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// 项目列表
    #[serde(default)]
    pub projects: Vec<Project>,
    /// 接口列表
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// 计划任务列表
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    /// 通知渠道列表
    #[serde(default)]
    pub channels: Vec<NotificationChannel>,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// 响应体保存的最大字符数
    #[serde(default = "default_max_body_chars")]
    pub max_response_body_chars: usize,
    /// 最大并发探测数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_probes: usize,
    /// 计划任务下次运行时间的同步间隔（秒）
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_seconds: u64,
    /// 内存中保留的探测结果上限，超出后丢弃最旧的结果
    #[serde(default = "default_max_stored_results")]
    pub max_stored_results: usize,
    /// 是否输出到控制台
    #[serde(default = "default_log_console")]
    pub log_console: bool,
    /// 是否使用JSON格式输出日志
    #[serde(default)]
    pub log_json: bool,
    /// 日志文件路径
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// 模块级别日志，例如 `"api_pulse::probe" = "debug"`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub log_modules: HashMap<String, String>,
    /// 邮件传输配置
    pub smtp: Option<SmtpConfig>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            request_timeout_seconds: default_timeout(),
            max_response_body_chars: default_max_body_chars(),
            max_concurrent_probes: default_max_concurrent(),
            reconcile_interval_seconds: default_reconcile_interval(),
            max_stored_results: default_max_stored_results(),
            log_console: default_log_console(),
            log_json: false,
            log_file: None,
            log_modules: HashMap::new(),
            smtp: None,
        }
    }
}

impl GlobalConfig {
    /// 请求超时时间
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// 同步间隔
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_seconds)
    }
}

/// SMTP 邮件传输配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmtpConfig {
    /// SMTP 服务器地址
    pub host: String,
    /// SMTP 端口
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// 用户名
    pub username: Option<String>,
    /// 密码
    pub password: Option<String>,
    /// 是否使用 STARTTLS
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    /// 发件人地址
    pub from_email: String,
    /// 发件人名称
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

// 默认值函数
fn default_log_level() -> String {
    "info".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_body_chars() -> usize {
    10_000
}
fn default_max_concurrent() -> usize {
    50
}
fn default_reconcile_interval() -> u64 {
    60
}
fn default_max_stored_results() -> usize {
    10_000
}
fn default_log_console() -> bool {
    true
}
fn default_smtp_port() -> u16 {
    587
}
fn default_use_tls() -> bool {
    true
}
fn default_from_name() -> String {
    crate::APP_DISPLAY_NAME.to_string()
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证全局配置
    if config.global.request_timeout_seconds == 0 {
        return Err("请求超时时间不能为0".to_string());
    }

    if config.global.max_concurrent_probes == 0 {
        return Err("最大并发探测数不能为0".to_string());
    }

    if config.global.max_response_body_chars == 0 {
        return Err("响应体最大字符数不能为0".to_string());
    }

    if config.global.reconcile_interval_seconds == 0 {
        return Err("同步间隔不能为0".to_string());
    }

    if config.global.max_stored_results == 0 {
        return Err("探测结果保留上限不能为0".to_string());
    }

    if !config.global.log_console && config.global.log_file.is_none() {
        return Err("关闭控制台日志时必须配置日志文件".to_string());
    }

    // 验证日志级别
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.global.log_level, valid_log_levels
        ));
    }
    for (module, level) in &config.global.log_modules {
        if !valid_log_levels.contains(&level.as_str()) {
            return Err(format!("模块 {} 的日志级别无效: {}", module, level));
        }
    }

    if let Some(ref smtp) = config.global.smtp {
        if smtp.host.trim().is_empty() {
            return Err("SMTP服务器地址不能为空".to_string());
        }
        if smtp.from_email.trim().is_empty() {
            return Err("SMTP发件人地址不能为空".to_string());
        }
    }

    // 验证项目
    let mut project_ids = HashSet::new();
    for project in &config.projects {
        if project.id.trim().is_empty() {
            return Err("项目ID不能为空".to_string());
        }
        if !project_ids.insert(project.id.as_str()) {
            return Err(format!("项目ID重复: {}", project.id));
        }
        if !is_http_url(&project.base_url) {
            return Err(format!("项目 {} 的基础URL格式无效", project.id));
        }
    }

    // 验证接口
    for endpoint in &config.endpoints {
        if !project_ids.contains(endpoint.project_id.as_str()) {
            return Err(format!(
                "接口 {} 引用了不存在的项目 {}",
                endpoint.id, endpoint.project_id
            ));
        }
        if !(100..=599).contains(&endpoint.expected_status) {
            return Err(format!(
                "接口 {} 的期望状态码 {} 无效",
                endpoint.id, endpoint.expected_status
            ));
        }
    }

    // 验证计划任务
    for schedule in &config.schedules {
        if !project_ids.contains(schedule.project_id.as_str()) {
            return Err(format!(
                "计划任务 {} 引用了不存在的项目 {}",
                schedule.id, schedule.project_id
            ));
        }
        CronSpec::parse(&schedule.cron_expression)
            .map_err(|e| format!("计划任务 {} 的cron表达式无效: {}", schedule.id, e))?;
    }

    // 验证通知渠道
    for channel in &config.channels {
        if channel.channel_type.is_webhook() && !is_http_url(&channel.target) {
            return Err(format!("渠道 {} 的webhook URL格式无效", channel.id));
        }
        if channel.target.trim().is_empty() {
            return Err(format!("渠道 {} 的投递目标不能为空", channel.id));
        }
    }

    Ok(())
}
