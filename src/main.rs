//! API Pulse 主程序入口
//!
//! API 接口监控引擎

use anyhow::{Context, Result};
use api_pulse::cli::args::{Args, Commands};
use api_pulse::cli::commands::{
    load_config, Command, RunCommand, TestCommand, ValidateCommand, VersionCommand,
};
use api_pulse::config::GlobalConfig;
use api_pulse::logging::{LogConfig, LoggingSystem};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {:#}", e);
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 初始化日志系统，命令行指定的级别优先于配置文件
fn init_logging(args: &Args, global: Option<&GlobalConfig>) -> Result<()> {
    let mut log_config = global.map(LogConfig::from).unwrap_or_default();
    if let Some(level) = args.log_level {
        log_config.level = level.into();
    }

    LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;
    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    if let Commands::Version { .. } = &args.command {
        init_logging(args, None)?;
        return VersionCommand
            .execute(args)
            .await
            .map_err(|e| anyhow::anyhow!(e));
    }

    let config_path = args.get_config_path();
    let config = load_config(&config_path)
        .await
        .with_context(|| format!("加载配置文件失败: {}", config_path.display()))?;

    init_logging(args, Some(&config.global))?;
    info!("{} v{} 启动", api_pulse::APP_DISPLAY_NAME, api_pulse::VERSION);

    let command: Box<dyn Command> = match &args.command {
        Commands::Run => Box::new(RunCommand::new(config)),
        Commands::Test { .. } => Box::new(TestCommand::new(config)),
        Commands::Validate { .. } => Box::new(ValidateCommand::new(config)),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
}
