use std::fs;
use std::sync::Arc;

use agentguard_server::{
    cli::{Cli, Commands},
    collaborator::{LogExecutor, LogSink},
    config::{self, GuardConfig},
    logging, GuardServer,
};
use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    let _ = dotenvy::dotenv();

    // 解析命令行参数
    let cli = Cli::parse();

    // 处理子命令
    if let Some(command) = &cli.command {
        match command {
            Commands::GenerateConfig { path } => {
                return generate_config(path);
            }
            Commands::ValidateConfig { path } => {
                return validate_config(path);
            }
            Commands::ShowConfig => {
                return show_config(&cli);
            }
        }
    }

    // 快速读取 config.toml 的 [logging] 段（不加载完整配置）
    let early_log = config::load_early_logging_config(cli.config_file.as_deref());

    // 合并日志配置（优先级：CLI > config.toml > 默认值）
    let log_level = cli
        .get_log_level()
        .or(early_log.level)
        .unwrap_or_else(|| "info".to_string());
    let log_format = cli.get_log_format().or(early_log.format);

    logging::init_logging(&log_level, log_format.as_deref(), cli.quiet)?;

    tracing::info!("🚀 AgentGuard starting...");

    // 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    let config = GuardConfig::load(&cli).context("加载配置失败")?;

    if cli.dev {
        tracing::info!("🔧 开发模式已启用");
    }

    // 显示配置信息
    tracing::info!("📊 Guard Configuration:");
    tracing::info!("  - Guild: {}", config.guild_id);
    tracing::info!(
        "  - Monitored Channels: {}",
        if config.monitored_channels.is_empty() {
            "all".to_string()
        } else {
            format!("{:?}", config.monitored_channels)
        }
    );
    tracing::info!("  - Quarantine Role: {}", config.quarantine_role_name);
    tracing::info!(
        "  - Thresholds: warn={} throttle={} quarantine={}",
        config.warn_threshold,
        config.throttle_threshold,
        config.quarantine_threshold
    );
    tracing::info!("  - Throttle Duration: {}s", config.throttle_seconds);
    tracing::info!("  - Log Level: {}", config.log_level);

    // 默认协作方只写日志；真实部署替换为平台适配实现
    let server = GuardServer::new(&config, Arc::new(LogSink), Arc::new(LogExecutor));

    server.run().await.context("事件循环异常退出")?;
    Ok(())
}

/// 生成默认配置文件
fn generate_config(path: &str) -> Result<()> {
    fs::write(path, GuardConfig::default_toml_template())
        .with_context(|| format!("无法写入配置文件: {}", path))?;
    println!("✅ 默认配置已生成: {}", path);
    Ok(())
}

/// 验证配置文件
fn validate_config(path: &str) -> Result<()> {
    let config = GuardConfig::from_toml_file(path)?;
    config.validate()?;
    println!("✅ 配置文件有效: {}", path);
    Ok(())
}

/// 显示合并后的最终配置
fn show_config(cli: &Cli) -> Result<()> {
    let config = GuardConfig::load(cli)?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
