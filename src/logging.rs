use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 单行紧凑格式（默认）
    Compact,
    /// 多行展开格式（适合开发环境）
    Pretty,
    /// JSON 格式（适合生产环境）
    Json,
}

impl LogFormat {
    fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("json") => LogFormat::Json,
            Some("pretty") | Some("dev") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// 初始化日志系统
///
/// 环境变量 RUST_LOG 优先于传入的级别；静默模式下只输出错误。
pub fn init_logging(log_level: &str, log_format: Option<&str>, quiet: bool) -> Result<()> {
    let level = if quiet { "error" } else { log_level };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match LogFormat::from_name(log_format) {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
    }

    Ok(())
}
