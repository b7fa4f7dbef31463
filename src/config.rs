//! 配置
//!
//! 优先级：命令行 > 环境变量（AGENTGUARD_ 前缀）> 配置文件 > 默认值。
//! 阈值必须满足 0 < warn < throttle < quarantine ≤ 1，加载时校验。

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::policy::Thresholds;

/// 引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// 监控的服务器（guild）ID
    pub guild_id: u64,
    /// 监控的频道列表（空 = 全部频道）
    pub monitored_channels: Vec<u64>,
    /// 隔离角色名（交给外部角色管理方）
    pub quarantine_role_name: String,

    /// 警告阈值
    pub warn_threshold: f64,
    /// 限速阈值
    pub throttle_threshold: f64,
    /// 隔离阈值
    pub quarantine_threshold: f64,
    /// 限速冷却时长（秒）
    pub throttle_seconds: i64,

    /// 日志级别
    pub log_level: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            guild_id: 0,
            monitored_channels: Vec::new(),
            quarantine_role_name: "Quarantined".to_string(),
            warn_threshold: 0.35,
            throttle_threshold: 0.55,
            quarantine_threshold: 0.75,
            throttle_seconds: 20,
            log_level: "info".to_string(),
        }
    }
}

impl GuardConfig {
    /// 按优先级加载完整配置（命令行 > 环境变量 > 配置文件 > 默认值）
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config_file {
            Some(path) => Self::from_toml_file(path)?,
            None if Path::new("config.toml").exists() => Self::from_toml_file("config.toml")?,
            None => Self::default(),
        };
        config.merge_from_env();
        config.merge_from_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("无法读取配置文件: {:?}", path.as_ref()))?;
        let toml_config: TomlConfig =
            toml::from_str(&content).with_context(|| "配置文件格式错误")?;
        Ok(toml_config.into())
    }

    /// 从环境变量合并配置（AGENTGUARD_ 前缀）
    pub fn merge_from_env(&mut self) {
        if let Ok(guild) = env::var("AGENTGUARD_GUILD_ID") {
            self.guild_id = guild.parse().unwrap_or(self.guild_id);
        }
        if let Ok(channels) = env::var("AGENTGUARD_MONITORED_CHANNEL_IDS") {
            self.monitored_channels = parse_csv_ids(&channels);
        }
        if let Ok(role) = env::var("AGENTGUARD_QUARANTINE_ROLE_NAME") {
            self.quarantine_role_name = role;
        }
        if let Ok(v) = env::var("AGENTGUARD_WARN_THRESHOLD") {
            self.warn_threshold = v.parse().unwrap_or(self.warn_threshold);
        }
        if let Ok(v) = env::var("AGENTGUARD_THROTTLE_THRESHOLD") {
            self.throttle_threshold = v.parse().unwrap_or(self.throttle_threshold);
        }
        if let Ok(v) = env::var("AGENTGUARD_QUARANTINE_THRESHOLD") {
            self.quarantine_threshold = v.parse().unwrap_or(self.quarantine_threshold);
        }
        if let Ok(v) = env::var("AGENTGUARD_THROTTLE_SECONDS") {
            self.throttle_seconds = v.parse().unwrap_or(self.throttle_seconds);
        }
        if let Ok(level) = env::var("AGENTGUARD_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// 从命令行参数合并配置
    pub fn merge_from_cli(&mut self, cli: &Cli) {
        if let Some(guild) = cli.guild_id {
            self.guild_id = guild;
        }
        if let Some(v) = cli.warn_threshold {
            self.warn_threshold = v;
        }
        if let Some(v) = cli.throttle_threshold {
            self.throttle_threshold = v;
        }
        if let Some(v) = cli.quarantine_threshold {
            self.quarantine_threshold = v;
        }
        if let Some(v) = cli.throttle_seconds {
            self.throttle_seconds = v;
        }
        if let Some(level) = cli.get_log_level() {
            self.log_level = level;
        }
    }

    /// 校验配置（阈值必须严格递增且落在 (0,1] 内）
    pub fn validate(&self) -> Result<()> {
        if self.warn_threshold <= 0.0 {
            bail!("warn_threshold 必须大于 0");
        }
        if self.warn_threshold >= self.throttle_threshold {
            bail!(
                "阈值必须满足 warn < throttle（当前 {} >= {}）",
                self.warn_threshold,
                self.throttle_threshold
            );
        }
        if self.throttle_threshold >= self.quarantine_threshold {
            bail!(
                "阈值必须满足 throttle < quarantine（当前 {} >= {}）",
                self.throttle_threshold,
                self.quarantine_threshold
            );
        }
        if self.quarantine_threshold > 1.0 {
            bail!("quarantine_threshold 不能超过 1.0");
        }
        if self.throttle_seconds <= 0 {
            bail!("throttle_seconds 必须大于 0");
        }
        Ok(())
    }

    /// 转成策略阈值
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            warn: self.warn_threshold,
            throttle: self.throttle_threshold,
            quarantine: self.quarantine_threshold,
        }
    }

    /// 默认配置文件模板（generate-config 子命令输出）
    pub fn default_toml_template() -> &'static str {
        r#"# AgentGuard 配置文件

[chat]
# 监控的服务器 ID
guild_id = 0
# 监控的频道列表（空 = 全部频道）
monitored_channels = []
# 隔离角色名
quarantine_role_name = "Quarantined"

[guard]
# 动作阈值：0 < warn < throttle < quarantine <= 1
warn_threshold = 0.35
throttle_threshold = 0.55
quarantine_threshold = 0.75
# 限速冷却时长（秒）
throttle_seconds = 20

[logging]
# 日志级别: trace, debug, info, warn, error
level = "info"
# 日志格式: compact, pretty, json
# format = "compact"
"#
    }
}

fn parse_csv_ids(s: &str) -> Vec<u64> {
    s.split(',').filter_map(|x| x.trim().parse().ok()).collect()
}

/// TOML 文件结构（分段，字段全部可选，缺省回落到默认值）
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    chat: TomlChatSection,
    #[serde(default)]
    guard: TomlGuardSection,
    #[serde(default)]
    logging: TomlLoggingSection,
}

#[derive(Debug, Default, Deserialize)]
struct TomlChatSection {
    guild_id: Option<u64>,
    monitored_channels: Option<Vec<u64>>,
    quarantine_role_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlGuardSection {
    warn_threshold: Option<f64>,
    throttle_threshold: Option<f64>,
    quarantine_threshold: Option<f64>,
    throttle_seconds: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlLoggingSection {
    level: Option<String>,
    format: Option<String>,
    file: Option<String>,
}

impl From<TomlConfig> for GuardConfig {
    fn from(t: TomlConfig) -> Self {
        let mut config = GuardConfig::default();
        if let Some(guild) = t.chat.guild_id {
            config.guild_id = guild;
        }
        if let Some(channels) = t.chat.monitored_channels {
            config.monitored_channels = channels;
        }
        if let Some(role) = t.chat.quarantine_role_name {
            config.quarantine_role_name = role;
        }
        if let Some(v) = t.guard.warn_threshold {
            config.warn_threshold = v;
        }
        if let Some(v) = t.guard.throttle_threshold {
            config.throttle_threshold = v;
        }
        if let Some(v) = t.guard.quarantine_threshold {
            config.quarantine_threshold = v;
        }
        if let Some(v) = t.guard.throttle_seconds {
            config.throttle_seconds = v;
        }
        if let Some(level) = t.logging.level {
            config.log_level = level;
        }
        config
    }
}

/// 早期日志配置（完整配置加载前读取 [logging] 段）
#[derive(Debug, Default)]
pub struct EarlyLoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<String>,
}

/// 只读 [logging] 段，不加载完整配置（日志要在配置校验前初始化）
pub fn load_early_logging_config(path: Option<&str>) -> EarlyLoggingConfig {
    let path = path.unwrap_or("config.toml");
    let Ok(content) = fs::read_to_string(path) else {
        return EarlyLoggingConfig::default();
    };
    let Ok(toml_config) = toml::from_str::<TomlConfig>(&content) else {
        return EarlyLoggingConfig::default();
    };
    EarlyLoggingConfig {
        level: toml_config.logging.level,
        format: toml_config.logging.format,
        file: toml_config.logging.file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GuardConfig::default().validate().is_ok());
    }

    #[test]
    fn test_threshold_ordering_enforced() {
        let mut config = GuardConfig::default();
        config.warn_threshold = 0.6;
        assert!(config.validate().is_err());

        let mut config = GuardConfig::default();
        config.quarantine_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = GuardConfig::default();
        config.throttle_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_template_round_trips() {
        let toml_config: TomlConfig =
            toml::from_str(GuardConfig::default_toml_template()).unwrap();
        let config: GuardConfig = toml_config.into();
        assert!(config.validate().is_ok());
        assert_eq!(config.warn_threshold, 0.35);
        assert_eq!(config.quarantine_role_name, "Quarantined");
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let toml_config: TomlConfig = toml::from_str("[guard]\nwarn_threshold = 0.4\n").unwrap();
        let config: GuardConfig = toml_config.into();
        assert_eq!(config.warn_threshold, 0.4);
        assert_eq!(config.throttle_threshold, 0.55);
        assert_eq!(config.throttle_seconds, 20);
    }

    #[test]
    fn test_parse_csv_ids() {
        assert_eq!(parse_csv_ids("1, 2,3"), vec![1, 2, 3]);
        assert_eq!(parse_csv_ids(""), Vec::<u64>::new());
        assert_eq!(parse_csv_ids("7,bad,8"), vec![7, 8]);
    }
}
