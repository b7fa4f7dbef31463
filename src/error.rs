use std::error::Error as StdError;
use std::fmt;

/// 引擎错误类型
///
/// 核心评分路径不产生致命错误（历史不足降级、验证失败返回 false），
/// 这里只覆盖进程边界：配置、事件接入、序列化、I/O。
#[derive(Debug)]
pub enum GuardError {
    /// 配置错误
    Configuration(String),
    /// 非法事件（无法解析的入站事件）
    InvalidEvent(String),
    /// 序列化错误
    Serialization(String),
    /// I/O 错误
    Io(String),
    /// 内部错误
    Internal(String),
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            GuardError::InvalidEvent(msg) => write!(f, "Invalid event: {}", msg),
            GuardError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            GuardError::Io(msg) => write!(f, "I/O error: {}", msg),
            GuardError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for GuardError {}

impl From<std::io::Error> for GuardError {
    fn from(err: std::io::Error) -> Self {
        GuardError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::Serialization(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, GuardError>;
