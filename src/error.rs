//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;
use uuid::Uuid;

/// Server Pulse 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum ServerPulseError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 目标存储相关错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 按需检测相关错误
    #[error("检测错误: {0}")]
    Check(#[from] CheckError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 目标存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 目标不存在（例如在巡检过程中被删除）
    #[error("目标不存在: {0}")]
    NotFound(Uuid),

    /// 存储文件读写失败
    #[error("存储文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    /// 存储内容序列化失败
    #[error("存储内容序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 存储不可用
    #[error("存储不可用: {0}")]
    Unavailable(String),
}

/// 按需检测错误类型
///
/// 只有结构性失败才会以错误形式返回给调用方，
/// 单个目标的探测失败总是转换为一次正常的观测记录。
#[derive(Error, Debug)]
pub enum CheckError {
    /// 请求检测的目标不存在
    #[error("Server not found: {0}")]
    NotFound(Uuid),

    /// 读取或写回目标失败
    #[error("存储访问失败: {0}")]
    Store(#[from] StoreError),
}

/// 探测失败原因
///
/// 不会向调用方抛出，而是被探测器转换为 `error`/`offline` 观测。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// 目标没有可用的地址
    #[error("invalid configuration")]
    Configuration,

    /// 网络、超时或TLS握手失败
    #[error("{0}")]
    Transport(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ServerPulseError>;
