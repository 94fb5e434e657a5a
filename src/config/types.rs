//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::health::checker::{
    ClassificationPolicy, ClientOptions, ProbeProfile, TlsTrust, DEFAULT_USER_AGENT,
};
use crate::health::scheduler::{OverlapPolicy, ScheduleSettings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// 探测配置
    #[serde(default)]
    pub probe: ProbeConfig,
    /// 目标存储配置
    #[serde(default)]
    pub store: StoreConfig,
    /// Web 服务器配置
    #[serde(default)]
    pub web: WebConfig,
    /// 启动时写入存储的初始目标
    #[serde(default)]
    pub targets: Vec<TargetSeed>,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 巡检间隔（秒）
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// 启动时立即巡检一次
    #[serde(default)]
    pub run_sweep_on_startup: bool,
    /// 上一次巡检未结束时跳过新的周期
    #[serde(default)]
    pub skip_overlapping_sweeps: bool,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 日志文件路径，不配置时输出到控制台
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// 是否使用JSON日志格式
    #[serde(default)]
    pub log_json: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: default_sweep_interval(),
            run_sweep_on_startup: false,
            skip_overlapping_sweeps: false,
            log_level: default_log_level(),
            log_file: None,
            log_json: false,
        }
    }
}

impl GlobalConfig {
    /// 转换为调度参数
    pub fn schedule_settings(&self) -> ScheduleSettings {
        ScheduleSettings {
            interval: Duration::from_secs(self.sweep_interval_seconds),
            run_on_startup: self.run_sweep_on_startup,
            overlap: if self.skip_overlapping_sweeps {
                OverlapPolicy::SkipIfRunning
            } else {
                OverlapPolicy::Allow
            },
        }
    }
}

/// 探测配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeConfig {
    /// 请求头中的客户端标识
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// TLS信任模式
    #[serde(default)]
    pub tls_trust: TlsTrust,
    /// 定时巡检和单目标检测的超时时间（秒）
    #[serde(default = "default_scheduled_timeout")]
    pub scheduled_timeout_seconds: u64,
    /// 批量检测的超时时间（秒）
    #[serde(default = "default_bulk_timeout")]
    pub bulk_timeout_seconds: u64,
    /// 批量检测的分类策略
    #[serde(default = "default_bulk_policy")]
    pub bulk_policy: ClassificationPolicy,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            tls_trust: TlsTrust::default(),
            scheduled_timeout_seconds: default_scheduled_timeout(),
            bulk_timeout_seconds: default_bulk_timeout(),
            bulk_policy: default_bulk_policy(),
        }
    }
}

impl ProbeConfig {
    /// 定时巡检和单目标检测的探测参数
    pub fn scheduled_profile(&self) -> ProbeProfile {
        ProbeProfile {
            timeout: Duration::from_secs(self.scheduled_timeout_seconds),
            policy: ClassificationPolicy::AnyResponse,
        }
    }

    /// 批量检测的探测参数
    pub fn bulk_profile(&self) -> ProbeProfile {
        ProbeProfile {
            timeout: Duration::from_secs(self.bulk_timeout_seconds),
            policy: self.bulk_policy,
        }
    }

    /// HTTP客户端参数
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            tls_trust: self.tls_trust,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// JSON文件
    #[default]
    File,
    /// 仅内存，进程退出后丢失
    Memory,
}

/// 目标存储配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// 存储后端
    #[serde(default)]
    pub backend: StoreBackend,
    /// 存储文件路径
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// Web 服务器配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    /// 是否启用 Web 功能
    #[serde(default)]
    pub enabled: bool,
    /// 监听端口
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// 绑定地址
    #[serde(default = "default_web_bind_address")]
    pub bind_address: String,
    /// API密钥，配置后 `/api` 和 `/ws` 需要携带
    #[serde(default)]
    pub api_key: Option<String>,
    /// 是否允许跨域访问
    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_web_port(),
            bind_address: default_web_bind_address(),
            api_key: None,
            cors_enabled: default_cors_enabled(),
        }
    }
}

/// 配置文件中声明的初始目标
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetSeed {
    /// 显示名称
    pub title: String,
    /// 基础地址
    pub url: String,
    /// 健康检查路径
    #[serde(default)]
    pub endpoint: Option<String>,
}

// 默认值函数
fn default_sweep_interval() -> u64 {
    2 * 60 * 60
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_scheduled_timeout() -> u64 {
    10
}
fn default_bulk_timeout() -> u64 {
    5
}
fn default_bulk_policy() -> ClassificationPolicy {
    ClassificationPolicy::StrictSuccess
}
fn default_store_path() -> PathBuf {
    PathBuf::from("targets.json")
}
fn default_web_port() -> u16 {
    5000
}
fn default_web_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_cors_enabled() -> bool {
    true
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
    if config.global.sweep_interval_seconds == 0 {
        return Err("巡检间隔不能为0".to_string());
    }

    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.global.log_level, valid_log_levels
        ));
    }

    // 验证探测配置
    if config.probe.scheduled_timeout_seconds == 0 {
        return Err("定时巡检超时时间不能为0".to_string());
    }

    if config.probe.bulk_timeout_seconds == 0 {
        return Err("批量检测超时时间不能为0".to_string());
    }

    if config.probe.user_agent.trim().is_empty() {
        return Err("客户端标识不能为空".to_string());
    }

    // 验证存储配置
    if config.store.backend == StoreBackend::File && config.store.path.as_os_str().is_empty() {
        return Err("存储文件路径不能为空".to_string());
    }

    // 验证Web配置（如果启用）
    if config.web.enabled {
        if config.web.port == 0 {
            return Err("无效的Web服务器端口: 0，端口不能为0".to_string());
        }

        if config.web.bind_address.is_empty() {
            return Err("Web服务器绑定地址不能为空".to_string());
        }

        if let Some(ref key) = config.web.api_key {
            if key.trim().is_empty() {
                return Err("API密钥不能为空字符串".to_string());
            }
        }
    }

    // 验证初始目标
    for (index, target) in config.targets.iter().enumerate() {
        if target.title.trim().is_empty() {
            return Err(format!("第 {} 个目标的名称不能为空", index + 1));
        }

        if target.url.trim().is_empty() {
            return Err(format!("目标 {} 的地址不能为空", target.title));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        Config {
            targets: vec![TargetSeed {
                title: "Main API".to_string(),
                url: "api.example.com".to_string(),
                endpoint: Some("/health".to_string()),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_config_serialization() {
        let config = create_test_config();

        let serialized = toml::to_string(&config).expect("序列化失败");
        assert!(!serialized.is_empty());

        let deserialized: Config = toml::from_str(&serialized).expect("反序列化失败");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_validation() {
        assert!(validate_config(&create_test_config()).is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.global.sweep_interval_seconds, 7200);
        assert!(!config.global.run_sweep_on_startup);
        assert!(!config.global.skip_overlapping_sweeps);
        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.probe.user_agent, "ServerPulse-HealthCheck/1.0");
        assert_eq!(config.probe.tls_trust, TlsTrust::AcceptInvalidCerts);
        assert_eq!(config.probe.scheduled_timeout_seconds, 10);
        assert_eq!(config.probe.bulk_timeout_seconds, 5);
        assert_eq!(config.probe.bulk_policy, ClassificationPolicy::StrictSuccess);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert!(!config.web.enabled);
        assert_eq!(config.web.port, 5000);
        assert_eq!(config.web.bind_address, "0.0.0.0");
        assert!(config.targets.is_empty());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_profiles_follow_probe_config() {
        let probe = ProbeConfig::default();
        assert_eq!(probe.scheduled_profile(), ProbeProfile::scheduled());
        assert_eq!(probe.bulk_profile(), ProbeProfile::bulk());

        let probe = ProbeConfig {
            bulk_policy: ClassificationPolicy::AnyResponse,
            bulk_timeout_seconds: 3,
            ..Default::default()
        };
        let bulk = probe.bulk_profile();
        assert_eq!(bulk.policy, ClassificationPolicy::AnyResponse);
        assert_eq!(bulk.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_schedule_settings() {
        let global = GlobalConfig {
            sweep_interval_seconds: 60,
            skip_overlapping_sweeps: true,
            ..Default::default()
        };
        let settings = global.schedule_settings();
        assert_eq!(settings.interval, Duration::from_secs(60));
        assert_eq!(settings.overlap, OverlapPolicy::SkipIfRunning);
        assert!(!settings.run_on_startup);
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = create_test_config();
        config.global.sweep_interval_seconds = 0;

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("巡检间隔不能为0"));
    }

    #[test]
    fn test_config_validation_zero_timeouts() {
        let mut config = create_test_config();
        config.probe.scheduled_timeout_seconds = 0;
        assert!(validate_config(&config).is_err());

        let mut config = create_test_config();
        config.probe.bulk_timeout_seconds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = create_test_config();
        config.global.log_level = "verbose".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("无效的日志级别"));
    }

    #[test]
    fn test_config_validation_empty_target_fields() {
        let mut config = create_test_config();
        config.targets[0].url = "  ".to_string();
        assert!(validate_config(&config).unwrap_err().contains("地址不能为空"));

        let mut config = create_test_config();
        config.targets[0].title = String::new();
        assert!(validate_config(&config).unwrap_err().contains("名称不能为空"));
    }

    #[test]
    fn test_web_config_validation_invalid_port() {
        let mut config = create_test_config();
        config.web.enabled = true;
        config.web.port = 0;

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("端口不能为0"));
    }

    #[test]
    fn test_disabled_web_config_is_not_validated() {
        let mut config = create_test_config();
        config.web.port = 0;
        assert!(validate_config(&config).is_ok());
    }
}
