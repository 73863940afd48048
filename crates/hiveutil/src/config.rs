//! hiveutil 配置
//!
//! 内置默认值，可以被可选的 YAML/JSON 配置文件以及 `HIVEUTIL__` 前缀的环境变量
//! 覆盖，例如 `HIVEUTIL__AWS__WAITER_TIMEOUT_SECONDS=900`。

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use hive_controller::utils::PollConfig;

const DEFAULTS: &str = r#"
aws:
  waiter_interval_seconds: 15
  waiter_timeout_seconds: 600
powervs:
  iam_endpoint: https://iam.cloud.ibm.com
  resource_controller_endpoint: https://resource-controller.cloud.ibm.com
  cis_endpoint: https://api.cis.cloud.ibm.com
  poll_interval_seconds: 15
  destroy_timeout_seconds: 1800
"#;

/// hiveutil 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveutilConfig {
    /// AWS 相关配置
    pub aws: AwsSettings,
    /// PowerVS / IBM Cloud 相关配置
    pub powervs: PowerVsSettings,
}

/// AWS 等待器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsSettings {
    pub waiter_interval_seconds: u64,
    pub waiter_timeout_seconds: u64,
}

/// IBM Cloud 接入点与销毁轮询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerVsSettings {
    pub iam_endpoint: String,
    pub resource_controller_endpoint: String,
    pub cis_endpoint: String,
    pub poll_interval_seconds: u64,
    pub destroy_timeout_seconds: u64,
}

impl AwsSettings {
    pub fn waiter(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.waiter_interval_seconds),
            timeout: Duration::from_secs(self.waiter_timeout_seconds),
        }
    }
}

impl PowerVsSettings {
    pub fn poll(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_seconds),
            timeout: Duration::from_secs(self.destroy_timeout_seconds),
        }
    }
}

impl HiveutilConfig {
    /// 加载配置，`path` 为空时只使用默认值和环境变量
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from_str(DEFAULTS, FileFormat::Yaml));

        if let Some(path) = path {
            let format = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml") | Some("yml") => FileFormat::Yaml,
                Some("json") => FileFormat::Json,
                _ => return Err(anyhow!("不支持的配置文件格式，仅支持 YAML 或 JSON")),
            };
            let file = path.to_str().ok_or_else(|| anyhow!("配置路径无效"))?;
            builder = builder.add_source(File::with_name(file).format(format));
        }

        builder
            .add_source(Environment::with_prefix("HIVEUTIL").separator("__").try_parsing(true))
            .build()
            .context("构建配置失败")?
            .try_deserialize::<HiveutilConfig>()
            .context("配置格式错误")
    }
}
