//! 数据模型模块
//!
//! 该模块定义了 Hive 使用的自定义资源与平台配置类型，字段名与
//! `hive.openshift.io/v1` API 的 JSON 表示保持一致。

pub mod alibabacloud;
pub mod cluster_deployment;
pub mod dns;
pub mod hive_config;
pub mod machine_pool;
pub mod machine_set;
pub mod powervs;

pub use cluster_deployment::*;
pub use dns::*;
pub use hive_config::*;
pub use machine_pool::*;
pub use machine_set::*;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 资源状态条件，ClusterDeployment 与 MachinePool 共用
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// 条件类型
    #[serde(rename = "type")]
    pub type_: String,
    /// True、False 或 Unknown
    pub status: String,
    /// 机器可读的原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// 人类可读的说明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 上次状态变化时间（RFC3339）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    /// 创建一个带当前时间戳的条件
    pub fn new(type_: &str, status: bool, reason: &str, message: impl Into<String>) -> Self {
        Self {
            type_: type_.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            reason: Some(reason.to_string()),
            message: Some(message.into()),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// 设置或替换同类型的条件，状态未变化时保留原有的变化时间
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time.clone();
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}
