//! PowerVS 平台类型
//!
//! 所有 MachineSet 共享的 PowerVS 全局配置以及 MachinePool 的 PowerVS 规格。

use k8s_openapi::api::core::v1::LocalObjectReference;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Power VS 平台名称
pub const NAME: &str = "powervs";

/// 所有 MachineSet 使用的 PowerVS 全局配置
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    /// 引用保存 IBM Cloud 账号凭据的 Secret
    pub credentials_secret_ref: LocalObjectReference,
    /// 集群所在的 PowerVS 区域
    pub region: String,
    /// 集群所在的 PowerVS 可用区
    pub zone: String,
}

/// MachinePool 的 PowerVS 规格
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachinePool {
    /// 机器分布的可用区，为空时使用区域内的全部可用区
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
    /// 内存大小（GiB）
    #[serde(rename = "memoryGiB", default)]
    pub memory_gib: i32,
    /// 处理器类型：Dedicated、Shared 或 Capped
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proc_type: String,
    /// 处理器数量，可以是小数，例如 "0.5"
    pub processors: IntOrString,
    /// 系统类型，例如 s922、e980
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sys_type: String,
    /// 附加的存储卷 ID
    #[serde(rename = "volumeIDs", default, skip_serializing_if = "Vec::is_empty")]
    pub volume_ids: Vec<String>,
}

impl Default for MachinePool {
    fn default() -> Self {
        Self {
            zones: Vec::new(),
            memory_gib: 0,
            proc_type: String::new(),
            processors: IntOrString::String(String::new()),
            sys_type: String::new(),
            volume_ids: Vec::new(),
        }
    }
}

/// 将 processors 渲染为安装程序和 Machine API 接受的字符串
pub fn processors_string(processors: &IntOrString) -> String {
    match processors {
        IntOrString::Int(n) => n.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_wire_format() {
        let platform: Platform = serde_json::from_value(serde_json::json!({
            "credentialsSecretRef": {"name": "powervs-credentials"},
            "region": "dal",
            "zone": "dal12"
        }))
        .unwrap();

        assert_eq!(platform.credentials_secret_ref.name.as_deref(), Some("powervs-credentials"));
        assert_eq!(platform.region, "dal");
        assert_eq!(platform.zone, "dal12");
    }

    #[test]
    fn test_machine_pool_field_names() {
        let pool = MachinePool {
            memory_gib: 32,
            processors: IntOrString::String("0.5".to_string()),
            sys_type: "s922".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&pool).unwrap();
        assert_eq!(value["memoryGiB"], 32);
        assert_eq!(value["processors"], "0.5");
        assert!(value.get("zones").is_none());
        assert_eq!(processors_string(&IntOrString::Int(2)), "2");
    }
}
