//! Alibaba Cloud 平台类型

use k8s_openapi::api::core::v1::LocalObjectReference;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Alibaba Cloud 平台名称
pub const NAME: &str = "alibabacloud";

/// Alibaba Cloud 全局配置
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    /// 引用保存 AccessKey 的 Secret
    pub credentials_secret_ref: LocalObjectReference,
    /// 集群所在区域，例如 cn-hangzhou
    pub region: String,
}

/// MachinePool 的 Alibaba Cloud 规格
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachinePool {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system_disk_category: String,
    #[serde(default)]
    pub system_disk_size: i32,
    #[serde(rename = "imageID", default, skip_serializing_if = "String::is_empty")]
    pub image_id: String,
}
