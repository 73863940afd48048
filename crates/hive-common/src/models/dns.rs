//! 托管 DNS 配置类型

use k8s_openapi::api::core::v1::LocalObjectReference;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 一组由 Hive 托管的 DNS 域以及操作这些域所需的云凭据
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManageDnsConfig {
    /// 托管的域名列表，集群的 baseDomain 必须是其中某个域的子域
    pub domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<ManageDnsAwsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<ManageDnsGcpConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<ManageDnsAzureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ibm: Option<ManageDnsIbmConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManageDnsAwsConfig {
    pub credentials_secret_ref: LocalObjectReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManageDnsGcpConfig {
    pub credentials_secret_ref: LocalObjectReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManageDnsAzureConfig {
    pub credentials_secret_ref: LocalObjectReference,
    pub resource_group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManageDnsIbmConfig {
    pub credentials_secret_ref: LocalObjectReference,
}
