//! HiveConfig 自定义资源
//!
//! 单例的集群级配置对象（名称固定为 `hive`），其中 `spec.awsPrivateLink`
//! 记录了 PrivateLink 使用的端点 VPC 清单以及与之对等连接的关联 VPC。

use k8s_openapi::api::core::v1::LocalObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_HIVE_NAMESPACE;
use crate::models::ManageDnsConfig;

/// HiveConfig 规范
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(group = "hive.openshift.io", version = "v1", kind = "HiveConfig")]
#[kube(status = "HiveConfigStatus")]
#[serde(rename_all = "camelCase")]
pub struct HiveConfigSpec {
    /// Hive 组件部署的命名空间，为空时为 `hive`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,

    /// AWS PrivateLink 配置，为空表示未启用
    #[serde(rename = "awsPrivateLink", default, skip_serializing_if = "Option::is_none")]
    pub aws_private_link: Option<AwsPrivateLinkConfig>,

    /// 托管 DNS 域
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_domains: Vec<ManageDnsConfig>,
}

/// HiveConfig 状态
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HiveConfigStatus {
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub config_applied: bool,
}

/// AWS PrivateLink 配置
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsPrivateLinkConfig {
    /// Hub 账号凭据
    pub credentials_secret_ref: LocalObjectReference,

    /// 可用于创建 VPC 端点的 VPC 清单
    #[serde(rename = "endpointVPCInventory", default)]
    pub endpoint_vpc_inventory: Vec<AwsPrivateLinkInventory>,

    /// 需要访问 VPC 端点的关联 VPC（通常是 Hive 集群所在的 VPC）
    #[serde(rename = "associatedVPCs", default)]
    pub associated_vpcs: Vec<AwsAssociatedVpc>,

    /// 私有托管区使用的记录类型：Alias 或 ARecord
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_record_type: Option<String>,
}

/// VPC 的 ID 与区域
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct AwsPrivateLinkVpc {
    #[serde(rename = "vpcID")]
    pub vpc_id: String,
    pub region: String,
}

/// 端点 VPC 清单中的一项
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct AwsPrivateLinkInventory {
    #[serde(flatten)]
    pub aws_private_link_vpc: AwsPrivateLinkVpc,
    #[serde(default)]
    pub subnets: Vec<AwsPrivateLinkSubnet>,
}

/// 端点 VPC 中用于创建端点的子网
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct AwsPrivateLinkSubnet {
    #[serde(rename = "availabilityZone")]
    pub availability_zone: String,
    #[serde(rename = "subnetID")]
    pub subnet_id: String,
}

/// 关联 VPC
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct AwsAssociatedVpc {
    #[serde(flatten)]
    pub aws_private_link_vpc: AwsPrivateLinkVpc,
    /// 关联 VPC 位于其他账号时使用的凭据
    #[serde(rename = "credentialsSecretRef", default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret_ref: Option<LocalObjectReference>,
}

/// 在端点 VPC 清单中查找指定 VPC，返回其下标
pub fn find_vpc_in_inventory(vpc_id: &str, inventory: &[AwsPrivateLinkInventory]) -> Option<usize> {
    inventory
        .iter()
        .position(|item| item.aws_private_link_vpc.vpc_id == vpc_id)
}

/// Hive 组件所在的命名空间
pub fn hive_namespace(config: &HiveConfig) -> String {
    config
        .spec
        .target_namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .unwrap_or(DEFAULT_HIVE_NAMESPACE)
        .to_string()
}
