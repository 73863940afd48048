//! ClusterDeployment 自定义资源
//!
//! 描述一个由 Hive 安装和管理的 OpenShift 集群。

use k8s_openapi::api::core::v1::LocalObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{alibabacloud, powervs, Condition};

/// ClusterDeployment 规范
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(group = "hive.openshift.io", version = "v1", kind = "ClusterDeployment", namespaced)]
#[kube(status = "ClusterDeploymentStatus")]
#[kube(shortname = "cd")]
#[kube(printcolumn = r#"{"name":"InfraID", "type":"string", "jsonPath":".spec.clusterMetadata.infraID"}"#)]
#[kube(printcolumn = r#"{"name":"PowerState", "type":"string", "jsonPath":".status.powerState"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDeploymentSpec {
    /// 集群名称
    pub cluster_name: String,

    /// 集群的基础域名
    pub base_domain: String,

    /// 云平台配置
    pub platform: Platform,

    /// 安装完成后填充的集群元数据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_metadata: Option<ClusterMetadata>,

    /// 安装配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning: Option<Provisioning>,

    /// Pull secret 引用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_secret_ref: Option<LocalObjectReference>,

    /// 是否由 Hive 管理集群的 DNS 区域
    #[serde(rename = "manageDNS", default)]
    pub manage_dns: bool,

    /// 集群是否已安装完成
    #[serde(default)]
    pub installed: bool,

    /// 期望的电源状态
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_state: Option<PowerState>,
}

/// 集群所在的云平台，同一时间只应设置一个
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powervs: Option<powervs::Platform>,
    #[serde(rename = "alibabacloud", default, skip_serializing_if = "Option::is_none")]
    pub alibaba_cloud: Option<alibabacloud::Platform>,
}

/// 集群元数据
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ClusterMetadata {
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    /// 安装程序生成的基础设施 ID，云资源的名称与标签都以它为前缀
    #[serde(rename = "infraID")]
    pub infra_id: String,
    #[serde(rename = "adminKubeconfigSecretRef")]
    pub admin_kubeconfig_secret_ref: LocalObjectReference,
    #[serde(rename = "adminPasswordSecretRef", default, skip_serializing_if = "Option::is_none")]
    pub admin_password_secret_ref: Option<LocalObjectReference>,
}

/// 安装配置
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Provisioning {
    /// 保存 install-config.yaml 的 Secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_config_secret_ref: Option<LocalObjectReference>,
    /// 安装使用的 release 镜像
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_image: Option<String>,
}

/// 集群电源状态
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum PowerState {
    Running,
    Hibernating,
    /// 仅出现在 status 中，表示正在从休眠中恢复
    Resuming,
}

/// ClusterDeployment 状态
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDeploymentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_state: Option<PowerState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ClusterDeployment {
    /// 集群的基础设施 ID，未安装时返回 None
    pub fn infra_id(&self) -> Option<&str> {
        self.spec
            .cluster_metadata
            .as_ref()
            .map(|metadata| metadata.infra_id.as_str())
            .filter(|id| !id.is_empty())
    }
}
