//! OpenShift Machine API 类型
//!
//! MachinePool 控制器在远程集群上创建的 MachineSet，以及 PowerVS 的
//! providerSpec。这里只建模 Hive 需要写入的字段。

use k8s_openapi::api::core::v1::Taint;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// MachineSet 规范
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(group = "machine.openshift.io", version = "v1beta1", kind = "MachineSet", namespaced)]
#[kube(status = "MachineSetStatusInfo")]
#[serde(rename_all = "camelCase")]
pub struct MachineSetSpec {
    pub replicas: i32,
    pub selector: LabelSelector,
    pub template: MachineTemplateSpec,
}

/// MachineSet 状态
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineSetStatusInfo {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub ready_replicas: i32,
}

/// Machine 模板
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
pub struct MachineTemplateSpec {
    pub metadata: MachineTemplateMeta,
    pub spec: MachineSpec,
}

/// Machine 模板元数据
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
pub struct MachineTemplateMeta {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Machine 规范
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// 传递给节点的元数据
    #[serde(default)]
    pub metadata: MachineTemplateMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
    pub provider_spec: ProviderSpec,
}

/// 云厂商相关的机器配置
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
pub struct ProviderSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// PowerVS 资源引用，按 ID、名称或正则表达式匹配
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(tag = "type")]
pub enum PowerVsResource {
    #[serde(rename = "ID")]
    Id { id: String },
    #[serde(rename = "Name")]
    Name { name: String },
    #[serde(rename = "RegEx")]
    RegEx { regex: String },
}

/// Secret 名称引用
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct SecretName {
    pub name: String,
}

/// PowerVS 的 providerSpec 内容
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PowerVsMachineProviderConfig {
    pub api_version: String,
    pub kind: String,
    pub service_instance: PowerVsResource,
    pub image: PowerVsResource,
    pub network: PowerVsResource,
    pub key_pair_name: String,
    pub system_type: String,
    pub processor_type: String,
    pub processors: String,
    #[serde(rename = "memoryGiB")]
    pub memory_gib: i32,
    pub user_data_secret: SecretName,
    pub credentials_secret: SecretName,
}
