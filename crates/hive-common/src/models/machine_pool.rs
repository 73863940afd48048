//! MachinePool 自定义资源
//!
//! 描述远程集群上的一组工作节点，由 MachinePool 控制器转换为 MachineSet。

use k8s_openapi::api::core::v1::{LocalObjectReference, Taint};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{alibabacloud, powervs, Condition};

/// MachinePool 规范
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(group = "hive.openshift.io", version = "v1", kind = "MachinePool", namespaced)]
#[kube(status = "MachinePoolStatus")]
#[kube(printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".status.replicas"}"#)]
#[serde(rename_all = "camelCase")]
pub struct MachinePoolSpec {
    /// 所属的 ClusterDeployment
    pub cluster_deployment_ref: LocalObjectReference,

    /// 池名称，例如 worker
    pub name: String,

    /// 机器总数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,

    /// 云平台规格
    pub platform: MachinePoolPlatform,

    /// 添加到节点上的标签
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// 添加到节点上的污点
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
}

/// MachinePool 平台规格，同一时间只应设置一个
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct MachinePoolPlatform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powervs: Option<powervs::MachinePool>,
    #[serde(rename = "alibabacloud", default, skip_serializing_if = "Option::is_none")]
    pub alibaba_cloud: Option<alibabacloud::MachinePool>,
}

/// MachinePool 状态
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachinePoolStatus {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_sets: Vec<MachineSetStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// 单个 MachineSet 的状态摘要
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineSetStatus {
    pub name: String,
    pub replicas: i32,
}
