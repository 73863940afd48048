//! install-config.yaml 类型
//!
//! 只包含 Hive 生成安装配置时需要填写的字段。

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfig {
    pub api_version: String,
    pub metadata: InstallConfigMeta,
    pub base_domain: String,
    pub control_plane: InstallMachinePool,
    pub compute: Vec<InstallMachinePool>,
    pub networking: Networking,
    pub platform: InstallPlatform,
    pub pull_secret: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssh_key: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct InstallConfigMeta {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct InstallMachinePool {
    pub name: String,
    pub replicas: i64,
    pub platform: InstallMachinePoolPlatform,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct InstallMachinePoolPlatform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powervs: Option<PowerVsInstallMachinePool>,
}

/// 安装程序的 PowerVS 机器池，空值表示使用安装程序默认值
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PowerVsInstallMachinePool {
    #[serde(rename = "memoryGiB", default, skip_serializing_if = "Option::is_none")]
    pub memory_gib: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys_type: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    pub network_type: String,
    pub machine_network: Vec<CidrEntry>,
    pub cluster_network: Vec<ClusterNetworkEntry>,
    pub service_network: Vec<String>,
}

impl Default for Networking {
    fn default() -> Self {
        Self {
            network_type: "OVNKubernetes".to_string(),
            machine_network: vec![CidrEntry {
                cidr: "10.0.0.0/16".to_string(),
            }],
            cluster_network: vec![ClusterNetworkEntry {
                cidr: "10.128.0.0/14".to_string(),
                host_prefix: 23,
            }],
            service_network: vec!["172.30.0.0/16".to_string()],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CidrEntry {
    pub cidr: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkEntry {
    pub cidr: String,
    pub host_prefix: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct InstallPlatform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powervs: Option<PowerVsInstallPlatform>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PowerVsInstallPlatform {
    pub region: String,
    pub zone: String,
}
