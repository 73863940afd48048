//! PowerVS 集群资源生成

use k8s_openapi::api::core::v1::{LocalObjectReference, Secret};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

use hive_common::constants::POWERVS_API_KEY_SECRET_KEY;
use hive_common::{powervs, MachinePool, Platform};

use super::install_config::{InstallConfig, PowerVsInstallMachinePool, PowerVsInstallPlatform};
use super::{Builder, CloudBuilder, ClusterObject};

/// PowerVS 集群资源生成逻辑
#[derive(Debug, Clone, Default)]
pub struct PowerVsBuilder {
    /// PowerVS API Key
    pub api_key: String,
    /// 集群所在的 PowerVS 区域
    pub region: String,
    /// 集群所在的 PowerVS 可用区
    pub zone: String,
}

impl CloudBuilder for PowerVsBuilder {
    fn generate_credentials_secret(&self, o: &Builder) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(self.creds_secret_name(o)),
                namespace: Some(o.namespace.clone()),
                ..Default::default()
            },
            type_: Some("Opaque".to_string()),
            // 安装程序通过 IBMCLOUD_API_KEY 环境变量读取该值
            string_data: Some(BTreeMap::from([(
                POWERVS_API_KEY_SECRET_KEY.to_string(),
                self.api_key.clone(),
            )])),
            ..Default::default()
        }
    }

    fn generate_cloud_objects(&self, _o: &Builder) -> Vec<ClusterObject> {
        Vec::new()
    }

    fn get_cloud_platform(&self, o: &Builder) -> Platform {
        Platform {
            powervs: Some(powervs::Platform {
                credentials_secret_ref: LocalObjectReference {
                    name: Some(self.creds_secret_name(o)),
                },
                region: self.region.clone(),
                zone: self.zone.clone(),
            }),
            ..Default::default()
        }
    }

    fn add_machine_pool_platform(&self, _o: &Builder, mp: &mut MachinePool) {
        mp.spec.platform.powervs = Some(powervs::MachinePool {
            memory_gib: 32,
            processors: IntOrString::String("0.5".to_string()),
            sys_type: "s922".to_string(),
            ..Default::default()
        });
    }

    fn add_install_config_platform(&self, _o: &Builder, ic: &mut InstallConfig) {
        ic.platform.powervs = Some(PowerVsInstallPlatform {
            region: self.region.clone(),
            zone: self.zone.clone(),
        });
        // 控制平面与工作节点共用同一个机器池配置
        let mpp = PowerVsInstallMachinePool::default();
        ic.control_plane.platform.powervs = Some(mpp.clone());
        if let Some(compute) = ic.compute.first_mut() {
            compute.platform.powervs = Some(mpp);
        }
    }

    fn creds_secret_name(&self, o: &Builder) -> String {
        format!("{}-powervs-creds", o.name)
    }
}
