//! 集群资源构建器
//!
//! 根据少量输入生成创建一个集群所需的全部 Kubernetes 对象：凭据 Secret、
//! pull secret、install-config Secret、ClusterDeployment 以及 worker MachinePool。
//! 云平台相关的部分由 `CloudBuilder` 实现提供。

pub mod install_config;
mod powervs;

pub use install_config::InstallConfig;
pub use powervs::PowerVsBuilder;

use k8s_openapi::api::core::v1::{LocalObjectReference, Secret};
use kube::api::ObjectMeta;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use hive_common::constants::{INSTALL_CONFIG_SECRET_KEY, PULL_SECRET_KEY};
use hive_common::{
    ClusterDeployment, ClusterDeploymentSpec, Error, MachinePool, MachinePoolSpec, Platform,
    Provisioning, Result,
};

use install_config::{InstallConfigMeta, InstallMachinePool};

/// 默认的控制平面节点数
const CONTROL_PLANE_REPLICAS: i64 = 3;

/// 构建器生成的对象
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClusterObject {
    Secret(Secret),
    ClusterDeployment(ClusterDeployment),
    MachinePool(MachinePool),
}

impl ClusterObject {
    /// 对象的 kind，用于日志
    pub fn kind(&self) -> &'static str {
        match self {
            ClusterObject::Secret(_) => "Secret",
            ClusterObject::ClusterDeployment(_) => "ClusterDeployment",
            ClusterObject::MachinePool(_) => "MachinePool",
        }
    }
}

/// 云平台相关的资源生成逻辑
pub trait CloudBuilder: Send + Sync {
    /// 生成云凭据 Secret
    fn generate_credentials_secret(&self, o: &Builder) -> Secret;

    /// 生成平台额外需要的对象
    fn generate_cloud_objects(&self, o: &Builder) -> Vec<ClusterObject>;

    /// ClusterDeployment 的平台配置
    fn get_cloud_platform(&self, o: &Builder) -> Platform;

    /// 填充 worker MachinePool 的平台规格
    fn add_machine_pool_platform(&self, o: &Builder, mp: &mut MachinePool);

    /// 填充 install-config 的平台部分
    fn add_install_config_platform(&self, o: &Builder, ic: &mut InstallConfig);

    /// 凭据 Secret 名称
    fn creds_secret_name(&self, o: &Builder) -> String;
}

/// 集群资源构建器
pub struct Builder {
    /// 集群名称，同时用作 ClusterDeployment 名称
    pub name: String,
    pub namespace: String,
    pub base_domain: String,
    pub worker_node_count: i64,
    /// dockerconfigjson 格式的 pull secret
    pub pull_secret: String,
    pub ssh_public_key: String,
    pub release_image: Option<String>,
    pub manage_dns: bool,
    /// 添加到 ClusterDeployment 的标签
    pub labels: BTreeMap<String, String>,
    pub cloud: Box<dyn CloudBuilder>,
}

impl Builder {
    /// 校验必填字段
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("namespace", &self.namespace),
            ("base domain", &self.base_domain),
            ("pull secret", &self.pull_secret),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(Error::Validation(format!("{field} is required")));
            }
        }
        if self.worker_node_count < 0 {
            return Err(Error::Validation("worker node count must not be negative".to_string()));
        }
        Ok(())
    }

    /// 生成全部对象
    pub fn build(&self) -> Result<Vec<ClusterObject>> {
        self.validate()?;

        let mut objects = vec![
            ClusterObject::Secret(self.cloud.generate_credentials_secret(self)),
            ClusterObject::Secret(self.generate_pull_secret()),
            ClusterObject::Secret(self.generate_install_config_secret()?),
            ClusterObject::ClusterDeployment(self.generate_cluster_deployment()),
            ClusterObject::MachinePool(self.generate_machine_pool()),
        ];
        objects.extend(self.cloud.generate_cloud_objects(self));

        debug!("为集群 {} 生成了 {} 个对象", self.name, objects.len());
        Ok(objects)
    }

    fn pull_secret_name(&self) -> String {
        format!("{}-pull-secret", self.name)
    }

    fn install_config_secret_name(&self) -> String {
        format!("{}-install-config", self.name)
    }

    fn object_meta(&self, name: String) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.namespace.clone()),
            ..Default::default()
        }
    }

    fn generate_pull_secret(&self) -> Secret {
        Secret {
            metadata: self.object_meta(self.pull_secret_name()),
            type_: Some("kubernetes.io/dockerconfigjson".to_string()),
            string_data: Some(BTreeMap::from([(
                PULL_SECRET_KEY.to_string(),
                self.pull_secret.clone(),
            )])),
            ..Default::default()
        }
    }

    /// 生成 install-config，pull secret 由 Hive 单独注入，这里留空
    pub fn generate_install_config(&self) -> InstallConfig {
        let mut ic = InstallConfig {
            api_version: "v1".to_string(),
            metadata: InstallConfigMeta {
                name: self.name.clone(),
            },
            base_domain: self.base_domain.clone(),
            control_plane: InstallMachinePool {
                name: "master".to_string(),
                replicas: CONTROL_PLANE_REPLICAS,
                platform: Default::default(),
            },
            compute: vec![InstallMachinePool {
                name: "worker".to_string(),
                replicas: self.worker_node_count,
                platform: Default::default(),
            }],
            networking: Default::default(),
            platform: Default::default(),
            pull_secret: String::new(),
            ssh_key: self.ssh_public_key.clone(),
        };
        self.cloud.add_install_config_platform(self, &mut ic);
        ic
    }

    fn generate_install_config_secret(&self) -> Result<Secret> {
        let ic = serde_yaml::to_string(&self.generate_install_config())
            .map_err(|e| Error::Serialization(format!("无法序列化 install-config: {e}")))?;
        Ok(Secret {
            metadata: self.object_meta(self.install_config_secret_name()),
            type_: Some("Opaque".to_string()),
            string_data: Some(BTreeMap::from([(INSTALL_CONFIG_SECRET_KEY.to_string(), ic)])),
            ..Default::default()
        })
    }

    fn generate_cluster_deployment(&self) -> ClusterDeployment {
        let mut cd = ClusterDeployment::new(
            &self.name,
            ClusterDeploymentSpec {
                cluster_name: self.name.clone(),
                base_domain: self.base_domain.clone(),
                platform: self.cloud.get_cloud_platform(self),
                provisioning: Some(Provisioning {
                    install_config_secret_ref: Some(LocalObjectReference {
                        name: Some(self.install_config_secret_name()),
                    }),
                    release_image: self.release_image.clone(),
                }),
                pull_secret_ref: Some(LocalObjectReference {
                    name: Some(self.pull_secret_name()),
                }),
                manage_dns: self.manage_dns,
                ..Default::default()
            },
        );
        cd.metadata.namespace = Some(self.namespace.clone());
        if !self.labels.is_empty() {
            cd.metadata.labels = Some(self.labels.clone());
        }
        cd
    }

    fn generate_machine_pool(&self) -> MachinePool {
        let mut mp = MachinePool::new(
            &format!("{}-worker", self.name),
            MachinePoolSpec {
                cluster_deployment_ref: LocalObjectReference {
                    name: Some(self.name.clone()),
                },
                name: "worker".to_string(),
                replicas: Some(self.worker_node_count),
                ..Default::default()
            },
        );
        mp.metadata.namespace = Some(self.namespace.clone());
        self.cloud.add_machine_pool_platform(self, &mut mp);
        mp
    }
}
