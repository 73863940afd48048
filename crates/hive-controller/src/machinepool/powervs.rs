//! PowerVS MachinePool 执行器

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use hive_common::constants::*;
use hive_common::powervs::{self, processors_string};
use hive_common::{
    ClusterDeployment, Error, MachinePool, MachineSet, MachineSetSpec, MachineSpec,
    MachineTemplateMeta, MachineTemplateSpec, PowerVsMachineProviderConfig, PowerVsResource,
    ProviderSpec, Result, SecretName,
};

use super::{distribute_replicas, ensure_unique_zone_suffixes, zone_suffix, Actuator, WORKER_ROLE};
use crate::powervsclient::{self, PowerVsApi};

/// 远程集群上 Machine API 使用的 PowerVS 凭据 Secret
const MACHINE_API_CREDENTIALS_SECRET: &str = "powervs-credentials";

/// 为 PowerVS 集群生成 MachineSet
pub struct PowerVsActuator {
    powervs_client: Arc<dyn PowerVsApi>,
}

impl PowerVsActuator {
    /// 使用 ClusterDeployment 的凭据 Secret 创建执行器
    pub fn new(creds: &Secret) -> Result<Self> {
        let client = powervsclient::Client::from_secret(creds).map_err(|e| {
            warn!("无法使用 ClusterDeployment 的凭据创建 PowerVS 客户端: {}", e);
            Error::from(e)
        })?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// 使用现有客户端创建执行器
    pub fn with_client(powervs_client: Arc<dyn PowerVsApi>) -> Self {
        Self { powervs_client }
    }
}

#[async_trait]
impl Actuator for PowerVsActuator {
    async fn generate_machine_sets(
        &self,
        cd: &ClusterDeployment,
        pool: &MachinePool,
    ) -> Result<(Vec<MachineSet>, bool)> {
        let metadata = cd.spec.cluster_metadata.as_ref().ok_or_else(|| {
            Error::Validation("ClusterDeployment does not have cluster metadata".to_string())
        })?;
        let platform = cd
            .spec
            .platform
            .powervs
            .as_ref()
            .ok_or_else(|| Error::Validation("ClusterDeployment is not for PowerVS".to_string()))?;
        let pool_platform = pool
            .spec
            .platform
            .powervs
            .as_ref()
            .ok_or_else(|| Error::Validation("MachinePool is not for PowerVS".to_string()))?;

        let zones = if pool_platform.zones.is_empty() {
            self.powervs_client
                .get_vpc_zones_for_region(&platform.region)
                .await?
        } else {
            pool_platform.zones.clone()
        };
        if zones.is_empty() {
            return Err(Error::Validation(format!(
                "no zones returned for region {}",
                platform.region
            )));
        }
        ensure_unique_zone_suffixes(&zones)?;
        debug!("MachinePool {} 使用可用区 {:?}", pool.name_any(), zones);

        let infra_id = metadata.infra_id.as_str();
        let replicas = distribute_replicas(pool.spec.replicas.unwrap_or(0), zones.len())?;
        let provider_config = provider_config(infra_id, pool_platform);
        let provider_value = serde_json::to_value(&provider_config)?;

        let machine_sets = zones
            .iter()
            .zip(replicas)
            .map(|(zone, replicas)| {
                let name = format!("{}-{}-{}", infra_id, pool.spec.name, zone_suffix(zone));
                machine_set(&name, infra_id, pool, replicas, provider_value.clone())
            })
            .collect();

        Ok((machine_sets, true))
    }
}

fn provider_config(infra_id: &str, pool: &powervs::MachinePool) -> PowerVsMachineProviderConfig {
    PowerVsMachineProviderConfig {
        api_version: "machine.openshift.io/v1".to_string(),
        kind: "PowerVSMachineProviderConfig".to_string(),
        service_instance: PowerVsResource::Name {
            name: format!("{infra_id}-power-iaas"),
        },
        image: PowerVsResource::Name {
            name: format!("rhcos-{infra_id}"),
        },
        network: PowerVsResource::RegEx {
            regex: format!("^DHCPSERVER.*{infra_id}.*_Private$"),
        },
        key_pair_name: format!("{infra_id}-key"),
        system_type: pool.sys_type.clone(),
        processor_type: pool.proc_type.clone(),
        processors: processors_string(&pool.processors),
        memory_gib: pool.memory_gib,
        user_data_secret: SecretName {
            name: WORKER_USER_DATA_NAME.to_string(),
        },
        credentials_secret: SecretName {
            name: MACHINE_API_CREDENTIALS_SECRET.to_string(),
        },
    }
}

fn machine_set(
    name: &str,
    infra_id: &str,
    pool: &MachinePool,
    replicas: i32,
    provider_value: serde_json::Value,
) -> MachineSet {
    let selector_labels = BTreeMap::from([
        (MACHINE_CLUSTER_LABEL.to_string(), infra_id.to_string()),
        (MACHINE_SET_LABEL.to_string(), name.to_string()),
    ]);
    let mut template_labels = selector_labels.clone();
    template_labels.insert(MACHINE_ROLE_LABEL.to_string(), WORKER_ROLE.to_string());
    template_labels.insert(MACHINE_TYPE_LABEL.to_string(), WORKER_ROLE.to_string());

    let mut labels = BTreeMap::from([
        (MACHINE_CLUSTER_LABEL.to_string(), infra_id.to_string()),
        (MACHINE_POOL_NAME_LABEL.to_string(), pool.spec.name.clone()),
    ]);
    if let Some(cd_name) = &pool.spec.cluster_deployment_ref.name {
        labels.insert(CLUSTER_DEPLOYMENT_NAME_LABEL.to_string(), cd_name.clone());
    }

    MachineSet {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(MACHINE_API_NAMESPACE.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: MachineSetSpec {
            replicas,
            selector: LabelSelector {
                match_labels: Some(selector_labels),
                ..Default::default()
            },
            template: MachineTemplateSpec {
                metadata: MachineTemplateMeta {
                    labels: template_labels,
                },
                spec: MachineSpec {
                    metadata: MachineTemplateMeta {
                        labels: pool.spec.labels.clone(),
                    },
                    taints: pool.spec.taints.clone(),
                    provider_spec: ProviderSpec {
                        value: Some(provider_value),
                    },
                },
            },
        },
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use crate::powervsclient::MockPowerVsApi;
    use hive_common::{ClusterDeploymentSpec, ClusterMetadata, MachinePoolPlatform, MachinePoolSpec, Platform};
    use k8s_openapi::api::core::v1::LocalObjectReference;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use std::collections::HashMap;

    const TEST_INFRA_ID: &str = "test-infra-id";
    const TEST_REGION: &str = "test-region";
    const TEST_ZONE: &str = "test-zone";

    fn test_cluster_deployment() -> ClusterDeployment {
        let mut cd = ClusterDeployment::new(
            "test-cluster",
            ClusterDeploymentSpec {
                cluster_name: "test-cluster".to_string(),
                base_domain: "example.com".to_string(),
                platform: Platform {
                    powervs: Some(powervs::Platform {
                        credentials_secret_ref: LocalObjectReference {
                            name: Some("powervs-credentials".to_string()),
                        },
                        region: TEST_REGION.to_string(),
                        zone: TEST_ZONE.to_string(),
                    }),
                    alibaba_cloud: None,
                },
                cluster_metadata: Some(ClusterMetadata {
                    cluster_id: "test-cluster-id".to_string(),
                    infra_id: TEST_INFRA_ID.to_string(),
                    admin_kubeconfig_secret_ref: LocalObjectReference {
                        name: Some("admin-kubeconfig".to_string()),
                    },
                    admin_password_secret_ref: None,
                }),
                installed: true,
                ..Default::default()
            },
        );
        cd.metadata.namespace = Some("test-namespace".to_string());
        cd
    }

    fn test_pool() -> MachinePool {
        let mut pool = MachinePool::new(
            "test-cluster-worker",
            MachinePoolSpec {
                cluster_deployment_ref: LocalObjectReference {
                    name: Some("test-cluster".to_string()),
                },
                name: "worker".to_string(),
                replicas: Some(3),
                platform: MachinePoolPlatform {
                    powervs: Some(powervs::MachinePool {
                        memory_gib: 32,
                        proc_type: "Shared".to_string(),
                        processors: IntOrString::String("0.5".to_string()),
                        sys_type: "s922".to_string(),
                        ..Default::default()
                    }),
                    alibaba_cloud: None,
                },
                ..Default::default()
            },
        );
        pool.metadata.namespace = Some("test-namespace".to_string());
        pool
    }

    fn machine_set_name(pool: &str, zone: &str) -> String {
        format!("{TEST_INFRA_ID}-{pool}-{zone}")
    }

    fn mock_zones(zones: Vec<&'static str>) -> MockPowerVsApi {
        let mut client = MockPowerVsApi::new();
        client
            .expect_get_vpc_zones_for_region()
            .withf(|region| region == TEST_REGION)
            .times(1)
            .returning(move |_| Ok(zones.iter().map(|z| z.to_string()).collect()));
        client
    }

    fn replicas_by_name(machine_sets: &[MachineSet]) -> HashMap<String, i32> {
        machine_sets
            .iter()
            .map(|ms| (ms.name_any(), ms.spec.replicas))
            .collect()
    }

    #[tokio::test]
    async fn test_generate_machine_sets_for_region_zones() {
        let client = mock_zones(vec!["test-region-1", "test-region-2", "test-region-3"]);
        let actuator = PowerVsActuator::with_client(Arc::new(client));

        let (machine_sets, proceed) = actuator
            .generate_machine_sets(&test_cluster_deployment(), &test_pool())
            .await
            .unwrap();

        assert!(proceed);
        assert_eq!(
            replicas_by_name(&machine_sets),
            HashMap::from([
                (machine_set_name("worker", "1"), 1),
                (machine_set_name("worker", "2"), 1),
                (machine_set_name("worker", "3"), 1),
            ])
        );
    }

    #[tokio::test]
    async fn test_generate_machine_sets_for_specified_zones() {
        let mut client = MockPowerVsApi::new();
        client.expect_get_vpc_zones_for_region().never();
        let actuator = PowerVsActuator::with_client(Arc::new(client));

        let mut pool = test_pool();
        pool.spec.platform.powervs.as_mut().unwrap().zones = vec![
            "test-region-A".to_string(),
            "test-region-B".to_string(),
            "test-region-C".to_string(),
        ];

        let (machine_sets, _) = actuator
            .generate_machine_sets(&test_cluster_deployment(), &pool)
            .await
            .unwrap();

        assert_eq!(
            replicas_by_name(&machine_sets),
            HashMap::from([
                (machine_set_name("worker", "A"), 1),
                (machine_set_name("worker", "B"), 1),
                (machine_set_name("worker", "C"), 1),
            ])
        );
    }

    #[tokio::test]
    async fn test_rejects_zones_with_duplicate_suffix() {
        let mut client = MockPowerVsApi::new();
        client.expect_get_vpc_zones_for_region().never();
        let actuator = PowerVsActuator::with_client(Arc::new(client));

        let mut pool = test_pool();
        pool.spec.platform.powervs.as_mut().unwrap().zones =
            vec!["us-south-1".to_string(), "us-east-1".to_string()];

        let err = actuator
            .generate_machine_sets(&test_cluster_deployment(), &pool)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("us-east-1"));
    }

    #[tokio::test]
    async fn test_rejects_replicas_beyond_i32() {
        let actuator = PowerVsActuator::with_client(Arc::new(mock_zones(vec!["us-south-1"])));
        let mut pool = test_pool();
        pool.spec.replicas = Some(i64::from(i32::MAX) + 1);

        let err = actuator
            .generate_machine_sets(&test_cluster_deployment(), &pool)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_no_zones_returned_for_region() {
        let actuator = PowerVsActuator::with_client(Arc::new(mock_zones(vec![])));
        let result = actuator
            .generate_machine_sets(&test_cluster_deployment(), &test_pool())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_zone_lookup_error_is_propagated() {
        let mut client = MockPowerVsApi::new();
        client
            .expect_get_vpc_zones_for_region()
            .returning(|_| Err(CloudError::new("401", "unauthorized")));
        let actuator = PowerVsActuator::with_client(Arc::new(client));

        let err = actuator
            .generate_machine_sets(&test_cluster_deployment(), &test_pool())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cloud(_)));
    }

    #[tokio::test]
    async fn test_rejects_non_powervs_inputs() {
        let actuator = PowerVsActuator::with_client(Arc::new(MockPowerVsApi::new()));

        let mut cd = test_cluster_deployment();
        cd.spec.cluster_metadata = None;
        let err = actuator.generate_machine_sets(&cd, &test_pool()).await.unwrap_err();
        assert!(err.to_string().contains("cluster metadata"));

        let mut cd = test_cluster_deployment();
        cd.spec.platform.powervs = None;
        let err = actuator.generate_machine_sets(&cd, &test_pool()).await.unwrap_err();
        assert!(err.to_string().contains("not for PowerVS"));

        let mut pool = test_pool();
        pool.spec.platform.powervs = None;
        let err = actuator
            .generate_machine_sets(&test_cluster_deployment(), &pool)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("MachinePool is not for PowerVS"));
    }

    #[tokio::test]
    async fn test_provider_spec_contents() {
        let actuator = PowerVsActuator::with_client(Arc::new(mock_zones(vec!["us-south-1"])));
        let (machine_sets, _) = actuator
            .generate_machine_sets(&test_cluster_deployment(), &test_pool())
            .await
            .unwrap();

        let ms = &machine_sets[0];
        assert_eq!(ms.spec.replicas, 3);
        assert_eq!(ms.namespace().as_deref(), Some(MACHINE_API_NAMESPACE));
        assert_eq!(
            ms.labels().get(MACHINE_POOL_NAME_LABEL).map(String::as_str),
            Some("worker")
        );

        let value = ms.spec.template.spec.provider_spec.value.clone().unwrap();
        let config: PowerVsMachineProviderConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config.memory_gib, 32);
        assert_eq!(config.processors, "0.5");
        assert_eq!(config.system_type, "s922");
        assert_eq!(config.processor_type, "Shared");
        assert_eq!(config.key_pair_name, "test-infra-id-key");
        assert_eq!(
            config.image,
            PowerVsResource::Name { name: "rhcos-test-infra-id".to_string() }
        );
    }
}
