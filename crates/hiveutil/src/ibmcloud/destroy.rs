//! PowerVS 集群销毁
//!
//! 按依赖关系分阶段删除安装程序创建的资源。每个阶段只处理名称中带有
//! infra ID 的资源（DNS 记录按集群域名匹配），删除后轮询直到资源消失。

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use hive_controller::utils::{poll_until, PollConfig};
use hive_controller::CloudError;

use super::{is_gone, CloudResource, IbmCloudApi, ServiceInstance, VpcResourceKind, WorkspaceResourceKind};

/// 待销毁集群的元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMetadata {
    pub cluster_name: String,
    pub infra_id: String,
    pub base_domain: String,
    pub region: String,
    pub zone: String,
}

impl ClusterMetadata {
    /// 集群域名 `{cluster}.{baseDomain}`
    pub fn cluster_domain(&self) -> String {
        format!("{}.{}", self.cluster_name, self.base_domain.trim_end_matches('.'))
    }
}

/// PowerVS 集群销毁器
pub struct PowerVsDestroyer {
    api: Arc<dyn IbmCloudApi>,
    metadata: ClusterMetadata,
    poll: PollConfig,
}

impl PowerVsDestroyer {
    pub fn new(api: Arc<dyn IbmCloudApi>, metadata: ClusterMetadata, poll: PollConfig) -> Self {
        Self { api, metadata, poll }
    }

    /// 依次执行全部销毁阶段
    pub async fn run(&self) -> Result<()> {
        info!(
            "开始销毁 PowerVS 集群 {}（infra ID: {}，区域: {}，可用区: {}）",
            self.metadata.cluster_name, self.metadata.infra_id, self.metadata.region, self.metadata.zone
        );

        self.destroy_dns_records().await.context("删除 DNS 记录失败")?;

        let instances = self.api.list_service_instances().await.context("列出服务实例失败")?;
        let workspaces: Vec<&ServiceInstance> = instances
            .iter()
            .filter(|instance| instance.is_power_workspace() && self.owns(&instance.name))
            .filter(|instance| instance.region_id.is_empty() || instance.region_id == self.metadata.zone)
            .collect();
        if workspaces.is_empty() {
            warn!("没有找到 infra ID {} 的 PowerVS 工作区", self.metadata.infra_id);
        }
        for workspace in workspaces {
            for kind in WorkspaceResourceKind::DESTROY_ORDER {
                self.destroy_workspace_resources(workspace, kind)
                    .await
                    .with_context(|| format!("删除工作区 {} 中的{}失败", workspace.name, kind))?;
            }
        }

        for kind in VpcResourceKind::DESTROY_ORDER {
            self.destroy_vpc_resources(kind)
                .await
                .with_context(|| format!("删除{}失败", kind))?;
        }

        self.destroy_service_instances().await.context("删除服务实例失败")?;

        info!("PowerVS 集群 {} 已销毁", self.metadata.infra_id);
        Ok(())
    }

    fn owns(&self, name: &str) -> bool {
        name.contains(&self.metadata.infra_id)
    }

    async fn destroy_dns_records(&self) -> Result<(), CloudError> {
        let Some(zone) = self.api.find_dns_zone(&self.metadata.base_domain).await? else {
            warn!("没有找到基础域名 {} 对应的 DNS 区，跳过 DNS 记录", self.metadata.base_domain);
            return Ok(());
        };

        let cluster_domain = self.metadata.cluster_domain();
        let suffix = format!(".{cluster_domain}");
        let api = self.api.as_ref();
        let zone = &zone;
        self.destroy_stage(
            "DNS 记录",
            |record| record.name == cluster_domain || record.name.ends_with(&suffix),
            move || api.list_dns_records(zone),
            move |id| async move { api.delete_dns_record(zone, &id).await },
        )
        .await
    }

    async fn destroy_workspace_resources(
        &self,
        workspace: &ServiceInstance,
        kind: WorkspaceResourceKind,
    ) -> Result<(), CloudError> {
        let api = self.api.as_ref();
        self.destroy_stage(
            &kind.to_string(),
            |resource| self.owns(&resource.name),
            move || api.list_workspace_resources(workspace, kind),
            move |id| async move { api.delete_workspace_resource(workspace, kind, &id).await },
        )
        .await
    }

    async fn destroy_vpc_resources(&self, kind: VpcResourceKind) -> Result<(), CloudError> {
        let api = self.api.as_ref();
        self.destroy_stage(
            &kind.to_string(),
            |resource| self.owns(&resource.name),
            move || api.list_vpc_resources(kind),
            move |id| async move { api.delete_vpc_resource(kind, &id).await },
        )
        .await
    }

    async fn destroy_service_instances(&self) -> Result<(), CloudError> {
        let api = self.api.as_ref();
        self.destroy_stage(
            "服务实例",
            |resource| self.owns(&resource.name),
            move || async move {
                let instances = api.list_service_instances().await?;
                Ok::<Vec<CloudResource>, CloudError>(
                    instances
                        .into_iter()
                        .map(|instance| CloudResource {
                            id: instance.id,
                            name: instance.name,
                        })
                        .collect(),
                )
            },
            move |id| async move { api.delete_service_instance(&id).await },
        )
        .await
    }

    /// 列出匹配的资源，逐个删除，然后等待它们从列表中消失
    async fn destroy_stage<M, L, LF, D, DF>(&self, what: &str, matches: M, list: L, delete: D) -> Result<(), CloudError>
    where
        M: Fn(&CloudResource) -> bool,
        L: Fn() -> LF,
        LF: Future<Output = Result<Vec<CloudResource>, CloudError>>,
        D: Fn(String) -> DF,
        DF: Future<Output = Result<(), CloudError>>,
    {
        let targets: Vec<CloudResource> = list().await?.into_iter().filter(|r| matches(r)).collect();
        if targets.is_empty() {
            debug!("没有需要删除的{}", what);
            return Ok(());
        }

        for resource in &targets {
            info!("删除{} {}（{}）", what, resource.name, resource.id);
            match delete(resource.id.clone()).await {
                Ok(()) => {}
                Err(err) if is_gone(&err) => debug!("{} {} 已不存在", what, resource.name),
                Err(err) => return Err(err),
            }
        }

        let ids: HashSet<String> = targets.into_iter().map(|r| r.id).collect();
        let ids = &ids;
        let list = &list;
        poll_until(&format!("{what}删除"), self.poll, move || async move {
            let remaining = list().await?;
            Ok::<bool, CloudError>(!remaining.iter().any(|r| ids.contains(&r.id)))
        })
        .await?;

        info!("已删除 {} 个{}", ids.len(), what);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibmcloud::DnsZone;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const INFRA: &str = "mycluster-x7k2p";

    #[derive(Default)]
    struct State {
        vpc: HashMap<VpcResourceKind, Vec<CloudResource>>,
        workspace: HashMap<WorkspaceResourceKind, Vec<CloudResource>>,
        instances: Vec<ServiceInstance>,
        zone: Option<DnsZone>,
        records: Vec<CloudResource>,
        deleted: Vec<String>,
    }

    /// 内存中的 IBM Cloud，删除立即生效；`sticky` 中的资源删除后仍然存在，
    /// `gone` 中的资源在删除时已被他人删除
    #[derive(Default)]
    struct FakeIbmCloud {
        state: Mutex<State>,
        sticky: HashSet<String>,
        gone: HashSet<String>,
    }

    impl FakeIbmCloud {
        fn remove(&self, list: impl FnOnce(&mut State) -> &mut Vec<CloudResource>, id: &str) -> Result<(), CloudError> {
            let mut state = self.state.lock().unwrap();
            if self.gone.contains(id) {
                list(&mut state).retain(|r| r.id != id);
                return Err(CloudError::new("404", "not found"));
            }
            state.deleted.push(id.to_string());
            if !self.sticky.contains(id) {
                list(&mut state).retain(|r| r.id != id);
            }
            Ok(())
        }

        fn deleted(&self) -> Vec<String> {
            self.state.lock().unwrap().deleted.clone()
        }
    }

    #[async_trait]
    impl IbmCloudApi for FakeIbmCloud {
        async fn list_vpc_resources(&self, kind: VpcResourceKind) -> Result<Vec<CloudResource>, CloudError> {
            Ok(self.state.lock().unwrap().vpc.get(&kind).cloned().unwrap_or_default())
        }

        async fn delete_vpc_resource(&self, kind: VpcResourceKind, id: &str) -> Result<(), CloudError> {
            self.remove(|s| s.vpc.entry(kind).or_default(), id)
        }

        async fn list_service_instances(&self) -> Result<Vec<ServiceInstance>, CloudError> {
            Ok(self.state.lock().unwrap().instances.clone())
        }

        async fn delete_service_instance(&self, id: &str) -> Result<(), CloudError> {
            let mut state = self.state.lock().unwrap();
            state.deleted.push(id.to_string());
            state.instances.retain(|i| i.id != id);
            Ok(())
        }

        async fn list_workspace_resources(
            &self,
            _workspace: &ServiceInstance,
            kind: WorkspaceResourceKind,
        ) -> Result<Vec<CloudResource>, CloudError> {
            Ok(self.state.lock().unwrap().workspace.get(&kind).cloned().unwrap_or_default())
        }

        async fn delete_workspace_resource(
            &self,
            _workspace: &ServiceInstance,
            kind: WorkspaceResourceKind,
            id: &str,
        ) -> Result<(), CloudError> {
            self.remove(|s| s.workspace.entry(kind).or_default(), id)
        }

        async fn find_dns_zone(&self, _base_domain: &str) -> Result<Option<DnsZone>, CloudError> {
            Ok(self.state.lock().unwrap().zone.clone())
        }

        async fn list_dns_records(&self, _zone: &DnsZone) -> Result<Vec<CloudResource>, CloudError> {
            Ok(self.state.lock().unwrap().records.clone())
        }

        async fn delete_dns_record(&self, _zone: &DnsZone, id: &str) -> Result<(), CloudError> {
            self.remove(|s| &mut s.records, id)
        }
    }

    fn metadata() -> ClusterMetadata {
        ClusterMetadata {
            cluster_name: "mycluster".to_string(),
            infra_id: INFRA.to_string(),
            base_domain: "example.com".to_string(),
            region: "dal".to_string(),
            zone: "dal10".to_string(),
        }
    }

    fn poll() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(50),
        }
    }

    fn instance(id: &str, name: &str, service: &str, region: &str) -> ServiceInstance {
        ServiceInstance {
            id: id.to_string(),
            guid: format!("{id}-guid"),
            name: name.to_string(),
            crn: format!("crn:v1:bluemix:public:{service}:{region}:a/acct:{id}::"),
            region_id: region.to_string(),
        }
    }

    fn populated() -> FakeIbmCloud {
        let fake = FakeIbmCloud::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.zone = Some(DnsZone {
                crn: "crn:cis".to_string(),
                id: "zone-1".to_string(),
                name: "example.com".to_string(),
            });
            state.records = vec![
                CloudResource::new("rec-api", "api.mycluster.example.com"),
                CloudResource::new("rec-apps", "*.apps.mycluster.example.com"),
                CloudResource::new("rec-other", "api.othercluster.example.com"),
                CloudResource::new("rec-similar", "api.notmycluster.example.com"),
            ];
            state.instances = vec![
                instance("ws-1", &format!("{INFRA}-power-iaas"), "power-iaas", "dal10"),
                instance("ws-other-zone", &format!("{INFRA}-power-iaas-old"), "power-iaas", "wdc06"),
                instance("cos-1", &format!("{INFRA}-cos"), "cloud-object-storage", "global"),
                instance("ws-2", "other-power-iaas", "power-iaas", "dal10"),
            ];
            state.workspace.insert(
                WorkspaceResourceKind::PvmInstances,
                vec![
                    CloudResource::new("pvm-1", &format!("{INFRA}-master-0")),
                    CloudResource::new("pvm-2", "bastion"),
                ],
            );
            state.workspace.insert(
                WorkspaceResourceKind::Images,
                vec![CloudResource::new("img-1", &format!("rhcos-{INFRA}"))],
            );
            state.workspace.insert(
                WorkspaceResourceKind::Networks,
                vec![CloudResource::new("net-1", &format!("DHCPSERVER{INFRA}_Private"))],
            );
            state.vpc.insert(
                VpcResourceKind::LoadBalancers,
                vec![
                    CloudResource::new("lb-int", &format!("{INFRA}-loadbalancer-int")),
                    CloudResource::new("lb-ext", &format!("{INFRA}-loadbalancer")),
                ],
            );
            state.vpc.insert(
                VpcResourceKind::Subnets,
                vec![CloudResource::new("subnet-1", &format!("{INFRA}-vpcsubnet"))],
            );
            state.vpc.insert(
                VpcResourceKind::PublicGateways,
                vec![CloudResource::new("pgw-1", &format!("{INFRA}-publicgateway"))],
            );
            state.vpc.insert(
                VpcResourceKind::SecurityGroups,
                vec![
                    CloudResource::new("sg-1", &format!("{INFRA}-ocp-sec-group")),
                    CloudResource::new("sg-default", "jovial-unlatch-rebound"),
                ],
            );
            state.vpc.insert(
                VpcResourceKind::Vpcs,
                vec![
                    CloudResource::new("vpc-1", &format!("{INFRA}-vpc")),
                    CloudResource::new("vpc-shared", "shared-vpc"),
                ],
            );
        }
        fake
    }

    #[test]
    fn test_cluster_domain() {
        let mut metadata = metadata();
        assert_eq!(metadata.cluster_domain(), "mycluster.example.com");
        metadata.base_domain = "example.com.".to_string();
        assert_eq!(metadata.cluster_domain(), "mycluster.example.com");
    }

    #[tokio::test]
    async fn test_run_deletes_only_cluster_resources_in_order() {
        let fake = Arc::new(populated());
        let destroyer = PowerVsDestroyer::new(fake.clone(), metadata(), poll());
        destroyer.run().await.unwrap();

        assert_eq!(
            fake.deleted(),
            vec![
                "rec-api", "rec-apps", "pvm-1", "img-1", "net-1", "lb-int", "lb-ext", "subnet-1", "pgw-1",
                "sg-1", "vpc-1", "ws-1", "ws-other-zone", "cos-1",
            ]
        );

        let state = fake.state.lock().unwrap();
        assert_eq!(state.records.len(), 2);
        assert_eq!(state.workspace[&WorkspaceResourceKind::PvmInstances].len(), 1);
        assert_eq!(state.vpc[&VpcResourceKind::SecurityGroups][0].id, "sg-default");
        assert_eq!(state.vpc[&VpcResourceKind::Vpcs][0].id, "vpc-shared");
        assert_eq!(state.instances.len(), 1);
        assert_eq!(state.instances[0].id, "ws-2");
    }

    #[tokio::test]
    async fn test_run_without_dns_zone_or_workspace() {
        let fake = Arc::new(FakeIbmCloud::default());
        fake.state.lock().unwrap().vpc.insert(
            VpcResourceKind::Vpcs,
            vec![CloudResource::new("vpc-1", &format!("{INFRA}-vpc"))],
        );

        PowerVsDestroyer::new(fake.clone(), metadata(), poll()).run().await.unwrap();
        assert_eq!(fake.deleted(), vec!["vpc-1"]);
    }

    #[tokio::test]
    async fn test_already_gone_resources_are_tolerated() {
        let mut fake = populated();
        fake.gone.insert("lb-int".to_string());
        fake.gone.insert("img-1".to_string());
        let fake = Arc::new(fake);

        PowerVsDestroyer::new(fake.clone(), metadata(), poll()).run().await.unwrap();

        let deleted = fake.deleted();
        assert!(!deleted.contains(&"lb-int".to_string()));
        assert!(deleted.contains(&"lb-ext".to_string()));
        assert!(deleted.contains(&"vpc-1".to_string()));
    }

    #[tokio::test]
    async fn test_stage_times_out_when_resource_remains() {
        let mut fake = populated();
        fake.sticky.insert("pgw-1".to_string());
        let fake = Arc::new(fake);

        let err = PowerVsDestroyer::new(fake.clone(), metadata(), poll())
            .run()
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("WaiterTimeout"));

        let deleted = fake.deleted();
        assert!(deleted.contains(&"pgw-1".to_string()));
        assert!(!deleted.contains(&"sg-1".to_string()));
    }
}
