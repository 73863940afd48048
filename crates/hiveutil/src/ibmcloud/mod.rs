//! IBM Cloud 资源接口
//!
//! PowerVS 集群销毁涉及四类 API：VPC、PowerVS 工作区（pcloud）、
//! Resource Controller 以及 CIS（DNS）。`IbmCloudApi` 只暴露列举和删除两种操作。

pub mod destroy;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;

use hive_controller::powervsclient::{vpc_region_for_powervs_region, IamAuthenticator, VPC_API_VERSION};
use hive_controller::CloudError;

use crate::config::PowerVsSettings;

/// 可删除的云资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudResource {
    pub id: String,
    pub name: String,
}

impl CloudResource {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Resource Controller 中的服务实例
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceInstance {
    pub id: String,
    #[serde(default)]
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub crn: String,
    #[serde(default)]
    pub region_id: String,
}

impl ServiceInstance {
    /// 是否为 PowerVS 工作区
    pub fn is_power_workspace(&self) -> bool {
        self.crn.contains(":power-iaas:")
    }

    /// 是否为 CIS 实例
    pub fn is_cis(&self) -> bool {
        self.crn.contains(":internet-svcs:")
    }
}

/// CIS 中的 DNS 区
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsZone {
    /// 所属 CIS 实例的 CRN
    pub crn: String,
    pub id: String,
    pub name: String,
}

/// VPC 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VpcResourceKind {
    LoadBalancers,
    Subnets,
    PublicGateways,
    SecurityGroups,
    Vpcs,
}

impl VpcResourceKind {
    /// 删除顺序，被依赖的资源在后
    pub const DESTROY_ORDER: [VpcResourceKind; 5] = [
        VpcResourceKind::LoadBalancers,
        VpcResourceKind::Subnets,
        VpcResourceKind::PublicGateways,
        VpcResourceKind::SecurityGroups,
        VpcResourceKind::Vpcs,
    ];

    /// API 路径，同时也是列表响应中的集合字段名
    pub fn path(&self) -> &'static str {
        match self {
            VpcResourceKind::LoadBalancers => "load_balancers",
            VpcResourceKind::Subnets => "subnets",
            VpcResourceKind::PublicGateways => "public_gateways",
            VpcResourceKind::SecurityGroups => "security_groups",
            VpcResourceKind::Vpcs => "vpcs",
        }
    }
}

impl fmt::Display for VpcResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VpcResourceKind::LoadBalancers => "负载均衡",
            VpcResourceKind::Subnets => "子网",
            VpcResourceKind::PublicGateways => "公网网关",
            VpcResourceKind::SecurityGroups => "安全组",
            VpcResourceKind::Vpcs => "VPC",
        };
        write!(f, "{}", name)
    }
}

/// PowerVS 工作区内的资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceResourceKind {
    PvmInstances,
    Images,
    Networks,
}

impl WorkspaceResourceKind {
    pub const DESTROY_ORDER: [WorkspaceResourceKind; 3] = [
        WorkspaceResourceKind::PvmInstances,
        WorkspaceResourceKind::Images,
        WorkspaceResourceKind::Networks,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            WorkspaceResourceKind::PvmInstances => "pvm-instances",
            WorkspaceResourceKind::Images => "images",
            WorkspaceResourceKind::Networks => "networks",
        }
    }

    /// 列表响应中的集合字段、ID 字段、名称字段
    fn fields(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            WorkspaceResourceKind::PvmInstances => ("pvmInstances", "pvmInstanceID", "serverName"),
            WorkspaceResourceKind::Images => ("images", "imageID", "name"),
            WorkspaceResourceKind::Networks => ("networks", "networkID", "name"),
        }
    }
}

impl fmt::Display for WorkspaceResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkspaceResourceKind::PvmInstances => "PVM 实例",
            WorkspaceResourceKind::Images => "镜像",
            WorkspaceResourceKind::Networks => "网络",
        };
        write!(f, "{}", name)
    }
}

/// 资源已经不存在
pub fn is_gone(err: &CloudError) -> bool {
    err.is_code("404") || err.is_code("410")
}

/// IBM Cloud 操作接口
#[async_trait]
pub trait IbmCloudApi: Send + Sync {
    async fn list_vpc_resources(&self, kind: VpcResourceKind) -> Result<Vec<CloudResource>, CloudError>;

    async fn delete_vpc_resource(&self, kind: VpcResourceKind, id: &str) -> Result<(), CloudError>;

    /// 账号下全部服务实例
    async fn list_service_instances(&self) -> Result<Vec<ServiceInstance>, CloudError>;

    async fn delete_service_instance(&self, id: &str) -> Result<(), CloudError>;

    async fn list_workspace_resources(
        &self,
        workspace: &ServiceInstance,
        kind: WorkspaceResourceKind,
    ) -> Result<Vec<CloudResource>, CloudError>;

    async fn delete_workspace_resource(
        &self,
        workspace: &ServiceInstance,
        kind: WorkspaceResourceKind,
        id: &str,
    ) -> Result<(), CloudError>;

    /// 查找承载 `base_domain` 的 CIS DNS 区
    async fn find_dns_zone(&self, base_domain: &str) -> Result<Option<DnsZone>, CloudError>;

    async fn list_dns_records(&self, zone: &DnsZone) -> Result<Vec<CloudResource>, CloudError>;

    async fn delete_dns_record(&self, zone: &DnsZone, id: &str) -> Result<(), CloudError>;
}

/// `base_domain` 是否落在 `zone_name` 区内
pub fn zone_covers(zone_name: &str, base_domain: &str) -> bool {
    let zone_name = zone_name.trim_end_matches('.');
    let base_domain = base_domain.trim_end_matches('.');
    base_domain == zone_name || base_domain.ends_with(&format!(".{zone_name}"))
}

#[derive(Debug, Deserialize)]
struct ServiceInstancePage {
    #[serde(default)]
    resources: Vec<ServiceInstance>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CisPage {
    #[serde(default)]
    result: Vec<CisItem>,
    result_info: Option<CisResultInfo>,
}

#[derive(Debug, Deserialize)]
struct CisItem {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CisResultInfo {
    page: u32,
    total_pages: u32,
}

/// 基于 REST API 的 IBM Cloud 客户端
pub struct IbmCloudClient {
    http: reqwest::Client,
    auth: IamAuthenticator,
    vpc_endpoint: String,
    power_endpoint: String,
    resource_controller_endpoint: String,
    cis_endpoint: String,
}

impl IbmCloudClient {
    /// 为 PowerVS 区域创建客户端
    pub fn new(api_key: &str, region: &str, settings: &PowerVsSettings) -> Result<Self, CloudError> {
        let vpc_region = vpc_region_for_powervs_region(region)?;
        Ok(Self {
            http: reqwest::Client::new(),
            auth: IamAuthenticator::with_endpoint(api_key, &settings.iam_endpoint),
            vpc_endpoint: format!("https://{vpc_region}.iaas.cloud.ibm.com/v1"),
            power_endpoint: format!("https://{region}.power-iaas.cloud.ibm.com/pcloud/v1"),
            resource_controller_endpoint: settings.resource_controller_endpoint.trim_end_matches('/').to_string(),
            cis_endpoint: settings.cis_endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CloudError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CloudError::new(status.as_str(), body))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, CloudError> {
        let token = self.auth.token().await?;
        Self::check(request.bearer_auth(token).send().await?).await
    }

    async fn send_cis(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, CloudError> {
        let token = self.auth.token().await?;
        let response = request
            .header("X-Auth-User-Token", format!("Bearer {token}"))
            .send()
            .await?;
        Self::check(response).await
    }

    fn workspace_url(&self, workspace: &ServiceInstance, kind: WorkspaceResourceKind) -> String {
        format!("{}/cloud-instances/{}/{}", self.power_endpoint, workspace.guid, kind.path())
    }

    fn cis_zones_url(&self, crn: &str) -> String {
        format!("{}/v1/{}/zones", self.cis_endpoint, urlencoding::encode(crn))
    }

    async fn list_cis_pages(&self, url: &str) -> Result<Vec<CisItem>, CloudError> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let request = self
                .http
                .get(url)
                .query(&[("per_page", "1000".to_string()), ("page", page.to_string())]);
            let body: CisPage = self.send_cis(request).await?.json().await?;
            items.extend(body.result);
            match body.result_info {
                Some(info) if info.page < info.total_pages => page = info.page + 1,
                _ => return Ok(items),
            }
        }
    }
}

fn resources_from(items: &Value, id_field: &str, name_field: &str) -> Vec<CloudResource> {
    items
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(CloudResource::new(
                        item.get(id_field)?.as_str()?,
                        item.get(name_field).and_then(Value::as_str).unwrap_or_default(),
                    ))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl IbmCloudApi for IbmCloudClient {
    async fn list_vpc_resources(&self, kind: VpcResourceKind) -> Result<Vec<CloudResource>, CloudError> {
        let mut resources = Vec::new();
        let mut url = format!("{}/{}", self.vpc_endpoint, kind.path());
        loop {
            let mut request = self.http.get(&url);
            if !url.contains("version=") {
                request = request.query(&[("version", VPC_API_VERSION), ("generation", "2"), ("limit", "100")]);
            }
            let body: Value = self.send(request).await?.json().await?;
            resources.extend(resources_from(&body[kind.path()], "id", "name"));

            match body["next"]["href"].as_str() {
                Some(next) => url = next.to_string(),
                None => break,
            }
        }
        debug!("列出 {} 个{}", resources.len(), kind);
        Ok(resources)
    }

    async fn delete_vpc_resource(&self, kind: VpcResourceKind, id: &str) -> Result<(), CloudError> {
        let url = format!("{}/{}/{}", self.vpc_endpoint, kind.path(), id);
        let request = self
            .http
            .delete(url)
            .query(&[("version", VPC_API_VERSION), ("generation", "2")]);
        self.send(request).await?;
        Ok(())
    }

    async fn list_service_instances(&self) -> Result<Vec<ServiceInstance>, CloudError> {
        let mut instances = Vec::new();
        let mut url = format!("{}/v2/resource_instances?limit=100", self.resource_controller_endpoint);
        loop {
            let page: ServiceInstancePage = self.send(self.http.get(&url)).await?.json().await?;
            instances.extend(page.resources);
            match page.next_url {
                Some(next) if !next.is_empty() => url = format!("{}{}", self.resource_controller_endpoint, next),
                _ => break,
            }
        }
        Ok(instances)
    }

    async fn delete_service_instance(&self, id: &str) -> Result<(), CloudError> {
        let url = format!(
            "{}/v2/resource_instances/{}",
            self.resource_controller_endpoint,
            urlencoding::encode(id)
        );
        self.send(self.http.delete(url).query(&[("recursive", "true")])).await?;
        Ok(())
    }

    async fn list_workspace_resources(
        &self,
        workspace: &ServiceInstance,
        kind: WorkspaceResourceKind,
    ) -> Result<Vec<CloudResource>, CloudError> {
        let request = self
            .http
            .get(self.workspace_url(workspace, kind))
            .header("CRN", &workspace.crn);
        let body: Value = self.send(request).await?.json().await?;
        let (collection, id_field, name_field) = kind.fields();
        Ok(resources_from(&body[collection], id_field, name_field))
    }

    async fn delete_workspace_resource(
        &self,
        workspace: &ServiceInstance,
        kind: WorkspaceResourceKind,
        id: &str,
    ) -> Result<(), CloudError> {
        let mut request = self
            .http
            .delete(format!("{}/{}", self.workspace_url(workspace, kind), id))
            .header("CRN", &workspace.crn);
        if kind == WorkspaceResourceKind::PvmInstances {
            request = request.query(&[("delete_data_volumes", "true")]);
        }
        self.send(request).await?;
        Ok(())
    }

    async fn find_dns_zone(&self, base_domain: &str) -> Result<Option<DnsZone>, CloudError> {
        let instances = self.list_service_instances().await?;
        for cis in instances.iter().filter(|instance| instance.is_cis()) {
            let zones = self.list_cis_pages(&self.cis_zones_url(&cis.crn)).await?;
            if let Some(zone) = zones.into_iter().find(|zone| zone_covers(&zone.name, base_domain)) {
                debug!("基础域名 {} 位于 CIS 实例 {} 的 DNS 区 {}", base_domain, cis.name, zone.name);
                return Ok(Some(DnsZone {
                    crn: cis.crn.clone(),
                    id: zone.id,
                    name: zone.name,
                }));
            }
        }
        Ok(None)
    }

    async fn list_dns_records(&self, zone: &DnsZone) -> Result<Vec<CloudResource>, CloudError> {
        let url = format!("{}/{}/dns_records", self.cis_zones_url(&zone.crn), zone.id);
        Ok(self
            .list_cis_pages(&url)
            .await?
            .into_iter()
            .map(|item| CloudResource {
                id: item.id,
                name: item.name,
            })
            .collect())
    }

    async fn delete_dns_record(&self, zone: &DnsZone, id: &str) -> Result<(), CloudError> {
        let url = format!("{}/{}/dns_records/{}", self.cis_zones_url(&zone.crn), zone.id, id);
        self.send_cis(self.http.delete(url)).await?;
        Ok(())
    }
}
