//! EC2 客户端
//!
//! `Ec2Api` 只包含 PrivateLink 网络清理需要的调用，`AwsEc2Client` 基于
//! aws-sdk-ec2 实现。错误统一转换为带错误码的 `CloudError`。

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_ec2::types::{
    Filter as Ec2Filter, IpPermission, IpRange, UserIdGroupPair, VpcPeeringConnectionStateReasonCode,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use hive_controller::utils::{poll_until, PollConfig};
use hive_controller::CloudError;

/// 路由不存在
pub const INVALID_ROUTE_NOT_FOUND: &str = "InvalidRoute.NotFound";
/// 安全组规则不存在
pub const INVALID_PERMISSION_NOT_FOUND: &str = "InvalidPermission.NotFound";
const INVALID_PEERING_NOT_FOUND: &str = "InvalidVpcPeeringConnectionID.NotFound";

/// EC2 查询过滤器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new<I, S>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// EC2 操作接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ec2Api: Send + Sync {
    /// VPC 的 CIDR
    async fn vpc_cidr(&self, vpc_id: &str) -> Result<String, CloudError>;

    /// VPC 的默认安全组 ID
    async fn default_security_group(&self, vpc_id: &str) -> Result<String, CloudError>;

    /// 集群 VPC 中 worker 节点的安全组 ID
    async fn worker_security_group(&self, vpc_id: &str) -> Result<String, CloudError>;

    /// 两个 VPC 之间处于 active 状态的对等连接 ID
    async fn active_peering_connections(&self, vpc_a: &str, vpc_b: &str) -> Result<Vec<String>, CloudError>;

    async fn delete_peering_connection(&self, peering_id: &str) -> Result<(), CloudError>;

    /// 等待对等连接进入 deleted 状态
    async fn wait_peering_connection_deleted(&self, peering_id: &str) -> Result<(), CloudError>;

    /// 满足过滤条件的路由表 ID（自动翻页）
    async fn route_table_ids(&self, filters: Vec<Filter>) -> Result<Vec<String>, CloudError>;

    async fn delete_route(&self, route_table_id: &str, destination_cidr: &str) -> Result<(), CloudError>;

    /// 撤销来自另一个安全组的全部入站规则
    async fn revoke_ingress_from_security_group(&self, group_id: &str, source_group_id: &str) -> Result<(), CloudError>;

    /// 撤销来自某个 CIDR 的全部入站规则
    async fn revoke_ingress_from_cidr(&self, group_id: &str, cidr: &str) -> Result<(), CloudError>;
}

fn sdk_error<E>(err: E) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    CloudError {
        code: err.code().map(str::to_string),
        message,
    }
}

fn to_sdk_filter(filter: Filter) -> Ec2Filter {
    Ec2Filter::builder().name(filter.name).set_values(Some(filter.values)).build()
}

/// 基于 aws-sdk-ec2 的实现
#[derive(Clone)]
pub struct AwsEc2Client {
    client: aws_sdk_ec2::Client,
    region: String,
    waiter: PollConfig,
}

impl AwsEc2Client {
    /// 使用默认凭证链为指定区域创建客户端
    pub async fn new(region: &str, waiter: PollConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            client: aws_sdk_ec2::Client::new(&sdk_config),
            region: region.to_string(),
            waiter,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn peering_deleted(&self, peering_id: &str) -> Result<bool, CloudError> {
        let output = match self
            .client
            .describe_vpc_peering_connections()
            .vpc_peering_connection_ids(peering_id)
            .send()
            .await
            .map_err(sdk_error)
        {
            Ok(output) => output,
            Err(err) if err.is_code(INVALID_PEERING_NOT_FOUND) => return Ok(true),
            Err(err) => return Err(err),
        };

        Ok(output.vpc_peering_connections().iter().all(|pc| {
            pc.status()
                .and_then(|status| status.code())
                .map(|code| *code == VpcPeeringConnectionStateReasonCode::Deleted)
                .unwrap_or(false)
        }))
    }
}

#[async_trait]
impl Ec2Api for AwsEc2Client {
    async fn vpc_cidr(&self, vpc_id: &str) -> Result<String, CloudError> {
        let output = self
            .client
            .describe_vpcs()
            .vpc_ids(vpc_id)
            .send()
            .await
            .map_err(sdk_error)?;

        output
            .vpcs()
            .first()
            .and_then(|vpc| vpc.cidr_block())
            .map(str::to_string)
            .ok_or_else(|| CloudError::message(format!("VPC {vpc_id} 没有 CIDR")))
    }

    async fn default_security_group(&self, vpc_id: &str) -> Result<String, CloudError> {
        let output = self
            .client
            .describe_security_groups()
            .filters(to_sdk_filter(Filter::new("vpc-id", [vpc_id])))
            .filters(to_sdk_filter(Filter::new("group-name", ["default"])))
            .send()
            .await
            .map_err(sdk_error)?;

        output
            .security_groups()
            .first()
            .and_then(|sg| sg.group_id())
            .map(str::to_string)
            .ok_or_else(|| CloudError::message(format!("VPC {vpc_id} 没有默认安全组")))
    }

    async fn worker_security_group(&self, vpc_id: &str) -> Result<String, CloudError> {
        let output = self
            .client
            .describe_security_groups()
            .filters(to_sdk_filter(Filter::new("vpc-id", [vpc_id])))
            .filters(to_sdk_filter(Filter::new("tag:Name", ["*-worker-sg", "*-node"])))
            .send()
            .await
            .map_err(sdk_error)?;

        output
            .security_groups()
            .first()
            .and_then(|sg| sg.group_id())
            .map(str::to_string)
            .ok_or_else(|| CloudError::message(format!("VPC {vpc_id} 中没有 worker 安全组")))
    }

    async fn active_peering_connections(&self, vpc_a: &str, vpc_b: &str) -> Result<Vec<String>, CloudError> {
        let output = self
            .client
            .describe_vpc_peering_connections()
            .filters(to_sdk_filter(Filter::new("requester-vpc-info.vpc-id", [vpc_a, vpc_b])))
            .filters(to_sdk_filter(Filter::new("accepter-vpc-info.vpc-id", [vpc_a, vpc_b])))
            .filters(to_sdk_filter(Filter::new("status-code", ["active"])))
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output
            .vpc_peering_connections()
            .iter()
            .filter_map(|pc| pc.vpc_peering_connection_id())
            .map(str::to_string)
            .collect())
    }

    async fn delete_peering_connection(&self, peering_id: &str) -> Result<(), CloudError> {
        self.client
            .delete_vpc_peering_connection()
            .vpc_peering_connection_id(peering_id)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn wait_peering_connection_deleted(&self, peering_id: &str) -> Result<(), CloudError> {
        let what = format!("VPC 对等连接 {peering_id} 删除");
        poll_until(&what, self.waiter, || self.peering_deleted(peering_id)).await
    }

    async fn route_table_ids(&self, filters: Vec<Filter>) -> Result<Vec<String>, CloudError> {
        let mut pages = self
            .client
            .describe_route_tables()
            .set_filters(Some(filters.into_iter().map(to_sdk_filter).collect()))
            .into_paginator()
            .send();

        let mut ids = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(sdk_error)?;
            ids.extend(
                page.route_tables()
                    .iter()
                    .filter_map(|rt| rt.route_table_id())
                    .map(str::to_string),
            );
        }
        debug!("区域 {} 匹配到 {} 个路由表", self.region, ids.len());
        Ok(ids)
    }

    async fn delete_route(&self, route_table_id: &str, destination_cidr: &str) -> Result<(), CloudError> {
        self.client
            .delete_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn revoke_ingress_from_security_group(&self, group_id: &str, source_group_id: &str) -> Result<(), CloudError> {
        let permission = IpPermission::builder()
            .ip_protocol("-1")
            .user_id_group_pairs(UserIdGroupPair::builder().group_id(source_group_id).build())
            .build();

        self.client
            .revoke_security_group_ingress()
            .group_id(group_id)
            .ip_permissions(permission)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn revoke_ingress_from_cidr(&self, group_id: &str, cidr: &str) -> Result<(), CloudError> {
        let permission = IpPermission::builder()
            .ip_protocol("-1")
            .ip_ranges(IpRange::builder().cidr_ip(cidr).build())
            .build();

        self.client
            .revoke_security_group_ingress()
            .group_id(group_id)
            .ip_permissions(permission)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}

/// 为每个区域创建一个 EC2 客户端
pub async fn clients_by_region(regions: &BTreeSet<String>, waiter: PollConfig) -> HashMap<String, Arc<dyn Ec2Api>> {
    let mut clients: HashMap<String, Arc<dyn Ec2Api>> = HashMap::new();
    for region in regions {
        let client = AwsEc2Client::new(region, waiter).await;
        clients.insert(region.clone(), Arc::new(client));
    }
    clients
}
