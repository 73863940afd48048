//! `hiveutil awsprivatelink endpointvpc remove VPC_ID`
//!
//! 对每个关联 VPC 依次拆除：对等连接、双方路由表中指向对端 CIDR 的路由、
//! 双方安全组之间的入站规则。最后把端点 VPC 从 HiveConfig 清单中移除。
//! 路由或安全组规则已经不存在时只记录警告，其它错误立即终止。

use anyhow::{anyhow, Context, Result};
use kube::Client;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use hive_common::{find_vpc_in_inventory, AwsAssociatedVpc, AwsPrivateLinkInventory, HiveConfig};
use hive_controller::CloudError;

use crate::awsclient::{
    clients_by_region, Ec2Api, Filter, INVALID_PERMISSION_NOT_FOUND, INVALID_ROUTE_NOT_FOUND,
};
use crate::awsprivatelink::{get_hive_config, patch_hive_config};
use crate::config::AwsSettings;

type ClientsByRegion = HashMap<String, Arc<dyn Ec2Api>>;

/// 端点 VPC 移除任务
#[derive(Debug, Clone)]
pub struct EndpointVpcRemover {
    endpoint_vpc_id: String,
    endpoint_vpc_region: String,
    endpoint_vpc_idx: usize,
    endpoint_subnet_ids: Vec<String>,
    associated_vpcs: Vec<AwsAssociatedVpc>,
    inventory: Vec<AwsPrivateLinkInventory>,
}

impl EndpointVpcRemover {
    /// 从 HiveConfig 中定位端点 VPC
    pub fn new(hive_config: &HiveConfig, endpoint_vpc_id: &str) -> Result<Self> {
        let private_link = hive_config.spec.aws_private_link.as_ref().ok_or_else(|| {
            anyhow!("HiveConfig 未启用 AWS PrivateLink，请先执行 `hiveutil awsprivatelink enable`")
        })?;

        if private_link.associated_vpcs.is_empty() {
            warn!(
                "HiveConfig/hive 没有任何关联 VPC，端点 VPC {} 仍会从 HiveConfig 中移除，但不会删除任何云资源",
                endpoint_vpc_id
            );
        }

        let inventory = private_link.endpoint_vpc_inventory.clone();
        let endpoint_vpc_idx = find_vpc_in_inventory(endpoint_vpc_id, &inventory).ok_or_else(|| {
            anyhow!(
                "端点 VPC {} 不在 HiveConfig.spec.awsPrivateLink.endpointVPCInventory 中，\
                 请先执行 `hiveutil awsprivatelink endpointvpc add` 添加",
                endpoint_vpc_id
            )
        })?;

        let endpoint = &inventory[endpoint_vpc_idx];
        Ok(Self {
            endpoint_vpc_id: endpoint_vpc_id.to_string(),
            endpoint_vpc_region: endpoint.aws_private_link_vpc.region.clone(),
            endpoint_vpc_idx,
            endpoint_subnet_ids: endpoint.subnets.iter().map(|s| s.subnet_id.clone()).collect(),
            associated_vpcs: private_link.associated_vpcs.clone(),
            inventory,
        })
    }

    /// 需要 EC2 客户端的全部区域
    pub fn regions(&self) -> BTreeSet<String> {
        std::iter::once(self.endpoint_vpc_region.clone())
            .chain(self.associated_vpcs.iter().map(|vpc| vpc.aws_private_link_vpc.region.clone()))
            .collect()
    }

    /// 拆除端点 VPC 与每个关联 VPC 之间的网络
    pub async fn remove_networking(&self, clients: &ClientsByRegion) -> Result<()> {
        let endpoint_client = client_for(clients, &self.endpoint_vpc_region)?;

        let endpoint_default_sg = endpoint_client
            .default_security_group(&self.endpoint_vpc_id)
            .await
            .context("获取端点 VPC 的默认安全组失败")?;
        debug!("端点 VPC 的默认安全组为 {}", endpoint_default_sg);

        for associated in &self.associated_vpcs {
            let associated_region = associated.aws_private_link_vpc.region.as_str();
            let associated_vpc_id = associated.aws_private_link_vpc.vpc_id.as_str();
            let associated_client = client_for(clients, associated_region)?;
            info!(
                "拆除关联 VPC {} 与端点 VPC {} 之间的网络",
                associated_vpc_id, self.endpoint_vpc_id
            );

            let associated_cidr = associated_client
                .vpc_cidr(associated_vpc_id)
                .await
                .context("获取关联 VPC 的 CIDR 失败")?;
            debug!("关联 VPC 的 CIDR 为 {}", associated_cidr);
            let endpoint_cidr = endpoint_client
                .vpc_cidr(&self.endpoint_vpc_id)
                .await
                .context("获取端点 VPC 的 CIDR 失败")?;
            debug!("端点 VPC 的 CIDR 为 {}", endpoint_cidr);

            delete_peering_connection(associated_client.as_ref(), associated_vpc_id, &self.endpoint_vpc_id)
                .await
                .context("删除 VPC 对等连接失败")?;

            info!("删除关联 VPC 私有路由表中的路由");
            delete_route_from_route_tables(
                associated_client.as_ref(),
                associated_vpc_id,
                &endpoint_cidr,
                Filter::new("tag:Name", ["*private*"]),
            )
            .await
            .context("删除关联 VPC 私有路由表中的路由失败")?;

            info!("删除端点子网路由表中的路由");
            delete_route_from_route_tables(
                endpoint_client.as_ref(),
                &self.endpoint_vpc_id,
                &associated_cidr,
                Filter::new("association.subnet-id", self.endpoint_subnet_ids.clone()),
            )
            .await
            .context("删除端点子网路由表中的路由失败")?;

            let associated_worker_sg = associated_client
                .worker_security_group(associated_vpc_id)
                .await
                .context("获取关联集群的 worker 安全组失败")?;
            debug!("关联集群的 worker 安全组为 {}", associated_worker_sg);

            if associated_region == self.endpoint_vpc_region {
                // 同区域：按安全组撤销
                info!("撤销端点 VPC 默认安全组到关联 VPC worker 安全组的访问");
                tolerate_not_found(
                    associated_client
                        .revoke_ingress_from_security_group(&associated_worker_sg, &endpoint_default_sg)
                        .await,
                    INVALID_PERMISSION_NOT_FOUND,
                    "端点 VPC 默认安全组到关联 VPC worker 安全组的访问未开启",
                )
                .context("撤销端点 VPC 默认安全组到关联 VPC worker 安全组的访问失败")?;

                info!("撤销关联 VPC worker 安全组到端点 VPC 默认安全组的访问");
                tolerate_not_found(
                    endpoint_client
                        .revoke_ingress_from_security_group(&endpoint_default_sg, &associated_worker_sg)
                        .await,
                    INVALID_PERMISSION_NOT_FOUND,
                    "关联 VPC worker 安全组到端点 VPC 默认安全组的访问未开启",
                )
                .context("撤销关联 VPC worker 安全组到端点 VPC 默认安全组的访问失败")?;
            } else {
                // 跨区域：安全组不能跨区域引用，按 CIDR 撤销
                info!("撤销端点 VPC CIDR 到关联 VPC worker 安全组的访问");
                tolerate_not_found(
                    associated_client
                        .revoke_ingress_from_cidr(&associated_worker_sg, &endpoint_cidr)
                        .await,
                    INVALID_PERMISSION_NOT_FOUND,
                    "端点 VPC CIDR 到关联 VPC worker 安全组的访问未开启",
                )
                .context("撤销端点 VPC CIDR 到关联 VPC worker 安全组的访问失败")?;

                info!("撤销关联 VPC CIDR 到端点 VPC 默认安全组的访问");
                tolerate_not_found(
                    endpoint_client
                        .revoke_ingress_from_cidr(&endpoint_default_sg, &associated_cidr)
                        .await,
                    INVALID_PERMISSION_NOT_FOUND,
                    "关联 VPC CIDR 到端点 VPC 默认安全组的访问未开启",
                )
                .context("撤销关联 VPC CIDR 到端点 VPC 默认安全组的访问失败")?;
            }
        }

        Ok(())
    }

    /// 移除端点 VPC 后的清单，最后一项换到被移除的位置
    pub fn remaining_inventory(&self) -> Vec<AwsPrivateLinkInventory> {
        let mut inventory = self.inventory.clone();
        inventory.swap_remove(self.endpoint_vpc_idx);
        inventory
    }

    /// 持久化清单的 merge patch，带上读取时的 resourceVersion
    pub fn inventory_patch(&self, resource_version: Option<&str>) -> Value {
        let mut patch = json!({
            "spec": {
                "awsPrivateLink": {
                    "endpointVPCInventory": self.remaining_inventory(),
                }
            }
        });
        if let Some(rv) = resource_version {
            patch["metadata"] = json!({ "resourceVersion": rv });
        }
        patch
    }
}

fn client_for<'a>(clients: &'a ClientsByRegion, region: &str) -> Result<&'a Arc<dyn Ec2Api>> {
    clients
        .get(region)
        .ok_or_else(|| anyhow!("没有区域 {} 的 EC2 客户端", region))
}

/// 错误码为 `code` 时记录警告并视为成功
fn tolerate_not_found(result: Result<(), CloudError>, code: &str, warning: &str) -> Result<(), CloudError> {
    match result {
        Err(err) if err.is_code(code) => {
            warn!("{}", warning);
            Ok(())
        }
        other => other,
    }
}

async fn delete_peering_connection(client: &dyn Ec2Api, vpc_a: &str, vpc_b: &str) -> Result<(), CloudError> {
    info!("删除关联 VPC 与端点 VPC 之间的对等连接");

    // 同一对 VPC 之间同时只能有一个 active 对等连接
    let Some(peering_id) = client.active_peering_connections(vpc_a, vpc_b).await?.into_iter().next() else {
        warn!("关联 VPC 与端点 VPC 之间没有对等连接");
        return Ok(());
    };

    client.delete_peering_connection(&peering_id).await?;
    debug!("已发起对等连接 {} 的删除", peering_id);

    client.wait_peering_connection_deleted(&peering_id).await?;
    debug!("对等连接 {} 已删除", peering_id);
    Ok(())
}

async fn delete_route_from_route_tables(
    client: &dyn Ec2Api,
    vpc_id: &str,
    peer_cidr: &str,
    extra_filter: Filter,
) -> Result<(), CloudError> {
    let filters = vec![Filter::new("vpc-id", [vpc_id]), extra_filter];

    for route_table_id in client.route_table_ids(filters).await? {
        match client.delete_route(&route_table_id, peer_cidr).await {
            Ok(()) => debug!("已从路由表 {} 删除路由", route_table_id),
            Err(err) if err.is_code(INVALID_ROUTE_NOT_FOUND) => {
                warn!("路由表 {} 中没有该路由", route_table_id)
            }
            Err(err) => {
                return Err(CloudError {
                    code: err.code,
                    message: format!("从路由表 {} 删除路由失败: {}", route_table_id, err.message),
                })
            }
        }
    }
    Ok(())
}

/// 执行移除流程
pub async fn run(client: Client, endpoint_vpc_id: &str, settings: &AwsSettings) -> Result<()> {
    let hive_config = get_hive_config(client.clone()).await?;
    let remover = EndpointVpcRemover::new(&hive_config, endpoint_vpc_id)?;

    let clients = clients_by_region(&remover.regions(), settings.waiter()).await;
    remover.remove_networking(&clients).await?;

    info!("从 HiveConfig 中移除端点 VPC {}", endpoint_vpc_id);
    let patch = remover.inventory_patch(hive_config.metadata.resource_version.as_deref());
    patch_hive_config(client, patch).await?;
    info!("端点 VPC {} 已移除", endpoint_vpc_id);
    Ok(())
}
