//! `hiveutil awsprivatelink disable`

use anyhow::{bail, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, ListParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use hive_common::constants::{PRIVATE_LINK_HUB_ACCT_CREDS_LABEL, PRIVATE_LINK_HUB_ACCT_CREDS_NAME};
use hive_common::{hive_namespace, HiveConfigSpec};

use super::{get_hive_config, patch_hive_config};

/// 检查 HiveConfig 是否可以关闭 PrivateLink
///
/// 端点 VPC 清单和关联 VPC 都还存在时说明网络尚未清理，拒绝关闭。
pub fn check_disable(spec: &HiveConfigSpec) -> Result<()> {
    let Some(private_link) = spec.aws_private_link.as_ref() else {
        warn!("HiveConfig 中的 AWS PrivateLink 已经处于关闭状态");
        return Ok(());
    };

    if !private_link.endpoint_vpc_inventory.is_empty() && !private_link.associated_vpcs.is_empty() {
        bail!(
            "HiveConfig 中仍有端点 VPC 与关联 VPC 相连，请先对每个端点 VPC 执行 \
             `hiveutil awsprivatelink endpointvpc remove <vpc-id>` 拆除网络"
        );
    }
    Ok(())
}

/// 清空 `spec.awsPrivateLink` 的 merge patch
pub fn disable_patch() -> Value {
    json!({ "spec": { "awsPrivateLink": null } })
}

/// 列出 Hub 账号凭据 Secret 的查询参数
pub fn hub_acct_creds_list_params() -> ListParams {
    ListParams::default()
        .fields(&format!("metadata.name={}", PRIVATE_LINK_HUB_ACCT_CREDS_NAME))
        .labels(&format!("{}=true", PRIVATE_LINK_HUB_ACCT_CREDS_LABEL))
}

/// 执行关闭流程
pub async fn run(client: Client) -> Result<()> {
    let hive_config = get_hive_config(client.clone()).await?;
    check_disable(&hive_config.spec)?;

    let namespace = hive_namespace(&hive_config);
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &namespace);

    info!("删除命名空间 {} 中的 Hub 账号凭据", namespace);
    match secrets.list(&hub_acct_creds_list_params()).await {
        Ok(list) => {
            for secret in list.items {
                let name = secret.name_any();
                match secrets.delete(&name, &DeleteParams::default()).await {
                    Ok(_) => info!("已删除 Secret {}/{}", namespace, name),
                    Err(e) => error!("删除 Secret {}/{} 失败: {}", namespace, name, e),
                }
            }
        }
        Err(e) => error!("列出 Hub 账号凭据 Secret 失败: {}", e),
    }

    info!("从 HiveConfig 中移除 AWS PrivateLink 配置");
    patch_hive_config(client, disable_patch()).await?;
    info!("AWS PrivateLink 已关闭");
    Ok(())
}
