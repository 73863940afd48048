//! AWS PrivateLink 管理命令
//!
//! - `disable`: 关闭 PrivateLink，删除 Hub 账号凭据并清空 HiveConfig 中的配置
//! - `endpointvpc remove`: 拆除端点 VPC 与关联 VPC 之间的网络并将其移出清单

pub mod disable;
pub mod endpointvpc;

use anyhow::{Context, Result};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::Value;

use hive_common::constants::HIVE_CONFIG_NAME;
use hive_common::HiveConfig;

/// 读取 `HiveConfig/hive`
pub async fn get_hive_config(client: Client) -> Result<HiveConfig> {
    let api: Api<HiveConfig> = Api::all(client);
    api.get(HIVE_CONFIG_NAME)
        .await
        .with_context(|| format!("获取 HiveConfig/{} 失败", HIVE_CONFIG_NAME))
}

/// 以 JSON merge patch 更新 `HiveConfig/hive`，只改动 patch 中出现的字段
pub async fn patch_hive_config(client: Client, patch: Value) -> Result<HiveConfig> {
    let api: Api<HiveConfig> = Api::all(client);
    api.patch(HIVE_CONFIG_NAME, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("更新 HiveConfig/{} 失败", HIVE_CONFIG_NAME))
}
