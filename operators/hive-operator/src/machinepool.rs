//! MachinePool 控制器
//!
//! 为已安装的 PowerVS 集群生成 MachineSet，以 server-side apply 同步到远程集群，
//! 删除不再需要的 MachineSet，并把结果写回 MachinePool 的状态。

use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use hive_common::constants::{MACHINE_API_NAMESPACE, MACHINE_POOL_NAME_LABEL};
use hive_common::{set_condition, ClusterDeployment, Condition, MachinePool, MachinePoolStatus, MachineSet, MachineSetStatus};
use hive_controller::machinepool::{Actuator, PowerVsActuator};

use crate::error::{Error, Result};
use crate::{remote, Context};

/// MachineSet 生成结果的条件类型
pub const MACHINE_SETS_GENERATED_CONDITION: &str = "MachineSetsGenerated";

/// 协调 MachinePool
pub async fn reconcile(pool: Arc<MachinePool>, ctx: Arc<Context>) -> Result<Action> {
    let name = pool.name_any();
    let namespace = pool.namespace().unwrap_or_else(|| "default".into());

    info!("协调 MachinePool {}/{}", namespace, name);

    if pool.spec.platform.powervs.is_none() {
        debug!("MachinePool {}/{} 不是 PowerVS 平台，跳过", namespace, name);
        return Ok(Action::await_change());
    }

    let cd_name = pool
        .spec
        .cluster_deployment_ref
        .name
        .clone()
        .ok_or_else(|| Error::Invalid("MachinePool 没有 clusterDeploymentRef".to_string()))?;
    let cds: Api<ClusterDeployment> = Api::namespaced(ctx.client.clone(), &namespace);
    let Some(cd) = cds.get_opt(&cd_name).await? else {
        warn!("ClusterDeployment {}/{} 不存在", namespace, cd_name);
        return Ok(Action::requeue(ctx.requeue_interval));
    };

    if !cd.spec.installed {
        info!("ClusterDeployment {}/{} 尚未安装完成，稍后重试", namespace, cd_name);
        return Ok(Action::requeue(ctx.requeue_interval));
    }

    let creds_name = cd
        .spec
        .platform
        .powervs
        .as_ref()
        .and_then(|platform| platform.credentials_secret_ref.name.clone())
        .ok_or_else(|| Error::Invalid("ClusterDeployment is not for PowerVS".to_string()))?;
    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
    let creds = secrets.get(&creds_name).await?;

    let actuator = PowerVsActuator::new(&creds)?;
    let (machine_sets, proceed) = match actuator.generate_machine_sets(&cd, &pool).await {
        Ok(result) => result,
        Err(e) => {
            let condition = Condition::new(MACHINE_SETS_GENERATED_CONDITION, false, "GenerationFailed", e.to_string());
            patch_status(&ctx.client, &pool, failed_status(&pool, condition)).await?;
            return Err(e.into());
        }
    };
    if !proceed {
        info!("MachinePool {}/{} 暂时无法生成 MachineSet，稍后重试", namespace, name);
        return Ok(Action::requeue(ctx.requeue_interval));
    }

    let remote_client = remote::remote_client(ctx.client.clone(), &cd).await?;
    sync_machine_sets(remote_client, &pool.spec.name, &machine_sets, &ctx.field_manager).await?;

    patch_status(&ctx.client, &pool, pool_status(&pool, &machine_sets)).await?;
    info!("MachinePool {}/{} 已同步 {} 个 MachineSet", namespace, name, machine_sets.len());

    Ok(Action::requeue(ctx.resync_interval))
}

/// 应用生成的 MachineSet 并删除同一 MachinePool 下多余的 MachineSet
async fn sync_machine_sets(client: Client, pool_name: &str, machine_sets: &[MachineSet], field_manager: &str) -> Result<()> {
    let api: Api<MachineSet> = Api::namespaced(client, MACHINE_API_NAMESPACE);
    let params = PatchParams::apply(field_manager).force();

    for ms in machine_sets {
        let ms_name = ms.name_any();
        debug!("应用 MachineSet {}", ms_name);
        api.patch(&ms_name, &params, &Patch::Apply(ms)).await?;
    }

    let existing = api
        .list(&ListParams::default().labels(&format!("{}={}", MACHINE_POOL_NAME_LABEL, pool_name)))
        .await?;
    let existing_names: Vec<String> = existing.items.iter().map(|ms| ms.name_any()).collect();
    for stale in stale_machine_sets(&existing_names, machine_sets) {
        info!("删除多余的 MachineSet {}", stale);
        api.delete(&stale, &DeleteParams::default()).await?;
    }
    Ok(())
}

/// 已存在但不在期望列表中的 MachineSet
pub fn stale_machine_sets(existing: &[String], desired: &[MachineSet]) -> Vec<String> {
    let desired: BTreeSet<String> = desired.iter().map(|ms| ms.name_any()).collect();
    existing
        .iter()
        .filter(|name| !desired.contains(*name))
        .cloned()
        .collect()
}

/// 根据生成的 MachineSet 计算 MachinePool 状态
pub fn pool_status(pool: &MachinePool, machine_sets: &[MachineSet]) -> MachinePoolStatus {
    let mut conditions = pool.status.as_ref().map(|s| s.conditions.clone()).unwrap_or_default();
    set_condition(
        &mut conditions,
        Condition::new(
            MACHINE_SETS_GENERATED_CONDITION,
            true,
            "MachineSetsGenerated",
            format!("已生成 {} 个 MachineSet", machine_sets.len()),
        ),
    );

    let machine_sets: Vec<MachineSetStatus> = machine_sets
        .iter()
        .map(|ms| MachineSetStatus {
            name: ms.name_any(),
            replicas: ms.spec.replicas,
        })
        .collect();

    MachinePoolStatus {
        replicas: machine_sets.iter().map(|ms| ms.replicas).sum(),
        machine_sets,
        conditions,
    }
}

/// 生成失败时只更新条件，保留原有的副本信息
fn failed_status(pool: &MachinePool, condition: Condition) -> MachinePoolStatus {
    let mut status = pool.status.clone().unwrap_or_default();
    set_condition(&mut status.conditions, condition);
    status
}

async fn patch_status(client: &Client, pool: &MachinePool, status: MachinePoolStatus) -> Result<()> {
    let namespace = pool.namespace().unwrap_or_else(|| "default".into());
    let api: Api<MachinePool> = Api::namespaced(client.clone(), &namespace);
    let patch = serde_json::json!({ "status": status });
    api.patch_status(&pool.name_any(), &PatchParams::default(), &Patch::Merge(patch))
        .await?;
    Ok(())
}

/// 处理协调错误
pub fn error_policy(pool: Arc<MachinePool>, error: &Error, ctx: Arc<Context>) -> Action {
    error!(
        "协调 MachinePool {}/{} 失败: {}",
        pool.namespace().unwrap_or_default(),
        pool.name_any(),
        error
    );
    Action::requeue(ctx.error_requeue_interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_common::{MachinePoolPlatform, MachinePoolSpec, MachineSetSpec};
    use k8s_openapi::api::core::v1::LocalObjectReference;

    fn machine_set(name: &str, replicas: i32) -> MachineSet {
        MachineSet::new(
            name,
            MachineSetSpec {
                replicas,
                ..Default::default()
            },
        )
    }

    fn pool() -> MachinePool {
        let mut pool = MachinePool::new(
            "mycluster-worker",
            MachinePoolSpec {
                cluster_deployment_ref: LocalObjectReference {
                    name: Some("mycluster".to_string()),
                },
                name: "worker".to_string(),
                replicas: Some(3),
                platform: MachinePoolPlatform::default(),
                labels: Default::default(),
                taints: vec![],
            },
        );
        pool.metadata.namespace = Some("clusters".to_string());
        pool
    }

    #[test]
    fn test_stale_machine_sets() {
        let existing = vec![
            "infra-worker-1".to_string(),
            "infra-worker-2".to_string(),
            "infra-worker-3".to_string(),
        ];
        let desired = vec![machine_set("infra-worker-1", 2), machine_set("infra-worker-2", 1)];
        assert_eq!(stale_machine_sets(&existing, &desired), vec!["infra-worker-3"]);
        assert!(stale_machine_sets(&[], &desired).is_empty());
    }

    #[test]
    fn test_pool_status() {
        let status = pool_status(
            &pool(),
            &[machine_set("infra-worker-1", 2), machine_set("infra-worker-2", 1)],
        );
        assert_eq!(status.replicas, 3);
        assert_eq!(status.machine_sets.len(), 2);
        assert_eq!(status.machine_sets[0].name, "infra-worker-1");
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].type_, MACHINE_SETS_GENERATED_CONDITION);
        assert_eq!(status.conditions[0].status, "True");
    }

    #[test]
    fn test_failed_status_keeps_replicas() {
        let mut pool = pool();
        pool.status = Some(pool_status(&pool, &[machine_set("infra-worker-1", 2)]));

        let status = failed_status(
            &pool,
            Condition::new(MACHINE_SETS_GENERATED_CONDITION, false, "GenerationFailed", "boom"),
        );
        assert_eq!(status.replicas, 2);
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].status, "False");
        assert_eq!(status.conditions[0].message.as_deref(), Some("boom"));
    }
}
