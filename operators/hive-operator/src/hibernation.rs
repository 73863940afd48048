//! 休眠控制器
//!
//! 对阿里云集群，根据 `spec.powerState` 停止或启动全部云主机，
//! 并把实际电源状态写回 `status.powerState`。

use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

use hive_common::{set_condition, ClusterDeployment, Condition, PowerState};
use hive_controller::alibabaclient;
use hive_controller::hibernation::{AlibabaHibernationActuator, HibernationActuator};

use crate::error::{Error, Result};
use crate::Context;

/// 休眠条件类型
pub const HIBERNATING_CONDITION: &str = "Hibernating";

/// 一次驱动的结果
#[derive(Debug, Clone)]
pub struct PowerOutcome {
    /// 需要写入 status 的电源状态，None 表示保持不变
    pub power_state: Option<PowerState>,
    /// 机器是否已经达到期望状态
    pub settled: bool,
    pub condition: Condition,
}

fn pending_message(verb: &str, pending: &[String]) -> String {
    format!("等待 {} 台机器{}: {}", pending.len(), verb, pending.join(", "))
}

/// 把集群机器驱动到期望的电源状态
pub async fn drive_power_state(
    actuator: &dyn HibernationActuator,
    infra_id: &str,
    desired: PowerState,
) -> hive_common::Result<PowerOutcome> {
    match desired {
        PowerState::Hibernating => {
            let (stopped, pending) = actuator.machines_stopped(infra_id).await?;
            if stopped {
                return Ok(PowerOutcome {
                    power_state: Some(PowerState::Hibernating),
                    settled: true,
                    condition: Condition::new(HIBERNATING_CONDITION, true, "Hibernating", "集群已休眠"),
                });
            }
            actuator.stop_machines(infra_id).await?;
            Ok(PowerOutcome {
                power_state: None,
                settled: false,
                condition: Condition::new(HIBERNATING_CONDITION, false, "Stopping", pending_message("停止", &pending)),
            })
        }
        PowerState::Running | PowerState::Resuming => {
            let (running, pending) = actuator.machines_running(infra_id).await?;
            if running {
                return Ok(PowerOutcome {
                    power_state: Some(PowerState::Running),
                    settled: true,
                    condition: Condition::new(HIBERNATING_CONDITION, false, "Running", "集群正在运行"),
                });
            }
            actuator.start_machines(infra_id).await?;
            Ok(PowerOutcome {
                power_state: Some(PowerState::Resuming),
                settled: false,
                condition: Condition::new(HIBERNATING_CONDITION, false, "Resuming", pending_message("启动", &pending)),
            })
        }
    }
}

/// 协调 ClusterDeployment 的电源状态
pub async fn reconcile(cd: Arc<ClusterDeployment>, ctx: Arc<Context>) -> Result<Action> {
    let name = cd.name_any();
    let namespace = cd.namespace().unwrap_or_else(|| "default".into());

    let Some(platform) = cd.spec.platform.alibaba_cloud.as_ref() else {
        return Ok(Action::await_change());
    };
    if !cd.spec.installed {
        debug!("ClusterDeployment {}/{} 尚未安装完成，跳过休眠处理", namespace, name);
        return Ok(Action::await_change());
    }
    let infra_id = cd
        .infra_id()
        .ok_or_else(|| Error::Invalid("ClusterDeployment does not have cluster metadata".to_string()))?;

    let desired = cd.spec.power_state.unwrap_or(PowerState::Running);
    let current = cd.status.as_ref().and_then(|s| s.power_state);
    info!(
        "协调 ClusterDeployment {}/{} 电源状态: 期望 {:?}，当前 {:?}",
        namespace, name, desired, current
    );

    let creds_name = platform
        .credentials_secret_ref
        .name
        .clone()
        .ok_or_else(|| Error::Invalid("ClusterDeployment 没有阿里云凭据".to_string()))?;
    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
    let creds = secrets.get(&creds_name).await?;
    let client = alibabaclient::Client::from_secret(&creds, &platform.region)?;
    let actuator = AlibabaHibernationActuator::new(Arc::new(client));

    let outcome = drive_power_state(&actuator, infra_id, desired).await?;

    let mut conditions = cd.status.as_ref().map(|s| s.conditions.clone()).unwrap_or_default();
    set_condition(&mut conditions, outcome.condition.clone());
    let mut status = json!({ "conditions": conditions });
    if let Some(power_state) = outcome.power_state {
        status["powerState"] = json!(power_state);
    }

    let api: Api<ClusterDeployment> = Api::namespaced(ctx.client.clone(), &namespace);
    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(json!({ "status": status })))
        .await?;

    if outcome.settled {
        Ok(Action::requeue(ctx.resync_interval))
    } else {
        Ok(Action::requeue(ctx.requeue_interval))
    }
}

/// 处理协调错误
pub fn error_policy(cd: Arc<ClusterDeployment>, error: &Error, ctx: Arc<Context>) -> Action {
    error!(
        "协调 ClusterDeployment {}/{} 电源状态失败: {}",
        cd.namespace().unwrap_or_default(),
        cd.name_any(),
        error
    );
    Action::requeue(ctx.error_requeue_interval)
}
