//! 控制器启动
//!
//! 同时运行 MachinePool 控制器和 ClusterDeployment 休眠控制器，直到两者都退出。

use futures::StreamExt;
use kube::api::Api;
use kube::runtime::{watcher, Controller};
use kube::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

use hive_common::{ClusterDeployment, MachinePool};

use crate::{hibernation, machinepool, Context};

fn namespaced_or_all<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as kube::Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// 运行全部控制器
pub async fn run(ctx: Arc<Context>, namespace: Option<&str>) {
    let pools: Api<MachinePool> = namespaced_or_all(ctx.client.clone(), namespace);
    let cds: Api<ClusterDeployment> = namespaced_or_all(ctx.client.clone(), namespace);

    info!(
        "启动 MachinePool 和休眠控制器，监听命名空间: {}",
        namespace.unwrap_or("全部")
    );

    let machine_pools = Controller::new(pools, watcher::Config::default())
        .shutdown_on_signal()
        .run(machinepool::reconcile, machinepool::error_policy, ctx.clone())
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => debug!("MachinePool {} 协调完成", obj.name),
                Err(e) => error!("MachinePool 控制器错误: {}", e),
            }
        });

    let hibernation = Controller::new(cds, watcher::Config::default())
        .shutdown_on_signal()
        .run(hibernation::reconcile, hibernation::error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => debug!("ClusterDeployment {} 电源状态协调完成", obj.name),
                Err(e) => error!("休眠控制器错误: {}", e),
            }
        });

    futures::join!(machine_pools, hibernation);
    info!("控制器已停止");
}
