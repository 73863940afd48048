//! `hiveutil deprovision powervs INFRA_ID`

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::sync::Arc;
use tracing::info;

use hive_common::constants::POWERVS_API_KEY_ENV_VAR;
use hive_controller::powervsclient::api_key_from_secret;

use crate::config::PowerVsSettings;
use crate::ibmcloud::destroy::{ClusterMetadata, PowerVsDestroyer};
use crate::ibmcloud::IbmCloudClient;

/// 删除 openshift-installer 创建的 PowerVS 资源
#[derive(Args, Debug, Clone, Default)]
pub struct PowerVsDeprovisionArgs {
    /// 集群的 infra ID
    pub infra_id: String,

    /// 集群所在的 PowerVS 区域
    #[arg(long, default_value = "")]
    pub region: String,

    /// 集群所在的 PowerVS 可用区
    #[arg(long, default_value = "")]
    pub zone: String,

    /// 集群的基础域名
    #[arg(long, default_value = "")]
    pub base_domain: String,

    /// 集群名称
    #[arg(long, default_value = "")]
    pub cluster_name: String,

    /// 保存 API Key 的 Secret，未指定时读取 IBMCLOUD_API_KEY 环境变量
    #[arg(long)]
    pub creds_secret: Option<String>,

    /// 凭据 Secret 所在的命名空间
    #[arg(long, default_value = "default")]
    pub namespace: String,
}

impl PowerVsDeprovisionArgs {
    /// 检查必填参数
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("region", &self.region),
            ("zone", &self.zone),
            ("base-domain", &self.base_domain),
            ("cluster-name", &self.cluster_name),
        ];
        for (flag, value) in required {
            if value.is_empty() {
                bail!("no --{} provided, cannot proceed", flag);
            }
        }
        Ok(())
    }

    pub fn metadata(&self) -> ClusterMetadata {
        ClusterMetadata {
            cluster_name: self.cluster_name.clone(),
            infra_id: self.infra_id.clone(),
            base_domain: self.base_domain.clone(),
            region: self.region.clone(),
            zone: self.zone.clone(),
        }
    }

    async fn api_key(&self) -> Result<String> {
        match self.creds_secret.as_deref() {
            Some(name) => {
                let client = Client::try_default().await.context("创建 Kubernetes 客户端失败")?;
                let secrets: Api<Secret> = Api::namespaced(client, &self.namespace);
                let secret = secrets
                    .get(name)
                    .await
                    .with_context(|| format!("获取凭据 Secret {}/{} 失败", self.namespace, name))?;
                Ok(api_key_from_secret(&secret)?)
            }
            None => api_key_from_env(),
        }
    }
}

fn api_key_from_env() -> Result<String> {
    std::env::var(POWERVS_API_KEY_ENV_VAR)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| anyhow!("no {} env var set, cannot proceed", POWERVS_API_KEY_ENV_VAR))
}

/// 执行销毁
pub async fn run(args: &PowerVsDeprovisionArgs, settings: &PowerVsSettings) -> Result<()> {
    args.validate()?;
    let api_key = args.api_key().await?;

    let client = IbmCloudClient::new(&api_key, &args.region, settings).context("创建 IBM Cloud 客户端失败")?;
    info!("开始清理 infra ID 为 {} 的 PowerVS 资源", args.infra_id);
    PowerVsDestroyer::new(Arc::new(client), args.metadata(), settings.poll())
        .run()
        .await
}
