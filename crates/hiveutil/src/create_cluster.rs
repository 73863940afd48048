//! `hiveutil create-cluster NAME`
//!
//! 生成一个集群所需的全部对象，输出为 YAML 或直接创建到当前集群。

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, ValueEnum};
use k8s_openapi::api::core::v1::Secret;
use kube::api::PostParams;
use kube::{Api, Client, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;
use tracing::{info, warn};

use hive_common::constants::POWERVS_API_KEY_ENV_VAR;
use hive_common::manageddns::{find_managed_domain, read_managed_domains_file};
use hive_common::{ClusterDeployment, MachinePool};
use hive_controller::clusterresource::{Builder, ClusterObject, PowerVsBuilder};

/// 云平台
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cloud {
    Powervs,
}

/// 输出方式
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// 打印 YAML
    Yaml,
    /// 在当前集群中创建
    Apply,
}

/// 创建集群
#[derive(Args, Debug, Clone)]
pub struct CreateClusterArgs {
    /// 集群名称
    pub name: String,

    #[arg(long, value_enum, default_value = "powervs")]
    pub cloud: Cloud,

    #[arg(long)]
    pub region: String,

    #[arg(long)]
    pub zone: String,

    #[arg(long)]
    pub base_domain: String,

    /// pull secret 文件路径
    #[arg(long)]
    pub pull_secret_file: PathBuf,

    /// SSH 公钥文件路径
    #[arg(long)]
    pub ssh_public_key_file: Option<PathBuf>,

    #[arg(long, default_value = "default")]
    pub namespace: String,

    /// worker 节点数
    #[arg(long, default_value_t = 3)]
    pub workers: i64,

    #[arg(long)]
    pub release_image: Option<String>,

    /// 由 Hive 管理集群 DNS，基础域名必须是托管域
    #[arg(long)]
    pub manage_dns: bool,

    /// 额外的 ClusterDeployment 标签，格式为 key=value
    #[arg(long = "label", value_parser = parse_label)]
    pub labels: Vec<(String, String)>,

    #[arg(long, value_enum, default_value = "yaml")]
    pub output: Output,
}

fn parse_label(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("标签格式错误，应为 key=value: {value}")),
    }
}

fn read_trimmed(path: &PathBuf) -> Result<String> {
    let content = std::fs::read_to_string(path).with_context(|| format!("读取文件 {} 失败", path.display()))?;
    Ok(content.trim().to_string())
}

impl CreateClusterArgs {
    /// 根据参数组装构建器
    pub fn builder(&self, api_key: &str) -> Result<Builder> {
        if self.manage_dns {
            let domains = read_managed_domains_file()?;
            if find_managed_domain(&domains, &self.base_domain).is_none() {
                bail!("基础域名 {} 不在任何托管域中，不能使用 --manage-dns", self.base_domain);
            }
        }

        let cloud = match self.cloud {
            Cloud::Powervs => Box::new(PowerVsBuilder {
                api_key: api_key.to_string(),
                region: self.region.clone(),
                zone: self.zone.clone(),
            }),
        };

        let ssh_public_key = match self.ssh_public_key_file.as_ref() {
            Some(path) => read_trimmed(path)?,
            None => String::new(),
        };

        Ok(Builder {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            base_domain: self.base_domain.clone(),
            worker_node_count: self.workers,
            pull_secret: read_trimmed(&self.pull_secret_file)?,
            ssh_public_key,
            release_image: self.release_image.clone(),
            manage_dns: self.manage_dns,
            labels: self.labels.iter().cloned().collect::<BTreeMap<_, _>>(),
            cloud,
        })
    }
}

/// 序列化为多文档 YAML
pub fn to_yaml(objects: &[ClusterObject]) -> Result<String> {
    let mut docs = Vec::with_capacity(objects.len());
    for object in objects {
        docs.push(serde_yaml::to_string(object).with_context(|| format!("序列化 {} 失败", object.kind()))?);
    }
    Ok(docs.join("---\n"))
}

async fn create<K>(client: &Client, namespace: &str, object: &K) -> Result<()>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug,
    <K as kube::Resource>::DynamicType: Default,
{
    let api: Api<K> = Api::namespaced(client.clone(), namespace);
    let kind = K::kind(&Default::default()).to_string();
    match api.create(&PostParams::default(), object).await {
        Ok(created) => {
            info!("已创建 {} {}/{}", kind, namespace, created.name_any());
            Ok(())
        }
        Err(kube::Error::Api(resp)) if resp.code == 409 => {
            warn!("{} {}/{} 已存在，跳过", kind, namespace, object.name_any());
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("创建 {} {} 失败", kind, object.name_any())),
    }
}

/// 在集群中依次创建对象
pub async fn apply(client: Client, namespace: &str, objects: &[ClusterObject]) -> Result<()> {
    for object in objects {
        match object {
            ClusterObject::Secret(secret) => create::<Secret>(&client, namespace, secret).await?,
            ClusterObject::ClusterDeployment(cd) => create::<ClusterDeployment>(&client, namespace, cd).await?,
            ClusterObject::MachinePool(pool) => create::<MachinePool>(&client, namespace, pool).await?,
        }
    }
    Ok(())
}

/// 执行创建
pub async fn run(args: &CreateClusterArgs) -> Result<()> {
    let api_key = match args.cloud {
        Cloud::Powervs => std::env::var(POWERVS_API_KEY_ENV_VAR)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("no {} env var set, cannot proceed", POWERVS_API_KEY_ENV_VAR))?,
    };

    let objects = args.builder(&api_key)?.build()?;
    match args.output {
        Output::Yaml => {
            print!("{}", to_yaml(&objects)?);
            Ok(())
        }
        Output::Apply => {
            let client = Client::try_default().await.context("创建 Kubernetes 客户端失败")?;
            apply(client, &args.namespace, &objects).await?;
            info!("集群 {} 的资源已创建", args.name);
            Ok(())
        }
    }
}
