//! 远程集群访问
//!
//! 通过 ClusterDeployment 的管理员 kubeconfig Secret 连接已安装的集群。

use k8s_openapi::api::core::v1::Secret;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use tracing::debug;

use hive_common::constants::KUBECONFIG_SECRET_KEY;
use hive_common::ClusterDeployment;

use crate::error::{Error, Result};

/// 从 Secret 中解析 kubeconfig
pub fn kubeconfig_from_secret(secret: &Secret) -> Result<Kubeconfig> {
    let raw = secret
        .data
        .as_ref()
        .and_then(|data| data.get(KUBECONFIG_SECRET_KEY))
        .ok_or_else(|| {
            Error::Kubeconfig(format!(
                "Secret {} 中没有 \"{}\" 数据",
                secret.name_any(),
                KUBECONFIG_SECRET_KEY
            ))
        })?;
    let content = std::str::from_utf8(&raw.0).map_err(|e| Error::Kubeconfig(e.to_string()))?;
    Kubeconfig::from_yaml(content).map_err(|e| Error::Kubeconfig(e.to_string()))
}

/// 创建远程集群客户端
pub async fn remote_client(client: Client, cd: &ClusterDeployment) -> Result<Client> {
    let namespace = cd.namespace().unwrap_or_else(|| "default".into());
    let secret_name = cd
        .spec
        .cluster_metadata
        .as_ref()
        .and_then(|metadata| metadata.admin_kubeconfig_secret_ref.name.clone())
        .ok_or_else(|| Error::Invalid("ClusterDeployment does not have admin kubeconfig secret".to_string()))?;

    debug!("使用 Secret {}/{} 连接远程集群", namespace, secret_name);
    let secrets: Api<Secret> = Api::namespaced(client, &namespace);
    let secret = secrets.get(&secret_name).await?;

    let kubeconfig = kubeconfig_from_secret(&secret)?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::Kubeconfig(e.to_string()))?;
    Ok(Client::try_from(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: remote
  cluster:
    server: https://api.mycluster.example.com:6443
contexts:
- name: admin
  context:
    cluster: remote
    user: admin
current-context: admin
users:
- name: admin
  user:
    token: abc
"#;

    fn secret(data: Option<&str>) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("mycluster-admin-kubeconfig".to_string()),
                ..Default::default()
            },
            data: data.map(|d| {
                BTreeMap::from([(KUBECONFIG_SECRET_KEY.to_string(), ByteString(d.as_bytes().to_vec()))])
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_kubeconfig_from_secret() {
        let kubeconfig = kubeconfig_from_secret(&secret(Some(KUBECONFIG))).unwrap();
        assert_eq!(kubeconfig.current_context.as_deref(), Some("admin"));
        assert_eq!(kubeconfig.clusters.len(), 1);
    }

    #[test]
    fn test_kubeconfig_missing_key() {
        let err = kubeconfig_from_secret(&secret(None)).unwrap_err();
        assert!(err.to_string().contains("mycluster-admin-kubeconfig"));
    }

    #[test]
    fn test_kubeconfig_invalid_yaml() {
        assert!(matches!(
            kubeconfig_from_secret(&secret(Some("clusters: ["))),
            Err(Error::Kubeconfig(_))
        ));
    }
}
