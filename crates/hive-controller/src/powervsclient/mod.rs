//! PowerVS 客户端
//!
//! MachinePool 执行器通过该客户端查询 PowerVS 区域对应的 VPC 可用区。

mod iam;

pub use iam::{IamAuthenticator, DEFAULT_IAM_ENDPOINT};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use serde::Deserialize;
use tracing::debug;

use hive_common::constants::POWERVS_API_KEY_SECRET_KEY;

use crate::error::CloudError;

/// VPC API 版本日期
pub const VPC_API_VERSION: &str = "2023-06-13";

/// PowerVS 区域到 VPC 区域的映射
const POWERVS_TO_VPC_REGION: &[(&str, &str)] = &[
    ("dal", "us-south"),
    ("eu-de", "eu-de"),
    ("lon", "eu-gb"),
    ("mad", "eu-es"),
    ("mon", "ca-tor"),
    ("osa", "jp-osa"),
    ("sao", "br-sao"),
    ("syd", "au-syd"),
    ("tok", "jp-tok"),
    ("tor", "ca-tor"),
    ("us-east", "us-east"),
    ("us-south", "us-south"),
    ("wdc", "us-east"),
];

/// 返回 PowerVS 区域所在的 VPC 区域；传入值本身就是 VPC 区域时原样返回
pub fn vpc_region_for_powervs_region(region: &str) -> Result<&'static str, CloudError> {
    POWERVS_TO_VPC_REGION
        .iter()
        .find(|(powervs, vpc)| *powervs == region || *vpc == region)
        .map(|(_, vpc)| *vpc)
        .ok_or_else(|| CloudError::new("UnknownRegion", format!("未知的 PowerVS 区域: {region}")))
}

/// PowerVS API 调用集合
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PowerVsApi: Send + Sync {
    /// 返回 PowerVS 区域对应 VPC 区域中处于可用状态的可用区
    async fn get_vpc_zones_for_region(&self, region: &str) -> Result<Vec<String>, CloudError>;
}

#[derive(Debug, Deserialize)]
struct ZoneCollection {
    #[serde(default)]
    zones: Vec<Zone>,
}

#[derive(Debug, Deserialize)]
struct Zone {
    name: String,
    #[serde(default)]
    status: String,
}

/// PowerVS 客户端
pub struct Client {
    http: reqwest::Client,
    auth: IamAuthenticator,
}

impl Client {
    /// 使用 API Key 创建客户端
    pub fn from_api_key(api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth: IamAuthenticator::new(api_key),
        }
    }

    /// 从凭据 Secret 创建客户端
    pub fn from_secret(secret: &Secret) -> Result<Self, CloudError> {
        Ok(Self::from_api_key(&api_key_from_secret(secret)?))
    }
}

/// 从凭据 Secret 中读取 API Key，`data` 优先于 `stringData`
pub fn api_key_from_secret(secret: &Secret) -> Result<String, CloudError> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(POWERVS_API_KEY_SECRET_KEY))
        .map(|value| String::from_utf8_lossy(&value.0).trim().to_string())
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|data| data.get(POWERVS_API_KEY_SECRET_KEY))
                .cloned()
        })
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            CloudError::message(format!(
                "creds secret does not contain \"{POWERVS_API_KEY_SECRET_KEY}\" data"
            ))
        })
}

#[async_trait]
impl PowerVsApi for Client {
    async fn get_vpc_zones_for_region(&self, region: &str) -> Result<Vec<String>, CloudError> {
        let vpc_region = vpc_region_for_powervs_region(region)?;
        let token = self.auth.token().await?;
        let url = format!("https://{vpc_region}.iaas.cloud.ibm.com/v1/regions/{vpc_region}/zones");

        debug!("查询 VPC 区域 {} 的可用区", vpc_region);
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("version", VPC_API_VERSION), ("generation", "2")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CloudError::new(status.as_str(), body));
        }

        let zones: ZoneCollection = response.json().await?;
        Ok(zones
            .zones
            .into_iter()
            .filter(|zone| zone.status.is_empty() || zone.status == "available")
            .map(|zone| zone.name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    #[test]
    fn test_vpc_region_mapping() {
        assert_eq!(vpc_region_for_powervs_region("dal").unwrap(), "us-south");
        assert_eq!(vpc_region_for_powervs_region("wdc").unwrap(), "us-east");
        assert_eq!(vpc_region_for_powervs_region("eu-gb").unwrap(), "eu-gb");
        assert!(vpc_region_for_powervs_region("atlantis")
            .unwrap_err()
            .is_code("UnknownRegion"));
    }

    #[test]
    fn test_from_secret() {
        let mut secret = Secret::default();
        assert!(Client::from_secret(&secret).is_err());

        secret.data = Some(BTreeMap::from([(
            POWERVS_API_KEY_SECRET_KEY.to_string(),
            ByteString(b"api-key\n".to_vec()),
        )]));
        assert!(Client::from_secret(&secret).is_ok());
    }
}
