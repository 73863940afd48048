//! ECS RPC 客户端实现
//!
//! 请求使用 Alibaba Cloud RPC 签名（HMAC-SHA1），所有参数放在 GET 查询串中。

use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use k8s_openapi::api::core::v1::Secret;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::de::DeserializeOwned;
use sha1::Sha1;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use hive_common::constants::{
    ALIBABA_CLOUD_ACCESS_KEY_ID_SECRET_KEY, ALIBABA_CLOUD_ACCESS_KEY_SECRET_SECRET_KEY,
};

use super::types::*;
use super::{available_zones_with_stock, AlibabaApi};
use crate::error::CloudError;

const ECS_PRODUCT: &str = "ecs";
const ECS_API_VERSION: &str = "2014-05-26";

/// 各产品的默认接入点
static DEFAULT_ENDPOINTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("pvtz", "pvtz.aliyuncs.com"),
        ("resourcemanager", "resourcemanager.aliyuncs.com"),
        ("ecs", "ecs.aliyuncs.com"),
    ])
});

/// 默认接入点不可用的区域
static ADDITION_ENDPOINTS: Lazy<HashMap<&'static str, HashMap<&'static str, &'static str>>> =
    Lazy::new(|| {
        HashMap::from([(
            "ecs",
            HashMap::from([
                ("cn-wulanchabu", "ecs.cn-wulanchabu.aliyuncs.com"),
                ("cn-guangzhou", "ecs.cn-guangzhou.aliyuncs.com"),
                ("ap-southeast-6", "ecs.ap-southeast-6.aliyuncs.com"),
                ("cn-heyuan", "ecs.cn-heyuan.aliyuncs.com"),
                ("cn-chengdu", "ecs.cn-chengdu.aliyuncs.com"),
            ]),
        )])
    });

/// 提供区域化接入点 `{product}.{region}.aliyuncs.com` 的产品
const REGIONAL_PRODUCTS: &[&str] = &["ecs"];

/// 解析产品在指定区域的接入点
///
/// 依次查找：补充表、区域化接入点、产品默认接入点。
pub fn resolve_endpoint(product: &str, region_id: &str) -> Option<String> {
    let product = product.to_lowercase();
    let region_id = region_id.to_lowercase();

    if let Some(endpoint) = ADDITION_ENDPOINTS
        .get(product.as_str())
        .and_then(|regions| regions.get(region_id.as_str()))
    {
        return Some(endpoint.to_string());
    }

    if !region_id.is_empty() && REGIONAL_PRODUCTS.contains(&product.as_str()) {
        return Some(format!("{product}.{region_id}.aliyuncs.com"));
    }

    DEFAULT_ENDPOINTS
        .get(product.as_str())
        .map(|endpoint| endpoint.to_string())
}

/// 构造待签名字符串，返回 (规范化查询串, 待签名字符串)
pub fn string_to_sign(params: &BTreeMap<String, String>) -> (String, String) {
    let canonical = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let to_sign = format!("GET&{}&{}", urlencoding::encode("/"), urlencoding::encode(&canonical));
    (canonical, to_sign)
}

fn sign(access_key_secret: &str, to_sign: &str) -> Result<String, CloudError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(format!("{access_key_secret}&").as_bytes())
        .map_err(|e| CloudError::message(format!("初始化签名失败: {e}")))?;
    mac.update(to_sign.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Alibaba Cloud API 客户端
pub struct Client {
    http: reqwest::Client,
    region_id: String,
    access_key_id: String,
    access_key_secret: String,
}

impl Client {
    /// 使用 AccessKey 创建客户端
    pub fn new(region_id: &str, access_key_id: &str, access_key_secret: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            region_id: region_id.to_string(),
            access_key_id: access_key_id.to_string(),
            access_key_secret: access_key_secret.to_string(),
        }
    }

    /// 从凭据 Secret 创建客户端
    pub fn from_secret(secret: &Secret, region_id: &str) -> Result<Self, CloudError> {
        let access_key_id = secret_value(secret, ALIBABA_CLOUD_ACCESS_KEY_ID_SECRET_KEY)?;
        let access_key_secret = secret_value(secret, ALIBABA_CLOUD_ACCESS_KEY_SECRET_SECRET_KEY)?;
        Ok(Self::new(region_id, &access_key_id, &access_key_secret))
    }

    /// 客户端所属区域
    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    async fn do_action<T: DeserializeOwned>(
        &self,
        product: &str,
        action: &str,
        extra: Vec<(String, String)>,
    ) -> Result<T, CloudError> {
        let endpoint = resolve_endpoint(product, &self.region_id).ok_or_else(|| {
            CloudError::message(format!("无法解析 {product} 在区域 {} 的接入点", self.region_id))
        })?;

        let nonce: u64 = rand::thread_rng().gen();
        let mut params: BTreeMap<String, String> = BTreeMap::from([
            ("Action".to_string(), action.to_string()),
            ("Format".to_string(), "JSON".to_string()),
            ("Version".to_string(), ECS_API_VERSION.to_string()),
            ("AccessKeyId".to_string(), self.access_key_id.clone()),
            ("SignatureMethod".to_string(), "HMAC-SHA1".to_string()),
            ("SignatureVersion".to_string(), "1.0".to_string()),
            ("SignatureNonce".to_string(), format!("{nonce:016x}")),
            (
                "Timestamp".to_string(),
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ),
            ("RegionId".to_string(), self.region_id.clone()),
        ]);
        params.extend(extra);

        let (canonical, to_sign) = string_to_sign(&params);
        let signature = sign(&self.access_key_secret, &to_sign)?;
        let url = format!(
            "https://{endpoint}/?{canonical}&Signature={}",
            urlencoding::encode(&signature)
        );

        debug!("调用 Alibaba Cloud {} 接口 {}", product, action);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err: ErrorResponse = serde_json::from_slice(&body).unwrap_or_default();
            return Err(CloudError::new(
                if err.code.is_empty() { status.as_str().to_string() } else { err.code },
                format!("{} (RequestId: {})", err.message, err.request_id),
            ));
        }

        serde_json::from_slice(&body)
            .map_err(|e| CloudError::message(format!("解析 {action} 响应失败: {e}")))
    }
}

fn secret_value(secret: &Secret, key: &str) -> Result<String, CloudError> {
    let value = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .ok_or_else(|| CloudError::message(format!("creds secret does not contain \"{key}\" data")))?;
    String::from_utf8(value.0.clone())
        .map_err(|_| CloudError::message(format!("creds secret 中 \"{key}\" 不是有效的 UTF-8")))
}

#[async_trait]
impl AlibabaApi for Client {
    async fn describe_available_zone_by_instance_type(
        &self,
        instance_type: &str,
    ) -> Result<DescribeAvailableResourceResponse, CloudError> {
        let params = vec![
            ("DestinationResource".to_string(), "InstanceType".to_string()),
            ("InstanceType".to_string(), instance_type.to_string()),
        ];
        self.do_action(ECS_PRODUCT, "DescribeAvailableResource", params).await
    }

    async fn get_available_zones_by_instance_type(
        &self,
        instance_type: &str,
    ) -> Result<Vec<String>, CloudError> {
        let response = self.describe_available_zone_by_instance_type(instance_type).await?;
        Ok(available_zones_with_stock(&response))
    }

    async fn describe_instances(
        &self,
        request: &DescribeInstancesRequest,
    ) -> Result<DescribeInstancesResponse, CloudError> {
        self.do_action(ECS_PRODUCT, "DescribeInstances", request.to_params()).await
    }

    async fn start_instances(
        &self,
        request: &StartInstancesRequest,
    ) -> Result<StartInstancesResponse, CloudError> {
        self.do_action(ECS_PRODUCT, "StartInstances", request.to_params()).await
    }

    async fn stop_instances(
        &self,
        request: &StopInstancesRequest,
    ) -> Result<StopInstancesResponse, CloudError> {
        self.do_action(ECS_PRODUCT, "StopInstances", request.to_params()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;

    #[test]
    fn test_resolve_endpoint() {
        assert_eq!(
            resolve_endpoint("ECS", "cn-chengdu").as_deref(),
            Some("ecs.cn-chengdu.aliyuncs.com")
        );
        assert_eq!(
            resolve_endpoint("ecs", "cn-hangzhou").as_deref(),
            Some("ecs.cn-hangzhou.aliyuncs.com")
        );
        assert_eq!(
            resolve_endpoint("ecs", "eu-central-1").as_deref(),
            Some("ecs.eu-central-1.aliyuncs.com")
        );
        assert_eq!(
            resolve_endpoint("ecs", "AP-Southeast-2").as_deref(),
            Some("ecs.ap-southeast-2.aliyuncs.com")
        );
        assert_eq!(resolve_endpoint("ecs", "").as_deref(), Some("ecs.aliyuncs.com"));
        assert_eq!(resolve_endpoint("pvtz", "cn-chengdu").as_deref(), Some("pvtz.aliyuncs.com"));
        assert_eq!(resolve_endpoint("vpc", "cn-hangzhou"), None);
    }

    #[test]
    fn test_string_to_sign_sorts_and_encodes() {
        let params = BTreeMap::from([
            ("Timestamp".to_string(), "2016-02-23T12:46:24Z".to_string()),
            ("Action".to_string(), "DescribeRegions".to_string()),
            ("AccessKeyId".to_string(), "testid".to_string()),
        ]);

        let (canonical, to_sign) = string_to_sign(&params);
        assert_eq!(
            canonical,
            "AccessKeyId=testid&Action=DescribeRegions&Timestamp=2016-02-23T12%3A46%3A24Z"
        );
        assert_eq!(
            to_sign,
            "GET&%2F&AccessKeyId%3Dtestid%26Action%3DDescribeRegions%26Timestamp%3D2016-02-23T12%253A46%253A24Z"
        );
    }

    #[test]
    fn test_signature_is_base64_sha1() {
        let signature = sign("testsecret", "GET&%2F&Action%3DDescribeRegions").unwrap();
        assert_eq!(signature.len(), 28);
        assert!(signature.ends_with('='));
    }

    #[test]
    fn test_from_secret_requires_keys() {
        let mut secret = Secret::default();
        let err = Client::from_secret(&secret, "cn-hangzhou").err().unwrap();
        assert!(err.message.contains("access_key_id"));

        secret.data = Some(BTreeMap::from([(
            "access_key_id".to_string(),
            ByteString(b"id".to_vec()),
        )]));
        let err = Client::from_secret(&secret, "cn-hangzhou").err().unwrap();
        assert!(err.message.contains("access_key_secret"));

        secret.data.as_mut().unwrap().insert(
            "access_key_secret".to_string(),
            ByteString(b"secret".to_vec()),
        );
        let client = Client::from_secret(&secret, "cn-hangzhou").unwrap();
        assert_eq!(client.region_id(), "cn-hangzhou");
    }
}
