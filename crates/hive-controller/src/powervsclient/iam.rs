//! IBM Cloud IAM 认证
//!
//! 用 API Key 换取 Bearer token，并在过期前缓存。

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::CloudError;

/// IAM 默认地址
pub const DEFAULT_IAM_ENDPOINT: &str = "https://iam.cloud.ibm.com";

/// 提前刷新 token 的余量
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// IAM API Key 认证器
pub struct IamAuthenticator {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    cached: Mutex<Option<CachedToken>>,
}

impl IamAuthenticator {
    /// 使用默认 IAM 地址创建认证器
    pub fn new(api_key: &str) -> Self {
        Self::with_endpoint(api_key, DEFAULT_IAM_ENDPOINT)
    }

    /// 使用指定 IAM 地址创建认证器
    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// 返回有效的 Bearer token，必要时重新获取
    pub async fn token(&self) -> Result<String, CloudError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + REFRESH_MARGIN < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        debug!("向 IAM 申请新的访问令牌");
        let response = self
            .http
            .post(format!("{}/identity/token", self.endpoint))
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CloudError::new(
                status.as_str(),
                format!("IAM 认证失败: {body}"),
            ));
        }

        let token: TokenResponse = response.json().await?;
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }
}
