//! 云 API 错误
//!
//! 所有云厂商客户端返回同一种错误，保留厂商的错误码，调用方据此
//! 区分"资源不存在"等可以容忍的情况。

use thiserror::Error;

/// 云厂商 API 调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", format_cloud_error(.code, .message))]
pub struct CloudError {
    /// 厂商返回的错误码，例如 `InvalidRoute.NotFound`
    pub code: Option<String>,
    /// 错误详情
    pub message: String,
}

fn format_cloud_error(code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) => format!("{code}: {message}"),
        None => message.to_string(),
    }
}

impl CloudError {
    /// 创建带错误码的错误
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// 创建不带错误码的错误
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// 错误码是否等于给定值
    pub fn is_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl From<reqwest::Error> for CloudError {
    fn from(err: reqwest::Error) -> Self {
        Self::message(format!("HTTP 请求失败: {err}"))
    }
}

impl From<CloudError> for hive_common::Error {
    fn from(err: CloudError) -> Self {
        hive_common::Error::Cloud(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CloudError::new("InvalidRoute.NotFound", "no route");
        assert_eq!(err.to_string(), "InvalidRoute.NotFound: no route");
        assert!(err.is_code("InvalidRoute.NotFound"));
        assert!(!CloudError::message("boom").is_code("InvalidRoute.NotFound"));
    }
}
