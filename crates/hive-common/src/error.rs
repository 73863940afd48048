//! 错误处理模块
//!
//! 该模块提供 Hive 库代码的统一错误类型。命令行和 Operator 入口使用 anyhow
//! 包装这些错误并补充上下文。

use std::io;
use thiserror::Error;

/// Hive 统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 校验错误，通常表示资源缺少必需字段或平台不匹配
    #[error("校验失败: {0}")]
    Validation(String),

    /// Kubernetes API 错误
    #[error("Kubernetes API 错误: {0}")]
    Kube(#[from] kube::Error),

    /// 云厂商 API 错误
    #[error("云 API 错误: {0}")]
    Cloud(String),

    /// 序列化/反序列化错误
    #[error("序列化/反序列化错误: {0}")]
    Serialization(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] io::Error),

    /// JSON 错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),
}

/// Hive 结果类型别名
pub type Result<T> = std::result::Result<T, Error>;
