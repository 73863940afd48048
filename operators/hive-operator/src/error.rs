//! Operator 错误类型

use thiserror::Error;

use hive_controller::CloudError;

/// 协调过程中的错误
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API 错误
    #[error("Kubernetes API 错误: {0}")]
    Kube(#[from] kube::Error),

    /// 远程集群 kubeconfig 错误
    #[error("kubeconfig 错误: {0}")]
    Kubeconfig(String),

    /// 执行器错误
    #[error("{0}")]
    Hive(#[from] hive_common::Error),

    /// 云 API 错误
    #[error("云 API 错误: {0}")]
    Cloud(#[from] CloudError),

    /// 资源缺少必要字段
    #[error("{0}")]
    Invalid(String),
}

/// Operator 结果类型
pub type Result<T, E = Error> = std::result::Result<T, E>;
