//! 休眠执行器
//!
//! 停止或启动集群的全部云主机，使集群进入休眠或从休眠恢复。

mod alibaba;

pub use alibaba::AlibabaHibernationActuator;

use async_trait::async_trait;
use hive_common::Result;

/// 休眠执行器
#[async_trait]
pub trait HibernationActuator: Send + Sync {
    /// 停止集群的全部机器
    async fn stop_machines(&self, infra_id: &str) -> Result<()>;

    /// 启动集群的全部机器
    async fn start_machines(&self, infra_id: &str) -> Result<()>;

    /// 全部机器是否处于运行状态，同时返回尚未运行的机器
    async fn machines_running(&self, infra_id: &str) -> Result<(bool, Vec<String>)>;

    /// 全部机器是否处于停止状态，同时返回尚未停止的机器
    async fn machines_stopped(&self, infra_id: &str) -> Result<(bool, Vec<String>)>;
}
