//! Hive Operator
//!
//! 运行 MachinePool 和休眠两个控制器，把集群的期望状态同步到云端和远程集群。

pub mod controller;
pub mod error;
pub mod hibernation;
pub mod machinepool;
pub mod remote;

use kube::Client;
use std::time::Duration;

/// 控制器共享的上下文
#[derive(Clone)]
pub struct Context {
    /// 管理集群的 Kubernetes 客户端
    pub client: Client,
    /// 条件未满足时的重试间隔
    pub requeue_interval: Duration,
    /// 成功后的周期性重新协调间隔
    pub resync_interval: Duration,
    /// 协调失败后的重试间隔
    pub error_requeue_interval: Duration,
    /// server-side apply 使用的字段管理者
    pub field_manager: String,
}

/// 控制器间隔配置
#[derive(Debug, Clone, PartialEq)]
pub struct Intervals {
    pub requeue: Duration,
    pub resync: Duration,
    pub error_requeue: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            requeue: Duration::from_secs(30),
            resync: Duration::from_secs(300),
            error_requeue: Duration::from_secs(60),
        }
    }
}

impl Context {
    pub fn new(client: Client, intervals: Intervals, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            requeue_interval: intervals.requeue,
            resync_interval: intervals.resync,
            error_requeue_interval: intervals.error_requeue,
            field_manager: field_manager.into(),
        }
    }
}
