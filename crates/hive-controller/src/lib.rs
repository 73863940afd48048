//! Hive 控制平面库
//!
//! 该模块实现 Hive 控制器共用的云厂商客户端与资源生成逻辑：
//! Alibaba Cloud ECS 客户端、PowerVS 客户端、MachinePool 执行器、
//! 休眠执行器以及集群资源构建器。

pub mod alibabaclient;
pub mod clusterresource;
pub mod error;
pub mod hibernation;
pub mod machinepool;
pub mod powervsclient;
pub mod utils;

pub use error::CloudError;
