//! hiveutil - Hive 运维命令行工具
//!
//! 提供 AWS PrivateLink 的关闭与端点 VPC 移除、PowerVS 集群资源清理，
//! 以及生成集群资源清单等子命令。

pub mod awsclient;
pub mod awsprivatelink;
pub mod config;
pub mod create_cluster;
pub mod deprovision;
pub mod ibmcloud;
