//! Hive Common - 跨模块共享的 API 类型与工具
//!
//! 该模块提供 Hive 各组件共享的自定义资源类型（HiveConfig、ClusterDeployment、
//! MachinePool 等）、平台配置、常量、统一错误类型以及托管 DNS 域配置的读取。

pub mod constants;
pub mod error;
pub mod manageddns;
pub mod models;

/// 重新导出常用类型，方便使用
pub use error::Error;
pub use error::Result;
pub use models::*;
