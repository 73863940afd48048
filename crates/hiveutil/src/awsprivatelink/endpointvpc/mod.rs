//! 端点 VPC 管理

pub mod remove;
