//! 集群资源清理命令

pub mod powervs;
