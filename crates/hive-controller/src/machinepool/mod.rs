//! MachinePool 执行器
//!
//! 执行器把 MachinePool 转换为需要同步到远程集群的 MachineSet 列表。
//! 每个云平台实现一个执行器。

mod powervs;

pub use powervs::PowerVsActuator;

use async_trait::async_trait;
use hive_common::{ClusterDeployment, Error, MachinePool, MachineSet, Result};
use std::collections::HashSet;

/// 工作节点角色
pub const WORKER_ROLE: &str = "worker";

/// MachinePool 执行器
#[async_trait]
pub trait Actuator: Send + Sync {
    /// 生成需要同步到远程集群的 MachineSet
    ///
    /// 第二个返回值为 false 时表示暂时无法生成，调用方应稍后重试。
    async fn generate_machine_sets(
        &self,
        cd: &ClusterDeployment,
        pool: &MachinePool,
    ) -> Result<(Vec<MachineSet>, bool)>;
}

/// 把副本数平均分配到各可用区，余数依次分给靠前的可用区
///
/// 单个可用区的副本数超出 i32 范围时返回错误。
pub fn distribute_replicas(total: i64, zones: usize) -> Result<Vec<i32>> {
    if zones == 0 {
        return Ok(Vec::new());
    }
    let total = total.max(0);
    let zones_i64 = i64::try_from(zones)
        .map_err(|_| Error::Validation(format!("可用区数量过大: {zones}")))?;
    (0..zones_i64)
        .map(|idx| {
            let extra = if idx < total % zones_i64 { 1 } else { 0 };
            i32::try_from(total / zones_i64 + extra).map_err(|_| {
                Error::Validation(format!("副本数 {total} 分配到 {zones} 个可用区后超出范围"))
            })
        })
        .collect()
}

/// 可用区名称最后一个 `-` 之后的部分，用作 MachineSet 名称后缀
pub fn zone_suffix(zone: &str) -> &str {
    zone.rsplit('-').next().unwrap_or(zone)
}

/// 检查各可用区的名称后缀互不相同，避免生成同名 MachineSet
pub fn ensure_unique_zone_suffixes(zones: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for zone in zones {
        let suffix = zone_suffix(zone);
        if !seen.insert(suffix) {
            return Err(Error::Validation(format!(
                "可用区 {zone} 的后缀 {suffix} 与其他可用区重复"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(3, 3, vec![1, 1, 1])]
    #[case(5, 3, vec![2, 2, 1])]
    #[case(1, 3, vec![1, 0, 0])]
    #[case(0, 2, vec![0, 0])]
    #[case(-4, 2, vec![0, 0])]
    #[case(4, 0, vec![])]
    fn test_distribute_replicas(#[case] total: i64, #[case] zones: usize, #[case] expected: Vec<i32>) {
        assert_eq!(distribute_replicas(total, zones).unwrap(), expected);
    }

    #[test]
    fn test_distribute_replicas_overflow() {
        let err = distribute_replicas(i64::MAX, 2).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let max = i64::from(i32::MAX);
        assert_eq!(distribute_replicas(max * 2, 2).unwrap(), vec![i32::MAX, i32::MAX]);
        assert!(distribute_replicas(max * 2 + 1, 2).is_err());
    }

    #[test]
    fn test_ensure_unique_zone_suffixes() {
        let zones = vec!["us-south-1".to_string(), "us-south-2".to_string()];
        assert!(ensure_unique_zone_suffixes(&zones).is_ok());

        let zones = vec!["us-south-1".to_string(), "us-east-1".to_string()];
        let err = ensure_unique_zone_suffixes(&zones).unwrap_err();
        assert!(err.to_string().contains("us-east-1"));
    }

    #[test]
    fn test_zone_suffix() {
        assert_eq!(zone_suffix("us-south-1"), "1");
        assert_eq!(zone_suffix("test-region-A"), "A");
        assert_eq!(zone_suffix("dal12"), "dal12");
    }
}
