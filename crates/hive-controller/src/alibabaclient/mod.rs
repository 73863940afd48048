//! Alibaba Cloud ECS 客户端
//!
//! `AlibabaApi` 描述 Hive 对 Alibaba Cloud 的全部调用，控制器只依赖该 trait，
//! 测试中使用 mockall 生成的实现替换。

mod client;
mod types;

pub use client::{resolve_endpoint, string_to_sign, Client};
pub use types::*;

use async_trait::async_trait;

use crate::error::CloudError;

/// Alibaba Cloud API 调用集合
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlibabaApi: Send + Sync {
    /// 查询指定实例规格可用的可用区
    async fn describe_available_zone_by_instance_type(
        &self,
        instance_type: &str,
    ) -> Result<DescribeAvailableResourceResponse, CloudError>;

    /// 返回指定实例规格可用且有库存的可用区
    async fn get_available_zones_by_instance_type(
        &self,
        instance_type: &str,
    ) -> Result<Vec<String>, CloudError>;

    /// 查询一个或多个 ECS 实例的详情
    async fn describe_instances(
        &self,
        request: &DescribeInstancesRequest,
    ) -> Result<DescribeInstancesResponse, CloudError>;

    /// 启动一个或多个 ECS 实例
    async fn start_instances(
        &self,
        request: &StartInstancesRequest,
    ) -> Result<StartInstancesResponse, CloudError>;

    /// 停止一个或多个 ECS 实例
    async fn stop_instances(
        &self,
        request: &StopInstancesRequest,
    ) -> Result<StopInstancesResponse, CloudError>;
}

/// 从可用区查询结果中筛选出可用且有库存的可用区
pub fn available_zones_with_stock(response: &DescribeAvailableResourceResponse) -> Vec<String> {
    response
        .available_zones
        .available_zone
        .iter()
        .filter(|zone| zone.status == "Available" && zone.status_category == "WithStock")
        .map(|zone| zone.zone_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: &str, status: &str, category: &str) -> AvailableZone {
        AvailableZone {
            zone_id: id.to_string(),
            region_id: "cn-hangzhou".to_string(),
            status: status.to_string(),
            status_category: category.to_string(),
        }
    }

    #[test]
    fn test_available_zones_with_stock() {
        let response = DescribeAvailableResourceResponse {
            request_id: "req".to_string(),
            available_zones: AvailableZones {
                available_zone: vec![
                    zone("cn-hangzhou-a", "Available", "WithStock"),
                    zone("cn-hangzhou-b", "SoldOut", "WithoutStock"),
                    zone("cn-hangzhou-c", "Available", "ClosedWithStock"),
                    zone("cn-hangzhou-d", "Available", "WithStock"),
                ],
            },
        };

        assert_eq!(
            available_zones_with_stock(&response),
            vec!["cn-hangzhou-a", "cn-hangzhou-d"]
        );
    }

    #[test]
    fn test_response_decoding() {
        let response: DescribeAvailableResourceResponse = serde_json::from_str(
            r#"{"RequestId":"r1","AvailableZones":{"AvailableZone":[
                {"ZoneId":"cn-hangzhou-i","RegionId":"cn-hangzhou","Status":"Available","StatusCategory":"WithStock"}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(response.available_zones.available_zone[0].zone_id, "cn-hangzhou-i");
    }
}
