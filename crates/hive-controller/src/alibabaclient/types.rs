//! ECS 请求与响应类型

use serde::{Deserialize, Serialize};

/// DescribeAvailableResource 响应
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeAvailableResourceResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub available_zones: AvailableZones,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AvailableZones {
    #[serde(default)]
    pub available_zone: Vec<AvailableZone>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AvailableZone {
    #[serde(default)]
    pub zone_id: String,
    #[serde(default)]
    pub region_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_category: String,
}

/// 资源标签
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    #[serde(alias = "TagKey")]
    pub key: String,
    #[serde(alias = "TagValue")]
    pub value: String,
}

/// DescribeInstances 请求
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeInstancesRequest {
    pub instance_ids: Vec<String>,
    pub tags: Vec<Tag>,
    pub status: Option<String>,
    pub vpc_id: Option<String>,
    pub page_number: u32,
    pub page_size: u32,
}

impl DescribeInstancesRequest {
    /// 转换为 RPC 请求参数
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if !self.instance_ids.is_empty() {
            // InstanceIds 以 JSON 数组字符串传递
            let ids = serde_json::to_string(&self.instance_ids).unwrap_or_default();
            params.push(("InstanceIds".to_string(), ids));
        }
        for (i, tag) in self.tags.iter().enumerate() {
            params.push((format!("Tag.{}.Key", i + 1), tag.key.clone()));
            params.push((format!("Tag.{}.Value", i + 1), tag.value.clone()));
        }
        if let Some(status) = &self.status {
            params.push(("Status".to_string(), status.clone()));
        }
        if let Some(vpc_id) = &self.vpc_id {
            params.push(("VpcId".to_string(), vpc_id.clone()));
        }
        if self.page_number > 0 {
            params.push(("PageNumber".to_string(), self.page_number.to_string()));
        }
        if self.page_size > 0 {
            params.push(("PageSize".to_string(), self.page_size.to_string()));
        }
        params
    }
}

/// DescribeInstances 响应
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeInstancesResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub instances: Instances,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Instances {
    #[serde(default)]
    pub instance: Vec<Instance>,
}

/// ECS 实例
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    pub instance_id: String,
    #[serde(default)]
    pub instance_name: String,
    /// Pending、Running、Starting、Stopping 或 Stopped
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub zone_id: String,
    #[serde(default)]
    pub instance_type: String,
}

/// StartInstances 请求
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartInstancesRequest {
    pub instance_ids: Vec<String>,
    pub dry_run: bool,
}

impl StartInstancesRequest {
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = indexed_instance_ids(&self.instance_ids);
        if self.dry_run {
            params.push(("DryRun".to_string(), "true".to_string()));
        }
        params
    }
}

/// StopInstances 请求
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopInstancesRequest {
    pub instance_ids: Vec<String>,
    /// StopCharging 或 KeepCharging
    pub stopped_mode: Option<String>,
    pub force_stop: bool,
    pub dry_run: bool,
}

impl StopInstancesRequest {
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = indexed_instance_ids(&self.instance_ids);
        if let Some(mode) = &self.stopped_mode {
            params.push(("StoppedMode".to_string(), mode.clone()));
        }
        if self.force_stop {
            params.push(("ForceStop".to_string(), "true".to_string()));
        }
        if self.dry_run {
            params.push(("DryRun".to_string(), "true".to_string()));
        }
        params
    }
}

fn indexed_instance_ids(ids: &[String]) -> Vec<(String, String)> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| (format!("InstanceId.{}", i + 1), id.clone()))
        .collect()
}

/// StartInstances / StopInstances 中单个实例的结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceResponse {
    pub instance_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub current_status: String,
    #[serde(default)]
    pub previous_status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceResponses {
    #[serde(default)]
    pub instance_response: Vec<InstanceResponse>,
}

/// StartInstances 响应
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StartInstancesResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub instance_responses: InstanceResponses,
}

/// StopInstances 响应
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StopInstancesResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub instance_responses: InstanceResponses,
}

/// API 错误响应
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
