//! Alibaba Cloud 休眠执行器

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use hive_common::Result;

use super::HibernationActuator;
use crate::alibabaclient::{
    AlibabaApi, DescribeInstancesRequest, Instance, StartInstancesRequest, StopInstancesRequest, Tag,
};

const PAGE_SIZE: u32 = 100;

/// Start/StopInstances 单次请求最多接受的实例数
const MAX_INSTANCES_PER_REQUEST: usize = 100;

const STATUS_RUNNING: &str = "Running";
const STATUS_STARTING: &str = "Starting";
const STATUS_STOPPED: &str = "Stopped";
const STATUS_STOPPING: &str = "Stopping";

/// 通过 ECS 接口停止和启动集群实例
pub struct AlibabaHibernationActuator {
    client: Arc<dyn AlibabaApi>,
}

impl AlibabaHibernationActuator {
    pub fn new(client: Arc<dyn AlibabaApi>) -> Self {
        Self { client }
    }

    /// 列出带有集群所有权标签的全部实例
    async fn cluster_instances(&self, infra_id: &str) -> Result<Vec<Instance>> {
        let mut instances = Vec::new();
        let mut page_number = 1;
        loop {
            let request = DescribeInstancesRequest {
                tags: vec![Tag {
                    key: format!("kubernetes.io/cluster/{infra_id}"),
                    value: "owned".to_string(),
                }],
                page_number,
                page_size: PAGE_SIZE,
                ..Default::default()
            };
            let response = self.client.describe_instances(&request).await?;
            let received = response.instances.instance.len();
            instances.extend(response.instances.instance);

            if received == 0 || instances.len() as u32 >= response.total_count {
                break;
            }
            page_number += 1;
        }
        debug!("集群 {} 共有 {} 个实例", infra_id, instances.len());
        Ok(instances)
    }

    async fn instances_not_in(&self, infra_id: &str, states: &[&str]) -> Result<Vec<Instance>> {
        Ok(self
            .cluster_instances(infra_id)
            .await?
            .into_iter()
            .filter(|instance| !states.contains(&instance.status.as_str()))
            .collect())
    }
}

fn instance_ids(instances: &[Instance]) -> Vec<String> {
    instances.iter().map(|i| i.instance_id.clone()).collect()
}

#[async_trait]
impl HibernationActuator for AlibabaHibernationActuator {
    async fn stop_machines(&self, infra_id: &str) -> Result<()> {
        let to_stop = self
            .instances_not_in(infra_id, &[STATUS_STOPPED, STATUS_STOPPING])
            .await?;
        if to_stop.is_empty() {
            info!("集群 {} 没有需要停止的实例", infra_id);
            return Ok(());
        }

        let ids = instance_ids(&to_stop);
        info!("停止集群 {} 的实例: {:?}", infra_id, ids);
        for batch in ids.chunks(MAX_INSTANCES_PER_REQUEST) {
            self.client
                .stop_instances(&StopInstancesRequest {
                    instance_ids: batch.to_vec(),
                    stopped_mode: Some("StopCharging".to_string()),
                    ..Default::default()
                })
                .await?;
        }
        Ok(())
    }

    async fn start_machines(&self, infra_id: &str) -> Result<()> {
        let to_start = self
            .instances_not_in(infra_id, &[STATUS_RUNNING, STATUS_STARTING])
            .await?;
        if to_start.is_empty() {
            info!("集群 {} 没有需要启动的实例", infra_id);
            return Ok(());
        }

        let ids = instance_ids(&to_start);
        info!("启动集群 {} 的实例: {:?}", infra_id, ids);
        for batch in ids.chunks(MAX_INSTANCES_PER_REQUEST) {
            self.client
                .start_instances(&StartInstancesRequest {
                    instance_ids: batch.to_vec(),
                    dry_run: false,
                })
                .await?;
        }
        Ok(())
    }

    async fn machines_running(&self, infra_id: &str) -> Result<(bool, Vec<String>)> {
        let pending = self.instances_not_in(infra_id, &[STATUS_RUNNING]).await?;
        Ok((pending.is_empty(), instance_ids(&pending)))
    }

    async fn machines_stopped(&self, infra_id: &str) -> Result<(bool, Vec<String>)> {
        let pending = self.instances_not_in(infra_id, &[STATUS_STOPPED]).await?;
        Ok((pending.is_empty(), instance_ids(&pending)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alibabaclient::{
        DescribeInstancesResponse, Instances, MockAlibabaApi, StartInstancesResponse,
        StopInstancesResponse,
    };
    use mockall::predicate::always;
    use mockall::Sequence;

    fn instance(id: &str, status: &str) -> Instance {
        Instance {
            instance_id: id.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    fn describe_response(instances: Vec<Instance>, total: u32) -> DescribeInstancesResponse {
        DescribeInstancesResponse {
            total_count: total,
            instances: Instances { instance: instances },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_stop_machines_skips_stopped_instances() {
        let mut client = MockAlibabaApi::new();
        client
            .expect_describe_instances()
            .withf(|request| {
                request.tags[0].key == "kubernetes.io/cluster/infra-1" && request.page_number == 1
            })
            .returning(|_| {
                Ok(describe_response(
                    vec![
                        instance("i-running", "Running"),
                        instance("i-stopped", "Stopped"),
                        instance("i-stopping", "Stopping"),
                    ],
                    3,
                ))
            });
        client
            .expect_stop_instances()
            .withf(|request| {
                request.instance_ids == vec!["i-running".to_string()]
                    && request.stopped_mode.as_deref() == Some("StopCharging")
            })
            .times(1)
            .returning(|_| Ok(StopInstancesResponse::default()));

        let actuator = AlibabaHibernationActuator::new(Arc::new(client));
        actuator.stop_machines("infra-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_start_machines_noop_when_all_running() {
        let mut client = MockAlibabaApi::new();
        client
            .expect_describe_instances()
            .returning(|_| Ok(describe_response(vec![instance("i-1", "Running")], 1)));
        client.expect_start_instances().never();

        let actuator = AlibabaHibernationActuator::new(Arc::new(client));
        actuator.start_machines("infra-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_start_machines_starts_stopped_instances() {
        let mut client = MockAlibabaApi::new();
        client
            .expect_describe_instances()
            .returning(|_| {
                Ok(describe_response(
                    vec![instance("i-1", "Stopped"), instance("i-2", "Starting")],
                    2,
                ))
            });
        client
            .expect_start_instances()
            .withf(|request| request.instance_ids == vec!["i-1".to_string()])
            .times(1)
            .returning(|_| Ok(StartInstancesResponse::default()));

        let actuator = AlibabaHibernationActuator::new(Arc::new(client));
        actuator.start_machines("infra-1").await.unwrap();
    }

    fn many_instances(count: usize, status: &str) -> Vec<Instance> {
        (0..count).map(|i| instance(&format!("i-{i:03}"), status)).collect()
    }

    #[tokio::test]
    async fn test_stop_machines_batches_large_clusters() {
        let mut client = MockAlibabaApi::new();
        client
            .expect_describe_instances()
            .returning(|request| {
                let page = if request.page_number == 1 {
                    many_instances(150, "Running")[..100].to_vec()
                } else {
                    many_instances(150, "Running")[100..].to_vec()
                };
                Ok(describe_response(page, 150))
            });
        let mut seq = Sequence::new();
        client
            .expect_stop_instances()
            .withf(|request| {
                request.instance_ids.len() == 100
                    && request.instance_ids[0] == "i-000"
                    && request.instance_ids[99] == "i-099"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(StopInstancesResponse::default()));
        client
            .expect_stop_instances()
            .withf(|request| {
                request.instance_ids.len() == 50
                    && request.instance_ids[0] == "i-100"
                    && request.stopped_mode.as_deref() == Some("StopCharging")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(StopInstancesResponse::default()));

        let actuator = AlibabaHibernationActuator::new(Arc::new(client));
        actuator.stop_machines("infra-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_start_machines_batches_large_clusters() {
        let mut client = MockAlibabaApi::new();
        client
            .expect_describe_instances()
            .returning(|request| {
                let page = if request.page_number == 1 {
                    many_instances(201, "Stopped")[..100].to_vec()
                } else if request.page_number == 2 {
                    many_instances(201, "Stopped")[100..200].to_vec()
                } else {
                    many_instances(201, "Stopped")[200..].to_vec()
                };
                Ok(describe_response(page, 201))
            });
        client
            .expect_start_instances()
            .withf(|request| request.instance_ids.len() <= 100)
            .times(3)
            .returning(|_| Ok(StartInstancesResponse::default()));

        let actuator = AlibabaHibernationActuator::new(Arc::new(client));
        actuator.start_machines("infra-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_machines_running_pages_through_instances() {
        let mut client = MockAlibabaApi::new();
        client
            .expect_describe_instances()
            .with(always())
            .returning(|request| {
                let page = if request.page_number == 1 {
                    vec![instance("i-1", "Running"), instance("i-2", "Running")]
                } else {
                    vec![instance("i-3", "Starting")]
                };
                Ok(describe_response(page, 3))
            });

        let actuator = AlibabaHibernationActuator::new(Arc::new(client));
        let (running, pending) = actuator.machines_running("infra-1").await.unwrap();
        assert!(!running);
        assert_eq!(pending, vec!["i-3"]);

        let (stopped, pending) = actuator.machines_stopped("infra-1").await.unwrap();
        assert!(!stopped);
        assert_eq!(pending.len(), 3);
    }
}
