//! hive-operator 入口

use anyhow::{Context as _, Result};
use clap::Parser;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hive_operator::{controller, Context, Intervals};

#[derive(Parser, Debug)]
#[command(name = "hive-operator", version, about = "Hive MachinePool 与休眠控制器")]
struct Args {
    /// 只监听该命名空间，缺省时监听全部命名空间
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// 条件未满足时的重试间隔（秒）
    #[arg(long, default_value_t = 30)]
    requeue_seconds: u64,

    /// 周期性重新协调间隔（秒）
    #[arg(long, default_value_t = 300)]
    resync_seconds: u64,

    /// 协调失败后的重试间隔（秒）
    #[arg(long, default_value_t = 60)]
    error_requeue_seconds: u64,

    /// server-side apply 字段管理者
    #[arg(long, default_value = "hive-operator")]
    field_manager: String,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn intervals(&self) -> Intervals {
        Intervals {
            requeue: Duration::from_secs(self.requeue_seconds),
            resync: Duration::from_secs(self.resync_seconds),
            error_requeue: Duration::from_secs(self.error_requeue_seconds),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();

    info!("启动 hive-operator");
    let client = Client::try_default().await.context("创建 Kubernetes 客户端失败")?;
    let namespace = args.namespace.clone().filter(|ns| !ns.is_empty());
    let ctx = Arc::new(Context::new(client, args.intervals(), args.field_manager.clone()));

    controller::run(ctx, namespace.as_deref()).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intervals_match_library_defaults() {
        let args = Args::parse_from(["hive-operator"]);
        assert_eq!(args.intervals(), Intervals::default());
        assert_eq!(args.field_manager, "hive-operator");
    }

    #[test]
    fn test_custom_intervals() {
        let args = Args::parse_from(["hive-operator", "--requeue-seconds=5", "--namespace=clusters"]);
        assert_eq!(args.intervals().requeue, Duration::from_secs(5));
        assert_eq!(args.namespace.as_deref(), Some("clusters"));
    }
}
