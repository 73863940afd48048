//! hiveutil 命令行入口

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hiveutil::awsprivatelink;
use hiveutil::config::HiveutilConfig;
use hiveutil::create_cluster::{self, CreateClusterArgs};
use hiveutil::deprovision::powervs::{self, PowerVsDeprovisionArgs};

/// Hive 运维工具
#[derive(Parser, Debug)]
#[command(name = "hiveutil", version, about, long_about = None)]
struct Cli {
    /// 日志级别：trace、debug、info、warn、error
    #[arg(long, global = true, default_value = "info")]
    loglevel: String,

    /// 配置文件（YAML 或 JSON）
    #[arg(long, global = true, env = "HIVEUTIL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// AWS PrivateLink 管理
    #[command(subcommand)]
    Awsprivatelink(PrivateLinkCommands),

    /// 清理集群的云资源
    #[command(subcommand)]
    Deprovision(DeprovisionCommands),

    /// 生成并创建集群资源
    CreateCluster(CreateClusterArgs),
}

#[derive(Subcommand, Debug)]
enum PrivateLinkCommands {
    /// 关闭 AWS PrivateLink
    Disable,

    /// 端点 VPC 管理
    #[command(subcommand)]
    Endpointvpc(EndpointVpcCommands),
}

#[derive(Subcommand, Debug)]
enum EndpointVpcCommands {
    /// 拆除端点 VPC 的网络并将其移出 HiveConfig
    Remove {
        /// 端点 VPC ID
        vpc_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum DeprovisionCommands {
    /// 清理 PowerVS 集群资源
    Powervs(PowerVsDeprovisionArgs),
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

async fn kube_client() -> Result<Client> {
    Client::try_default().await.context("创建 Kubernetes 客户端失败")
}

async fn run(cli: Cli) -> Result<()> {
    let config = HiveutilConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Awsprivatelink(PrivateLinkCommands::Disable) => {
            awsprivatelink::disable::run(kube_client().await?).await
        }
        Commands::Awsprivatelink(PrivateLinkCommands::Endpointvpc(EndpointVpcCommands::Remove { vpc_id })) => {
            awsprivatelink::endpointvpc::remove::run(kube_client().await?, &vpc_id, &config.aws).await
        }
        Commands::Deprovision(DeprovisionCommands::Powervs(args)) => powervs::run(&args, &config.powervs).await,
        Commands::CreateCluster(args) => create_cluster::run(&args).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.loglevel);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_endpointvpc_remove() {
        let cli = Cli::parse_from(["hiveutil", "awsprivatelink", "endpointvpc", "remove", "vpc-123"]);
        match cli.command {
            Commands::Awsprivatelink(PrivateLinkCommands::Endpointvpc(EndpointVpcCommands::Remove { vpc_id })) => {
                assert_eq!(vpc_id, "vpc-123")
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_deprovision_powervs() {
        let cli = Cli::parse_from([
            "hiveutil",
            "deprovision",
            "powervs",
            "infra-1",
            "--region=dal",
            "--zone=dal10",
            "--base-domain=example.com",
            "--cluster-name=mycluster",
            "--loglevel=debug",
        ]);
        assert_eq!(cli.loglevel, "debug");
        match cli.command {
            Commands::Deprovision(DeprovisionCommands::Powervs(args)) => {
                assert_eq!(args.infra_id, "infra-1");
                assert_eq!(args.zone, "dal10");
                assert!(args.validate().is_ok());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_deprovision_missing_flags_is_validation_error() {
        let cli = Cli::parse_from(["hiveutil", "deprovision", "powervs", "infra-1", "--region=dal"]);
        match cli.command {
            Commands::Deprovision(DeprovisionCommands::Powervs(args)) => {
                assert_eq!(
                    args.validate().unwrap_err().to_string(),
                    "no --zone provided, cannot proceed"
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_create_cluster() {
        let cli = Cli::try_parse_from([
            "hiveutil",
            "create-cluster",
            "mycluster",
            "--cloud=powervs",
            "--region=dal",
            "--zone=dal10",
            "--base-domain=example.com",
            "--pull-secret-file=/tmp/pull-secret",
            "--output=apply",
            "--label=team=infra",
        ])
        .unwrap();
        match cli.command {
            Commands::CreateCluster(args) => {
                assert_eq!(args.workers, 3);
                assert_eq!(args.output, create_cluster::Output::Apply);
                assert_eq!(args.labels, vec![("team".to_string(), "infra".to_string())]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
