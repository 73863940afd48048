//! 常量定义
//!
//! 环境变量名、Secret 键名、标签等在多个组件之间共享的固定字符串。

/// 托管 DNS 域配置文件路径所在的环境变量
pub const MANAGED_DOMAINS_FILE_ENV_VAR: &str = "MANAGED_DOMAINS_FILE";

/// Hive 默认运行的命名空间
pub const DEFAULT_HIVE_NAMESPACE: &str = "hive";

/// 单例 HiveConfig 的名称
pub const HIVE_CONFIG_NAME: &str = "hive";

/// 传递给安装程序的 PowerVS API Key 环境变量
pub const POWERVS_API_KEY_ENV_VAR: &str = "IBMCLOUD_API_KEY";

/// PowerVS 凭据 Secret 中保存 API Key 的键
pub const POWERVS_API_KEY_SECRET_KEY: &str = "ibmcloud_api_key";

/// Alibaba Cloud 凭据 Secret 中的 AccessKey ID 键
pub const ALIBABA_CLOUD_ACCESS_KEY_ID_SECRET_KEY: &str = "access_key_id";

/// Alibaba Cloud 凭据 Secret 中的 AccessKey Secret 键
pub const ALIBABA_CLOUD_ACCESS_KEY_SECRET_SECRET_KEY: &str = "access_key_secret";

/// `hiveutil awsprivatelink enable` 创建的 Hub 账号凭据 Secret 名称
pub const PRIVATE_LINK_HUB_ACCT_CREDS_NAME: &str = "awsprivatelink-hub-acct-creds";

/// Hub 账号凭据 Secret 的标签
pub const PRIVATE_LINK_HUB_ACCT_CREDS_LABEL: &str =
    "hive.openshift.io/awsprivatelink-hub-acct-credentials";

/// Pull secret 中的 dockerconfigjson 键
pub const PULL_SECRET_KEY: &str = ".dockerconfigjson";

/// install-config Secret 中的键
pub const INSTALL_CONFIG_SECRET_KEY: &str = "install-config.yaml";

/// 标记 MachineSet 所属 MachinePool 的标签
pub const MACHINE_POOL_NAME_LABEL: &str = "hive.openshift.io/machine-pool";

/// 标记资源所属 ClusterDeployment 的标签
pub const CLUSTER_DEPLOYMENT_NAME_LABEL: &str = "hive.openshift.io/cluster-deployment-name";

/// Machine API 集群标签
pub const MACHINE_CLUSTER_LABEL: &str = "machine.openshift.io/cluster-api-cluster";

/// Machine API 角色标签
pub const MACHINE_ROLE_LABEL: &str = "machine.openshift.io/cluster-api-machine-role";

/// Machine API 类型标签
pub const MACHINE_TYPE_LABEL: &str = "machine.openshift.io/cluster-api-machine-type";

/// Machine API MachineSet 标签
pub const MACHINE_SET_LABEL: &str = "machine.openshift.io/cluster-api-machineset";

/// 远程集群上 Machine API 所在的命名空间
pub const MACHINE_API_NAMESPACE: &str = "openshift-machine-api";

/// 工作节点 user-data Secret 名称
pub const WORKER_USER_DATA_NAME: &str = "worker-user-data";

/// 管理员 kubeconfig Secret 中的数据键
pub const KUBECONFIG_SECRET_KEY: &str = "kubeconfig";
