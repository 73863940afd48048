//! 托管 DNS 域配置读取
//!
//! Hive 通过环境变量 `MANAGED_DOMAINS_FILE` 指向一个 JSON 文件，文件内容是
//! `ManageDnsConfig` 数组。

use std::path::Path;
use tracing::debug;

use crate::constants::MANAGED_DOMAINS_FILE_ENV_VAR;
use crate::error::Result;
use crate::models::ManageDnsConfig;

/// 读取环境变量指向的托管域文件
///
/// 环境变量未设置或为空时返回空列表；文件读取或解析失败时返回错误。
pub fn read_managed_domains_file() -> Result<Vec<ManageDnsConfig>> {
    match std::env::var(MANAGED_DOMAINS_FILE_ENV_VAR) {
        Ok(path) if !path.is_empty() => read_managed_domains_from(&path),
        _ => Ok(Vec::new()),
    }
}

/// 从指定路径读取托管域配置
pub fn read_managed_domains_from(path: impl AsRef<Path>) -> Result<Vec<ManageDnsConfig>> {
    let path = path.as_ref();
    let content = std::fs::read(path)?;
    let domains: Vec<ManageDnsConfig> = serde_json::from_slice(&content)?;
    debug!("从 {} 读取到 {} 组托管域", path.display(), domains.len());
    Ok(domains)
}

/// 查找管理指定基础域名的配置
///
/// 基础域名等于某个托管域，或以 `.<托管域>` 结尾时视为匹配。
pub fn find_managed_domain<'a>(
    configs: &'a [ManageDnsConfig],
    base_domain: &str,
) -> Option<&'a ManageDnsConfig> {
    let base_domain = base_domain.trim_end_matches('.');
    configs.iter().find(|config| {
        config.domains.iter().any(|domain| {
            let domain = domain.trim_end_matches('.');
            base_domain == domain || base_domain.ends_with(&format!(".{domain}"))
        })
    })
}
