//! 控制平面工具函数
//!
//! 轮询等待与持续时间格式化等辅助函数。

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::CloudError;

/// 轮询配置
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// 两次检查之间的间隔
    pub interval: Duration,
    /// 总超时
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(600),
        }
    }
}

/// 反复执行检查直到返回 true，超时返回错误
pub async fn poll_until<F, Fut>(what: &str, config: PollConfig, mut check: F) -> Result<(), CloudError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, CloudError>>,
{
    let deadline = tokio::time::Instant::now() + config.timeout;
    loop {
        if check().await? {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(CloudError::new(
                "WaiterTimeout",
                format!("等待 {what} 超时（{}）", format_duration(config.timeout)),
            ));
        }
        debug!("{} 尚未完成，{} 后重试", what, format_duration(config.interval));
        tokio::time::sleep(config.interval).await;
    }
}

/// 格式化持续时间为人类可读的字符串
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();

    if seconds < 60 {
        return format!("{} 秒", seconds);
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{} 分钟 {} 秒", minutes, seconds % 60);
    }

    let hours = minutes / 60;
    format!("{} 小时 {} 分钟", hours, minutes % 60)
}
