//! tracing 日志初始化
//!
//! 根据配置选择 JSON（结构化）或 pretty（人类可读）输出，
//! 过滤规则优先取 RUST_LOG，其次取配置中的 log_level。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::ObservabilityConfig;

/// 构建环境过滤器
pub fn build_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局 tracing subscriber
///
/// 进程内只能成功调用一次，重复调用返回错误。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = build_filter(config);

    let fmt_layer = if config.json_logs() {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_falls_back() {
        let config = ObservabilityConfig {
            log_level: "[[not a filter".to_string(),
            ..Default::default()
        };
        // 无效的过滤表达式不应 panic
        let _ = build_filter(&config);
    }

    #[test]
    fn test_second_init_fails() {
        let config = ObservabilityConfig::default();
        let _ = init(&config);
        // 全局 subscriber 已安装，第二次一定失败
        assert!(init(&config).is_err());
    }
}
