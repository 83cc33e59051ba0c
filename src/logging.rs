//! # 日志配置模块
//!
//! tracing-subscriber 初始化。Token material never reaches the log: callers
//! pass tokens through `AuthUtils::sanitize_token_for_logging` first.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
#[must_use]
pub fn default_filter(level: Option<&str>) -> String {
    let level = level.unwrap_or("info");
    format!("{level},chirpy_auth=debug")
}

/// 初始化日志系统
///
/// `RUST_LOG` wins over `level`. Calling this twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(None), "info,chirpy_auth=debug");
        assert_eq!(default_filter(Some("warn")), "warn,chirpy_auth=debug");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logging(Some("debug"));
        init_logging(None);
        tracing::info!("still logging");
    }
}
