//! # 配置管理模块
//!
//! 处理认证配置加载和验证

mod auth_config;

pub use auth_config::{AuthConfig, MAX_ACCESS_TOKEN_TTL_SECS, SigningSecret};

use std::path::Path;

use crate::auth::refresh::RotationPolicy;
use crate::error::{AuthError, Result};

/// 从 TOML 文件加载配置
pub fn load_config(path: impl AsRef<Path>) -> Result<AuthConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(AuthError::config(format!(
            "配置文件不存在: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        AuthError::config_with_source(format!("读取配置文件失败: {}", path.display()), e)
    })?;

    let config: AuthConfig = toml::from_str(&content)
        .map_err(|e| AuthError::config_with_source("配置文件格式错误", e))?;

    config.validate().map_err(AuthError::config)?;

    Ok(config)
}

/// 从环境变量加载配置
///
/// `JWT_SECRET` and `POLKA_KEY` are required; `ACCESS_TOKEN_TTL_SECS`,
/// `REFRESH_TOKEN_TTL_DAYS`, `BCRYPT_COST` and `REFRESH_TOKEN_ROTATION`
/// (`reuse` | `rotate`) are optional.
pub fn from_env() -> Result<AuthConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Same as [`from_env`] with an arbitrary variable source.
pub fn from_lookup<F>(lookup: F) -> Result<AuthConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| {
        lookup(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::config(format!("环境变量 {key} 未设置")))
    };

    let mut config = AuthConfig::new(required("JWT_SECRET")?, required("POLKA_KEY")?);

    if let Some(value) = lookup("ACCESS_TOKEN_TTL_SECS") {
        config.access_token_ttl_secs = parse_var("ACCESS_TOKEN_TTL_SECS", &value)?;
    }
    if let Some(value) = lookup("REFRESH_TOKEN_TTL_DAYS") {
        config.refresh_token_ttl_days = parse_var("REFRESH_TOKEN_TTL_DAYS", &value)?;
    }
    if let Some(value) = lookup("BCRYPT_COST") {
        config.bcrypt_cost = parse_var("BCRYPT_COST", &value)?;
    }
    if let Some(value) = lookup("REFRESH_TOKEN_ROTATION") {
        config.rotation = match value.to_ascii_lowercase().as_str() {
            "reuse" => RotationPolicy::Reuse,
            "rotate" => RotationPolicy::Rotate,
            other => {
                return Err(AuthError::config(format!(
                    "REFRESH_TOKEN_ROTATION 无效: {other}"
                )));
            }
        };
    }

    config.validate().map_err(AuthError::config)?;

    Ok(config)
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .map_err(|e| AuthError::config_with_source(format!("环境变量 {key} 无效: {value}"), e))
}
