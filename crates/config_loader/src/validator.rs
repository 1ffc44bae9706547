//! 配置校验模块
//!
//! 校验规则：
//! - 至少一个目标 URI
//! - 每个 URI 可解析且带 scheme
//! - URI 不重复
//! - max_concurrency > 0 (若设置)
//! - timeout_secs > 0 (若设置)

use std::collections::HashSet;

use contracts::BroadcastConfig;
use url::Url;

use crate::error::ConfigError;

/// 校验 BroadcastConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &BroadcastConfig) -> Result<(), ConfigError> {
    validate_broadcasters(config)?;
    validate_limits(config)?;
    Ok(())
}

/// 校验目标 URI 列表
fn validate_broadcasters(config: &BroadcastConfig) -> Result<(), ConfigError> {
    if config.broadcasters.is_empty() {
        return Err(ConfigError::validation(
            "broadcasters",
            "at least one broadcaster URI is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, uri) in config.broadcasters.iter().enumerate() {
        let field = format!("broadcasters[{idx}]");
        // Url::parse rejects anything without a scheme
        Url::parse(uri)
            .map_err(|e| ConfigError::validation(&field, format!("invalid URI '{uri}': {e}")))?;

        if !seen.insert(uri.as_str()) {
            return Err(ConfigError::validation(field, format!("duplicate URI '{uri}'")));
        }
    }
    Ok(())
}

/// 校验并发与超时
fn validate_limits(config: &BroadcastConfig) -> Result<(), ConfigError> {
    if config.max_concurrency == Some(0) {
        return Err(ConfigError::validation(
            "max_concurrency",
            "max_concurrency must be > 0",
        ));
    }

    if config.timeout_secs == Some(0) {
        return Err(ConfigError::validation("timeout_secs", "timeout_secs must be > 0"));
    }

    Ok(())
}
