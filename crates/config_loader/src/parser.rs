//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON 格式。

use contracts::BroadcastConfig;

use crate::error::ConfigError;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<BroadcastConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<BroadcastConfig, ConfigError> {
    serde_json::from_str(content).map_err(|e| ConfigError::Parse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<BroadcastConfig, ConfigError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DispatchMode;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
broadcasters = ["null://", "log://?name=audit"]
mode = "sequential"
max_concurrency = 2
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.broadcasters.len(), 2);
        assert_eq!(config.mode, DispatchMode::Sequential);
        assert_eq!(config.max_concurrency, Some(2));
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn test_parse_json_defaults() {
        let config = parse_json(r#"{ "broadcasters": ["null://"] }"#).unwrap();
        assert_eq!(config.mode, DispatchMode::Concurrent);
        assert_eq!(config.max_concurrency, None);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unknown_mode_is_parse_error() {
        let err = parse_toml(r#"mode = "parallel""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
