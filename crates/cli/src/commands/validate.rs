//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::{BroadcastConfig, ConfigLoader, DispatchMode};
use dispatcher::Registry;
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    mode: String,
    broadcaster_count: usize,
    max_concurrency: Option<usize>,
    timeout_secs: Option<u64>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let registry = Registry::with_defaults().context("Failed to register built-in broadcasters")?;
    let result = validate_config(args, &registry);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs, registry: &Registry) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config, registry);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    mode: format!("{:?}", config.mode),
                    broadcaster_count: config.broadcasters.len(),
                    max_concurrency: config.max_concurrency,
                    timeout_secs: config.timeout_secs,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BroadcastConfig, registry: &Registry) -> Vec<String> {
    let mut warnings = Vec::new();

    // Schemes this binary cannot construct
    for uri in &config.broadcasters {
        if let Ok(url) = Url::parse(uri) {
            if !registry.contains(url.scheme()) {
                warnings.push(format!(
                    "Broadcaster '{}' uses unregistered scheme '{}://'",
                    uri,
                    url.scheme()
                ));
            }
        }
    }

    if config.mode == DispatchMode::Sequential && config.max_concurrency.is_some() {
        warnings.push("max_concurrency is ignored in sequential mode".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Mode: {}", summary.mode);
            println!("  Broadcasters: {}", summary.broadcaster_count);
            if let Some(limit) = summary.max_concurrency {
                println!("  Max concurrency: {}", limit);
            }
            if let Some(secs) = summary.timeout_secs {
                println!("  Timeout: {}s", secs);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
