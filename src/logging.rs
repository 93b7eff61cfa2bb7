//! tracing-subscriber setup shared by the binaries

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` still applies; each of `targets` is added at the configured
/// level.
pub fn init(config: &LoggingConfig, targets: &[&str]) -> Result<()> {
    let filter = build_filter(config, targets)?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

fn build_filter(config: &LoggingConfig, targets: &[&str]) -> Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env();
    for target in targets {
        let directive = format!("{}={}", target, config.level);
        filter = filter.add_directive(
            directive
                .parse()
                .with_context(|| format!("Invalid log directive {directive:?}"))?,
        );
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            format: "pretty".to_string(),
        }
    }

    #[test]
    fn test_filter_directives() {
        let filter = build_filter(&logging("debug"), &["churn_prediction_pipeline", "train_model"]).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("churn_prediction_pipeline=debug"));
        assert!(rendered.contains("train_model=debug"));
    }

    #[test]
    fn test_bad_level_is_reported() {
        assert!(build_filter(&logging("loud"), &["churn_prediction_pipeline"]).is_err());
    }
}
