use crate::config::Settings;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Shape of the optional YAML file. Every key may be omitted.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StaticConfig {
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    use_fixture_data: Option<bool>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

/// Loads settings from an optional YAML file, then applies the `CMS_API_URL`,
/// `CMS_USE_FIXTURES` and `CMS_TIMEOUT_SECS` environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Settings> {
    let static_conf = match path {
        Some(path) => read_static_config(path)?,
        None => {
            info!("No config file given, using defaults");
            StaticConfig::default()
        }
    };

    let mut settings = Settings::default();
    if let Some(api_url) = static_conf.api_url {
        settings.api_url = api_url;
    }
    if let Some(flag) = static_conf.use_fixture_data {
        settings.use_fixture_data = flag;
    }
    if let Some(secs) = static_conf.timeout_secs {
        if secs == 0 {
            error!("timeout_secs in config file is zero");
            anyhow::bail!("timeout_secs must be at least 1 second, got 0");
        }
        settings.timeout_secs = secs;
    }

    if let Ok(api_url) = std::env::var("CMS_API_URL") {
        info!(api_url = %api_url, "CMS_API_URL found in env");
        settings.api_url = api_url;
    }
    if let Ok(raw) = std::env::var("CMS_USE_FIXTURES") {
        settings.use_fixture_data = parse_flag(&raw).with_context(|| {
            error!(raw = %raw, "CMS_USE_FIXTURES must be a boolean");
            format!("CMS_USE_FIXTURES must be a boolean, got `{raw}`")
        })?;
    }
    if let Ok(raw) = std::env::var("CMS_TIMEOUT_SECS") {
        settings.timeout_secs = raw.parse::<u64>().with_context(|| {
            error!(raw = %raw, "CMS_TIMEOUT_SECS must be a whole number of seconds");
            format!("CMS_TIMEOUT_SECS must be a whole number of seconds, got `{raw}`")
        })?;
        if settings.timeout_secs == 0 {
            error!("CMS_TIMEOUT_SECS is zero");
            anyhow::bail!("CMS_TIMEOUT_SECS must be at least 1 second, got 0");
        }
    }

    settings.api_url = settings.api_url.trim_end_matches('/').to_string();
    if settings.api_url.is_empty() {
        anyhow::bail!("api_url must not be empty");
    }

    settings.trace_loaded();
    Ok(settings)
}

fn read_static_config(path: &Path) -> Result<StaticConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    if content.trim().is_empty() {
        return Ok(StaticConfig::default());
    }

    serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
