use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub auth_url: String,
    pub session_token: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8443/api".into(),
            auth_url: "http://127.0.0.1:8443/auth".into(),
            session_token: None,
            log_filter: "info".into(),
        }
    }
}

/// Defaults, then the config file, then `APP__*` environment overrides.
///
/// A missing file is only an error when the path was given explicitly.
pub fn load_settings(explicit_path: Option<&Path>) -> anyhow::Result<Settings> {
    let path = explicit_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut settings = match fs::read_to_string(&path) {
        Ok(raw) => parse_settings(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound && explicit_path.is_none() => {
            Settings::default()
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.api_url = normalize_url(&settings.api_url).context("invalid api_url")?;
    settings.auth_url = normalize_url(&settings.auth_url).context("invalid auth_url")?;
    Ok(settings)
}

fn parse_settings(raw: &str) -> anyhow::Result<Settings> {
    Ok(toml::from_str(raw)?)
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__AUTH_URL") {
        settings.auth_url = v;
    }
    if let Some(v) = lookup("APP__SESSION_TOKEN") {
        let v = v.trim().to_string();
        settings.session_token = (!v.is_empty()).then_some(v);
    }
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

/// Accepts absolute http(s) URLs and strips the trailing slash.
pub fn normalize_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let parsed = Url::parse(raw).with_context(|| format!("'{raw}' is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("'{raw}' must use http or https");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
