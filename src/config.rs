//! Gateway configuration: bind address, optional client-facing
//! `forward_token`, and the upstream timeout constants (§4.7). Loaded
//! once at process start from an optional TOML file, overridable by
//! environment variables, then frozen — there is no other persisted or
//! mutable state (§6).

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Bearer token clients must present to use the gateway. `None`
    /// disables the check entirely (§15, ambient — bounds the pipeline,
    /// not part of the core).
    pub forward_token: Option<String>,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: "127.0.0.1".to_string(),
            port: 8787,
            forward_token: None,
            connect_timeout_secs: 5,
            idle_timeout_secs: 300,
        }
    }
}

static SETTINGS: Lazy<RwLock<Settings>> = Lazy::new(|| RwLock::new(Settings::default()));

/// Default config file path, overridable by `CCR_GATEWAY_CONFIG`.
pub fn default_config_path() -> PathBuf {
    std::env::var("CCR_GATEWAY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./ccr-gateway.toml"))
}

fn from_file(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

fn apply_env_overrides(mut settings: Settings) -> Settings {
    if let Ok(host) = std::env::var("CCR_GATEWAY_HOST") {
        settings.host = host;
    }
    if let Ok(port) = std::env::var("CCR_GATEWAY_PORT") {
        if let Ok(port) = port.parse() {
            settings.port = port;
        }
    }
    if let Ok(token) = std::env::var("CCR_FORWARD_TOKEN") {
        settings.forward_token = Some(token);
    }
    settings
}

/// Loads settings from `path` (or the default path if `None`), applies
/// environment overrides, and installs the result as process-wide state.
/// Called once at startup before the server accepts traffic.
pub fn init(path: Option<&Path>) {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let settings = apply_env_overrides(from_file(&path));
    *SETTINGS.write().expect("config lock poisoned") = settings;
}

pub fn load() -> Settings {
    SETTINGS.read().expect("config lock poisoned").clone()
}

/// Applies CLI-supplied overrides on top of whatever `init` already
/// loaded. CLI flags win over both the config file and env vars.
pub fn override_from_cli(host: Option<String>, port: Option<u16>, forward_token: Option<String>) {
    let mut settings = SETTINGS.write().expect("config lock poisoned");
    if let Some(host) = host {
        settings.host = host;
    }
    if let Some(port) = port {
        settings.port = port;
    }
    if let Some(token) = forward_token {
        settings.forward_token = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_have_spec_timeouts() {
        let s = Settings::default();
        assert_eq!(s.connect_timeout_secs, 5);
        assert_eq!(s.idle_timeout_secs, 300);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let s = from_file(Path::new("/nonexistent/ccr-gateway.toml"));
        assert_eq!(s.host, "127.0.0.1");
    }
}
