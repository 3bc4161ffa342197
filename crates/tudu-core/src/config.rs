use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::ReconcileOptions;

pub const WORKSPACE_DIR: &str = ".tudu";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl ProjectConfig {
    #[must_use]
    pub const fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            max_forbidden_attempts: self.sync.max_forbidden_attempts,
            cascade_deletes: self.sync.cascade_deletes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Server root, e.g. `http://localhost:3000`. Sync and seeding need it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Environment variable holding the session cookie.
    #[serde(default = "default_session_env")]
    pub session_env: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            session_env: default_session_env(),
        }
    }
}

impl RemoteConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_max_forbidden_attempts")]
    pub max_forbidden_attempts: u32,
    #[serde(default)]
    pub cascade_deletes: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_forbidden_attempts: default_max_forbidden_attempts(),
            cascade_deletes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(WORKSPACE_DIR).join(CONFIG_FILE)
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn save_project_config(project_root: &Path, config: &ProjectConfig) -> Result<()> {
    let path = project_config_path(project_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let body = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("tudu/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Pick the output mode: `--json`, then `FORMAT`, then the user config, then
/// pretty on a terminal and text when piped.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_session_env() -> String {
    "TUDU_SESSION".to_string()
}

const fn default_max_forbidden_attempts() -> u32 {
    1
}

const fn default_lock_timeout_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn make_temp_dir(label: &str) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("tudu-config-test-{label}-{id}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("temp dir must be created");
        dir
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = make_temp_dir("project-default");
        let cfg = load_project_config(&root).expect("load should succeed");
        assert_eq!(cfg.remote.base_url, None);
        assert_eq!(cfg.remote.timeout_secs, 10);
        assert_eq!(cfg.remote.session_env, "TUDU_SESSION");
        assert_eq!(cfg.sync.max_forbidden_attempts, 1);
        assert!(!cfg.sync.cascade_deletes);
        assert_eq!(cfg.store.lock_timeout(), Duration::from_millis(2000));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let root = make_temp_dir("project-partial");
        std::fs::create_dir_all(root.join(WORKSPACE_DIR)).expect("create .tudu");
        std::fs::write(
            project_config_path(&root),
            "[remote]\nbase_url = \"http://localhost:3000\"\n\n[sync]\ncascade_deletes = true\n",
        )
        .expect("write config");

        let cfg = load_project_config(&root).expect("load should succeed");
        assert_eq!(cfg.remote.base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(cfg.remote.timeout_secs, 10);
        let options = cfg.reconcile_options();
        assert!(options.cascade_deletes);
        assert_eq!(options.max_forbidden_attempts, 1);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn save_then_load_round_trips() {
        let root = make_temp_dir("project-save");
        let mut cfg = ProjectConfig::default();
        cfg.remote.base_url = Some("https://todo.example.com".to_string());
        cfg.sync.max_forbidden_attempts = 3;

        save_project_config(&root, &cfg).expect("save should succeed");
        let loaded = load_project_config(&root).expect("load should succeed");
        assert_eq!(loaded, cfg);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn invalid_config_is_an_error() {
        let root = make_temp_dir("project-invalid");
        std::fs::create_dir_all(root.join(WORKSPACE_DIR)).expect("create .tudu");
        std::fs::write(project_config_path(&root), "[sync\n").expect("write config");

        let err = load_project_config(&root).expect_err("parse should fail");
        assert!(err.to_string().contains("Failed to parse"));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty"), Some("text"));
        assert_eq!(output, "json");
    }

    #[test]
    fn env_beats_user_config() {
        assert_eq!(resolve_output(false, Some("json"), Some("text")), "text");
    }

    #[test]
    fn legacy_aliases_are_normalized() {
        assert_eq!(resolve_output(false, Some("table"), Some("human")), "pretty");
        assert_eq!(resolve_output(false, Some("human"), Some("table")), "text");
    }

    #[test]
    fn user_config_parses_output() {
        let cfg: UserConfig = toml::from_str("output = \"json\"\n").expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
    }
}
