//! Finding and layering skein config files.
//!
//! Later layers win:
//!
//! 1. `<config dir>/skein/config.toml`, where the config dir is
//!    `$SKEIN_CONFIG_DIR` or the platform's (`dirs::config_dir`)
//! 2. `skein.toml` in the project directory
//! 3. `SKEIN_URL`, `SKEIN_NAMESPACE`, `SKEIN_API_KEY`

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{ClientSection, ConfigError, LineageConfig, Result};

const APP_DIR: &str = "skein";
const USER_FILE: &str = "config.toml";
const PROJECT_FILE: &str = "skein.toml";

const CONFIG_DIR_ENV: &str = "SKEIN_CONFIG_DIR";
const URL_ENV: &str = "SKEIN_URL";
const NAMESPACE_ENV: &str = "SKEIN_NAMESPACE";
const API_KEY_ENV: &str = "SKEIN_API_KEY";

/// One config file that was consulted.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub path: PathBuf,
    /// False when the file was absent or could not be used.
    pub loaded: bool,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: LineageConfig,
    /// User layer first, then project.
    pub layers: Vec<ConfigLayer>,
    /// Skipped layers and insecure settings, already logged.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.layers
            .iter()
            .filter(|layer| layer.loaded)
            .map(|layer| layer.path.as_path())
            .collect()
    }
}

/// Layer the user file, the project file in `project_dir` (default: the
/// working directory) and the process environment.
///
/// Never fails. A layer that cannot be read or parsed is skipped with a
/// warning and the remaining layers still apply.
pub fn load_config(project_dir: Option<&Path>) -> LoadedConfig {
    load_config_with_options(project_dir, None, |key| std::env::var(key).ok())
}

/// [`load_config`] with the user config directory and the environment
/// supplied by the caller.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> LoadedConfig {
    let user_file = config_dir
        .map(|dir| dir.join(USER_FILE))
        .or_else(user_config_path);
    let project_file = project_dir.map_or_else(|| PathBuf::from(PROJECT_FILE), |dir| {
        dir.join(PROJECT_FILE)
    });

    let mut config = LineageConfig::new();
    let mut warnings = Vec::new();
    let layers: Vec<ConfigLayer> = user_file
        .into_iter()
        .chain(std::iter::once(project_file))
        .map(|path| merge_layer(&mut config, path, &mut warnings))
        .collect();

    // Checked before the environment is applied: a key from SKEIN_API_KEY is fine.
    if config
        .client
        .as_ref()
        .is_some_and(ClientSection::has_plaintext_api_key)
    {
        warnings.push(format!(
            "API key stored in a config file; prefer setting {API_KEY_ENV}"
        ));
    }

    apply_env(&mut config, env);

    for warning in &warnings {
        warn!("{warning}");
    }

    LoadedConfig {
        config,
        layers,
        warnings,
    }
}

/// Read and parse a single config file.
pub fn load_config_file(path: &Path) -> Result<LineageConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    LineageConfig::from_toml(&contents)
}

/// Overlay `SKEIN_*` variables read through `env`. Blank values are ignored.
pub fn apply_env(config: &mut LineageConfig, env: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    if let Some(namespace) = var(NAMESPACE_ENV) {
        config.namespace = Some(namespace);
    }
    if let Some(url) = var(URL_ENV) {
        config.client.get_or_insert_with(ClientSection::default).url = url;
    }
    if let Some(key) = var(API_KEY_ENV) {
        config
            .client
            .get_or_insert_with(ClientSection::default)
            .api_key = Some(key);
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join(USER_FILE))
}

/// `$SKEIN_CONFIG_DIR` if set, else `skein/` under the platform config dir.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|dir| dir.join(APP_DIR)),
    }
}

fn merge_layer(config: &mut LineageConfig, path: PathBuf, warnings: &mut Vec<String>) -> ConfigLayer {
    let loaded = path.is_file()
        && match load_config_file(&path) {
            Ok(layer) => {
                debug!(path = %path.display(), "Merged config layer");
                config.merge(layer);
                true
            }
            Err(e) => {
                warnings.push(format!("skipping {}: {e}", path.display()));
                false
            }
        };
    ConfigLayer { path, loaded }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_config_file_not_found() {
        let dir = TempDir::new().unwrap();
        let result = load_config_file(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let loaded = load_config_with_options(Some(project.path()), Some(user.path()), no_env);

        assert_eq!(loaded.config, LineageConfig::new());
        assert_eq!(loaded.layers.len(), 2);
        assert!(loaded.loaded_from().is_empty());
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_project_overrides_user() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            "namespace = \"user\"\n[client]\nurl = \"http://user:5000\"\n",
        )
        .unwrap();
        fs::write(project.path().join("skein.toml"), "namespace = \"project\"\n").unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path()), no_env);
        assert_eq!(loaded.config.namespace(), "project");
        assert_eq!(loaded.config.client().url, "http://user:5000");
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_invalid_layer_is_warning_not_error() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("skein.toml"), "namespace = [").unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path()), no_env);
        assert_eq!(loaded.config.namespace(), "default");
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("skein.toml"));
    }

    #[test]
    fn test_env_overrides_files() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("skein.toml"), "namespace = \"project\"\n").unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            ("SKEIN_NAMESPACE", "from-env"),
            ("SKEIN_URL", "http://env:5000"),
            ("SKEIN_API_KEY", ""),
        ]);
        let loaded = load_config_with_options(Some(project.path()), Some(user.path()), |k| {
            env.get(k).map(|v| v.to_string())
        });

        assert_eq!(loaded.config.namespace(), "from-env");
        let client = loaded.config.client();
        assert_eq!(client.url, "http://env:5000");
        assert!(client.api_key.is_none());
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_plaintext_api_key_warns() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("skein.toml"),
            "[client]\napi_key = \"secret\"\n",
        )
        .unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path()), no_env);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("SKEIN_API_KEY"));
    }
}
