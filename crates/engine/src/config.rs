use shared_types::{AppConfig, EngineConfig};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Path to the config file, relative to the project root.
const CONFIG_PATH: &str = "config.toml";

/// Environment variable that overrides [`CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "DEADLINE_ENGINE_CONFIG";

/// Parse the `[engine]` table of a TOML document.
pub fn parse_engine_config(contents: &str) -> Result<EngineConfig, toml::de::Error> {
    toml::from_str::<AppConfig>(contents).map(|c| c.engine)
}

/// Read an engine config from a file. A missing or unparseable file yields
/// the defaults.
pub fn load_engine_config_from(path: &Path) -> EngineConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_engine_config(&contents) {
            Ok(config) => {
                tracing::info!(path = %path.display(), ?config, "engine config loaded");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse engine config, using defaults");
                EngineConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "engine config not found, using defaults");
            EngineConfig::default()
        }
    }
}

/// The config file to read: the override if one is set, else `config.toml`.
pub fn config_path(override_path: Option<String>) -> PathBuf {
    PathBuf::from(override_path.unwrap_or_else(|| CONFIG_PATH.to_string()))
}

/// Load the config named by `DEADLINE_ENGINE_CONFIG` (after reading `.env`),
/// falling back to `config.toml`.
pub fn load_engine_config() -> EngineConfig {
    let _ = dotenvy::dotenv();
    load_engine_config_from(&config_path(std::env::var(CONFIG_PATH_ENV).ok()))
}

/// The process-wide config, loaded on first use. Safe to call repeatedly;
/// only the first call reads the file.
pub fn engine_config() -> &'static EngineConfig {
    CONFIG.get_or_init(load_engine_config)
}
