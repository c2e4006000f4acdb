//! Configuration for NutriLens.
//!
//! Sources, later ones winning:
//!
//! 1. TOML file at `$NUTRILENS_CONFIG` or `~/.nutrilens/config.toml` (optional)
//! 2. `.env` in the working directory (never overrides variables already set)
//! 3. Process environment (`GOOGLE_API_KEY`, `FIREBASE_CREDENTIALS_JSON`, ...)
//!
//! Every subsystem setting is optional. A missing credential leaves that subsystem
//! unconfigured; it never fails startup.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8000"
//! default_user_id = "demo_user"
//!
//! [vision]
//! api_key = "${GOOGLE_API_KEY}"
//! model = "gemini-2.5-flash"
//!
//! [store]
//! credentials_path = "serviceAccountKey.json"
//! collection = "food_logs"
//!
//! [fitness]
//! platform = "FitnessMock Basic"
//!
//! [timeouts]
//! classify_secs = 8
//! sync_secs = 5
//! ```

mod credentials;

pub use credentials::{CredentialError, CredentialSource, StoreCredentials, resolve_credentials};

use std::path::{Path, PathBuf};
use std::time::Duration;

use nutrilens_types::ApiKey;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_USER_ID: &str = "demo_user";
/// Service-account file picked up from the working directory when nothing else is set.
pub const DEFAULT_CREDENTIALS_FILE: &str = "serviceAccountKey.json";

const DEFAULT_CLASSIFY_SECS: u64 = 8;
const DEFAULT_PERSIST_SECS: u64 = 5;
const DEFAULT_SYNC_SECS: u64 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct NutrilensConfig {
    pub server: Option<ServerConfig>,
    pub vision: Option<VisionConfig>,
    pub store: Option<StoreConfig>,
    pub fitness: Option<FitnessConfig>,
    pub timeouts: Option<TimeoutsConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub default_user_id: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct StoreConfig {
    pub credentials_path: Option<PathBuf>,
    /// Service-account JSON, raw or base64 encoded.
    pub credentials_json: Option<String>,
    pub base_url: Option<String>,
    pub collection: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct FitnessConfig {
    pub platform: Option<String>,
    /// When absent the mock platform is used.
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimeoutsConfig {
    pub classify_secs: Option<u64>,
    pub persist_secs: Option<u64>,
    pub sync_secs: Option<u64>,
}

fn mask(opt: Option<&String>) -> &'static str {
    if opt.is_some() { "[REDACTED]" } else { "None" }
}

// Manual Debug impls to prevent leaking secrets in logs.
impl std::fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionConfig")
            .field("api_key", &mask(self.api_key.as_ref()))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("credentials_path", &self.credentials_path)
            .field("credentials_json", &mask(self.credentials_json.as_ref()))
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .finish()
    }
}

impl std::fmt::Debug for FitnessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitnessConfig")
            .field("platform", &self.platform)
            .field("endpoint", &self.endpoint)
            .field("token", &mask(self.token.as_ref()))
            .finish()
    }
}

/// Replace `${VAR}` references using `lookup`. Unknown variables become empty.
pub fn expand_env_vars_with(value: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&lookup(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

impl NutrilensConfig {
    /// Load the config file if one exists. `Ok(None)` means no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("NUTRILENS_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".nutrilens").join("config.toml"))
}

/// Load `.env` from the working directory. Returns the file that was loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(err) if err.not_found() => None,
        Err(err) => {
            tracing::warn!("Ignoring unreadable .env file: {err}");
            None
        }
    }
}

// ============================================================================
// Effective settings
// ============================================================================

#[derive(Debug, Clone)]
pub struct VisionSettings {
    pub api_key: Option<ApiKey>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub credentials: Option<CredentialSource>,
    pub base_url: Option<String>,
    pub collection: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FitnessSettings {
    pub platform: Option<String>,
    pub endpoint: Option<String>,
    pub token: Option<ApiKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub classify: Duration,
    pub persist: Duration,
    pub sync: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            classify: Duration::from_secs(DEFAULT_CLASSIFY_SECS),
            persist: Duration::from_secs(DEFAULT_PERSIST_SECS),
            sync: Duration::from_secs(DEFAULT_SYNC_SECS),
        }
    }
}

/// Config file merged with the environment. Absent credentials stay `None`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub default_user_id: String,
    pub vision: VisionSettings,
    pub store: StoreSettings,
    pub fitness: FitnessSettings,
    pub timeouts: Timeouts,
}

impl Settings {
    /// Merge `config` with the process environment.
    pub fn resolve(config: Option<NutrilensConfig>) -> Self {
        Self::resolve_with(config, &|key: &str| std::env::var(key).ok())
    }

    /// Merge `config` with variables provided by `env`.
    pub fn resolve_with(
        config: Option<NutrilensConfig>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Self {
        let config = config.unwrap_or_default();
        let server = config.server.unwrap_or_default();
        let vision = config.vision.unwrap_or_default();
        let store = config.store.unwrap_or_default();
        let fitness = config.fitness.unwrap_or_default();
        let timeouts = config.timeouts.unwrap_or_default();

        let var = |key: &str| env(key).filter(|value| !value.trim().is_empty());
        let file = |value: Option<String>| {
            value
                .map(|v| expand_env_vars_with(&v, env))
                .filter(|v| !v.trim().is_empty())
        };

        let api_key = var("GOOGLE_API_KEY")
            .or_else(|| var("GEMINI_API_KEY"))
            .or_else(|| file(vision.api_key))
            .and_then(ApiKey::new);

        let credentials = var("FIREBASE_CREDENTIALS_JSON")
            .map(CredentialSource::InlineJson)
            .or_else(|| var("FIREBASE_CREDENTIALS_PATH").map(|p| CredentialSource::Path(p.into())))
            .or_else(|| file(store.credentials_json).map(CredentialSource::InlineJson))
            .or_else(|| store.credentials_path.map(CredentialSource::Path))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CREDENTIALS_FILE);
                default.exists().then_some(CredentialSource::Path(default))
            });

        let store_base_url = var("FIRESTORE_BASE_URL")
            .or_else(|| var("FIRESTORE_EMULATOR_HOST").map(|host| format!("http://{host}/v1")))
            .or_else(|| file(store.base_url));

        let secs = |value: Option<u64>, default: Duration| {
            value
                .filter(|secs| *secs > 0)
                .map_or(default, Duration::from_secs)
        };
        let defaults = Timeouts::default();

        Self {
            bind: var("NUTRILENS_BIND")
                .or_else(|| file(server.bind))
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            default_user_id: var("NUTRILENS_DEFAULT_USER")
                .or_else(|| file(server.default_user_id))
                .unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
            vision: VisionSettings {
                api_key,
                model: var("GEMINI_MODEL").or_else(|| file(vision.model)),
                base_url: var("GEMINI_BASE_URL").or_else(|| file(vision.base_url)),
            },
            store: StoreSettings {
                credentials,
                base_url: store_base_url,
                collection: var("FIRESTORE_COLLECTION").or_else(|| file(store.collection)),
            },
            fitness: FitnessSettings {
                platform: var("FITNESS_PLATFORM").or_else(|| file(fitness.platform)),
                endpoint: var("FITNESS_ENDPOINT").or_else(|| file(fitness.endpoint)),
                token: var("FITNESS_TOKEN")
                    .or_else(|| file(fitness.token))
                    .and_then(ApiKey::new),
            },
            timeouts: Timeouts {
                classify: secs(timeouts.classify_secs, defaults.classify),
                persist: secs(timeouts.persist_secs, defaults.persist),
                sync: secs(timeouts.sync_secs, defaults.sync),
            },
        }
    }
}
