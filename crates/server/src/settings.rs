use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
    value::{Dict, Value},
};
use profai_chat::{ChatConfig, DEFAULT_INSTRUCTIONS, DEFAULT_WELCOME_MESSAGE, SequencePolicy};
use profai_llm::{DEFAULT_BASE_URL, DEFAULT_MODEL_ID, DEFAULT_PROVIDER_ID, ProviderConfig};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};

pub const SETTINGS_DIRECTORY_NAME: &str = "profai";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "PROFAI_";
pub const DOTENV_FILE_NAME: &str = ".env";
/// Overrides the settings file location.
pub const CONFIG_PATH_ENV: &str = "PROFAI_CONFIG";
/// Credential variable the Gemini tooling conventionally uses.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 120;

/// Everything the process reads at startup.
///
/// Sources, later ones winning: built-in defaults, the JSON settings file,
/// a `.env` file, `GEMINI_API_KEY`, then `PROFAI_*` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub provider_id: String,
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
    pub instructions: String,
    pub welcome_message: String,
    pub bind_address: String,
    /// Zero disables the per-turn timeout.
    pub turn_timeout_secs: u64,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    pub sequence_policy: SequencePolicy,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            provider_id: DEFAULT_PROVIDER_ID.to_string(),
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            turn_timeout_secs: DEFAULT_TURN_TIMEOUT_SECS,
            temperature: None,
            max_tokens: None,
            sequence_policy: SequencePolicy::default(),
        }
    }
}

impl AppSettings {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".profai"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// `.env` in the working directory or the nearest ancestor that has one.
    pub fn find_dotenv() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        current_dir
            .ancestors()
            .map(|dir| dir.join(DOTENV_FILE_NAME))
            .find(|path| path.is_file())
    }

    pub fn figment(config_path: Option<&Path>) -> Figment {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        let mut figment = Figment::from(Serialized::defaults(AppSettings::default()))
            .merge(Json::file(config_path));
        if let Some(dotenv_path) = Self::find_dotenv() {
            figment = figment.merge(Serialized::defaults(dotenv_values(&dotenv_path)));
        }

        figment
            .merge(
                Env::raw()
                    .only(&[GEMINI_API_KEY_ENV])
                    .map(|_| "api_key".into()),
            )
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(config_path: Option<&Path>) -> SettingsResult<Self> {
        let settings = Self::figment(config_path)
            .extract::<AppSettings>()
            .context(ExtractSnafu {
                stage: "extract-settings",
            })?;
        Ok(settings.normalized())
    }

    pub fn normalized(mut self) -> Self {
        self.provider_id = if self.provider_id.trim().is_empty() {
            DEFAULT_PROVIDER_ID.to_string()
        } else {
            self.provider_id.trim().to_string()
        };
        self.api_key = self.api_key.trim().to_string();
        self.base_url = if self.base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            self.base_url.trim().to_string()
        };
        self.model_id = if self.model_id.trim().is_empty() {
            DEFAULT_MODEL_ID.to_string()
        } else {
            self.model_id.trim().to_string()
        };
        self.bind_address = self.bind_address.trim().to_string();
        self
    }

    /// Provider credentials. A missing API key is fatal at startup.
    pub fn provider_config(&self) -> SettingsResult<ProviderConfig> {
        ensure!(
            !self.api_key.trim().is_empty(),
            ConfigMissingSnafu {
                stage: "provider-config",
                key: "api_key",
            }
        );

        Ok(ProviderConfig::new(
            &self.provider_id,
            &self.api_key,
            &self.base_url,
        ))
    }

    pub fn chat_config(&self) -> ChatConfig {
        let turn_timeout =
            (self.turn_timeout_secs > 0).then(|| Duration::from_secs(self.turn_timeout_secs));

        ChatConfig {
            model_id: self.model_id.clone(),
            instructions: self.instructions.clone(),
            welcome_message: self.welcome_message.clone(),
            turn_timeout,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            sequence_policy: self.sequence_policy,
        }
    }

    pub fn bind_address(&self) -> SettingsResult<SocketAddr> {
        self.bind_address
            .parse::<SocketAddr>()
            .context(InvalidBindAddressSnafu {
                stage: "parse-bind-address",
                raw: self.bind_address.clone(),
            })
    }
}

/// Settings named in a `.env` file, keyed like the environment layers key them.
///
/// The file is read without touching the process environment. Inside the file
/// `PROFAI_API_KEY` wins over `GEMINI_API_KEY`.
fn dotenv_values(path: &Path) -> Dict {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!(path = %path.display(), error = %error, "ignoring unreadable .env file");
            return Dict::new();
        }
    };

    let mut values = Dict::new();
    let mut gemini_api_key = None;
    for entry in entries {
        let (key, raw) = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "skipping malformed .env line"
                );
                continue;
            }
        };
        let Ok(value) = raw.parse::<Value>();

        if key == GEMINI_API_KEY_ENV {
            gemini_api_key = Some(value);
        } else if let Some(name) = key.strip_prefix(ENV_PREFIX) {
            values.insert(name.to_lowercase(), value);
        }
    }

    if let Some(api_key) = gemini_api_key {
        values.entry("api_key".to_string()).or_insert(api_key);
    }
    values
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("required setting `{key}` is missing"))]
    ConfigMissing {
        stage: &'static str,
        key: &'static str,
    },
    #[snafu(display("failed to read settings on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },
    #[snafu(display("bind address '{raw}' is invalid: {source}"))]
    InvalidBindAddress {
        stage: &'static str,
        raw: String,
        source: std::net::AddrParseError,
    },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_match_gemini_endpoint() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let settings = AppSettings::load(Some(Path::new("missing.json"))).unwrap();

            assert_eq!(settings.base_url, DEFAULT_BASE_URL);
            assert_eq!(settings.model_id, DEFAULT_MODEL_ID);
            assert_eq!(settings.bind_address, DEFAULT_BIND_ADDRESS);
            assert!(settings.api_key.is_empty());
            Ok(())
        });
    }

    #[test]
    fn missing_api_key_is_config_missing() {
        let error = AppSettings::default().provider_config().unwrap_err();
        assert!(matches!(
            error,
            SettingsError::ConfigMissing { key: "api_key", .. }
        ));
    }

    #[test]
    fn file_then_environment_layers_apply_in_order() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                "settings.json",
                r#"{
                    "api_key": "from-file",
                    "model_id": "file-model",
                    "turn_timeout_secs": 30,
                    "sequence_policy": "warn"
                }"#,
            )?;
            jail.set_env("PROFAI_MODEL_ID", "env-model");

            let settings = AppSettings::load(Some(Path::new("settings.json"))).unwrap();

            assert_eq!(settings.api_key, "from-file");
            assert_eq!(settings.model_id, "env-model");
            assert_eq!(settings.turn_timeout_secs, 30);
            assert_eq!(settings.sequence_policy, SequencePolicy::Warn);
            Ok(())
        });
    }

    #[test]
    fn gemini_key_is_accepted_and_prefixed_key_wins() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env(GEMINI_API_KEY_ENV, "gemini-key");

            let settings = AppSettings::load(Some(Path::new("missing.json"))).unwrap();
            assert_eq!(settings.api_key, "gemini-key");

            jail.set_env("PROFAI_API_KEY", "profai-key");
            let settings = AppSettings::load(Some(Path::new("missing.json"))).unwrap();
            assert_eq!(settings.api_key, "profai-key");
            Ok(())
        });
    }

    #[test]
    fn dotenv_file_supplies_the_gemini_key() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(DOTENV_FILE_NAME, "GEMINI_API_KEY=from-dotenv\n")?;

            let settings = AppSettings::load(Some(Path::new("missing.json"))).unwrap();

            assert_eq!(settings.api_key, "from-dotenv");
            assert_eq!(settings.provider_config().unwrap().api_key, "from-dotenv");
            Ok(())
        });
    }

    #[test]
    fn dotenv_values_sit_below_the_real_environment() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                DOTENV_FILE_NAME,
                "GEMINI_API_KEY=gemini-key\n\
                 PROFAI_API_KEY=profai-key\n\
                 PROFAI_TURN_TIMEOUT_SECS=45\n\
                 PROFAI_MODEL_ID=dotenv-model\n",
            )?;
            jail.set_env("PROFAI_MODEL_ID", "env-model");

            let settings = AppSettings::load(Some(Path::new("missing.json"))).unwrap();

            assert_eq!(settings.api_key, "profai-key");
            assert_eq!(settings.turn_timeout_secs, 45);
            assert_eq!(settings.model_id, "env-model");
            assert!(std::env::var_os("PROFAI_API_KEY").is_none());
            Ok(())
        });
    }

    #[test]
    fn chat_config_carries_timeout_and_model() {
        let settings = AppSettings {
            model_id: "m".to_string(),
            turn_timeout_secs: 0,
            max_tokens: Some(512),
            ..AppSettings::default()
        };

        let config = settings.chat_config();
        assert_eq!(config.model_id, "m");
        assert_eq!(config.turn_timeout, None);
        assert_eq!(config.max_tokens, Some(512));
        assert_eq!(config.welcome_message, DEFAULT_WELCOME_MESSAGE);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let settings = AppSettings {
            provider_id: "  ".to_string(),
            api_key: " key ".to_string(),
            base_url: String::new(),
            ..AppSettings::default()
        }
        .normalized();

        assert_eq!(settings.provider_id, DEFAULT_PROVIDER_ID);
        assert_eq!(settings.api_key, "key");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.provider_config().unwrap().api_key, "key");
    }

    #[test]
    fn bind_address_must_parse() {
        let settings = AppSettings {
            bind_address: "not an address".to_string(),
            ..AppSettings::default()
        };
        assert!(matches!(
            settings.bind_address(),
            Err(SettingsError::InvalidBindAddress { .. })
        ));
    }
}
