use anyhow::{Context, Result};
use keyring::Entry;

// --- Application Settings ---

const PROVIDER_URL_VAR: &str = "RANDOMSTRING_PROVIDER_URL";
const PROVIDER_TOKEN_REF_VAR: &str = "RANDOMSTRING_PROVIDER_TOKEN_REF";
const DATABASE_FILE_VAR: &str = "RANDOMSTRING_DATABASE_FILE";

const DEFAULT_PROVIDER_URL: &str = "http://127.0.0.1:7070";
const DEFAULT_DATABASE_FILE: &str = "random_strings.sqlite";

const KEYRING_SERVICE: &str = "randomstring_provider_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the content provider.
    pub provider_url: String,
    /// Where the provider's bearer token lives: `env:NAME`, `keyring`, or unset for no auth.
    pub provider_token_ref: Option<String>,
    /// Database file name, resolved against the app's local data directory.
    pub database_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            provider_token_ref: None,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads settings from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Blank values count as unset
        let read = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let config = Self {
            provider_url: read(PROVIDER_URL_VAR).unwrap_or(defaults.provider_url),
            provider_token_ref: read(PROVIDER_TOKEN_REF_VAR),
            database_file: read(DATABASE_FILE_VAR).unwrap_or(defaults.database_file),
        };
        log::debug!("Loaded configuration: provider={} database={}", config.provider_url, config.database_file);
        config
    }
}

// --- Provider Token Retrieval ---

/// Retrieves the provider token for the given configuration.
/// It checks the `provider_token_ref` field to determine whether to read from
/// environment variables or the OS keyring. `Ok(None)` means no token is configured.
pub fn get_provider_token(config: &AppConfig) -> Result<Option<String>> {
    match config.provider_token_ref.as_deref() {
        Some(ref_str) if ref_str.starts_with("env:") => {
            let env_var_name = ref_str.trim_start_matches("env:");
            log::debug!("Retrieving provider token from environment variable: {}", env_var_name);
            std::env::var(env_var_name)
                .map(Some)
                .context(format!(
                    "Failed to get provider token from environment variable '{}'",
                    env_var_name
                ))
        }
        Some("keyring") => {
            // The provider URL is the keyring "username"
            let entry = Entry::new(KEYRING_SERVICE, &config.provider_url)
                .context("Failed to create keyring entry")?;
            log::debug!("Retrieving provider token from keyring for service: {}", KEYRING_SERVICE);
            entry.get_password().map(Some).context(format!(
                "Failed to get provider token from keyring for '{}'",
                config.provider_url
            ))
        }
        Some(other) => Err(anyhow::anyhow!("Unsupported provider token reference format: {}", other)),
        None => Ok(None),
    }
}
