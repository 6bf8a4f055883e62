use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const PLACEHOLDER_CLIENT_ID: &str = "YOUR_GOOGLE_CLIENT_ID.apps.googleusercontent.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_FREE_SEARCH_LIMIT: u32 = 5;
pub const DEFAULT_SUBSCRIPTION_PRICE: u32 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub google_client_id: String,
    pub model: String,
    pub api_base: String,
    pub free_search_limit: u32,
    pub subscription_price: u32,
    pub storage_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = get_env(&lookup, "API_KEY")
            .or_else(|_| get_env(&lookup, "GEMINI_API_KEY"))
            .map_err(|_| ConfigError::MissingVar("API_KEY"))?;

        let google_client_id =
            get_env_or_default(&lookup, "GOOGLE_CLIENT_ID", PLACEHOLDER_CLIENT_ID);
        if google_client_id == PLACEHOLDER_CLIENT_ID {
            log::warn!(
                "MeTube is using a placeholder Google Client ID. \
                 Sign-In will not work until you provide a real GOOGLE_CLIENT_ID."
            );
        }

        Ok(Config {
            api_key,
            google_client_id,
            model: get_env_or_default(&lookup, "METUBE_MODEL", DEFAULT_MODEL),
            api_base: get_env_or_default(&lookup, "METUBE_API_BASE", DEFAULT_API_BASE),
            free_search_limit: parse_env(
                &lookup,
                "METUBE_FREE_SEARCH_LIMIT",
                DEFAULT_FREE_SEARCH_LIMIT,
            )?,
            subscription_price: parse_env(
                &lookup,
                "METUBE_SUBSCRIPTION_PRICE",
                DEFAULT_SUBSCRIPTION_PRICE,
            )?,
            storage_path: PathBuf::from(get_env_or_default(
                &lookup,
                "METUBE_STORAGE_PATH",
                ".metube/storage.json",
            )),
            bind_addr: parse_env(
                &lookup,
                "METUBE_BIND_ADDR",
                SocketAddr::from(([127, 0, 0, 1], 3000)),
            )?,
        })
    }

    /// Real sign-in is only possible with a non-placeholder client id.
    pub fn sign_in_enabled(&self) -> bool {
        self.google_client_id != PLACEHOLDER_CLIENT_ID
    }
}

fn get_env<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar(key))
}

fn get_env_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
            key,
            value: raw.clone(),
        }),
        None => Ok(default),
    }
}
