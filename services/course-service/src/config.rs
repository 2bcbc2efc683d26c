//! Service configuration, read from the environment at startup. A `.env`
//! file in the working directory is honoured for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use yd_api_types::ChainId;
use yd_chain_rpc::DEFAULT_RPC_URL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// JSON-RPC node acting as the injected wallet.
    Rpc,
    /// In-process chain with two funded dev accounts.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub rpc_url: String,
    pub provider: ProviderKind,
    pub default_chain: ChainId,
    pub sample_fallback: bool,
    /// RocksDB directory for the display name; in-memory when unset.
    pub display_name_db: Option<PathBuf>,
}

fn invalid(var: &str, detail: impl ToString) -> ConfigError {
    ConfigError::InvalidValue(var.to_owned(), detail.to_string())
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(invalid(var, format!("'{other}' is not a boolean"))),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address = lookup("BIND_ADDRESS")
            .unwrap_or_else(|| "0.0.0.0:8080".to_owned())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDRESS", e))?;

        let rpc_url = lookup("RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_owned());

        let provider = match lookup("YD_PROVIDER").as_deref().map(str::trim) {
            None | Some("") | Some("rpc") => ProviderKind::Rpc,
            Some("memory") => ProviderKind::Memory,
            Some(other) => return Err(invalid("YD_PROVIDER", format!("'{other}' is not rpc or memory"))),
        };

        let default_chain = match lookup("YD_DEFAULT_CHAIN_ID") {
            Some(raw) => ChainId(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| invalid("YD_DEFAULT_CHAIN_ID", e))?,
            ),
            None => ChainId::HARDHAT,
        };

        let sample_fallback = match lookup("YD_SAMPLE_FALLBACK") {
            Some(raw) => parse_bool("YD_SAMPLE_FALLBACK", &raw)?,
            None => true,
        };

        let display_name_db = lookup("DISPLAY_NAME_DB")
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bind_address,
            rpc_url,
            provider,
            default_chain,
            sample_fallback,
            display_name_db,
        })
    }
}
