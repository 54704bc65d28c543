use std::env;
use std::io;

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.bankhost.dev/v1";

/// Connection settings for the hosted bank, read from the environment once
/// at startup and passed explicitly into everything that talks to the API.
#[derive(Debug, Clone)]
pub(crate) struct ApiConfig {
    pub(crate) base_url: String,
    pub(crate) token: String,
    pub(crate) collection: String,
    pub(crate) timeout_secs: u64,
    pub(crate) requests_per_second: u32,
    pub(crate) page_size: usize,
}

impl ApiConfig {
    pub(crate) fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            base_url: env_optional("BANKCTL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            token: env_required("BANKCTL_TOKEN")?,
            collection: env_required("BANKCTL_COLLECTION")?,
            timeout_secs: env_u64("BANKCTL_TIMEOUT", 30)?,
            requests_per_second: env_u64("BANKCTL_RPS", 3)? as u32,
            page_size: env_usize("BANKCTL_PAGE_SIZE", 100)?,
        })
    }
}

pub(crate) fn env_required(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    let value = env::var(name).unwrap_or_default();
    if value.trim().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("Missing {name}")).into());
    }
    Ok(value)
}

pub(crate) fn env_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub(crate) fn env_u64(name: &str, default: u64) -> Result<u64, Box<dyn std::error::Error>> {
    match env_optional(name) {
        Some(value) => Ok(value
            .parse::<u64>()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid {name}")))?),
        None => Ok(default),
    }
}

pub(crate) fn env_usize(name: &str, default: usize) -> Result<usize, Box<dyn std::error::Error>> {
    match env_optional(name) {
        Some(value) => Ok(value
            .parse::<usize>()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid {name}")))?),
        None => Ok(default),
    }
}
