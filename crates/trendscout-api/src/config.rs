use std::env;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub listen_addr: String,
    /// Shared secret expected in `X-API-KEY`. When unset every protected
    /// request is rejected.
    pub api_key: Option<String>,
}

impl AppConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    /// `TRENDSCOUT_API_ADDR` wins over `PORT`; both fall back to `0.0.0.0:8080`.
    pub fn from_env() -> Result<Self> {
        let listen_addr = match non_empty_var("TRENDSCOUT_API_ADDR") {
            Some(addr) => addr,
            None => {
                let port = non_empty_var("PORT")
                    .map(|value| {
                        value
                            .parse::<u16>()
                            .with_context(|| format!("PORT must be a port number, got `{value}`"))
                    })
                    .transpose()?
                    .unwrap_or(Self::DEFAULT_PORT);
                format!("{}:{port}", Self::DEFAULT_HOST)
            }
        };

        Ok(Self {
            listen_addr,
            api_key: non_empty_var("API_KEY"),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
