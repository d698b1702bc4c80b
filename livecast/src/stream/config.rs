use crate::config::Config;

/// Public endpoints a descriptor points clients at
#[derive(Clone, Debug)]
pub struct Endpoints {
    /// WebSocket URL of the relay namespace
    pub relay_url: String,
    /// Base URL of the push-ingest listener
    pub ingest_url: String,
}

impl Endpoints {
    pub fn from_config(cfg: &Config) -> Self {
        let http = cfg.http.public_url();
        let relay = if let Some(rest) = http.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = http.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            http
        };
        Self {
            relay_url: format!("{}{}", relay, api::path::RELAY),
            ingest_url: cfg.ingest.public_url(),
        }
    }
}
