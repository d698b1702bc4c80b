use serde::{Deserialize, Serialize};
use std::{env, fs, net::SocketAddr, path::PathBuf, str::FromStr};

use storage::StorageConfig;

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub ingest: Ingest,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub recorder: Recorder,
    #[serde(default)]
    pub relay: Relay,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
    /// Externally visible base URL of the API and relay, e.g. `https://cast.example.com`
    #[serde(default)]
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Ingest {
    #[serde(default = "default_ingest_listen")]
    pub listen: SocketAddr,
    /// Externally visible base URL of the push-ingest listener
    #[serde(default)]
    pub public_url: Option<String>,
    /// A producer sending nothing for this long (ms) is treated as gone
    #[serde(default = "default_ingest_idle_timeout")]
    pub idle_timeout: u64,
    #[serde(default)]
    pub hls: Hls,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Hls {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_hls_root")]
    pub root: PathBuf,
    #[serde(default = "default_hls_segment_seconds")]
    pub segment_seconds: u32,
    #[serde(default = "default_hls_list_size")]
    pub list_size: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Auth {
    /// HS256 secret of caller tokens
    #[serde(default)]
    pub secret: String,
    /// Static tokens, each grants platform admin
    #[serde(default)]
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recorder {
    /// Seconds between signed URL refresh sweeps, `0` disables the sweep
    #[serde(default = "default_signed_url_refresh")]
    pub signed_url_refresh: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relay {
    /// Events queued per connection before new ones are dropped
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("5005"))
    ))
    .expect("invalid listen address")
}

fn default_ingest_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("INGEST_PORT").unwrap_or(String::from("8000"))
    ))
    .expect("invalid ingest listen address")
}

fn default_ingest_idle_timeout() -> u64 {
    30 * 1000
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_hls_root() -> PathBuf {
    PathBuf::from("./media/hls")
}

fn default_hls_segment_seconds() -> u32 {
    2
}

fn default_hls_list_size() -> u32 {
    3
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_database_url() -> String {
    "sqlite://./livepod.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_signed_url_refresh() -> u64 {
    24 * 60 * 60
}

fn default_outbox_capacity() -> usize {
    256
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
            public_url: None,
        }
    }
}

impl Default for Ingest {
    fn default() -> Self {
        Self {
            listen: default_ingest_listen(),
            public_url: None,
            idle_timeout: default_ingest_idle_timeout(),
            hls: Default::default(),
        }
    }
}

impl Default for Hls {
    fn default() -> Self {
        Self {
            enabled: false,
            ffmpeg: default_ffmpeg(),
            root: default_hls_root(),
            segment_seconds: default_hls_segment_seconds(),
            list_size: default_hls_list_size(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            signed_url_refresh: default_signed_url_refresh(),
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self {
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

impl Http {
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.listen))
            .trim_end_matches('/')
            .to_string()
    }
}

impl Ingest {
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.listen))
            .trim_end_matches('/')
            .to_string()
    }
}

impl Config {
    /// Reads `path`, then `livepod.toml`, then `/etc/livepod/livepod.toml`.
    /// No file at all means built-in defaults.
    pub fn parse(path: Option<String>) -> anyhow::Result<Self> {
        let result = fs::read_to_string(path.unwrap_or(String::from("livepod.toml")))
            .or(fs::read_to_string("/etc/livepod/livepod.toml"))
            .unwrap_or("".to_string());
        let cfg: Self = toml::from_str(result.as_str())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ingest.idle_timeout == 0 {
            return Err(anyhow::anyhow!("ingest.idle_timeout must be greater than 0"));
        }
        if self.storage.upload_timeout == 0 {
            return Err(anyhow::anyhow!("storage.upload_timeout must be greater than 0"));
        }
        if self.storage.prefix.trim_matches('/').is_empty() {
            return Err(anyhow::anyhow!("storage.prefix cannot be empty"));
        }
        if self.relay.outbox_capacity == 0 {
            return Err(anyhow::anyhow!("relay.outbox_capacity must be greater than 0"));
        }
        if self.ingest.hls.enabled && self.ingest.hls.segment_seconds == 0 {
            return Err(anyhow::anyhow!("ingest.hls.segment_seconds must be greater than 0"));
        }
        Ok(())
    }
}
