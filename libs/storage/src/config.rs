use serde::{Deserialize, Serialize};

/// Recording storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Key prefix of recording objects
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Base of public object URLs, derived from the backend when unset
    #[serde(default)]
    pub public_url: Option<String>,
    /// Lifetime of signed URLs in seconds
    #[serde(default = "default_signed_url_expires")]
    pub signed_url_expires: u64,
    /// Minimum upload timeout in seconds, large objects get more time
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Default::default(),
            prefix: default_prefix(),
            public_url: None,
            signed_url_expires: default_signed_url_expires(),
            upload_timeout: default_upload_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Backend {
    /// Local filesystem storage
    Fs {
        /// Root path for storage
        #[serde(default = "default_fs_root")]
        root: String,
    },
    /// AWS S3 compatible storage
    S3 {
        bucket: String,
        /// Root path within bucket
        #[serde(default = "default_s3_root")]
        root: String,
        #[serde(default)]
        region: Option<String>,
        /// Custom endpoint for S3-compatible services
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        access_key_id: Option<String>,
        #[serde(default)]
        secret_access_key: Option<String>,
        /// Disable config/credential auto-loading
        #[serde(default)]
        disable_config_load: bool,
        #[serde(default)]
        enable_virtual_host_style: bool,
    },
    /// Process memory, recordings are lost on restart
    Memory,
}

impl Default for Backend {
    fn default() -> Self {
        Self::Fs {
            root: default_fs_root(),
        }
    }
}

impl Backend {
    /// URL prefix under which uploaded objects are publicly reachable
    pub fn default_public_url(&self) -> String {
        match self {
            Backend::Fs { .. } => "/recordings".to_string(),
            Backend::S3 {
                bucket,
                root,
                endpoint,
                ..
            } => {
                let base = match endpoint {
                    Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
                    None => format!("https://{}.s3.amazonaws.com", bucket),
                };
                match root.trim_matches('/') {
                    "" => base,
                    root => format!("{}/{}", base, root),
                }
            }
            Backend::Memory => "memory://".to_string(),
        }
    }
}

fn default_prefix() -> String {
    "podcasts".to_string()
}

fn default_fs_root() -> String {
    "./recordings".to_string()
}

fn default_s3_root() -> String {
    "/".to_string()
}

fn default_signed_url_expires() -> u64 {
    7 * 24 * 60 * 60
}

fn default_upload_timeout() -> u64 {
    10 * 60
}
