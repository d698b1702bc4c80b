use std::net::{Ipv4Addr, SocketAddr};

use tempfile::TempDir;
use tokio::net::TcpListener;

use auth::claims::{Claims, Role};
use auth::Keys;
use livecast::config::Config;

pub const SECRET: &str = "integration-secret";

pub struct Server {
    pub http: SocketAddr,
    pub ingest: SocketAddr,
    pub recordings: TempDir,
}

impl Server {
    pub fn api(&self, path: &str) -> String {
        format!("http://{}{}", self.http, path)
    }

    pub fn relay(&self) -> String {
        format!("ws://{}{}", self.http, api::path::RELAY)
    }

    pub fn push(&self, credential: &str) -> String {
        format!("http://{}{}", self.ingest, api::path::ingest(credential))
    }
}

pub async fn spawn() -> Server {
    let recordings = tempfile::tempdir().unwrap();

    let mut cfg = Config::default();
    cfg.database.url = "sqlite::memory:".to_string();
    cfg.auth.secret = SECRET.to_string();
    cfg.ingest.idle_timeout = 2000;
    cfg.recorder.signed_url_refresh = 0;
    cfg.storage.backend = storage::Backend::Fs {
        root: recordings.path().to_str().unwrap().to_string(),
    };

    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .unwrap();
    let ingest_listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .unwrap();
    let http = listener.local_addr().unwrap();
    let ingest = ingest_listener.local_addr().unwrap();
    cfg.http.listen = http;
    cfg.ingest.listen = ingest;

    tokio::spawn(livecast::serve(
        cfg,
        listener,
        ingest_listener,
        std::future::pending(),
    ));
    wait_ready(http).await;

    Server {
        http,
        ingest,
        recordings,
    }
}

async fn wait_ready(addr: SocketAddr) {
    let url = format!("http://{}{}", addr, api::path::PODCASTS);
    for _ in 0..50 {
        if let Ok(res) = reqwest::get(&url).await {
            if res.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("server at {} did not come up", addr);
}

pub fn token(id: &str, role: Role) -> String {
    Keys::new(SECRET.as_bytes())
        .token(Claims {
            id: id.to_string(),
            // 2100-01-01
            exp: 4_102_444_800,
            role,
        })
        .unwrap()
}
