use crate::config::Config;
use crate::ingest::Ingest;
use crate::podcast::Manager;
use crate::relay::Relay;

pub mod ingest;
pub mod podcast;
pub mod relay;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub manager: Manager,
    pub relay: Relay,
    pub ingest: Ingest,
}
