use lazy_static::lazy_static;
use prometheus::{IntCounter, IntGauge, Registry, TextEncoder};

lazy_static! {
    pub static ref LIVE: IntGauge = IntGauge::new("live", "live podcast number").unwrap();
    pub static ref RECORDING: IntGauge =
        IntGauge::new("recording", "open recording buffer number").unwrap();
    pub static ref CONNECTION: IntGauge =
        IntGauge::new("connection", "relay connection number").unwrap();
    pub static ref PRODUCER: IntGauge =
        IntGauge::new("producer", "push ingest producer number").unwrap();
    pub static ref CHUNK: IntCounter = IntCounter::new("chunk", "relayed audio chunks").unwrap();
    pub static ref DROPPED: IntCounter =
        IntCounter::new("dropped", "events dropped for slow connections").unwrap();
    pub static ref REGISTRY: Registry =
        Registry::new_custom(Some("livepod".to_string()), None).unwrap();
    pub static ref ENCODER: TextEncoder = TextEncoder::new();
}
