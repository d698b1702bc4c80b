use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Credential of one live period, 192 random bits
pub fn live_session_id() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Long-lived alternate push-ingest credential of a podcast
pub fn stream_key() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    format!("sk_{}", URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_credentials_are_path_safe_and_distinct() {
        let ids: HashSet<String> = (0..256).map(|_| live_session_id()).collect();
        assert_eq!(ids.len(), 256);
        for id in ids.iter() {
            assert_eq!(id.len(), 32);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
        assert!(stream_key().starts_with("sk_"));
        assert_ne!(stream_key(), stream_key());
    }
}
