use crate::request::ListQuery;

pub const METRICS: &str = "/metrics";

pub const PODCASTS: &str = "/api/podcasts";
pub const PODCASTS_LIVE: &str = "/api/podcasts/live";
pub const PODCASTS_RECORDED: &str = "/api/podcasts/recorded";

/// WebSocket namespace of the realtime relay
pub const RELAY: &str = "/podcast";

/// Local filesystem recordings are served below this prefix
pub const RECORDINGS: &str = "/recordings";

pub const HLS: &str = "/hls";

pub fn podcast(id: &str) -> String {
    format!("/api/podcasts/{}", id)
}

pub fn podcast_start(id: &str) -> String {
    format!("/api/podcasts/{}/start", id)
}

pub fn podcast_end(id: &str) -> String {
    format!("/api/podcasts/{}/end", id)
}

pub fn podcast_cancel(id: &str) -> String {
    format!("/api/podcasts/{}/cancel", id)
}

pub fn podcast_status(id: &str) -> String {
    format!("/api/podcasts/{}/status", id)
}

pub fn podcast_stream(id: &str) -> String {
    format!("/api/podcasts/{}/stream", id)
}

pub fn podcasts(qry: &ListQuery) -> String {
    match serde_html_form::to_string(qry) {
        Ok(query) if !query.is_empty() => format!("{}?{}", PODCASTS, query),
        _ => PODCASTS.to_string(),
    }
}

pub fn recorded(qry: &ListQuery) -> String {
    match serde_html_form::to_string(qry) {
        Ok(query) if !query.is_empty() => format!("{}?{}", PODCASTS_RECORDED, query),
        _ => PODCASTS_RECORDED.to_string(),
    }
}

/// Push-ingest endpoint, `credential` is a live session id or a stream key
pub fn ingest(credential: &str) -> String {
    format!("/live/{}", credential)
}

pub fn hls_playlist(podcast: &str) -> String {
    format!("{}/{}/index.m3u8", HLS, podcast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::podcast::Status;

    #[test]
    fn test_podcasts_query() {
        assert_eq!(podcasts(&ListQuery::default()), "/api/podcasts");

        let qry = ListQuery {
            status: Some(Status::Live),
            search: Some("rust".to_string()),
            page: Some(2),
            limit: Some(5),
            sort: None,
        };
        assert_eq!(
            podcasts(&qry),
            "/api/podcasts?status=live&search=rust&page=2&limit=5"
        );
    }

    #[test]
    fn test_route_template() {
        assert_eq!(podcast_start("{id}"), "/api/podcasts/{id}/start");
        assert_eq!(ingest("{credential}"), "/live/{credential}");
    }
}
