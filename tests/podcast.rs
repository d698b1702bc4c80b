use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use http::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use api::event::{Inbound, JoinSession, LeaveSession, Outbound};
use api::response::{Page, Podcast, PodcastStatus, Started};
use auth::claims::Role;

mod common;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn create(server: &common::Server, token: &str, body: Value) -> Podcast {
    let res = reqwest::Client::new()
        .post(server.api(api::path::PODCASTS))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());
    res.json().await.unwrap()
}

async fn post(server: &common::Server, token: &str, path: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(server.api(path))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
}

async fn send(socket: &mut Socket, event: Inbound) {
    let text = serde_json::to_string(&event).unwrap();
    socket.send(Message::Text(text.into())).await.unwrap();
}

/// Next relay event matching `pick`, other events are skipped
async fn expect<T>(socket: &mut Socket, pick: impl Fn(Outbound) -> Option<T>) -> T {
    let wait = async {
        loop {
            let msg = socket.next().await.unwrap().unwrap();
            if !msg.is_text() {
                continue;
            }
            let event: Outbound = serde_json::from_str(msg.to_text().unwrap()).unwrap();
            if let Some(found) = pick(event) {
                return found;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("relay event timed out")
}

#[tokio::test]
async fn test_http_lifecycle() {
    let server = common::spawn().await;
    let host = common::token("host", Role::Admin);
    let other = common::token("other", Role::Admin);
    let listener = common::token("listener", Role::User);

    let res = reqwest::Client::new()
        .post(server.api(api::path::PODCASTS))
        .json(&json!({ "title": "No token" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = reqwest::Client::new()
        .post(server.api(api::path::PODCASTS))
        .bearer_auth(&listener)
        .json(&json!({ "title": "Not an admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = reqwest::Client::new()
        .post(server.api(api::path::PODCASTS))
        .bearer_auth(&host)
        .json(&json!({ "title": "ab" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "ValidationError");

    let podcast = create(&server, &host, json!({ "title": "HTTP lifecycle", "isRecording": false })).await;
    assert_eq!(podcast.owner_id, "host");
    let id = podcast.id.clone();

    let res = post(&server, &other, &api::path::podcast_start(&id)).await;
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = post(&server, &host, &api::path::podcast_start(&id)).await;
    assert_eq!(StatusCode::OK, res.status());
    let started: Started = res.json().await.unwrap();
    assert!(started.podcast.live_session_id.is_some());

    let res = post(&server, &host, &api::path::podcast_start(&id)).await;
    assert_eq!(StatusCode::CONFLICT, res.status());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Conflict");

    // public reads never carry the credential
    let public: Value = reqwest::get(server.api(&api::path::podcast(&id)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(public["status"], "live");
    assert!(public.get("liveSessionId").is_none());
    assert!(public["streamConfig"].get("sessionId").is_none());

    let status: PodcastStatus = reqwest::get(server.api(&api::path::podcast_status(&id)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(status.is_live);

    let res = reqwest::Client::new()
        .delete(server.api(&api::path::podcast(&id)))
        .bearer_auth(&host)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CONFLICT, res.status());

    let res = post(&server, &host, &api::path::podcast_end(&id)).await;
    assert_eq!(StatusCode::OK, res.status());
    let ended: Podcast = res.json().await.unwrap();
    assert_eq!(ended.status, api::podcast::Status::Ended);
    assert!(ended.duration_minutes.unwrap() >= 0);

    let res = post(&server, &host, &api::path::podcast_end(&id)).await;
    assert_eq!(StatusCode::CONFLICT, res.status());

    let page: Page<Podcast> = reqwest::get(server.api(api::path::PODCASTS))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    for path in [api::path::PODCASTS, api::path::PODCASTS_RECORDED] {
        let res = reqwest::get(server.api(&format!("{}?page={}&limit=2", path, u64::MAX)))
            .await
            .unwrap();
        assert_eq!(StatusCode::BAD_REQUEST, res.status());
    }

    let res = reqwest::Client::new()
        .delete(server.api(&api::path::podcast(&id)))
        .bearer_auth(&host)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let res = reqwest::get(server.api(&api::path::podcast(&id))).await.unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn test_relay_listeners_and_chunks() {
    let server = common::spawn().await;
    let host = common::token("host", Role::Admin);

    let podcast = create(&server, &host, json!({ "title": "Relay show" })).await;
    let id = podcast.id.clone();

    let (mut first, _) = connect_async(server.relay()).await.unwrap();
    let (mut second, _) = connect_async(server.relay()).await.unwrap();

    for (socket, user) in [(&mut first, "alice"), (&mut second, "bob")] {
        send(
            socket,
            Inbound::JoinSession(JoinSession {
                session_id: id.clone(),
                user_id: Some(user.to_string()),
            }),
        )
        .await;
        expect(socket, |event| match event {
            Outbound::JoinedSession(joined) => Some(joined),
            _ => None,
        })
        .await;
    }

    let started = post(&server, &host, &api::path::podcast_start(&id)).await;
    let started: Started = started.json().await.unwrap();
    let token = started.podcast.live_session_id.unwrap();

    // connected clients learn about the start
    let title = expect(&mut first, |event| match event {
        Outbound::SessionStarted(started) => Some(started.title),
        _ => None,
    })
    .await;
    assert_eq!(title, "Relay show");

    let counters = expect(&mut second, |event| match event {
        Outbound::ListenerUpdate(update) if update.counters.current_listeners == 2 => {
            Some(update.counters)
        }
        _ => None,
    })
    .await;
    assert_eq!(counters.peak_listeners, 2);

    send(
        &mut first,
        Inbound::BroadcastAudioChunk(api::event::AudioChunk {
            session_id: id.clone(),
            live_session_id: token.clone(),
            audio_chunk: STANDARD.encode(b"browser frame"),
            mime_type: Some("audio/webm".to_string()),
        }),
    )
    .await;
    let chunk = expect(&mut second, |event| match event {
        Outbound::AudioStream(stream) => Some(stream.audio_chunk),
        _ => None,
    })
    .await;
    assert_eq!(STANDARD.decode(chunk).unwrap(), b"browser frame");

    send(&mut first, Inbound::LeaveSession(LeaveSession { session_id: id.clone() })).await;
    let counters = expect(&mut second, |event| match event {
        Outbound::ListenerUpdate(update) if update.counters.current_listeners == 1 => {
            Some(update.counters)
        }
        _ => None,
    })
    .await;
    assert_eq!(counters.peak_listeners, 2);
    assert_eq!(counters.total_listeners, 2);

    send(
        &mut first,
        Inbound::JoinSession(JoinSession {
            session_id: "00000000-0000-4000-8000-000000000000".to_string(),
            user_id: None,
        }),
    )
    .await;
    let kind = expect(&mut first, |event| match event {
        Outbound::Error(error) => Some(error.kind),
        _ => None,
    })
    .await;
    assert_eq!(kind, "NotFound");

    let ended: Podcast = post(&server, &host, &api::path::podcast_end(&id))
        .await
        .json()
        .await
        .unwrap();
    let event = expect(&mut second, |event| match event {
        Outbound::SessionEnded(ended) => Some(ended),
        _ => None,
    })
    .await;
    assert_eq!(event.session_id, id);
    assert_eq!(event.recorded_url, ended.recorded_url);
    assert!(ended.recorded_url.unwrap().starts_with("/recordings/podcasts/"));

    drop(second);
    tokio::time::sleep(Duration::from_millis(300)).await;
    let status: PodcastStatus = reqwest::get(server.api(&api::path::podcast_status(&id)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status.counters.current_listeners, 0);
    assert_eq!(status.counters.peak_listeners, 2);
}

#[tokio::test]
async fn test_push_ingest_records_and_ends() {
    let server = common::spawn().await;
    let host = common::token("host", Role::Admin);

    let podcast = create(
        &server,
        &host,
        json!({ "title": "Encoder show", "audioFormat": "mp3" }),
    )
    .await;
    let id = podcast.id.clone();
    let started: Started = post(&server, &host, &api::path::podcast_start(&id))
        .await
        .json()
        .await
        .unwrap();
    let token = started.podcast.live_session_id.unwrap();

    let chunks: Vec<Result<Bytes, std::io::Error>> = (0u8..3)
        .map(|i| Ok(Bytes::from(vec![i; 1000])))
        .collect();
    let res = reqwest::Client::new()
        .put(server.push(&token))
        .header(http::header::CONTENT_TYPE, "audio/mpeg")
        .body(reqwest::Body::wrap_stream(futures_util::stream::iter(chunks)))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let podcast: Podcast = reqwest::get(server.api(&api::path::podcast(&id)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(podcast.status, api::podcast::Status::Ended);
    assert_eq!(podcast.audio_size_bytes, Some(3000));

    let file_name = podcast.recorded_file_name.unwrap();
    assert!(file_name.ends_with("_Encoder_show.mp3"));
    let stored = std::fs::read(server.recordings.path().join(&file_name)).unwrap();
    assert_eq!(stored.len(), 3000);
    assert_eq!(&stored[..1000], &[0u8; 1000][..]);
    assert_eq!(&stored[2000..], &[2u8; 1000][..]);

    let res = reqwest::get(server.api(&podcast.recorded_url.unwrap())).await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(res.bytes().await.unwrap().len(), 3000);

    let recorded: Page<Podcast> = reqwest::get(server.api(api::path::PODCASTS_RECORDED))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(recorded.total, 1);
}

#[tokio::test]
async fn test_push_ingest_idle_producer_ends_session() {
    let server = common::spawn().await;
    let host = common::token("host", Role::Admin);

    let podcast = create(
        &server,
        &host,
        json!({ "title": "Stalled encoder", "audioFormat": "mp3" }),
    )
    .await;
    let id = podcast.id.clone();
    let started: Started = post(&server, &host, &api::path::podcast_start(&id))
        .await
        .json()
        .await
        .unwrap();
    let token = started.podcast.live_session_id.unwrap();

    // One chunk, then the body stays open without data
    let body = futures_util::stream::iter(vec![Ok::<Bytes, std::io::Error>(Bytes::from(
        vec![7u8; 1000],
    ))])
    .chain(futures_util::stream::pending());
    let url = server.push(&token);
    let producer = tokio::spawn(async move {
        reqwest::Client::new()
            .put(url)
            .header(http::header::CONTENT_TYPE, "audio/mpeg")
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
    });

    let mut status = api::podcast::Status::Live;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let podcast: Podcast = reqwest::get(server.api(&api::path::podcast(&id)))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        status = podcast.status;
        if status == api::podcast::Status::Ended {
            assert_eq!(podcast.audio_size_bytes, Some(1000));
            assert!(podcast.recorded_url.is_some());
            break;
        }
    }
    assert_eq!(status, api::podcast::Status::Ended);
    producer.abort();

    let res = reqwest::Client::new()
        .put(server.push(&token))
        .body(vec![1u8; 10])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
}

#[tokio::test]
async fn test_push_ingest_rejects_unknown_credential() {
    let server = common::spawn().await;
    let host = common::token("host", Role::Admin);

    let podcast = create(&server, &host, json!({ "title": "Guarded show" })).await;
    let id = podcast.id.clone();
    post(&server, &host, &api::path::podcast_start(&id)).await;

    let res = reqwest::Client::new()
        .put(server.push("not-a-session"))
        .header(http::header::CONTENT_TYPE, "audio/mpeg")
        .body(vec![1u8; 100])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
    assert!(res.bytes().await.unwrap().is_empty());

    let status: PodcastStatus = reqwest::get(server.api(&api::path::podcast_status(&id)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(status.is_live);
    assert_eq!(status.recording.unwrap().size_bytes, 0);

    let res = reqwest::Client::new()
        .get(server.push("not-a-session"))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::METHOD_NOT_ALLOWED, res.status());
}
