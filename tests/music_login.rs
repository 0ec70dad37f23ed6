//! End-to-end Spotify login: authorization URL, redirect back with a code,
//! token exchange, first poll, and session loss on a 401.
//!
//! Uses the SQLite session store so the flow exercises the same storage the
//! binary uses.

use homedeck::capability::Capabilities;
use homedeck::http::ReqwestHttp;
use homedeck::music::{
    MusicSession, SessionConfig, SessionState, ACCESS_TOKEN_KEY, CODE_VERIFIER_KEY,
    TOKEN_EXPIRY_KEY,
};
use homedeck::storage::{KeyValueStore, SqliteStore};
use homedeck::widget::{PlayerView, PlayerWidget, Widget};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

async fn session_for(server: &MockServer) -> (Arc<MusicSession>, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open(":memory:").await.unwrap());
    let caps = Capabilities::new(store.clone(), Arc::new(ReqwestHttp::new().unwrap()));
    let config = SessionConfig {
        client_id: Some("client-abc".to_string()),
        redirect_uri: REDIRECT_URI.to_string(),
        authorize_url: format!("{}/authorize", server.uri()),
        token_url: format!("{}/api/token", server.uri()),
        api_base: format!("{}/v1", server.uri()),
        allow_implicit_grant: false,
    };
    (Arc::new(MusicSession::new(config, caps)), store)
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("code=the-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "token_type": "Bearer",
            "scope": "user-read-currently-playing",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_now_playing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/me/player/currently-playing"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "is_playing": true,
            "progress_ms": 42_000,
            "item": {
                "name": "Teardrop",
                "uri": "spotify:track:teardrop",
                "duration_ms": 330_000,
                "artists": [{"name": "Massive Attack"}],
                "album": {"name": "Mezzanine", "images": [{"url": "https://i.scdn.co/image/1"}]}
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_round_trip_through_player_widget() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_now_playing(&server).await;

    let (session, store) = session_for(&server).await;
    assert_eq!(session.state().await, SessionState::Unauthenticated);

    // First run: the user presses login
    let (tx, _rx) = mpsc::channel(8);
    let mut player = PlayerWidget::new(session.clone(), None);
    player.on_attach(tx).await;
    assert_eq!(player.view(), &PlayerView::LoggedOut);

    let authorize = player.login().await.unwrap();
    assert!(authorize.as_str().starts_with(&format!("{}/authorize?", server.uri())));
    assert!(store.get(CODE_VERIFIER_KEY).await.unwrap().is_some());
    assert_eq!(session.state().await, SessionState::Authenticating);
    player.on_detach();

    // Second run: the host hands over the redirected URL
    let callback = Url::parse(&format!("{}?code=the-code", REDIRECT_URI)).unwrap();
    let (tx, _rx) = mpsc::channel(8);
    let mut player = PlayerWidget::new(session.clone(), Some(callback));
    player.on_attach(tx).await;

    let PlayerView::NowPlaying(snapshot) = player.view() else {
        panic!("expected now playing, got {:?}", player.view());
    };
    assert_eq!(snapshot.track.name, "Teardrop");
    assert_eq!(snapshot.track.artists, "Massive Attack");
    assert_eq!(snapshot.track.album_art_url.as_deref(), Some("https://i.scdn.co/image/1"));
    assert!(player.is_polling());

    assert_eq!(session.state().await, SessionState::Authenticated);
    assert_eq!(store.get(CODE_VERIFIER_KEY).await.unwrap(), None);
    assert_eq!(
        store.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(),
        Some("access-1")
    );

    player.on_detach();
    assert!(!player.is_polling());
}

#[tokio::test]
async fn test_rejected_token_clears_both_slots() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/play"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (session, store) = session_for(&server).await;
    store.set(ACCESS_TOKEN_KEY, "stale").await.unwrap();
    let expiry = chrono::Utc::now().timestamp_millis() + 600_000;
    store.set(TOKEN_EXPIRY_KEY, &expiry.to_string()).await.unwrap();
    assert!(session.is_authenticated().await);

    let err = session.play().await.unwrap_err();
    assert!(err.requires_login());
    assert_eq!(err.to_string(), "Authentication error: token expired");
    assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap(), None);
    assert_eq!(store.get(TOKEN_EXPIRY_KEY).await.unwrap(), None);
    assert_eq!(session.state().await, SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_denied_authorization_leaves_player_logged_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (session, store) = session_for(&server).await;
    session.begin_authorization().await.unwrap();

    let callback = Url::parse(&format!("{}?error=access_denied", REDIRECT_URI)).unwrap();
    let (tx, _rx) = mpsc::channel(8);
    let mut player = PlayerWidget::new(session.clone(), Some(callback));
    player.on_attach(tx).await;

    assert_eq!(player.view(), &PlayerView::LoggedOut);
    assert_eq!(store.get(CODE_VERIFIER_KEY).await.unwrap(), None);
}
