//! Integration tests for the enroll_auth server

use std::net::TcpListener;
use std::sync::Arc;

use enroll_auth::auth::SystemClock;
use enroll_auth::configuration::AuthSettings;
use enroll_auth::startup::{run, Services};
use enroll_auth::store::{InMemoryAccountStore, InMemorySessionStore};

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let services = Services::new(
        AuthSettings {
            access_secret: "health-access-secret".to_string(),
            refresh_secret: "health-refresh-secret".to_string(),
            access_token_ttl: "15m".to_string(),
            refresh_token_ttl: "7d".to_string(),
            secure_cookies: false,
        },
        Arc::new(SystemClock),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryAccountStore::new()),
    );
    let server = run(listener, services)
        .expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/Alice", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}
