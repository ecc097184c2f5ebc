use std::net::TcpListener;
use std::sync::Arc;

use enroll_auth::auth::ManualClock;
use enroll_auth::configuration::AuthSettings;
use enroll_auth::startup::{run, Services};
use enroll_auth::store::{InMemoryAccountStore, InMemorySessionStore};
use reqwest::header::SET_COOKIE;
use reqwest::Response;
use serde_json::{json, Value};

pub struct TestApp {
    pub address: String,
    pub clock: Arc<ManualClock>,
    pub sessions: Arc<InMemorySessionStore>,
    pub client: reqwest::Client,
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let settings = AuthSettings {
        access_secret: "integration-access-secret".to_string(),
        refresh_secret: "integration-refresh-secret".to_string(),
        access_token_ttl: "15m".to_string(),
        refresh_token_ttl: "7d".to_string(),
        secure_cookies: false,
    };
    let clock = Arc::new(ManualClock::new(chrono::Utc::now().timestamp()));
    let sessions = Arc::new(InMemorySessionStore::new());
    let services = Services::new(
        settings,
        clock.clone(),
        sessions.clone(),
        Arc::new(InMemoryAccountStore::new()),
    );

    let server = run(listener, services).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        clock,
        sessions,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    async fn post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn signup(&self, email: &str, password: &str) -> Response {
        self.post("/auth/signup", &json!({"email": email, "password": password}))
            .await
    }

    async fn refresh_with_cookie(&self, refresh_token: &str) -> Response {
        self.client
            .post(&format!("{}/auth/refresh", self.address))
            .header("Cookie", format!("refreshToken={}", refresh_token))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

fn cookie_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

async fn tokens(response: Response) -> (String, String) {
    let body: Value = response.json().await.expect("Failed to parse response");
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

// --- Sign-up Tests ---

#[tokio::test]
async fn signup_returns_201_and_sets_token_cookies() {
    let app = spawn_app();

    let response = app.signup("student@example.com", "Secret123").await;

    assert_eq!(201, response.status().as_u16());
    let access_cookie = cookie_value(&response, "accessToken").expect("missing access cookie");
    let refresh_cookie = cookie_value(&response, "refreshToken").expect("missing refresh cookie");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["access_token"], json!(access_cookie));
    assert_eq!(body["refresh_token"], json!(refresh_cookie));
    assert_eq!(body["token_type"], json!("Bearer"));
    assert_eq!(body["expires_in"], json!(900));
    assert!(body["account_id"].is_string());
    assert_eq!(app.sessions.len(), 1);
}

#[tokio::test]
async fn signup_returns_409_for_duplicate_email() {
    let app = spawn_app();
    app.signup("student@example.com", "Secret123").await;

    let response = app.signup("student@example.com", "Another456").await;

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], json!("That email is already in use"));
}

#[tokio::test]
async fn signup_returns_400_for_invalid_input() {
    let app = spawn_app();

    for (email, password) in [
        ("notanemail", "Secret123"),
        ("user@", "Secret123"),
        ("@example.com", "Secret123"),
        ("student@example.com", ""),
    ] {
        let response = app.signup(email, password).await;
        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject email {:?} / password {:?}",
            email,
            password
        );
    }
}

#[tokio::test]
async fn signup_accepts_emails_containing_sql_keywords() {
    let app = spawn_app();

    for email in ["broadcast@example.com", "ann.castillo@example.com"] {
        let response = app.signup(email, "Secret123").await;
        assert_eq!(201, response.status().as_u16(), "Should accept {}", email);
    }
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_and_supersedes_previous_session() {
    let app = spawn_app();
    let (_, first_refresh) = tokens(app.signup("student@example.com", "Secret123").await).await;

    let response = app
        .post(
            "/auth/login",
            &json!({"email": "student@example.com", "password": "Secret123"}),
        )
        .await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(app.sessions.len(), 1);

    let stale = app.refresh_with_cookie(&first_refresh).await;
    assert_eq!(401, stale.status().as_u16());
}

#[tokio::test]
async fn login_returns_401_for_bad_credentials() {
    let app = spawn_app();
    app.signup("student@example.com", "Secret123").await;

    for body in [
        json!({"email": "student@example.com", "password": "Wrong123"}),
        json!({"email": "nobody@example.com", "password": "Secret123"}),
    ] {
        let response = app.post("/auth/login", &body).await;
        assert_eq!(401, response.status().as_u16());
    }
}

// --- Refresh Tests ---

#[tokio::test]
async fn refresh_rotates_the_refresh_token() {
    let app = spawn_app();
    let (_, refresh_a) = tokens(app.signup("student@example.com", "Secret123").await).await;

    let response = app.refresh_with_cookie(&refresh_a).await;
    assert_eq!(200, response.status().as_u16());
    let refresh_b = cookie_value(&response, "refreshToken").expect("missing refresh cookie");
    assert_ne!(refresh_a, refresh_b);

    // the old token is unexpired but superseded
    let replay = app.refresh_with_cookie(&refresh_a).await;
    assert_eq!(401, replay.status().as_u16());
    let body: Value = replay.json().await.unwrap();
    assert_eq!(body["message"], json!("Refresh token is not valid"));

    let response = app.refresh_with_cookie(&refresh_b).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_accepts_token_in_body() {
    let app = spawn_app();
    let (_, refresh_token) = tokens(app.signup("student@example.com", "Secret123").await).await;

    let response = app
        .post("/auth/refresh", &json!({"refresh_token": refresh_token}))
        .await;

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_returns_401_without_token() {
    let app = spawn_app();

    let response = app.post("/auth/refresh", &json!({})).await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_returns_401_for_expired_token() {
    let app = spawn_app();
    let (_, refresh_token) = tokens(app.signup("student@example.com", "Secret123").await).await;

    app.clock.advance(7 * 86_400 + 1);

    let response = app.refresh_with_cookie(&refresh_token).await;
    assert_eq!(401, response.status().as_u16());
}

// --- Protected Route Tests ---

#[tokio::test]
async fn me_returns_account_for_valid_access_token() {
    let app = spawn_app();
    let response = app.signup("student@example.com", "Secret123").await;
    let body: Value = response.json().await.unwrap();
    let access_token = body["access_token"].as_str().unwrap();

    let response = app
        .client
        .get(&format!("{}/api/me", app.address))
        .bearer_auth(access_token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let me: Value = response.json().await.unwrap();
    assert_eq!(me["email"], json!("student@example.com"));
    assert_eq!(me["id"], body["account_id"]);
}

#[tokio::test]
async fn me_accepts_access_cookie() {
    let app = spawn_app();
    let (access_token, _) = tokens(app.signup("student@example.com", "Secret123").await).await;

    let response = app
        .client
        .get(&format!("{}/api/me", app.address))
        .header("Cookie", format!("accessToken={}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn me_returns_401_without_credentials() {
    let app = spawn_app();

    let response = app
        .client
        .get(&format!("{}/api/me", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn me_returns_401_for_expired_access_token() {
    let app = spawn_app();
    let (access_token, _) = tokens(app.signup("student@example.com", "Secret123").await).await;

    app.clock.advance(15 * 60 + 1);

    let response = app
        .client
        .get(&format!("{}/api/me", app.address))
        .bearer_auth(access_token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn me_renews_session_from_refresh_cookie() {
    let app = spawn_app();
    let (_, refresh_token) = tokens(app.signup("student@example.com", "Secret123").await).await;

    let response = app
        .client
        .get(&format!("{}/api/me", app.address))
        .header("Cookie", format!("refreshToken={}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let rotated = cookie_value(&response, "refreshToken").expect("missing rotated cookie");
    assert!(cookie_value(&response, "accessToken").is_some());
    assert_ne!(rotated, refresh_token);

    let replay = app.refresh_with_cookie(&refresh_token).await;
    assert_eq!(401, replay.status().as_u16());
}

// --- Session Status Tests ---

impl TestApp {
    async fn status(&self, cookie: Option<String>) -> Value {
        let mut request = self.client.get(&format!("{}/auth/status", self.address));
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }
        let response = request.send().await.expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
        assert!(cookie_value(&response, "refreshToken").is_none());
        response.json().await.unwrap()
    }
}

#[tokio::test]
async fn status_is_anonymous_without_credentials() {
    let app = spawn_app();

    let status = app.status(None).await;

    assert_eq!(status["authenticated"], json!(false));
    assert_eq!(status["email"], Value::Null);
}

#[tokio::test]
async fn status_identifies_caller_from_access_cookie() {
    let app = spawn_app();
    let (access_token, _) = tokens(app.signup("student@example.com", "Secret123").await).await;

    let status = app.status(Some(format!("accessToken={}", access_token))).await;

    assert_eq!(status["authenticated"], json!(true));
    assert_eq!(status["email"], json!("student@example.com"));
}

#[tokio::test]
async fn status_falls_back_to_refresh_cookie_without_rotating() {
    let app = spawn_app();
    let (_, refresh_token) = tokens(app.signup("student@example.com", "Secret123").await).await;

    let status = app
        .status(Some(format!(
            "accessToken=garbage; refreshToken={}",
            refresh_token
        )))
        .await;

    assert_eq!(status["authenticated"], json!(true));
    assert_eq!(status["email"], json!("student@example.com"));

    // the refresh token was only checked, so it still renews
    let response = app.refresh_with_cookie(&refresh_token).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn status_ignores_invalid_tokens() {
    let app = spawn_app();

    let status = app
        .status(Some("accessToken=garbage; refreshToken=garbage".to_string()))
        .await;

    assert_eq!(status["authenticated"], json!(false));
}

// --- Logout Tests ---

#[tokio::test]
async fn logout_is_idempotent() {
    let app = spawn_app();
    let (_, refresh_token) = tokens(app.signup("student@example.com", "Secret123").await).await;
    let body = json!({"refresh_token": refresh_token});

    let first = app.post("/auth/logout", &body).await;
    assert_eq!(200, first.status().as_u16());
    assert_eq!(cookie_value(&first, "refreshToken"), Some(String::new()));
    let first: Value = first.json().await.unwrap();
    assert_eq!(first["logged_out"], json!(true));

    let second: Value = app.post("/auth/logout", &body).await.json().await.unwrap();
    assert_eq!(second["logged_out"], json!(false));

    assert!(app.sessions.is_empty());
    let response = app.refresh_with_cookie(&refresh_token).await;
    assert_eq!(401, response.status().as_u16());
}
