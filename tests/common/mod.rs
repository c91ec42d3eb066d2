#![allow(dead_code)]

use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;

use simple_auth::auth::hash_password;
use simple_auth::configuration::{
    ApplicationSettings, CookieSettings, Environment, JwtSettings, Settings, StoreSettings,
};
use simple_auth::domain::{NewUser, Role, UserRecord};
use simple_auth::startup::run;
use simple_auth::store::{InMemoryUserStore, UserStore};

pub const PASSWORD: &str = "Secure#Pass1";
pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryUserStore>,
    pub settings: Settings,
}

pub fn test_settings(environment: Environment) -> Settings {
    Settings {
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment,
            log_level: "debug".to_string(),
        },
        jwt: JwtSettings {
            secret: JWT_SECRET.to_string(),
            access_token_expiry_minutes: 30,
            refresh_token_expiry_days: 30,
            issuer: "simple-auth-test".to_string(),
        },
        cookie: CookieSettings { secure: Some(false) },
        store: StoreSettings { timeout_ms: 5_000 },
        database: None,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_in(Environment::Test).await
}

pub async fn spawn_app_in(environment: Environment) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let settings = test_settings(environment);
    let store = Arc::new(InMemoryUserStore::new());
    let server = run(listener, store.clone(), &settings).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        settings,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Client that keeps cookies between requests.
    pub fn session_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build client")
    }

    pub async fn register(&self, client: &reqwest::Client, name: &str, email: &str) -> reqwest::Response {
        client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "name": name, "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login(&self, client: &reqwest::Client, email: &str, password: &str) -> reqwest::Response {
        client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Insert a user straight into the store, bypassing the API.
    pub async fn seed_user(&self, email: &str, role: Role) -> UserRecord {
        self.store
            .create(NewUser {
                name: "Seeded User".to_string(),
                email: email.to_string(),
                password_hash: hash_password(PASSWORD).expect("Failed to hash password"),
                role,
            })
            .await
            .expect("Failed to seed user")
    }

    /// Access token for a seeded user, obtained through login.
    pub async fn access_token_for(&self, email: &str, role: Role) -> String {
        self.seed_user(email, role).await;
        let body: Value = self
            .login(&reqwest::Client::new(), email, PASSWORD)
            .await
            .json()
            .await
            .expect("Failed to parse response");
        body["data"]["accessToken"]
            .as_str()
            .expect("No access token in response")
            .to_string()
    }
}

pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}
