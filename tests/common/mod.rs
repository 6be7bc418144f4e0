//! Shared utilities for integration testing.

use std::net::SocketAddr;

use healthlog_service::config::ServiceConfig;
use healthlog_service::lifecycle::{Application, Shutdown};
use reqwest::RequestBuilder;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

pub const TOKEN: &str = "integration-token";

/// A running service on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl TestServer {
    /// Boot the real service with an in-memory database.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(customize: impl FnOnce(&mut ServiceConfig)) -> Self {
        let mut config = ServiceConfig::default();
        config.listener.host = "127.0.0.1".into();
        config.listener.port = 0;
        config.api.token = TOKEN.into();
        config.storage.database_url = "sqlite::memory:".into();
        customize(&mut config);

        let app = Application::build(&config).await.unwrap();
        let addr = app.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        let handle = tokio::spawn(async move {
            app.run(receiver).await.unwrap();
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(TOKEN)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(TOKEN)
    }

    /// Upload `logs` and assert the write was acknowledged.
    pub async fn upload(&self, logs: Vec<Value>) {
        let res = self
            .post("/logs")
            .json(&json!({ "logs": logs }))
            .send()
            .await
            .unwrap();
        let status = res.status();
        if status != 201 {
            panic!("upload failed with {status}: {}", res.text().await.unwrap_or_default());
        }
    }

    pub async fn count(&self) -> u64 {
        let body: Value = self
            .get("/logs")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["count"].as_u64().unwrap()
    }

    /// Trigger graceful shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap();
    }
}

/// A valid log entry.
#[allow(dead_code)]
pub fn entry(severity: &str, source: &str, patient_id: &str) -> Value {
    json!({
        "timestamp": "2025-05-20T18:12:00Z",
        "source": source,
        "severity": severity,
        "message": "Heartbeat within normal range",
        "patient_id": patient_id,
    })
}
