// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;
use timeship_rest_server::{Server, ServerConfig};
use tokio::task::JoinHandle;

/// Spawn a server over `root` on an ephemeral port and wait until it
/// answers health checks.
pub async fn spawn_server(root: &Path) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind to ephemeral port");
    let addr = listener.local_addr().expect("port");
    drop(listener);

    let config = ServerConfig {
        root: root.to_path_buf(),
        bind_addr: addr,
        ..Default::default()
    };

    let server = Server::new(config).expect("server");
    let base = format!("http://{}", addr);

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });

    wait_for_health(&base).await;

    (base, handle)
}

async fn wait_for_health(base_url: &str) {
    let client = reqwest::Client::new();
    let healthz = format!("{}/api/healthz", base_url);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(response) = client.get(&healthz).send().await {
            if response.status().is_success() {
                return;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("server did not become healthy at {}", healthz);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
