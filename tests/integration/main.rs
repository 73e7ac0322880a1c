//! RIPT integration test harness.
//!
//! Every test starts its own gateway (HTTP server plus loopback router) on an
//! ephemeral localhost port and drives it with the real client driver or with
//! raw HTTP requests. Gateways shut down when their handle is dropped.

mod discovery;
mod media;
mod register;
mod session;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use ript_client::ClientFace;
use ript_core::config::{ClientConfig, GatewayConfig};
use ript_core::wire::PEER_HEADER;
use ript_core::{Face, PacketEvent};
use ript_net::{GatewayState, LoopbackRouter, SessionDirectory};

// ── Harness ───────────────────────────────────────────────────────────────────

pub struct TestGateway {
    pub addr: SocketAddr,
    pub directory: SessionDirectory,
    pub config: GatewayConfig,
    shutdown: broadcast::Sender<()>,
}

impl TestGateway {
    pub async fn start() -> Self {
        Self::start_with(GatewayConfig::default()).await
    }

    /// A gateway whose correlated requests give up after `ms` milliseconds.
    pub async fn with_timeout(ms: u64) -> Self {
        Self::start_with(GatewayConfig {
            correlation_timeout_ms: ms,
            ..Default::default()
        })
        .await
    }

    pub async fn start_with(config: GatewayConfig) -> Self {
        let (state, feed) = GatewayState::from_config(&config);
        let directory = state.directory.clone();
        let (shutdown, _) = broadcast::channel(1);

        tokio::spawn(LoopbackRouter::new(&config, feed, shutdown.subscribe()).run());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let app = ript_net::router(state, &config.base_path);
        let mut stop = shutdown.subscribe();
        tokio::spawn(ript_net::serve(listener, app, async move {
            let _ = stop.recv().await;
        }));

        Self {
            addr,
            directory,
            config,
            shutdown,
        }
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin(), path)
    }

    /// URL under the gateway's base path.
    pub fn ript_url(&self, path: &str) -> String {
        format!("{}{}{}", self.origin(), self.config.base_path, path)
    }

    pub fn client_config(&self, peer_name: &str) -> ClientConfig {
        ClientConfig {
            gateway_origin: self.origin(),
            peer_name: peer_name.to_string(),
            ..Default::default()
        }
    }

    /// Join with the real client and bind an intake queue to it.
    pub async fn connect(&self, peer_name: &str) -> (ClientFace, mpsc::Receiver<PacketEvent>) {
        self.connect_with(self.client_config(peer_name)).await
    }

    pub async fn connect_with(
        &self,
        config: ClientConfig,
    ) -> (ClientFace, mpsc::Receiver<PacketEvent>) {
        let face = ClientFace::connect(&config).await.expect("join gateway");
        let (tx, rx) = mpsc::channel(8);
        face.set_receive_chan(tx).expect("bind intake");
        (face, rx)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// A plain HTTP client that identifies itself as `peer`.
pub fn raw_client(peer: &str) -> reqwest::Client {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        PEER_HEADER,
        reqwest::header::HeaderValue::from_str(peer).expect("valid peer name"),
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .expect("build http client")
}
