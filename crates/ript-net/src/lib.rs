//! ript-net: the gateway side of RIPT.
//!
//! An HTTP front end that turns each joined peer into a [`ServerFace`],
//! forwards peer requests to a router as packet events, and correlates the
//! router's replies back onto the waiting requests.

pub mod correlate;
pub mod directory;
pub mod face;
pub mod handlers;
pub mod loopback;
pub mod mailbox;

use std::future::Future;
use std::net::SocketAddr;

use axum::routing::{any, get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use ript_core::config::GatewayConfig;

pub use directory::{FaceFeed, SessionDirectory};
pub use face::ServerFace;
pub use handlers::{GatewayState, PEER_HEADER, REASON_HEADER};
pub use loopback::LoopbackRouter;
pub use mailbox::{MailboxCapacity, MailboxKind};

impl GatewayState {
    /// Build the shared state and the new-face feed the router will drain.
    pub fn from_config(config: &GatewayConfig) -> (Self, FaceFeed) {
        let capacity = MailboxCapacity {
            control: config.control_mailbox_capacity,
            media: config.media_mailbox_capacity,
        };
        let (directory, feed) =
            SessionDirectory::new(config.feed_capacity, config.feed_wait(), capacity);
        let state = Self {
            directory,
            correlation_timeout: config.correlation_timeout(),
        };
        (state, feed)
    }
}

/// The gateway's routes. `base_path` prefixes every endpoint except join/leave.
pub fn router(state: GatewayState, base_path: &str) -> Router {
    let base = base_path.trim_end_matches('/');
    let providertgs = format!("{}/providertgs", base);

    Router::new()
        .route("/media/join", any(handlers::handle_join))
        .route("/media/leave", any(handlers::handle_leave))
        .route(&providertgs, get(handlers::handle_tg_discovery))
        .route(
            &format!("{}/{{trunkGroupId}}/handlers", providertgs),
            post(handlers::handle_handler_registration),
        )
        .route(
            &format!("{}/{{trunkGroupId}}/calls", providertgs),
            post(handlers::handle_calls),
        )
        .route(
            &format!("{}/{{trunkGroupId}}/calls/{{callId}}/media", providertgs),
            put(handlers::handle_media_push).get(handlers::handle_media_pull),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `app` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "RIPT gateway listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}
