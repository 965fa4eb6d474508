//! Inbound CloudEvents HTTP server.
//!
//! Every POST on the configured path is read as a CloudEvent and handed to an
//! [`EnvelopeSink`]. The response only tells the sender whether processing
//! succeeded:
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | processed | `204` | empty |
//! | unreadable event | `500` | `Error handling cloud event request` |
//! | processing failed | `500` | `Error processing cloud event request` |

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tokio::net::TcpListener;
use tracing::{error, info, trace};

use ktwin_core::{BoxedEnvelopeSink, KtwinError};

use super::cloudevents;

/// Response body for events that cannot be read.
pub const HANDLING_ERROR: &str = "Error handling cloud event request";

/// Response body for events whose processing failed.
pub const PROCESSING_ERROR: &str = "Error processing cloud event request";

/// Builds the router serving `path`.
pub fn router(path: &str, sink: BoxedEnvelopeSink) -> Router {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    Router::new()
        .route(&path, post(receive))
        .with_state(sink)
}

/// A bound, not yet running, CloudEvents server.
#[derive(Debug)]
pub struct CloudEventServer {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl CloudEventServer {
    /// Binds `addr` and routes POSTs on `path` to `sink`.
    pub async fn bind(addr: &str, path: &str, sink: BoxedEnvelopeSink) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            router: router(path, sink),
            local_addr,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves requests until `shutdown` completes.
    pub async fn serve<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %self.local_addr, "CloudEvent server listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("CloudEvent server stopped");
        Ok(())
    }
}

async fn receive(
    State(sink): State<BoxedEnvelopeSink>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    trace!(len = body.len(), "Received CloudEvent request");

    let msg = match cloudevents::from_http(&headers, &body) {
        Ok(msg) => msg,
        Err(e) => {
            error!(error = %e, "{HANDLING_ERROR}");
            return (StatusCode::INTERNAL_SERVER_ERROR, HANDLING_ERROR).into_response();
        }
    };

    match sink.on_wire(msg).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e @ KtwinError::MalformedEnvelope { .. }) => {
            error!(error = %e, "{HANDLING_ERROR}");
            (StatusCode::INTERNAL_SERVER_ERROR, HANDLING_ERROR).into_response()
        }
        Err(e) => {
            error!(error = %e, "{PROCESSING_ERROR}");
            (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_ERROR).into_response()
        }
    }
}
