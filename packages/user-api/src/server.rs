//! Hyper server setup and request handling.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming as IncomingBody};
use hyper::{Request, Response};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::router::Router;

/// HTTP server for the user records API.
pub struct Server {
    addr: SocketAddr,
    router: Arc<Router>,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to
    /// * `router` - Request router
    pub fn new(addr: SocketAddr, router: Router) -> Self {
        Self {
            addr,
            router: Arc::new(router),
        }
    }

    /// Binds and serves until `shutdown` resolves and open connections
    /// have finished.
    ///
    /// The router, and with it every store request sender, is dropped
    /// before this returns.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;
        serve_listener(listener, self.router, shutdown).await
    }
}

/// Accepts connections on `listener` until `shutdown` resolves.
///
/// The listener is closed first. Open connections are then told to finish
/// their in-flight request and close; any still open after
/// `shutdown_timeout_ms` are aborted. No connection task outlives this call.
pub async fn serve_listener<F>(
    listener: TcpListener,
    router: Arc<Router>,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()>,
{
    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    tokio::pin!(shutdown);

    let builder = ConnectionBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(_) = connections.join_next() => {}
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let router = Arc::clone(&router);
                let conn = builder.serve_connection(
                    TokioIo::new(stream),
                    hyper::service::service_fn(move |req| handle_request(req, router.clone())),
                );
                let conn = graceful.watch(conn.into_owned());
                connections.spawn(async move {
                    if let Err(err) = conn.await {
                        tracing::debug!("Error serving connection from {}: {}", peer, err);
                    }
                });
            }
        }
    }

    drop(listener);
    let open = connections.len();
    tracing::info!("Server stopped accepting connections, closing {} open", open);

    let grace = Duration::from_millis(router.state().config.shutdown_timeout_ms);
    tokio::select! {
        _ = graceful.shutdown() => tracing::debug!("All connections closed"),
        _ = tokio::time::sleep(grace) => {
            tracing::warn!(
                "Connections still open after {}ms, aborting {}",
                grace.as_millis(),
                connections.len()
            );
        }
    }
    connections.shutdown().await;
    Ok(())
}

/// Handles an incoming HTTP request.
async fn handle_request(
    req: Request<IncomingBody>,
    router: Arc<Router>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(router.handle(req).await.map(Full::new))
}
