//! HTTP/1 server loop.
//!
//! Each accepted connection is served on its own task. Handlers only share
//! the read-only [`AppState`].

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::handler::{AppState, HttpResponse, route};

/// Pause after a failed accept. Errors such as `EMFILE` repeat immediately
/// until connections close, so retrying without a pause would spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Source of inbound connections.
trait Acceptor {
    fn next_connection(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    fn next_connection(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        self.accept()
    }
}

/// Accept connections on `listener` until `shutdown` resolves.
///
/// A failed accept is logged and retried; only `shutdown` ends the loop.
/// Connections already being served are left to finish on their own tasks.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) -> io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "listening");

    accept_loop(listener, state, shutdown).await;
    Ok(())
}

async fn accept_loop<A: Acceptor>(
    acceptor: A,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);

    loop {
        let accepted = tokio::select! {
            accepted = acceptor.next_connection() => accepted,
            () = &mut shutdown => {
                info!("shutting down");
                return;
            }
        };

        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                tokio::select! {
                    () = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
                    () = &mut shutdown => {
                        info!("shutting down");
                        return;
                    }
                }
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!(%peer, error = %e, "connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<HttpResponse, hyper::Error> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = route(&state, &method, &path, req.uri().query()).await;

    info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "handled request"
    );

    Ok(response)
}
