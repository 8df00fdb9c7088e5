//! HTTP server and graceful shutdown.
//!
//! # Draining
//!
//! A drain starts when the [`Shutdown`](crate::Shutdown) handle owned by the
//! [`App`] is triggered: by SIGTERM or Ctrl-C, or by the dispatcher after a
//! request ended in an integrity error. The server then:
//!
//! 1. Stops calling `listener.accept()` and closes the listener.
//! 2. Tells every open connection to finish its in-flight request and close.
//! 3. Waits at most the grace period, then aborts whatever is left.
//! 4. Returns the [`ShutdownReason`] from [`Server::serve`] so `main` can
//!    choose its exit status.
//!
//! Keep the grace period shorter than the orchestrator's kill timeout
//! (`terminationGracePeriodSeconds` on Kubernetes, 30 s by default).

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::router::App;
use crate::shutdown::{Shutdown, ShutdownReason};
use crate::status::Status;

const DEFAULT_GRACE: Duration = Duration::from_secs(20);

/// The HTTP server.
pub struct Server {
    listener: TcpListener,
    addr: SocketAddr,
    grace: Duration,
}

impl Server {
    /// Binds to `addr`. Use port `0` to let the OS pick one; [`local_addr`]
    /// reports the result.
    ///
    /// [`local_addr`]: Server::local_addr
    pub async fn bind(addr: &str) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr, grace: DEFAULT_GRACE })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// How long in-flight requests may run once a drain starts.
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Accepts connections and dispatches their requests through `app` until
    /// a shutdown is requested, then drains.
    pub async fn serve(self, app: App) -> Result<ShutdownReason, Error> {
        let Self { listener, addr, grace } = self;
        let app = Arc::new(app);
        let shutdown = app.shutdown().clone();
        let signals = tokio::spawn(watch_signals(shutdown.clone()));

        let builder = ConnBuilder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();
        let mut tasks = JoinSet::new();

        info!(%addr, "listening");

        let reason = loop {
            tokio::select! {
                // Checked first so a drain stops accepting even when more
                // connections are queued.
                biased;

                reason = shutdown.requested() => {
                    info!(?reason, in_flight = tasks.len(), "shutdown requested, draining connections");
                    break reason;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let svc = service_fn({
                        let app = Arc::clone(&app);
                        move |req| {
                            let app = Arc::clone(&app);
                            async move { Ok::<_, Infallible>(handle(&app, req).await) }
                        }
                    });
                    let conn = graceful.watch(builder.serve_connection(TokioIo::new(stream), svc).into_owned());

                    tasks.spawn(async move {
                        if let Err(e) = conn.await {
                            debug!(%peer, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        };

        drop(listener);
        signals.abort();

        if tokio::time::timeout(grace, graceful.shutdown()).await.is_err() {
            warn!(grace_secs = grace.as_secs_f64(), "grace period elapsed, aborting remaining connections");
        }
        tasks.shutdown().await;

        info!("server stopped");
        Ok(reason)
    }
}

/// Collects the body and hands the request to the app.
async fn handle(app: &App, req: hyper::Request<Incoming>) -> http::Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!("reading request body: {e}");
            return Error::request(Status::BadRequest, "unable to read request body")
                .to_response()
                .into_inner();
        }
    };
    app.dispatch(http::Request::from_parts(parts, body)).await.into_inner()
}

/// Requests a drain on the first SIGTERM or Ctrl-C.
///
/// A handler that cannot be installed is logged and treated as never firing;
/// the process can still be drained through the [`Shutdown`] handle.
async fn watch_signals(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("installing Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("installing SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
    shutdown.request(ShutdownReason::Signal);
}
