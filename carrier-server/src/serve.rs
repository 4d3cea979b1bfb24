//! HTTP serving loop with cooperative shutdown.
//!
//! Shutdown is two-phase: signalling stops the accept loop and asks every
//! open connection to finish its in-flight request; completion is reported
//! only after the last connection has closed.

use crate::config::ServeConfig;
use crate::error::ServerError;
use crate::operator::{Reply, RequestContext};
use crate::route::RouteTable;
use crate::router::{compile, Dispatcher};
use bytes::Bytes;
use carrier_protocol::{ErrorCode, Metadata, StatusError};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};

/// Bound HTTP server holding a compiled dispatch table.
pub struct HttpServer {
    config: ServeConfig,
    dispatcher: Arc<Dispatcher>,
    listener: TcpListener,
    shutdown: broadcast::Sender<()>,
    drained_tx: watch::Sender<bool>,
    drained_rx: watch::Receiver<bool>,
}

impl HttpServer {
    /// Compiles the route table and binds the listening socket.
    ///
    /// Compilation runs first so structural route errors surface before
    /// the port is taken.
    pub async fn bind(config: ServeConfig, table: RouteTable) -> Result<Self, ServerError> {
        let dispatcher = Arc::new(compile(table)?);
        let listener = TcpListener::bind(config.bind_addr()).await?;
        let (shutdown, _) = broadcast::channel(1);
        let (drained_tx, drained_rx) = watch::channel(false);
        Ok(Self {
            config,
            dispatcher,
            listener,
            shutdown,
            drained_tx,
            drained_rx,
        })
    }

    /// The bound address, useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Returns a handle that can signal and await shutdown.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            cancel: self.shutdown.clone(),
            drained: self.drained_rx.clone(),
        }
    }

    /// Runs the accept loop until shutdown is signalled, then drains.
    pub async fn run(self) -> Result<(), ServerError> {
        let HttpServer {
            config,
            dispatcher,
            listener,
            shutdown,
            drained_tx,
            ..
        } = self;

        let mut cancel = shutdown.subscribe();
        // Connection tasks hold clones of conn_tx; recv() returning None
        // after the accept loop drops its own clone means all are gone.
        let (conn_tx, mut conn_rx) = mpsc::channel::<()>(1);

        tracing::info!(
            "[{}] serving on http://{}",
            config.name,
            listener.local_addr()?
        );

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote)) => {
                            let dispatcher = dispatcher.clone();
                            let mut cancel = shutdown.subscribe();
                            let conn_guard = conn_tx.clone();
                            let with_cors = config.with_cors;
                            let read_timeout = config.read_timeout();
                            tokio::spawn(async move {
                                let _guard = conn_guard;
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let dispatcher = dispatcher.clone();
                                    async move { handle_request(req, dispatcher, with_cors).await }
                                });
                                let conn = http1::Builder::new()
                                    .timer(TokioTimer::new())
                                    .header_read_timeout(read_timeout)
                                    .serve_connection(io, service);
                                tokio::pin!(conn);
                                tokio::select! {
                                    result = conn.as_mut() => {
                                        if let Err(e) = result {
                                            tracing::debug!("connection error from {}: {}", remote, e);
                                        }
                                    }
                                    _ = cancel.recv() => {
                                        // Finish the in-flight exchange, then close.
                                        conn.as_mut().graceful_shutdown();
                                        let _ = conn.as_mut().await;
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {}", e);
                        }
                    }
                }
                _ = cancel.recv() => {
                    tracing::info!("[{}] shutdown signalled, draining connections", config.name);
                    break;
                }
            }
        }

        // Phase two: stop accepting, wait for every connection task to end.
        drop(listener);
        drop(conn_tx);
        let _ = conn_rx.recv().await;
        let _ = drained_tx.send(true);
        tracing::info!("[{}] drained", config.name);

        Ok(())
    }
}

/// Handle for signalling and awaiting server shutdown.
#[derive(Clone)]
pub struct ShutdownHandle {
    cancel: broadcast::Sender<()>,
    drained: watch::Receiver<bool>,
}

impl ShutdownHandle {
    /// Signals shutdown without waiting for the drain to finish.
    pub fn signal(&self) {
        let _ = self.cancel.send(());
    }

    /// Signals shutdown and waits until every connection has closed.
    pub async fn shutdown(mut self) {
        let _ = self.cancel.send(());
        while !*self.drained.borrow() {
            if self.drained.changed().await.is_err() {
                break;
            }
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    dispatcher: Arc<Dispatcher>,
    with_cors: bool,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let mut metadata = Metadata::new();
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            metadata.add(name.as_str(), value);
        }
    }

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let err = StatusError::new(ErrorCode::BadRequest, "failed to read request body")
                .with_desc(e.to_string());
            return Ok(finish(Reply::from_status_error(&err), with_cors));
        }
    };

    let cx = RequestContext {
        method: parts.method,
        path: parts.uri.path().to_string(),
        params: HashMap::new(),
        metadata,
        body,
    };

    let reply = dispatcher.dispatch(cx).await;
    Ok(finish(reply, with_cors))
}

fn finish(reply: Reply, with_cors: bool) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(reply.body));
    *response.status_mut() = reply.status;

    if let Some(content_type) = reply.content_type {
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    }

    if with_cors {
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, HEAD, PATCH, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("*"),
        );
    }

    response
}
