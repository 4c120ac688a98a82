//! Native one-shot HTTP/1.1 server
//!
//! Each accepted connection carries exactly one request: it is read
//! through a [`RequestReader`], handed to the [`Handler`], answered, and
//! closed. A request that fails to parse gets a best-effort 400.

use crate::reassembly::RequestReader;
use crate::response::Handler;
use crate::{Error, Response, Result, ServerConfig};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Create a listening socket bound to `addr`
pub fn create_listener(addr: &SocketAddr) -> std::io::Result<std::net::TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket.into())
}

/// Tracks active connections for graceful shutdown
#[derive(Debug)]
pub struct ConnectionTracker {
    active: AtomicU64,
    shutting_down: AtomicBool,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            active: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn increment(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    #[inline]
    pub fn decrement(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Connections accepted and not yet closed
    #[inline]
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Signal that shutdown is in progress
    pub fn start_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

/// State shared by the accept loop and every connection task
struct Shared {
    handler: Arc<dyn Handler>,
    tracker: Arc<ConnectionTracker>,
    read_buffer_size: usize,
}

/// A running server. Dropping it stops the accept loop.
pub struct Server {
    local_addr: SocketAddr,
    tracker: Arc<ConnectionTracker>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    accept_task: Option<JoinHandle<()>>,
}

impl Server {
    /// Bind the listener and start accepting on the current runtime
    pub async fn bind<H: Handler>(config: ServerConfig, handler: H) -> Result<Self> {
        config.validate()?;
        let addr = config.socket_addr()?;
        let bind_err = |source: std::io::Error| Error::Bind {
            addr: config.addr(),
            source,
        };

        let listener = create_listener(&addr).map_err(bind_err)?;
        let listener = TcpListener::from_std(listener).map_err(bind_err)?;
        let local_addr = listener.local_addr()?;

        let tracker = Arc::new(ConnectionTracker::new());
        let shared = Arc::new(Shared {
            handler: Arc::new(handler),
            tracker: tracker.clone(),
            read_buffer_size: config.read_buffer_size,
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let accept_task = tokio::spawn(accept_loop(listener, shared, shutdown_rx));

        info!(addr = %local_addr, "listening");
        Ok(Self {
            local_addr,
            tracker,
            shutdown_tx: Some(shutdown_tx),
            accept_task: Some(accept_task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn active_connections(&self) -> u64 {
        self.tracker.count()
    }

    /// Stop accepting and close the listener. Connections already
    /// accepted run to completion on their own.
    pub async fn close(mut self) -> Result<()> {
        self.tracker.start_shutdown();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.accept_task.take() {
            task.await.map_err(|e| Error::Io(std::io::Error::other(e)))?;
        }
        info!(addr = %self.local_addr, active = self.tracker.count(), "listener closed");
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            self.tracker.start_shutdown();
            let _ = tx.send(());
        }
    }
}

/// Pause after an accept error that will not clear by itself
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// `None` for per-connection failures that the next accept can skip.
/// Anything else (EMFILE, ENOBUFS) persists until resources free up.
fn accept_backoff(e: &io::Error) -> Option<Duration> {
    match e.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        if let Some(delay) = accept_backoff(&e) {
                            warn!(error = %e, ?delay, "accept failed, backing off");
                            tokio::select! {
                                _ = &mut shutdown_rx => break,
                                _ = tokio::time::sleep(delay) => {}
                            }
                        } else {
                            debug!(error = %e, "accept failed");
                        }
                        continue;
                    }
                };

                // Reject new connections during shutdown
                if shared.tracker.is_shutting_down() {
                    drop(stream);
                    break;
                }

                let shared = shared.clone();
                shared.tracker.increment();
                tokio::spawn(async move {
                    debug!(%peer, "connection accepted");
                    if let Err(e) = handle_connection(stream, peer, &shared).await {
                        debug!(%peer, error = %e, "connection error");
                    }
                    shared.tracker.decrement();
                });
            }
        }
    }
    debug!("accept loop stopped");
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, shared: &Shared) -> Result<()> {
    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    stream.set_nodelay(true)?;

    let reader = RequestReader::with_buffer_size(shared.read_buffer_size);
    let response = match reader.read_from_async(&mut stream).await {
        Ok(request) => {
            debug!(
                %peer,
                method = %request.method(),
                path = request.target(),
                body_len = request.body().len(),
                "request"
            );
            Response::from_handler(shared.handler.as_ref(), &request)
        }
        Err(Error::Parse(e)) => {
            warn!(%peer, error = %e, kind = ?e.kind(), "bad request");
            Response::bad_request()
        }
        Err(e) => return Err(e),
    };

    stream.write_all(&response.to_http1_bytes()).await?;
    stream.shutdown().await?;
    debug!(%peer, status = response.status.as_u16(), "response sent");
    Ok(())
}
