//! TCP listener that serves one request per connection.
//!
//! The accept loop runs on a background thread over a non-blocking listener
//! so it can observe the shutdown flag between accepts. Each accepted
//! connection is handed to its own thread, decoded, dispatched, answered,
//! and closed.

use std::io::{self, BufReader};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use ferry_protocol::{
    MessageContext, OperationRequest, OperationResponse, ProtocolError, decode_message,
    encode_message,
};
use tracing::{debug, info, warn};

use crate::error::ServeError;
use crate::operations::OperationHandler;

/// Tracing target for worker server operations.
const SERVER_TARGET: &str = "ferry_worker::server";

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Default time a connection may stay silent before its request is abandoned.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Serves exactly one request on `stream`, then closes it.
///
/// A request that cannot be decoded is still answered, with a failure
/// response that describes the protocol error and carries an empty context.
/// A connection closed before any byte arrived is ignored. A read that times
/// out is answered like any other undecodable request.
///
/// # Errors
///
/// Returns [`ServeError::Respond`] if the response cannot be written.
pub fn serve_connection<H>(stream: TcpStream, handler: &H) -> Result<(), ServeError>
where
    H: OperationHandler + ?Sized,
{
    let response = match decode_message::<OperationRequest>(BufReader::new(&stream)) {
        Ok(request) => {
            debug!(
                target: SERVER_TARGET,
                connector = request.connector_name(),
                operation = request.operation_name(),
                message_id = request.message_context().message_id(),
                "handling operation request"
            );
            handler.handle(request)
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!(target: SERVER_TARGET, "peer closed connection without a request");
            return Ok(());
        }
        Err(error) => {
            warn!(target: SERVER_TARGET, %error, "could not decode operation request");
            OperationResponse::failure(
                MessageContext::default(),
                format!("invalid request: {error}"),
            )
        }
    };

    encode_message(&stream, &response).map_err(|source| ServeError::Respond { source })
}

/// Bound, not yet running, connector listener.
#[derive(Debug)]
pub struct ConnectorServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    read_timeout: Duration,
}

impl ConnectorServer {
    /// Binds `host:port`. Port 0 picks an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::Bind`] if the address is unavailable.
    pub fn bind(host: IpAddr, port: u16) -> Result<Self, ServeError> {
        let addr = SocketAddr::new(host, port);
        let bind_error = |source: io::Error| ServeError::Bind {
            addr,
            source: Arc::new(source),
        };
        let listener = TcpListener::bind(addr).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        Ok(Self {
            listener,
            local_addr,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// Bounds how long each connection may take to deliver its request.
    /// A zero duration disables the bound.
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Returns the bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts the background accept loop.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::Socket`] if the listener cannot be switched to
    /// non-blocking mode.
    pub fn start<H: OperationHandler>(self, handler: H) -> Result<ServerHandle, ServeError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ServeError::Socket {
                source: Arc::new(source),
            })?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handler: Arc<dyn OperationHandler> = Arc::new(handler);
        let local_addr = self.local_addr;
        let handle = thread::spawn(move || run_accept_loop(&self, &shutdown_flag, &handler));
        Ok(ServerHandle {
            local_addr,
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to a running accept loop.
///
/// Dropping the handle requests shutdown without waiting for it.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Returns the address the server is listening on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Asks the accept loop to stop. In-flight connections finish on their
    /// own threads.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::ThreadPanic`] if the loop panicked.
    pub fn join(mut self) -> Result<(), ServeError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ServeError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    server: &ConnectorServer,
    shutdown: &AtomicBool,
    handler: &Arc<dyn OperationHandler>,
) {
    info!(
        target: SERVER_TARGET,
        addr = %server.local_addr,
        "connector listening"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&server.listener, server.read_timeout) {
            Ok(Some(stream)) => {
                last_error = None;
                let handler = Arc::clone(handler);
                thread::spawn(move || {
                    if let Err(error) = serve_connection(stream, handler.as_ref()) {
                        warn!(target: SERVER_TARGET, %error, "connection failed");
                    }
                });
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(target: SERVER_TARGET, %error, "accept error");
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(target: SERVER_TARGET, addr = %server.local_addr, "connector stopped listening");
}

fn accept_connection(
    listener: &TcpListener,
    read_timeout: Duration,
) -> io::Result<Option<TcpStream>> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            stream.set_read_timeout(Some(read_timeout).filter(|timeout| !timeout.is_zero()))?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}
