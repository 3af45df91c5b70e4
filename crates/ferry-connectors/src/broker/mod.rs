//! Request/response exchange with a running connector worker.
//!
//! Every call opens a fresh TCP connection to the worker's loopback port,
//! writes one JSONL request, reads one JSONL response, and closes the
//! connection. Calls for the same instance are serialised by its invocation
//! guard; calls for different instances proceed in parallel. Only the
//! connect step is bounded by a timeout.

use std::io::BufReader;
use std::mem;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use ferry_protocol::{
    OperationRequest, OperationResponse, decode_message, encode_message, merge_config,
};
use tracing::debug;

use crate::error::ConnectorError;
use crate::settings::DEFAULT_CONNECT_TIMEOUT;
use crate::supervisor::RunningInstance;

/// Tracing target for broker operations.
const BROKER_TARGET: &str = "ferry_connectors::broker";

/// Sends operation requests to workers and returns their responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationBroker {
    host: IpAddr,
    connect_timeout: Duration,
}

impl Default for InvocationBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl InvocationBroker {
    /// Creates a broker dialling workers on the loopback interface.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            connect_timeout,
        }
    }

    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Performs one exchange with `instance`.
    ///
    /// The request's connector configuration is treated as a per-call
    /// override and merged over the definition's defaults before sending.
    /// A worker-reported failure is returned as `Ok` with `success == false`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Connect`] if the worker cannot be reached
    /// within the timeout, [`ConnectorError::Encode`] if the request cannot
    /// be written, and [`ConnectorError::Decode`] if no valid response is
    /// read back.
    pub fn call(
        &self,
        instance: &RunningInstance,
        mut request: OperationRequest,
    ) -> Result<OperationResponse, ConnectorError> {
        let name = instance.name();
        let _guard = instance.lock_invocation();

        let addr = SocketAddr::new(self.host, instance.port());
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout).map_err(|source| {
            ConnectorError::Connect {
                name: name.to_owned(),
                addr,
                source: Arc::new(source),
            }
        })?;

        let overrides = mem::take(request.connector_config_mut());
        *request.connector_config_mut() =
            merge_config(instance.definition().default_config(), Some(overrides));

        debug!(
            target: BROKER_TARGET,
            connector = name,
            operation = request.operation_name(),
            message_id = request.message_context().message_id(),
            %addr,
            "sending operation request"
        );

        encode_message(&stream, &request).map_err(|source| ConnectorError::Encode {
            name: name.to_owned(),
            source,
        })?;
        let response: OperationResponse =
            decode_message(BufReader::new(&stream)).map_err(|source| ConnectorError::Decode {
                name: name.to_owned(),
                source,
            })?;

        debug!(
            target: BROKER_TARGET,
            connector = name,
            operation = request.operation_name(),
            success = response.is_success(),
            "received operation response"
        );
        Ok(response)
    }
}
