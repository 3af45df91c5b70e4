//! Request, response, and message context types exchanged with workers.
//!
//! Field names on the wire are snake_case. Every mapping field tolerates
//! being absent or `null`, and the payload travels as standard base64 so
//! arbitrary bytes survive the JSON encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueMap, null_as_default};

/// Transport-level headers carried alongside a payload.
pub type HeaderMap = BTreeMap<String, String>;

/// Payload plus metadata envelope passed through an invocation.
///
/// Contexts have value semantics: a request owns its copy, and a worker
/// returns an independent (possibly modified) copy in the response.
///
/// # Example
///
/// ```
/// use ferry_protocol::{MessageContext, Value};
///
/// let context = MessageContext::new("msg-7")
///     .with_payload(b"<order/>".to_vec())
///     .with_property("flowName", Value::from("orders"))
///     .with_header("X-Request-ID", "123");
///
/// assert_eq!(context.message_id(), "msg-7");
/// assert_eq!(context.payload(), b"<order/>");
/// assert_eq!(context.property("flowName").and_then(Value::as_str), Some("orders"));
/// assert_eq!(context.header("X-Request-ID"), Some("123"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageContext {
    #[serde(default, deserialize_with = "null_as_default")]
    message_id: String,
    #[serde(default, with = "payload_base64")]
    payload: Vec<u8>,
    #[serde(default, deserialize_with = "null_as_default")]
    properties: ValueMap,
    #[serde(default, deserialize_with = "null_as_default")]
    headers: HeaderMap,
}

impl MessageContext {
    /// Creates an empty context with the given correlation id.
    #[must_use]
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            ..Self::default()
        }
    }

    /// Replaces the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Adds or replaces a mediation property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Adds or replaces a transport header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Returns the caller-assigned correlation id.
    #[must_use]
    pub const fn message_id(&self) -> &str {
        self.message_id.as_str()
    }

    /// Returns the payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Replaces the payload in place.
    pub fn set_payload(&mut self, payload: impl Into<Vec<u8>>) {
        self.payload = payload.into();
    }

    /// Returns the mediation properties.
    #[must_use]
    pub const fn properties(&self) -> &ValueMap {
        &self.properties
    }

    /// Returns a single property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Inserts a property, returning the value it replaced.
    pub fn insert_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        self.properties.insert(key.into(), value.into())
    }

    /// Returns the transport headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a single header.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

/// Request sent from the broker to a connector worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    connector_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    operation_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    connector_config: ValueMap,
    #[serde(default, deserialize_with = "null_as_default")]
    operation_params: ValueMap,
    #[serde(default, deserialize_with = "null_as_default")]
    message_context_in: MessageContext,
}

impl OperationRequest {
    /// Creates a request with empty configuration, parameters, and context.
    #[must_use]
    pub fn new(connector_name: impl Into<String>, operation_name: impl Into<String>) -> Self {
        Self {
            connector_name: connector_name.into(),
            operation_name: operation_name.into(),
            ..Self::default()
        }
    }

    /// Sets the connector configuration.
    ///
    /// Before the broker merges it, this holds only the per-call override.
    #[must_use]
    pub fn with_connector_config(mut self, config: ValueMap) -> Self {
        self.connector_config = config;
        self
    }

    /// Sets the operation parameters.
    #[must_use]
    pub fn with_operation_params(mut self, params: ValueMap) -> Self {
        self.operation_params = params;
        self
    }

    /// Sets the inbound message context.
    #[must_use]
    pub fn with_message_context(mut self, context: MessageContext) -> Self {
        self.message_context_in = context;
        self
    }

    /// Returns the connector name.
    #[must_use]
    pub const fn connector_name(&self) -> &str {
        self.connector_name.as_str()
    }

    /// Returns the operation name.
    #[must_use]
    pub const fn operation_name(&self) -> &str {
        self.operation_name.as_str()
    }

    /// Returns the connector configuration.
    #[must_use]
    pub const fn connector_config(&self) -> &ValueMap {
        &self.connector_config
    }

    /// Returns the connector configuration for in-place updates.
    pub const fn connector_config_mut(&mut self) -> &mut ValueMap {
        &mut self.connector_config
    }

    /// Returns the operation parameters.
    #[must_use]
    pub const fn operation_params(&self) -> &ValueMap {
        &self.operation_params
    }

    /// Returns a single operation parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.operation_params.get(key)
    }

    /// Returns a single configuration entry.
    #[must_use]
    pub fn config(&self, key: &str) -> Option<&Value> {
        self.connector_config.get(key)
    }

    /// Returns the inbound message context.
    #[must_use]
    pub const fn message_context(&self) -> &MessageContext {
        &self.message_context_in
    }
}

/// Response sent from a connector worker back to the broker.
///
/// # Example
///
/// ```
/// use ferry_protocol::{MessageContext, OperationResponse};
///
/// let context = MessageContext::new("msg-1");
/// let response = OperationResponse::failure(context.clone(), "file not found");
///
/// assert!(!response.is_success());
/// assert_eq!(response.error_message(), Some("file not found"));
/// assert_eq!(response.message_context(), &context);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    message_context_out: MessageContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl OperationResponse {
    /// Creates a successful response carrying the outbound context.
    #[must_use]
    pub const fn success(context: MessageContext) -> Self {
        Self {
            success: true,
            message_context_out: context,
            error_message: None,
        }
    }

    /// Creates a failed response that echoes `context` with a message.
    #[must_use]
    pub fn failure(context: MessageContext, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message_context_out: context,
            error_message: Some(message.into()),
        }
    }

    /// Returns whether the operation completed successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the outbound message context.
    #[must_use]
    pub const fn message_context(&self) -> &MessageContext {
        &self.message_context_out
    }

    /// Consumes the response, returning the outbound message context.
    #[must_use]
    pub fn into_message_context(self) -> MessageContext {
        self.message_context_out
    }

    /// Returns the failure description, present only on failure.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// Standard base64 encoding for payload bytes; `null` decodes as empty.
mod payload_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(super) fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(encoded) = Option::<String>::deserialize(deserializer)? else {
            return Ok(Vec::new());
        };
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(|err| de::Error::custom(format!("payload is not valid base64: {err}")))
    }
}

#[cfg(test)]
mod tests;
