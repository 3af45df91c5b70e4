//! Connector definition types describing connector identity and launch data.
//!
//! A [`ConnectorDefinition`] declares everything the supervisor needs to start
//! a connector: its name, the worker executable, the fixed port the worker
//! binds, and instance-wide default configuration. Loaders produce raw
//! [`DefinitionRecord`]s that are validated into definitions so that a single
//! malformed record can be reported and skipped.

use std::path::{Path, PathBuf};

use ferry_protocol::{Value, ValueMap};
use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;

/// Validated, immutable description of a connector type.
///
/// # Example
///
/// ```
/// use ferry_connectors::ConnectorDefinition;
/// use ferry_protocol::{Value, ValueMap};
///
/// let mut defaults = ValueMap::new();
/// defaults.insert("baseDirectory".into(), Value::from("./data"));
///
/// let definition = ConnectorDefinition::new("SimpleFileConnector", "file-connector", 9101)
///     .with_default_config(defaults);
///
/// assert_eq!(definition.name(), "SimpleFileConnector");
/// assert_eq!(definition.port(), 9101);
/// assert!(definition.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDefinition {
    name: String,
    executable: PathBuf,
    port: u16,
    #[serde(default)]
    default_config: ValueMap,
}

impl ConnectorDefinition {
    /// Creates a definition with empty default configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, executable: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            port,
            default_config: ValueMap::new(),
        }
    }

    /// Replaces the default configuration.
    #[must_use]
    pub fn with_default_config(mut self, default_config: ValueMap) -> Self {
        self.default_config = default_config;
        self
    }

    /// Validates the definition, returning an error if it is malformed.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidDefinition`] if the name is blank, the
    /// executable path is empty, or the port is zero.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.name.trim().is_empty() {
            return Err(ConnectorError::InvalidDefinition {
                message: String::from("connector name must not be empty"),
            });
        }
        if self.executable.as_os_str().is_empty() {
            return Err(ConnectorError::InvalidDefinition {
                message: format!("connector '{}' has an empty executable path", self.name),
            });
        }
        if self.port == 0 {
            return Err(ConnectorError::InvalidDefinition {
                message: format!("connector '{}' must declare a non-zero port", self.name),
            });
        }
        Ok(())
    }

    /// Returns the connector name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the executable path, relative to the connectors directory
    /// unless absolute.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Returns the fixed port the worker listens on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the instance-wide default configuration.
    #[must_use]
    pub const fn default_config(&self) -> &ValueMap {
        &self.default_config
    }
}

/// Raw connector definition as produced by a loader, before validation.
///
/// Field names follow the definition file format; the long executable and
/// port names written by older tooling are accepted as aliases.
///
/// # Example
///
/// ```
/// use ferry_connectors::DefinitionRecord;
///
/// let record: DefinitionRecord = serde_json::from_str(r#"{
///     "name": "SimpleFileConnector",
///     "executable_path_relative_to_connectors_dir": "simple-file-connector",
///     "default_port": 9101,
///     "default_config": {"baseDirectory": "./data"}
/// }"#).unwrap();
///
/// let definition = record.into_definition().unwrap();
/// assert_eq!(definition.port(), 9101);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DefinitionRecord {
    /// Unique connector name.
    #[serde(default)]
    pub name: Option<String>,
    /// Worker executable location.
    #[serde(default, alias = "executable_path_relative_to_connectors_dir")]
    pub executable: Option<PathBuf>,
    /// Fixed listen port, kept wide so out-of-range values can be reported.
    #[serde(default, alias = "default_port")]
    pub port: Option<i64>,
    /// Default configuration; must be a mapping when present.
    #[serde(default)]
    pub default_config: Option<Value>,
    /// Where the record came from, used in diagnostics.
    #[serde(skip)]
    pub origin: Option<String>,
}

impl DefinitionRecord {
    /// Attaches an origin label used when the record is reported.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Validates the record into a [`ConnectorDefinition`].
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidDefinition`] when a required field is
    /// missing, the port is outside `1..=65535`, or the default configuration
    /// is not a mapping.
    pub fn into_definition(self) -> Result<ConnectorDefinition, ConnectorError> {
        let name = self.name.ok_or_else(|| ConnectorError::InvalidDefinition {
            message: String::from("record is missing 'name'"),
        })?;
        let executable = self
            .executable
            .ok_or_else(|| ConnectorError::InvalidDefinition {
                message: format!("connector '{name}' is missing an executable"),
            })?;
        let raw_port = self.port.ok_or_else(|| ConnectorError::InvalidDefinition {
            message: format!("connector '{name}' is missing a port"),
        })?;
        let port = u16::try_from(raw_port).map_err(|_| ConnectorError::InvalidDefinition {
            message: format!("connector '{name}' port {raw_port} is out of range"),
        })?;
        let default_config = match self.default_config {
            None | Some(Value::Null) => ValueMap::new(),
            Some(Value::Map(map)) => map,
            Some(_) => {
                return Err(ConnectorError::InvalidDefinition {
                    message: format!("connector '{name}' default_config must be a mapping"),
                });
            }
        };

        let definition =
            ConnectorDefinition::new(name, executable, port).with_default_config(default_config);
        definition.validate()?;
        Ok(definition)
    }
}

impl From<ConnectorDefinition> for DefinitionRecord {
    fn from(definition: ConnectorDefinition) -> Self {
        Self {
            name: Some(definition.name),
            executable: Some(definition.executable),
            port: Some(i64::from(definition.port)),
            default_config: Some(Value::Map(definition.default_config)),
            origin: None,
        }
    }
}
