//! Immutable table of known connector definitions.
//!
//! The [`DefinitionStore`] is built once from loader output and shared
//! read-only afterwards. Malformed records are skipped with a warning, and a
//! store with no usable definitions is valid: every lookup simply reports
//! [`ConnectorError::DefinitionNotFound`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::definition::{ConnectorDefinition, DefinitionRecord};
use crate::error::ConnectorError;

/// Tracing target for definition store operations.
const STORE_TARGET: &str = "ferry_connectors::store";

/// Read-only mapping from connector name to definition.
///
/// # Example
///
/// ```
/// use ferry_connectors::{ConnectorDefinition, DefinitionStore};
///
/// let store = DefinitionStore::from_definitions([
///     ConnectorDefinition::new("F", "file-connector", 9101),
/// ]);
/// assert!(store.lookup("F").is_ok());
/// assert!(store.lookup("G").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefinitionStore {
    definitions: HashMap<String, Arc<ConnectorDefinition>>,
}

impl DefinitionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from raw records, skipping the ones that fail
    /// validation.
    ///
    /// When two valid records share a name the later one wins, so the result
    /// is deterministic for a deterministic input order.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = DefinitionRecord>) -> Self {
        let mut store = Self::new();
        for (index, record) in records.into_iter().enumerate() {
            let origin = record
                .origin
                .clone()
                .unwrap_or_else(|| format!("record #{index}"));
            match record.into_definition() {
                Ok(definition) => store.insert(definition, &origin),
                Err(error) => {
                    warn!(
                        target: STORE_TARGET,
                        origin = %origin,
                        %error,
                        "skipping malformed connector definition"
                    );
                }
            }
        }
        store
    }

    /// Builds a store from already constructed definitions, skipping any
    /// that fail validation.
    #[must_use]
    pub fn from_definitions(definitions: impl IntoIterator<Item = ConnectorDefinition>) -> Self {
        Self::from_records(definitions.into_iter().map(DefinitionRecord::from))
    }

    fn insert(&mut self, definition: ConnectorDefinition, origin: &str) {
        let name = definition.name().to_owned();
        if self.definitions.contains_key(&name) {
            warn!(
                target: STORE_TARGET,
                connector = %name,
                origin = %origin,
                "duplicate connector definition replaces the earlier one"
            );
        }
        debug!(
            target: STORE_TARGET,
            connector = %name,
            origin = %origin,
            port = definition.port(),
            "loaded connector definition"
        );
        self.definitions.insert(name, Arc::new(definition));
    }

    /// Resolves a connector definition by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::DefinitionNotFound`] when no definition is
    /// registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<Arc<ConnectorDefinition>, ConnectorError> {
        self.definitions
            .get(name)
            .cloned()
            .ok_or_else(|| ConnectorError::DefinitionNotFound {
                name: name.to_owned(),
            })
    }

    /// Looks up a definition by name without allocating an error.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ConnectorDefinition> {
        self.definitions.get(name).map(Arc::as_ref)
    }

    /// Returns the registered connector names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` when no definitions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
