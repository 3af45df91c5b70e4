//! Loading connector definitions from a directory of JSON files.
//!
//! Every `*.json` file in the directory holds one definition record. Files
//! are read in file-name order so duplicate names resolve deterministically.
//! Unreadable or unparsable files are skipped with a warning; only a missing
//! or unreadable directory is fatal.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::definition::DefinitionRecord;
use crate::error::ConnectorError;
use crate::store::DefinitionStore;

/// Tracing target for definition loading.
const LOADER_TARGET: &str = "ferry_connectors::loader";

/// Reads every JSON definition record in `dir`.
///
/// # Errors
///
/// Returns [`ConnectorError::DefinitionsDirectory`] if the directory cannot
/// be listed.
pub fn read_definition_records(dir: &Path) -> Result<Vec<DefinitionRecord>, ConnectorError> {
    let directory_error = |source: std::io::Error| ConnectorError::DefinitionsDirectory {
        path: dir.to_path_buf(),
        source: Arc::new(source),
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(directory_error)? {
        let path = entry.map_err(directory_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths.iter().filter_map(|path| read_record(path)).collect())
}

/// Loads a [`DefinitionStore`] from the JSON records in `dir`.
///
/// # Errors
///
/// Returns [`ConnectorError::DefinitionsDirectory`] if the directory cannot
/// be listed.
pub fn load_definitions_dir(dir: &Path) -> Result<DefinitionStore, ConnectorError> {
    let records = read_definition_records(dir)?;
    let store = DefinitionStore::from_records(records);
    info!(
        target: LOADER_TARGET,
        directory = %dir.display(),
        connectors = store.len(),
        "loaded connector definitions"
    );
    Ok(store)
}

fn read_record(path: &Path) -> Option<DefinitionRecord> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(error) => {
            warn!(
                target: LOADER_TARGET,
                path = %path.display(),
                %error,
                "could not read connector definition"
            );
            return None;
        }
    };
    match serde_json::from_slice::<DefinitionRecord>(&data) {
        Ok(record) => Some(record.with_origin(path.display().to_string())),
        Err(error) => {
            warn!(
                target: LOADER_TARGET,
                path = %path.display(),
                %error,
                "could not parse connector definition"
            );
            None
        }
    }
}
