//! Sample connector that creates and reads files.
//!
//! The connector exposes two operations:
//!
//! * `create` writes the `content` parameter to `<baseDirectory>/<filename>`
//!   and records the written path in the `file.write.path` property.
//! * `read` loads `<baseDirectory>/<filename>` into the message payload and
//!   records the path in the `file.read.path` property.
//!
//! `baseDirectory` comes from the connector configuration and defaults to the
//! worker's current directory. Filenames must be relative and must not climb
//! out of the base directory.

#[cfg(test)]
mod tests;

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use ferry_protocol::{MessageContext, OperationRequest, Value};
use ferry_worker::OperationTable;
use thiserror::Error;

/// Configuration key naming the directory files are resolved against.
pub const BASE_DIRECTORY_KEY: &str = "baseDirectory";
/// Property set by `create` to the path that was written.
pub const WRITE_PATH_PROPERTY: &str = "file.write.path";
/// Property set by `create` once the write completed.
pub const WRITE_STATUS_PROPERTY: &str = "file.write.status";
/// Property set by `read` to the path that was read.
pub const READ_PATH_PROPERTY: &str = "file.read.path";

const DEFAULT_BASE_DIRECTORY: &str = ".";

/// Errors raised by file operations. Each becomes the message of a failure
/// response.
#[derive(Debug, Error)]
pub enum FileOperationError {
    /// A required parameter was absent.
    #[error("missing required parameter '{name}'")]
    MissingParameter {
        /// Parameter name.
        name: &'static str,
    },
    /// A parameter or configuration value had the wrong type.
    #[error("'{name}' must be a string")]
    NotAString {
        /// Parameter or configuration key.
        name: &'static str,
    },
    /// The filename was rejected.
    #[error("invalid filename '{filename}': {message}")]
    InvalidFilename {
        /// Offending filename.
        filename: String,
        /// Validation message.
        message: &'static str,
    },
    /// The base directory could not be created.
    #[error("failed to create directory '{}': {source}", path.display())]
    CreateDirectory {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Writing the file failed.
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Reading the file failed.
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Builds the operation table served by the file connector.
#[must_use]
pub fn operations() -> OperationTable {
    OperationTable::new()
        .with_operation("create", |request| {
            create_file(request).map_err(|error| error.to_string())
        })
        .with_operation("read", |request| {
            read_file(request).map_err(|error| error.to_string())
        })
}

/// Writes the `content` parameter to the file named by `filename`.
///
/// The base directory is created when missing. The returned context is the
/// input context with the write path and status properties set.
///
/// # Errors
///
/// Returns a [`FileOperationError`] for missing or invalid parameters and
/// for file system failures.
pub fn create_file(request: &OperationRequest) -> Result<MessageContext, FileOperationError> {
    let filename = required_string_param(request, "filename")?;
    let content = required_string_param(request, "content")?;
    let base = base_directory(request)?;
    let path = resolve_target(&base, filename)?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| FileOperationError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&path, content).map_err(|source| FileOperationError::Write {
        path: path.clone(),
        source,
    })?;

    Ok(request
        .message_context()
        .clone()
        .with_property(WRITE_PATH_PROPERTY, path.display().to_string())
        .with_property(WRITE_STATUS_PROPERTY, "success"))
}

/// Reads the file named by `filename` into the message payload.
///
/// # Errors
///
/// Returns a [`FileOperationError`] for missing or invalid parameters and
/// when the file cannot be read.
pub fn read_file(request: &OperationRequest) -> Result<MessageContext, FileOperationError> {
    let filename = required_string_param(request, "filename")?;
    let base = base_directory(request)?;
    let path = resolve_target(&base, filename)?;

    let contents = fs::read(&path).map_err(|source| FileOperationError::Read {
        path: path.clone(),
        source,
    })?;

    let mut context = request
        .message_context()
        .clone()
        .with_property(READ_PATH_PROPERTY, path.display().to_string());
    context.set_payload(contents);
    Ok(context)
}

/// Joins `filename` onto `base`, dropping `.` components.
///
/// # Errors
///
/// Returns [`FileOperationError::InvalidFilename`] for empty or absolute
/// filenames and filenames containing `..`.
pub fn resolve_target(base: &Path, filename: &str) -> Result<PathBuf, FileOperationError> {
    let invalid = |message| FileOperationError::InvalidFilename {
        filename: filename.to_owned(),
        message,
    };
    let relative = Path::new(filename);
    if filename.trim().is_empty() {
        return Err(invalid("filename must not be empty"));
    }
    if relative.is_absolute() || relative.has_root() {
        return Err(invalid("absolute paths are not allowed"));
    }
    if relative.components().any(|component| {
        matches!(component, Component::ParentDir | Component::Prefix(_))
    }) {
        return Err(invalid("path traversal is not allowed"));
    }

    Ok(base
        .join(relative)
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect())
}

fn required_string_param<'a>(
    request: &'a OperationRequest,
    name: &'static str,
) -> Result<&'a str, FileOperationError> {
    request
        .param(name)
        .ok_or(FileOperationError::MissingParameter { name })?
        .as_str()
        .ok_or(FileOperationError::NotAString { name })
}

fn base_directory(request: &OperationRequest) -> Result<PathBuf, FileOperationError> {
    match request.config(BASE_DIRECTORY_KEY) {
        None | Some(Value::Null) => Ok(PathBuf::from(DEFAULT_BASE_DIRECTORY)),
        Some(value) => value
            .as_str()
            .map(PathBuf::from)
            .ok_or(FileOperationError::NotAString {
                name: BASE_DIRECTORY_KEY,
            }),
    }
}
