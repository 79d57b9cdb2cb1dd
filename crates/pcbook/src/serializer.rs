//! Dump catalog messages to files as protobuf binary or JSON.

use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// Errors from reading or writing serialized messages.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file does not hold a valid protobuf message
    #[error("cannot decode protobuf message: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The message could not be rendered as JSON
    #[error("cannot encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `message` to `path` in protobuf binary encoding.
pub fn write_protobuf_to_binary_file<M: prost::Message>(
    message: &M,
    path: impl AsRef<Path>,
) -> Result<(), SerializeError> {
    fs::write(path, message.encode_to_vec())?;
    Ok(())
}

/// Read a protobuf binary message from `path`.
pub fn read_protobuf_from_binary_file<M: prost::Message + Default>(
    path: impl AsRef<Path>,
) -> Result<M, SerializeError> {
    let data = fs::read(path)?;
    Ok(M::decode(data.as_slice())?)
}

/// Render `value` as indented JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, SerializeError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write `value` to `path` as indented JSON.
pub fn write_json_file<T: Serialize>(
    value: &T,
    path: impl AsRef<Path>,
) -> Result<(), SerializeError> {
    fs::write(path, to_json(value)?)?;
    Ok(())
}
