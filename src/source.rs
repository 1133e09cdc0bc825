//! Payload sources for the sender
//!
//! - `Fixed`: one record, encoded once per send
//! - `File`: six fields read from a text file, re-read from the start on
//!   every send so edits show up without restarting
//! - `Raw`: free-form text sent as-is

use crate::codec::{DatagramCodec, DecodePolicy, TelemetryCodec};
use crate::error::{Result, TelemetryError};
use crate::record::TelemetryRecord;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// Text file holding one telemetry record
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file from the start and decode its first six fields
    pub fn read_record(&self, codec: &TelemetryCodec) -> Result<TelemetryRecord> {
        let content = std::fs::read(&self.path).map_err(|e| TelemetryError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        // Files may hold more than one record; only the first is used
        let policy = match codec.policy() {
            DecodePolicy::Strict => DecodePolicy::Lenient,
            other => other,
        };
        let file_codec = TelemetryCodec::new(
            policy,
            codec.precision(),
            content.len().max(codec.max_len()),
        );
        Ok(file_codec.decode(&content)?)
    }
}

/// Where the sender's payloads come from
#[derive(Debug, Clone)]
pub enum RecordSource {
    Fixed(TelemetryRecord),
    File(FileSource),
    Raw(String),
}

impl RecordSource {
    /// Produce the next payload to send
    pub fn next_payload(&self, codec: &TelemetryCodec) -> Result<Bytes> {
        match self {
            Self::Fixed(record) => Ok(Bytes::from(codec.encode_to_vec(record))),
            Self::File(file) => {
                let record = file.read_record(codec)?;
                Ok(Bytes::from(codec.encode_to_vec(&record)))
            }
            Self::Raw(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
        }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            Self::Fixed(_) => "fixed record".to_string(),
            Self::File(file) => format!("file {}", file.path().display()),
            Self::Raw(_) => "raw text".to_string(),
        }
    }
}
