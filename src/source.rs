//! Clip sources
//!
//! A [`SoundSource`] says where the bytes of a clip live. Backends read the
//! bytes once when a key is first loaded.

use crate::{Result, SoundError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Location of a clip's encoded bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SoundSource {
    /// File on disk
    Path(PathBuf),
    /// Bytes already in memory, with a label for logs
    Memory {
        /// Label shown in logs and `Display`
        label: String,
        /// Encoded clip bytes
        bytes: Arc<[u8]>,
    },
}

impl SoundSource {
    /// Source backed by a file path
    pub fn path(path: impl Into<PathBuf>) -> Self {
        SoundSource::Path(path.into())
    }

    /// Source backed by in-memory bytes
    pub fn bytes(label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        SoundSource::Memory {
            label: label.into(),
            bytes: bytes.into(),
        }
    }

    /// Resolve a relative path against `base`; absolute paths and memory
    /// sources are returned unchanged.
    pub fn resolved_against(&self, base: &Path) -> Self {
        match self {
            SoundSource::Path(p) if p.is_relative() => SoundSource::Path(base.join(p)),
            other => other.clone(),
        }
    }

    /// Read the encoded bytes
    pub fn read_bytes(&self) -> Result<Arc<[u8]>> {
        match self {
            SoundSource::Path(path) => {
                if !path.exists() {
                    return Err(SoundError::SourceNotFound(path.display().to_string()));
                }
                let data = fs::read(path)?;
                Ok(Arc::from(data))
            }
            SoundSource::Memory { bytes, .. } => Ok(Arc::clone(bytes)),
        }
    }
}

impl fmt::Display for SoundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundSource::Path(p) => write!(f, "{}", p.display()),
            SoundSource::Memory { label, bytes } => {
                write!(f, "memory:{} ({} bytes)", label, bytes.len())
            }
        }
    }
}
