//! Group file adapters
//!
//! A group file is a sequence of frames `[len: u32 LE][bincode(Transaction)]`
//! read until end of file.

use crate::domain::errors::DecodeError;
use crate::ports::outbound::GroupFileStore;
use async_trait::async_trait;
use shared_types::Transaction;
use std::path::{Component, Path, PathBuf};

const FRAME_HEADER_LEN: usize = 4;

/// Encode transactions into the group file framing.
pub fn encode_group_file(transactions: &[Transaction]) -> Result<Vec<u8>, bincode::Error> {
    let mut bytes = Vec::new();
    for trx in transactions {
        let payload = bincode::serialize(trx)?;
        bytes.extend_from_slice(&frame_len(payload.len())?.to_le_bytes());
        bytes.extend_from_slice(&payload);
    }
    Ok(bytes)
}

/// Frame header value; payloads must fit the u32 length prefix
fn frame_len(len: usize) -> Result<u32, bincode::Error> {
    u32::try_from(len).map_err(|_| Box::new(bincode::ErrorKind::SizeLimit))
}

/// Decode a whole group file. `file` only names the artifact in errors.
pub fn decode_group_file(file: &str, bytes: &[u8]) -> Result<Vec<Transaction>, DecodeError> {
    let malformed = |frame: usize, message: String| DecodeError::Malformed {
        file: file.to_string(),
        frame,
        message,
    };

    let mut transactions = Vec::new();
    let mut cursor = 0;

    while cursor < bytes.len() {
        let frame = transactions.len();
        if cursor + FRAME_HEADER_LEN > bytes.len() {
            return Err(malformed(frame, "truncated frame header".to_string()));
        }

        let mut header = [0u8; FRAME_HEADER_LEN];
        header.copy_from_slice(&bytes[cursor..cursor + FRAME_HEADER_LEN]);
        let len = u32::from_le_bytes(header) as usize;
        cursor += FRAME_HEADER_LEN;

        if cursor + len > bytes.len() {
            return Err(malformed(
                frame,
                format!("frame declares {} bytes, {} remaining", len, bytes.len() - cursor),
            ));
        }

        let trx: Transaction = bincode::deserialize(&bytes[cursor..cursor + len])
            .map_err(|e| malformed(frame, e.to_string()))?;
        transactions.push(trx);
        cursor += len;
    }

    Ok(transactions)
}

/// Group files stored in a directory on the local filesystem
pub struct FsGroupFileStore {
    dir: PathBuf,
}

impl FsGroupFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve `file_name` under the group directory.
    ///
    /// Only plain relative names are accepted: absolute paths, `..` and
    /// other special components are rejected before touching the disk.
    fn path_of(&self, file_name: &str) -> Result<PathBuf, DecodeError> {
        let name = Path::new(file_name);
        let plain = !file_name.is_empty()
            && name.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(DecodeError::Io {
                file: file_name.to_string(),
                message: "name escapes the group directory".to_string(),
            });
        }
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl GroupFileStore for FsGroupFileStore {
    async fn read(&self, file_name: &str) -> Result<Vec<u8>, DecodeError> {
        let path = self.path_of(file_name)?;
        tokio::fs::read(&path).await.map_err(|e| DecodeError::Io {
            file: path.display().to_string(),
            message: e.to_string(),
        })
    }

    async fn remove(&self, file_name: &str) -> Result<(), DecodeError> {
        let path = self.path_of(file_name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| DecodeError::Io {
                file: path.display().to_string(),
                message: e.to_string(),
            })
    }
}
