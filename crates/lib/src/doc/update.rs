//! Replication format: encoded document updates.

use serde::{Deserialize, Serialize};
use yrs::updates::decoder::Decode;

use super::DocError;

/// Changes produced by one transaction, or a full document state, in the
/// v1 binary update encoding.
///
/// Applied to another replica with [`Document::apply_update`](super::Document::apply_update).
/// Updates commute: replicas that received the same set of updates hold the
/// same content regardless of delivery order, and applying an update twice
/// has no further effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    bytes: Vec<u8>,
}

impl Update {
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Returns true if the update carries no changes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the wire form of the update.
    pub fn encode(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Validates and wraps bytes produced by [`Update::encode`].
    pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
        if !bytes.is_empty() {
            Self::decode_v1(bytes)?;
        }
        Ok(Self::from_bytes(bytes.to_vec()))
    }

    pub(crate) fn decode_v1(bytes: &[u8]) -> Result<yrs::Update, DocError> {
        yrs::Update::decode_v1(bytes).map_err(|err| DocError::DecodeFailed {
            reason: err.to_string(),
        })
    }
}
