//! Durable encoding of the discard history.
//!
//! The full [`HistoryState`] is stored as one content-addressed blob and a
//! small pointer to it is written to the repository configuration.

use crate::config::DEFAULT_POINTER_KEY;
use crate::error::{Result, RewindError};
use crate::gateway::ContentGateway;
use crate::snapshot::{ContentId, HistoryState};
use tracing::{debug, warn};

/// Encodes, persists and reloads a [`HistoryState`].
#[derive(Debug, Clone)]
pub struct HistorySerializer {
    pointer_key: String,
}

impl Default for HistorySerializer {
    fn default() -> Self {
        Self::new(DEFAULT_POINTER_KEY)
    }
}

impl HistorySerializer {
    /// Creates a serializer writing its pointer under `pointer_key`.
    pub fn new(pointer_key: impl Into<String>) -> Self {
        Self {
            pointer_key: pointer_key.into(),
        }
    }

    /// Configuration key holding the payload id.
    pub fn pointer_key(&self) -> &str {
        &self.pointer_key
    }

    /// Encodes the state as JSON.
    pub fn encode(state: &HistoryState) -> Result<Vec<u8>> {
        serde_json::to_vec(state).map_err(|e| RewindError::Serialization(e.to_string()))
    }

    /// Decodes a state previously produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<HistoryState> {
        serde_json::from_slice(bytes).map_err(|e| RewindError::Deserialization(e.to_string()))
    }

    /// Stores the state as a blob and points the configuration key at it.
    ///
    /// Returns the payload id.
    pub async fn persist<G>(&self, gateway: &G, state: &HistoryState) -> Result<ContentId>
    where
        G: ContentGateway + ?Sized,
    {
        let payload = Self::encode(state)?;
        let id = gateway.create_blob(&payload).await?;
        gateway
            .set_config_value(&self.pointer_key, id.as_str())
            .await?;

        debug!(pointer = %self.pointer_key, id = %id, bytes = payload.len(), "persisted discard history");
        Ok(id)
    }

    /// Reads the state the pointer names.
    ///
    /// An unset pointer, an unreachable payload or an unparsable payload all
    /// yield an empty state: losing undo history is preferable to refusing to
    /// open the repository.
    pub async fn load<G>(&self, gateway: &G) -> Result<HistoryState>
    where
        G: ContentGateway + ?Sized,
    {
        let Some(value) = gateway.config_value(&self.pointer_key).await? else {
            debug!(pointer = %self.pointer_key, "no discard history recorded");
            return Ok(HistoryState::default());
        };
        let id = ContentId::new(value);

        let payload = match gateway.blob_contents(&id).await {
            Ok(payload) => payload,
            Err(e) if e.is_stale() => {
                warn!(id = %id, "discard history payload is gone, starting empty");
                return Ok(HistoryState::default());
            }
            Err(e) => return Err(e),
        };

        match Self::decode(&payload) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(id = %id, error = %e, "discard history payload is unreadable, starting empty");
                Ok(HistoryState::default())
            }
        }
    }
}
