/// Common error type for the synchronization core.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("metadata fetch failed: {0}")]
    MetadataFetch(String),
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("subscribe to '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },
    #[error("malformed telemetry message: {0}")]
    MalformedMessage(String),
    #[error("transport lost: {0}")]
    TransportLost(String),
    #[error("view persistence failed: {0}")]
    Persistence(String),
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
    #[error("shutdown requested")]
    Shutdown,
}

impl SyncError {
    /// Errors that end the session instead of feeding the retry path.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncError::RetriesExhausted { .. } | SyncError::Shutdown
        )
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exhaustion_and_shutdown_are_terminal() {
        assert!(SyncError::Shutdown.is_terminal());
        assert!(SyncError::RetriesExhausted {
            attempts: 3,
            last: "refused".into()
        }
        .is_terminal());
        assert!(!SyncError::Connect("refused".into()).is_terminal());
        assert!(!SyncError::MalformedMessage("eof".into()).is_terminal());
    }
}
