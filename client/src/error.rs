/// Failures a placement surfaces to its caller.
///
/// Transient backend errors are not represented here: they are logged and
/// swallowed where they occur. Quota and geometry rejections are
/// [`PlacementOutcome`](crate::PlacementOutcome) values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("ledger rejected placement at {position}: {source}")]
    Ledger {
        position: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The spawned remote half of an interaction panicked or was aborted.
    #[error("placement task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PlacementError {
    pub(crate) fn ledger(position: u32, err: anyhow::Error) -> Self {
        PlacementError::Ledger {
            position,
            source: err.into(),
        }
    }

    pub fn position(&self) -> Option<u32> {
        match self {
            PlacementError::Ledger { position, .. } => Some(*position),
            PlacementError::Task(_) => None,
        }
    }
}
