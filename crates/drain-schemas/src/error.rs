use thiserror::Error;

/// The error taxonomy every fallible core operation maps into.
///
/// Only [`DrainError::TransientStore`] is recoverable locally (retry, or let
/// lock expiry reclaim the row). Every other variant means the cycle owning
/// the master must stop and attempt to fail the row.
#[derive(Debug, Error)]
pub enum DrainError {
    /// Network hiccup, serialization conflict, or timeout talking to the
    /// store. Claim returns none; finalize is retried once by the caller.
    #[error("transient store error: {0}")]
    TransientStore(#[source] anyhow::Error),

    /// The detail cursor was lost mid-stream (connection drop, server
    /// restart). Never recovered in place — the cycle aborts.
    #[error("detail stream interrupted: {0}")]
    StreamInterrupted(#[source] anyhow::Error),

    /// The embedded JSON document failed to parse. Carried per-row; this
    /// variant is constructed by the projector but never propagated past it
    /// — the row is still written with JSON-derived fields empty.
    #[error("projection error: {0}")]
    Projection(#[source] anyhow::Error),

    /// Disk full, permission denied, or any other failure writing/flushing
    /// the output file.
    #[error("sink error: {0}")]
    Sink(#[source] anyhow::Error),

    /// Finalize affected zero rows because the lock horizon expired and
    /// another worker re-claimed the master first. Treated as success for
    /// the losing worker: its already-complete output file is left on disk
    /// as an accepted at-least-once duplicate (see DESIGN.md) and it exits
    /// silently rather than retrying or backing off.
    #[error("ownership lost for master {master_id}")]
    OwnershipLost { master_id: i64 },

    /// The master row vanished out from under an in-flight cycle (external
    /// deletion) or some other integrity condition the store cannot recover
    /// from on its own.
    #[error("integrity error: {0}")]
    Integrity(#[source] anyhow::Error),

    /// Shutdown was observed at a suspension point mid-cycle. The cycle
    /// aborts, deletes its partial file, and records the cancellation via
    /// `fail` rather than running the master to completion.
    #[error("cycle cancelled for master {master_id}")]
    Cancelled { master_id: i64 },
}

impl DrainError {
    /// True only for [`DrainError::TransientStore`] — every other variant
    /// means the coordinator must terminate the cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DrainError::TransientStore(_))
    }

    pub fn transient(err: impl Into<anyhow::Error>) -> Self {
        DrainError::TransientStore(err.into())
    }

    pub fn integrity(err: impl Into<anyhow::Error>) -> Self {
        DrainError::Integrity(err.into())
    }

    pub fn stream_interrupted(err: impl Into<anyhow::Error>) -> Self {
        DrainError::StreamInterrupted(err.into())
    }

    pub fn sink(err: impl Into<anyhow::Error>) -> Self {
        DrainError::Sink(err.into())
    }
}

/// Classify a raw sqlx error into the taxonomy. Unique-constraint and
/// serialization-class failures are treated as transient (the caller is
/// expected to retry or let the claim loop try the next candidate);
/// everything else is an integrity error.
impl From<sqlx::Error> for DrainError {
    fn from(err: sqlx::Error) -> Self {
        let is_transient = match &err {
            sqlx::Error::Database(db_err) => matches!(
                db_err.code().as_deref(),
                Some("40001") // serialization_failure
                    | Some("40P01") // deadlock_detected
                    | Some("23505") // unique_violation (lost the claim race)
            ),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
            _ => false,
        };

        if is_transient {
            DrainError::TransientStore(anyhow::Error::new(err))
        } else {
            DrainError::Integrity(anyhow::Error::new(err))
        }
    }
}

pub type Result<T> = std::result::Result<T, DrainError>;
