use thiserror::Error;

pub use sqlx::Error as SqlxError;

/// Errors returned by a [`crate::store::KeyMessageStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No connection to the datastore could be obtained.
    #[error("datastore unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// An insert or delete reached the datastore but did not succeed.
    #[error("write failed: {0}")]
    WriteFailed(#[source] sqlx::Error),

    /// A read query failed.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Embedded schema migrations could not be applied.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn on_write(err: sqlx::Error) -> Self {
        if is_unavailable(&err) {
            StoreError::Unavailable(err)
        } else {
            StoreError::WriteFailed(err)
        }
    }

    pub(crate) fn on_read(err: sqlx::Error) -> Self {
        if is_unavailable(&err) {
            StoreError::Unavailable(err)
        } else {
            StoreError::Query(err)
        }
    }

    /// `true` when the failure means the datastore could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

fn is_unavailable(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
    )
}

/// Reply used when the inference endpoint refuses the connection.
pub const SERVICE_DOWN_REPLY: &str =
    "I'm sorry, I can't connect to the AI service. Please make sure Ollama is running.";

/// Reply used for every other inference failure.
pub const GENERIC_FAILURE_REPLY: &str =
    "I'm sorry, I'm having trouble connecting to my AI service right now. Please try again later.";

/// Errors produced while calling the inference endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Nothing is listening at the configured endpoint.
    #[error("connection refused: {0}")]
    ConnectionRefused(#[source] reqwest::Error),

    /// The request did not complete within the client timeout.
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("endpoint returned HTTP {0}")]
    Status(u16),

    /// The endpoint answered 2xx but the body was not the expected JSON.
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Any other HTTP client failure.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl InferenceError {
    /// The user-facing string this failure is converted into.
    pub fn apology(&self) -> &'static str {
        match self {
            InferenceError::ConnectionRefused(_) => SERVICE_DOWN_REPLY,
            _ => GENERIC_FAILURE_REPLY,
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if is_connection_refused(&err) {
            InferenceError::ConnectionRefused(err)
        } else if err.is_timeout() {
            InferenceError::Timeout(err)
        } else if let Some(status) = err.status() {
            InferenceError::Status(status.as_u16())
        } else {
            InferenceError::Transport(err)
        }
    }
}

/// Walks the source chain looking for an `io::ErrorKind::ConnectionRefused`.
fn is_connection_refused(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(StoreError::on_write(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(StoreError::on_read(sqlx::Error::PoolClosed).is_unavailable());
    }

    #[test]
    fn other_errors_keep_their_kind() {
        assert!(matches!(
            StoreError::on_write(sqlx::Error::RowNotFound),
            StoreError::WriteFailed(_)
        ));
        assert!(matches!(
            StoreError::on_read(sqlx::Error::RowNotFound),
            StoreError::Query(_)
        ));
    }

    #[test]
    fn apologies_are_distinct() {
        let malformed = InferenceError::Malformed(
            serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        );
        assert_eq!(malformed.apology(), GENERIC_FAILURE_REPLY);
        assert_eq!(InferenceError::Status(502).apology(), GENERIC_FAILURE_REPLY);
        assert_ne!(SERVICE_DOWN_REPLY, GENERIC_FAILURE_REPLY);
    }
}
