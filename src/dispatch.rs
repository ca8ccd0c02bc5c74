//! Request dispatch with the read-retry policy.
//!
//! Every resource operation is either a [`Operation::Read`] (idempotent: get, list,
//! query) or a [`Operation::Write`] (create, delete, update, control). Writes get one
//! attempt. Reads get `1 + read_operation_retry_count` attempts, issued back to back
//! from the calling task, each with the full request timeout. Only failures where no
//! reply came back are retried; a reply carrying an error is final.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{AriError, AriResult};
use crate::reply::Reply;

/// Operation class, deciding the retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Idempotent query, safe to re-issue.
    Read,
    /// Mutation, issued exactly once.
    Write,
}

impl Operation {
    /// Total attempts allowed for this class under `retry_count`.
    pub fn max_attempts(self, retry_count: u32) -> u32 {
        match self {
            Operation::Read => retry_count.saturating_add(1),
            Operation::Write => 1,
        }
    }
}

/// Whether a failed attempt may be re-issued. See [`AriError::is_retry_eligible`].
pub fn is_retry_eligible(err: &AriError) -> bool {
    err.is_retry_eligible()
}

/// Encode a request body as JSON.
pub fn encode<B: Serialize + ?Sized>(body: &B) -> AriResult<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(body)?))
}

impl Connection {
    /// Run one logical operation and return the decoded reply envelope.
    ///
    /// Application errors are returned as `Err(AriError::Application)`.
    pub async fn dispatch(
        &self,
        operation: Operation,
        subject: &str,
        payload: Bytes,
    ) -> AriResult<Reply> {
        let max_attempts = operation.max_attempts(
            self.options()
                .read_operation_retry_count,
        );
        let wait = self.request_timeout();

        let mut attempt = 1;
        loop {
            match self
                .request(subject, payload.clone(), wait)
                .await
            {
                Ok(raw) => {
                    let reply = Reply::decode(&raw)?;
                    if let Some(message) = reply.error_message() {
                        debug!("[DISPATCH] {} returned error: {}", subject, message);
                    }
                    return reply.into_result();
                }
                Err(e) if is_retry_eligible(&e) && attempt < max_attempts => {
                    warn!(
                        "[DISPATCH] {:?} {} attempt {}/{} failed: {}, retrying",
                        operation, subject, attempt, max_attempts, e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    debug!(
                        "[DISPATCH] {:?} {} failed after {} attempt(s): {}",
                        operation, subject, attempt, e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Read with an empty request body.
    pub async fn read<T: DeserializeOwned>(&self, subject: &str) -> AriResult<T> {
        self.dispatch(Operation::Read, subject, Bytes::new())
            .await?
            .into_data()
    }

    /// Read with a JSON request body (filters, query parameters).
    pub async fn read_with<B, T>(&self, subject: &str, body: &B) -> AriResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.dispatch(Operation::Read, subject, encode(body)?)
            .await?
            .into_data()
    }

    /// Write without a request body, discarding reply data.
    pub async fn write_empty(&self, subject: &str) -> AriResult<()> {
        self.dispatch(Operation::Write, subject, Bytes::new())
            .await
            .map(|_| ())
    }

    /// Write a JSON request body, discarding reply data.
    pub async fn write<B: Serialize + ?Sized>(&self, subject: &str, body: &B) -> AriResult<()> {
        self.dispatch(Operation::Write, subject, encode(body)?)
            .await
            .map(|_| ())
    }

    /// Write a JSON request body and decode the reply data.
    pub async fn write_returning<B, T>(&self, subject: &str, body: &B) -> AriResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.dispatch(Operation::Write, subject, encode(body)?)
            .await?
            .into_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_attempts() {
        assert_eq!(Operation::Read.max_attempts(0), 1);
        assert_eq!(Operation::Read.max_attempts(3), 4);
        assert_eq!(Operation::Write.max_attempts(0), 1);
        assert_eq!(Operation::Write.max_attempts(5), 1);
        assert_eq!(Operation::Read.max_attempts(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_retry_eligibility() {
        assert!(is_retry_eligible(&AriError::Timeout { timeout_ms: 200 }));
        assert!(is_retry_eligible(&AriError::transport("no responders")));
        assert!(!is_retry_eligible(&AriError::application("not found")));
        assert!(!is_retry_eligible(&AriError::ConnectionClosed));
        assert!(!is_retry_eligible(&AriError::InvalidSubject("x".into())));
    }

    #[test]
    fn test_encode() {
        let bytes = encode(&serde_json::json!({ "media": "sound:hello" })).unwrap();
        assert_eq!(&bytes[..], br#"{"media":"sound:hello"}"#);
    }
}
