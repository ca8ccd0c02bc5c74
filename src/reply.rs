//! Reply envelope decoding

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AriError, AriResult};

/// Outcome carried by a reply envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReplyStatus {
    /// No `error` field (or an empty payload).
    Ok,
    /// `error` field present: the gateway could not perform the operation.
    Err,
}

/// Reply from the ARI gateway.
///
/// Wire format is a JSON object `{"data": <any>, "error": "<message>"}` with both
/// fields optional. An empty payload is a success with no data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Reply {
    /// Successful reply carrying `data`.
    pub fn ok(data: impl Serialize) -> AriResult<Self> {
        Ok(Self {
            data: Some(serde_json::to_value(data)?),
            error: None,
        })
    }

    /// Successful reply without data.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Failed reply with a domain error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }

    /// Decode a raw reply payload.
    ///
    /// ```
    /// # use ari_nats_tokio::{Reply, ReplyStatus};
    /// let reply = Reply::decode(br#"{"error":"channel not found"}"#).unwrap();
    /// assert_eq!(reply.reply_status(), ReplyStatus::Err);
    /// assert!(Reply::decode(b"").unwrap().is_success());
    /// ```
    pub fn decode(payload: &[u8]) -> AriResult<Self> {
        if payload
            .iter()
            .all(u8::is_ascii_whitespace)
        {
            return Ok(Self::empty());
        }
        Ok(serde_json::from_slice(payload)?)
    }

    /// JSON wire encoding.
    pub fn to_bytes(&self) -> AriResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Classification of the envelope.
    pub fn reply_status(&self) -> ReplyStatus {
        match self.error {
            Some(_) => ReplyStatus::Err,
            None => ReplyStatus::Ok,
        }
    }

    /// `true` if no error was reported.
    pub fn is_success(&self) -> bool {
        self.reply_status() == ReplyStatus::Ok
    }

    /// Error message reported by the gateway.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_deref()
    }

    /// Raw data value.
    pub fn data(&self) -> Option<&Value> {
        self.data
            .as_ref()
    }

    /// Convert to result based on the envelope status.
    pub fn into_result(self) -> AriResult<Self> {
        match self.error {
            None => Ok(self),
            Some(message) => Err(AriError::Application { message }),
        }
    }

    /// Check the status, then deserialize `data` into `T`.
    ///
    /// A missing `data` field deserializes as JSON `null`, so `()` and `Option<_>`
    /// targets accept data-less replies.
    pub fn into_data<T: DeserializeOwned>(self) -> AriResult<T> {
        let reply = self.into_result()?;
        Ok(serde_json::from_value(
            reply
                .data
                .unwrap_or(Value::Null),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_status_ok_with_data() {
        let reply = Reply::decode(br#"{"data":{"id":"1"}}"#).unwrap();
        assert_eq!(reply.reply_status(), ReplyStatus::Ok);
        assert_eq!(reply.data(), Some(&json!({"id": "1"})));
    }

    #[test]
    fn test_reply_status_empty_payload() {
        let reply = Reply::decode(b"").unwrap();
        assert!(reply.is_success());
        assert!(reply
            .data()
            .is_none());
        let reply = Reply::decode(b"  \n").unwrap();
        assert!(reply.is_success());
    }

    #[test]
    fn test_reply_status_err() {
        let reply = Reply::decode(br#"{"error":"bridge not found"}"#).unwrap();
        assert_eq!(reply.reply_status(), ReplyStatus::Err);
        assert_eq!(reply.error_message(), Some("bridge not found"));
        let err = reply
            .into_result()
            .unwrap_err();
        assert!(
            matches!(err, AriError::Application { ref message } if message == "bridge not found")
        );
    }

    #[test]
    fn test_garbage_payload_is_json_error() {
        let err = Reply::decode(b"not json").unwrap_err();
        assert!(matches!(err, AriError::Json(_)));
        assert!(!err.is_retry_eligible());
    }

    #[test]
    fn test_into_data_typed() {
        let reply = Reply::ok(vec!["a", "b"]).unwrap();
        let names: Vec<String> = reply
            .into_data()
            .unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_into_data_missing_as_unit() {
        let () = Reply::empty()
            .into_data()
            .unwrap();
        let missing: Option<String> = Reply::empty()
            .into_data()
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_into_data_error_wins() {
        let err = Reply::error("nope")
            .into_data::<Value>()
            .unwrap_err();
        assert!(err.is_application());
    }

    #[test]
    fn test_wire_encoding() {
        let bytes = Reply::error("busy")
            .to_bytes()
            .unwrap();
        assert_eq!(&bytes[..], br#"{"error":"busy"}"#);
        let bytes = Reply::empty()
            .to_bytes()
            .unwrap();
        assert_eq!(&bytes[..], b"{}");
    }
}
