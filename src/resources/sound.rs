//! Sound files available to `sound:` media URIs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::SOUNDS;
use crate::connection::Connection;
use crate::error::AriResult;

/// A language/format pair a sound exists in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct FormatLang {
    pub language: String,
    pub format: String,
}

/// A sound and the variants installed for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct SoundData {
    pub id: String,
    pub text: Option<String>,
    pub formats: Vec<FormatLang>,
}

/// Optional filter for [`SoundClient::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Sound operations.
#[derive(Debug, Clone)]
pub struct SoundClient {
    conn: Arc<Connection>,
}

impl SoundClient {
    pub(crate) fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    pub async fn list(&self, filter: &SoundFilter) -> AriResult<Vec<SoundData>> {
        self.conn
            .read_with(
                &self
                    .conn
                    .subject(SOUNDS, "list", None),
                filter,
            )
            .await
    }

    pub async fn get(&self, id: &str) -> AriResult<SoundData> {
        self.conn
            .read(
                &self
                    .conn
                    .subject(SOUNDS, "get", Some(id)),
            )
            .await
    }
}
