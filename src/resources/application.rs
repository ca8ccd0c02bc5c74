//! Stasis applications.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::APPLICATIONS;
use crate::connection::Connection;
use crate::error::AriResult;

/// Stasis application as reported by Asterisk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ApplicationData {
    pub name: String,
    pub channel_ids: Vec<String>,
    pub bridge_ids: Vec<String>,
    pub endpoint_ids: Vec<String>,
    pub device_names: Vec<String>,
}

#[derive(Serialize)]
struct EventSource<'a> {
    event_source: &'a str,
}

/// Application operations.
#[derive(Debug, Clone)]
pub struct ApplicationClient {
    conn: Arc<Connection>,
}

impl ApplicationClient {
    pub(crate) fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    fn subject(&self, action: &str, name: Option<&str>) -> String {
        self.conn
            .subject(APPLICATIONS, action, name)
    }

    /// All registered applications.
    pub async fn list(&self) -> AriResult<Vec<ApplicationData>> {
        self.conn
            .read(&self.subject("list", None))
            .await
    }

    pub async fn get(&self, name: &str) -> AriResult<ApplicationData> {
        self.conn
            .read(&self.subject("get", Some(name)))
            .await
    }

    /// Subscribe the application to an event source such as `channel:<id>`,
    /// `bridge:<id>` or `endpoint:<tech>/<resource>`.
    pub async fn subscribe(&self, name: &str, event_source: &str) -> AriResult<ApplicationData> {
        self.conn
            .write_returning(
                &self.subject("subscribe", Some(name)),
                &EventSource { event_source },
            )
            .await
    }

    pub async fn unsubscribe(&self, name: &str, event_source: &str) -> AriResult<ApplicationData> {
        self.conn
            .write_returning(
                &self.subject("unsubscribe", Some(name)),
                &EventSource { event_source },
            )
            .await
    }
}
