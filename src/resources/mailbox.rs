//! Voicemail mailboxes (message waiting indication).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::MAILBOXES;
use crate::connection::Connection;
use crate::error::AriResult;

/// Mailbox message counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct MailboxData {
    pub name: String,
    pub old_messages: u32,
    pub new_messages: u32,
}

#[derive(Serialize)]
struct Counts {
    old_messages: u32,
    new_messages: u32,
}

/// Mailbox operations.
#[derive(Debug, Clone)]
pub struct MailboxClient {
    conn: Arc<Connection>,
}

impl MailboxClient {
    pub(crate) fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    fn subject(&self, action: &str, name: Option<&str>) -> String {
        self.conn
            .subject(MAILBOXES, action, name)
    }

    pub async fn list(&self) -> AriResult<Vec<MailboxData>> {
        self.conn
            .read(&self.subject("list", None))
            .await
    }

    pub async fn get(&self, name: &str) -> AriResult<MailboxData> {
        self.conn
            .read(&self.subject("get", Some(name)))
            .await
    }

    /// Set message counts, creating the mailbox if needed.
    pub async fn update(&self, name: &str, old_messages: u32, new_messages: u32) -> AriResult<()> {
        self.conn
            .write(
                &self.subject("update", Some(name)),
                &Counts {
                    old_messages,
                    new_messages,
                },
            )
            .await
    }

    pub async fn delete(&self, name: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("delete", Some(name)))
            .await
    }
}
