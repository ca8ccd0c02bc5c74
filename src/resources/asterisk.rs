//! Asterisk system resources: server info, global variables, log channels, modules and
//! dynamic configuration objects.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{VariableBody, ASTERISK, ASTERISK_CONFIG, ASTERISK_LOGGING, ASTERISK_MODULES};
use crate::connection::Connection;
use crate::error::AriResult;

/// Build details of the running Asterisk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct BuildInfo {
    pub os: String,
    pub kernel: String,
    pub machine: String,
    pub options: String,
    pub date: String,
    pub user: String,
}

/// Version and entity id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct SystemInfo {
    pub version: String,
    pub entity_id: String,
}

/// Effective core configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ConfigInfo {
    pub name: String,
    pub default_language: String,
    pub max_channels: Option<u32>,
    pub max_open_files: Option<u32>,
    pub max_load: Option<f64>,
}

/// Startup and last reload times (ISO 8601).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct StatusInfo {
    pub startup_time: String,
    pub last_reload_time: String,
}

/// Reply of [`AsteriskClient::info`]. Sections not requested are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct AsteriskInfo {
    pub build: Option<BuildInfo>,
    pub system: Option<SystemInfo>,
    pub config: Option<ConfigInfo>,
    pub status: Option<StatusInfo>,
}

/// A logger channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogChannel {
    /// Channel name (file name or `console`).
    pub channel: String,
    /// Logger type, e.g. `Console` or `File`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `Enabled` or `Disabled`.
    pub status: String,
    /// Log levels written to this channel.
    pub configuration: String,
}

/// A loaded or loadable module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ModuleData {
    pub name: String,
    pub description: String,
    pub use_count: u32,
    pub status: String,
    pub support_level: String,
}

/// One attribute of a dynamic configuration object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ConfigTuple {
    pub attribute: String,
    pub value: String,
}

impl ConfigTuple {
    /// Build an attribute/value pair.
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

fn no_sections(only: &&[&str]) -> bool {
    only.is_empty()
}

#[derive(Serialize)]
struct InfoFilter<'a> {
    #[serde(skip_serializing_if = "no_sections")]
    only: &'a [&'a str],
}

#[derive(Serialize)]
struct LogConfiguration<'a> {
    configuration: &'a str,
}

#[derive(Serialize)]
struct ConfigObject<'a> {
    config_class: &'a str,
    object_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [ConfigTuple]>,
}

/// `<config_class>/<object_type>/<id>` as a single subject token.
fn config_key(config_class: &str, object_type: &str, id: &str) -> String {
    format!("{}/{}/{}", config_class, object_type, id)
}

/// Asterisk-wide operations.
#[derive(Debug, Clone)]
pub struct AsteriskClient {
    conn: Arc<Connection>,
}

impl AsteriskClient {
    pub(crate) fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    /// Server information. `only` restricts the reply to the named sections
    /// (`build`, `system`, `config`, `status`); empty means all.
    pub async fn info(&self, only: &[&str]) -> AriResult<AsteriskInfo> {
        self.conn
            .read_with(
                &self
                    .conn
                    .subject(ASTERISK, "info", None),
                &InfoFilter { only },
            )
            .await
    }

    /// Value of a global dialplan variable or function.
    pub async fn get_variable(&self, variable: &str) -> AriResult<String> {
        let body = VariableBody {
            variable: Some(variable.to_string()),
            value: String::new(),
        };
        let reply: VariableBody = self
            .conn
            .read_with(
                &self
                    .conn
                    .subject(ASTERISK, "variable_get", None),
                &body,
            )
            .await?;
        Ok(reply.value)
    }

    /// Set a global dialplan variable.
    pub async fn set_variable(&self, variable: &str, value: &str) -> AriResult<()> {
        let body = VariableBody {
            variable: Some(variable.to_string()),
            value: value.to_string(),
        };
        self.conn
            .write(
                &self
                    .conn
                    .subject(ASTERISK, "variable_set", None),
                &body,
            )
            .await
    }

    /// Log channel management.
    pub fn logging(&self) -> LoggingClient {
        LoggingClient {
            conn: self
                .conn
                .clone(),
        }
    }

    /// Module management.
    pub fn modules(&self) -> ModulesClient {
        ModulesClient {
            conn: self
                .conn
                .clone(),
        }
    }

    /// Dynamic configuration objects (sorcery).
    pub fn config(&self) -> ConfigClient {
        ConfigClient {
            conn: self
                .conn
                .clone(),
        }
    }
}

/// Log channel operations.
#[derive(Debug, Clone)]
pub struct LoggingClient {
    conn: Arc<Connection>,
}

impl LoggingClient {
    fn subject(&self, action: &str, channel: Option<&str>) -> String {
        self.conn
            .subject(ASTERISK_LOGGING, action, channel)
    }

    pub async fn list(&self) -> AriResult<Vec<LogChannel>> {
        self.conn
            .read(&self.subject("list", None))
            .await
    }

    /// Create a log channel writing the given comma-separated levels.
    pub async fn create(&self, channel: &str, configuration: &str) -> AriResult<()> {
        self.conn
            .write(
                &self.subject("create", Some(channel)),
                &LogConfiguration { configuration },
            )
            .await
    }

    pub async fn delete(&self, channel: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("delete", Some(channel)))
            .await
    }

    /// Rotate the log file behind `channel`.
    pub async fn rotate(&self, channel: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("rotate", Some(channel)))
            .await
    }
}

/// Module operations.
#[derive(Debug, Clone)]
pub struct ModulesClient {
    conn: Arc<Connection>,
}

impl ModulesClient {
    fn subject(&self, action: &str, module: Option<&str>) -> String {
        self.conn
            .subject(ASTERISK_MODULES, action, module)
    }

    pub async fn list(&self) -> AriResult<Vec<ModuleData>> {
        self.conn
            .read(&self.subject("list", None))
            .await
    }

    pub async fn get(&self, module: &str) -> AriResult<ModuleData> {
        self.conn
            .read(&self.subject("get", Some(module)))
            .await
    }

    pub async fn load(&self, module: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("load", Some(module)))
            .await
    }

    pub async fn unload(&self, module: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("unload", Some(module)))
            .await
    }

    pub async fn reload(&self, module: &str) -> AriResult<()> {
        self.conn
            .write_empty(&self.subject("reload", Some(module)))
            .await
    }
}

/// Dynamic configuration object operations.
///
/// Objects are addressed by class, type and id, e.g.
/// `("res_pjsip", "endpoint", "alice")`.
#[derive(Debug, Clone)]
pub struct ConfigClient {
    conn: Arc<Connection>,
}

impl ConfigClient {
    fn subject(&self, action: &str, key: &str) -> String {
        self.conn
            .subject(ASTERISK_CONFIG, action, Some(key))
    }

    /// Attributes of a configuration object.
    pub async fn get(
        &self,
        config_class: &str,
        object_type: &str,
        id: &str,
    ) -> AriResult<Vec<ConfigTuple>> {
        let key = config_key(config_class, object_type, id);
        self.conn
            .read_with(
                &self.subject("get", &key),
                &ConfigObject {
                    config_class,
                    object_type,
                    fields: None,
                },
            )
            .await
    }

    /// Create or update an object; returns its resulting attributes.
    pub async fn update(
        &self,
        config_class: &str,
        object_type: &str,
        id: &str,
        fields: &[ConfigTuple],
    ) -> AriResult<Vec<ConfigTuple>> {
        let key = config_key(config_class, object_type, id);
        self.conn
            .write_returning(
                &self.subject("update", &key),
                &ConfigObject {
                    config_class,
                    object_type,
                    fields: Some(fields),
                },
            )
            .await
    }

    pub async fn delete(&self, config_class: &str, object_type: &str, id: &str) -> AriResult<()> {
        let key = config_key(config_class, object_type, id);
        self.conn
            .write(
                &self.subject("delete", &key),
                &ConfigObject {
                    config_class,
                    object_type,
                    fields: None,
                },
            )
            .await
    }
}
