//! Protocol constants and configuration defaults

use std::time::Duration;

/// Default per-attempt request timeout (200ms), applied when [`Options`](crate::Options)
/// carries a zero timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(200);

/// Default number of extra attempts for read operations (no retry).
pub const DEFAULT_READ_RETRY_COUNT: u32 = 0;

/// Maximum number of queued events per listener before dropping
pub const DEFAULT_EVENT_QUEUE_SIZE: usize = 1000;

/// Root token of every subject exchanged with the ARI gateway
pub const DEFAULT_SUBJECT_PREFIX: &str = "ari";

/// Default NATS server URL used by the live tests and examples
pub const DEFAULT_NATS_URL: &str = "nats://127.0.0.1:4222";

/// Subject token under which the gateway publishes ARI events
pub const EVENTS_TOKEN: &str = "events";

/// Prefix for per-request reply inboxes on the in-memory transport
pub const INBOX_PREFIX: &str = "_INBOX";

/// Subject wildcard matching exactly one token
pub const WILDCARD_TOKEN: &str = "*";
/// Subject wildcard matching one or more trailing tokens
pub const WILDCARD_TAIL: &str = ">";
