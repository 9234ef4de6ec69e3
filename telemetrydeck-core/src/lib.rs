//! # telemetrydeck-core
//!
//! Client library for sending usage signals to TelemetryDeck.
//!
//! This library provides:
//! - Pseudo-anonymous user identity with salted SHA-256 hashing
//! - Client configuration through ordered options or a config file
//! - Signal assembly in the ingest v2 wire format
//! - Fire-and-forget dispatch with failures routed to a diagnostic sink
//!
//! ## Example
//!
//! ```rust,no_run
//! use telemetrydeck_core::{Client, Payload};
//!
//! # fn main() -> telemetrydeck_core::Result<()> {
//! let app_id = std::env::var("TELEMETRY_APP_ID").unwrap_or_default();
//! let salt = std::env::var("TELEMETRY_USER_HASH_SALT").unwrap_or_default();
//!
//! let client = Client::builder(app_id)
//!     .user_id("somebody@example.com")
//!     .hash_salt(salt)
//!     .build()?;
//!
//! let mut payload = Payload::new();
//! payload.insert("command".to_string(), "create".into());
//! client.send_signal("MyNamespace.mySignalType", Some(payload))?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use client::{Client, ClientBuilder, ClientOption, DEFAULT_ENDPOINT};
pub use config::Config;
pub use dispatch::Delivery;
pub use error::{Error, Result};
pub use identity::{generate_fallback_user_id, hash_user_id};
pub use signal::{build_signal, Payload, SignalBody, SDK_NAME_AND_VERSION};
pub use sink::{DiagnosticSink, MemorySink, NullSink, TracingSink};

// Public modules
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod signal;
pub mod sink;

mod dispatch;
