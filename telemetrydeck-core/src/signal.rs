//! Signal assembly for the TelemetryDeck ingest API
//!
//! A signal is one event. On the wire it travels as a JSON array of
//! signal bodies; this library always sends exactly one per request.

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::{Error, Result};

/// Caller-supplied signal payload
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Payload key carrying the operating system name
pub const OPERATING_SYSTEM_KEY: &str = "TelemetryDeck.Device.operatingSystem";
/// Payload key carrying the CPU architecture
pub const ARCHITECTURE_KEY: &str = "TelemetryDeck.Device.architecture";
/// Payload key carrying [`SDK_NAME_AND_VERSION`]
pub const SDK_NAME_AND_VERSION_KEY: &str = "TelemetryDeck.SDK.nameAndVersion";

/// Identifies this library in every signal
pub const SDK_NAME_AND_VERSION: &str = concat!("telemetrydeck-rs/", env!("CARGO_PKG_VERSION"));

/// Signal envelope
///
/// Field names match the ingest v2 API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBody {
    #[serde(rename = "appID")]
    pub app_id: String,

    /// Salted hash of the user ID
    #[serde(rename = "clientUser")]
    pub client_user: String,

    #[serde(rename = "sessionID")]
    pub session_id: String,

    #[serde(rename = "isTestMode")]
    pub is_test_mode: bool,

    #[serde(rename = "type")]
    pub signal_type: String,

    pub payload: Payload,
}

/// Build the request body for one signal.
///
/// The standard device and SDK fields are written into the payload,
/// replacing any caller values under the same keys.
pub fn build_signal(
    client: &Client,
    signal_type: &str,
    payload: Option<Payload>,
) -> Result<Vec<SignalBody>> {
    if signal_type.is_empty() {
        return Err(Error::MissingSignalType);
    }

    let mut payload = payload.unwrap_or_default();
    payload.insert(
        OPERATING_SYSTEM_KEY.to_string(),
        std::env::consts::OS.into(),
    );
    payload.insert(ARCHITECTURE_KEY.to_string(), std::env::consts::ARCH.into());
    payload.insert(
        SDK_NAME_AND_VERSION_KEY.to_string(),
        SDK_NAME_AND_VERSION.into(),
    );

    let signal = SignalBody {
        app_id: client.app_id().to_string(),
        client_user: client.user_id_hash().to_string(),
        session_id: client.session_id().to_string(),
        is_test_mode: client.is_test_mode(),
        signal_type: signal_type.to_string(),
        payload,
    };

    Ok(vec![signal])
}
