//! TelemetryDeck client
//!
//! A [`Client`] represents one user of one application. It is configured
//! once, from an app ID and an ordered list of [`ClientOption`]s, and then
//! reused for every signal the application sends.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::dispatch::{self, Delivery, ExchangeContext};
use crate::error::{Error, Result};
use crate::identity::{generate_fallback_user_id, hash_user_id};
use crate::signal::{build_signal, Payload};
use crate::sink::{DiagnosticSink, NullSink};

/// The TelemetryDeck ingest v2 endpoint
pub const DEFAULT_ENDPOINT: &str = "https://nom.telemetrydeck.com/v2/";

/// A single configuration change applied on top of the client defaults
///
/// Options are applied in order; when two options touch the same field
/// the later one wins.
#[derive(Clone)]
pub enum ClientOption {
    /// Alternative ingest endpoint, mainly for tests
    Endpoint(String),
    /// Where delivery failures are reported
    DiagnosticSink(Arc<dyn DiagnosticSink>),
    /// Salt appended to the user ID before hashing (recommended)
    HashSalt(String),
    /// Explicit user identifier, replacing the machine fingerprint
    UserId(String),
    /// Session identifier, replacing the generated UUID
    SessionId(String),
    /// Mark signals as test data and report failures in detail
    TestMode,
    /// Per-request timeout; without it the transport default applies
    Timeout(Duration),
    /// Custom HTTP client, e.g. with proxy settings
    HttpClient(reqwest::Client),
}

impl ClientOption {
    fn apply(self, client: &mut Client) {
        match self {
            ClientOption::Endpoint(endpoint) => client.endpoint = endpoint,
            ClientOption::DiagnosticSink(sink) => client.sink = sink,
            ClientOption::HashSalt(salt) => {
                client.hash_salt = salt;
                client.user_id_hash = hash_user_id(&client.user_id, &client.hash_salt);
            }
            ClientOption::UserId(user_id) => {
                client.user_id = user_id;
                client.user_id_hash = hash_user_id(&client.user_id, &client.hash_salt);
            }
            ClientOption::SessionId(session_id) => client.session_id = session_id,
            ClientOption::TestMode => client.test_mode = true,
            ClientOption::Timeout(timeout) => client.timeout = Some(timeout),
            ClientOption::HttpClient(http_client) => client.http_client = http_client,
        }
    }
}

impl fmt::Debug for ClientOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientOption::Endpoint(e) => f.debug_tuple("Endpoint").field(e).finish(),
            ClientOption::DiagnosticSink(_) => f.write_str("DiagnosticSink(..)"),
            ClientOption::HashSalt(_) => f.write_str("HashSalt(..)"),
            ClientOption::UserId(u) => f.debug_tuple("UserId").field(u).finish(),
            ClientOption::SessionId(s) => f.debug_tuple("SessionId").field(s).finish(),
            ClientOption::TestMode => f.write_str("TestMode"),
            ClientOption::Timeout(t) => f.debug_tuple("Timeout").field(t).finish(),
            ClientOption::HttpClient(_) => f.write_str("HttpClient(..)"),
        }
    }
}

/// Client for the TelemetryDeck ingest API
#[derive(Clone)]
pub struct Client {
    http_client: reqwest::Client,
    app_id: String,
    endpoint: String,
    hash_salt: String,
    user_id: String,
    /// Always `hash_user_id(user_id, hash_salt)`
    user_id_hash: String,
    session_id: String,
    test_mode: bool,
    timeout: Option<Duration>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Client {
    /// Create a client and start a new session.
    ///
    /// The app ID is the only required parameter. Defaults are the
    /// production endpoint, a random session UUID, and a user ID derived
    /// from the local machine; `options` override them left to right.
    pub fn new(
        app_id: impl Into<String>,
        options: impl IntoIterator<Item = ClientOption>,
    ) -> Result<Self> {
        let app_id = app_id.into();
        if app_id.is_empty() {
            return Err(Error::MissingAppId);
        }

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        let user_id = generate_fallback_user_id();
        let user_id_hash = hash_user_id(&user_id, "");

        let mut client = Self {
            http_client,
            app_id,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            hash_salt: String::new(),
            user_id,
            user_id_hash,
            session_id: uuid::Uuid::new_v4().to_string(),
            test_mode: false,
            timeout: None,
            sink: Arc::new(NullSink),
        };

        for option in options {
            option.apply(&mut client);
        }

        tracing::debug!(
            app_id = %client.app_id,
            endpoint = %client.endpoint,
            session_id = %client.session_id,
            test_mode = client.test_mode,
            "TelemetryDeck client created"
        );

        Ok(client)
    }

    /// Start building a client for `app_id`
    pub fn builder(app_id: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            app_id: app_id.into(),
            options: Vec::new(),
        }
    }

    /// Create a client from the `[client]` table of the config file
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let app_id = config.app_id.clone().unwrap_or_default();
        Self::new(app_id, config.to_options())
    }

    /// Send a signal without waiting for the result.
    ///
    /// Returns once the request has been built; the HTTP exchange runs on
    /// a detached background task. Delivery failures never show up here,
    /// they go to the diagnostic sink.
    ///
    /// The task is spawned on the current tokio runtime if there is one,
    /// otherwise on a shared background runtime. On a current-thread
    /// runtime the request only goes out once the caller yields. There is
    /// no limit on the number of sends in flight.
    pub fn send_signal(&self, signal_type: &str, payload: Option<Payload>) -> Result<()> {
        let signals = build_signal(self, signal_type, payload)?;
        let prepared = dispatch::prepare(self, &signals)?;
        dispatch::spawn_detached(self.exchange_context(), prepared);
        Ok(())
    }

    /// Send a signal and wait for the exchange to finish.
    ///
    /// Local errors are returned exactly as for [`send_signal`](Self::send_signal);
    /// the delivery outcome is reported as a [`Delivery`] and also goes
    /// to the diagnostic sink.
    pub async fn deliver(&self, signal_type: &str, payload: Option<Payload>) -> Result<Delivery> {
        let signals = build_signal(self, signal_type, payload)?;
        let prepared = dispatch::prepare(self, &signals)?;
        Ok(dispatch::exchange(self.exchange_context(), prepared).await)
    }

    fn exchange_context(&self) -> ExchangeContext {
        ExchangeContext {
            http_client: self.http_client.clone(),
            test_mode: self.test_mode,
            sink: Arc::clone(&self.sink),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The unhashed user ID
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The salted user ID hash, the only user identifier that is sent
    pub fn user_id_hash(&self) -> &str {
        &self.user_id_hash
    }

    pub fn hash_salt(&self) -> &str {
        &self.hash_salt
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("app_id", &self.app_id)
            .field("endpoint", &self.endpoint)
            .field("user_id_hash", &self.user_id_hash)
            .field("session_id", &self.session_id)
            .field("test_mode", &self.test_mode)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder collecting [`ClientOption`]s in call order
#[derive(Debug)]
pub struct ClientBuilder {
    app_id: String,
    options: Vec<ClientOption>,
}

impl ClientBuilder {
    pub fn endpoint(self, endpoint: impl Into<String>) -> Self {
        self.option(ClientOption::Endpoint(endpoint.into()))
    }

    pub fn diagnostic_sink(self, sink: impl DiagnosticSink + 'static) -> Self {
        self.option(ClientOption::DiagnosticSink(Arc::new(sink)))
    }

    pub fn hash_salt(self, salt: impl Into<String>) -> Self {
        self.option(ClientOption::HashSalt(salt.into()))
    }

    pub fn user_id(self, user_id: impl Into<String>) -> Self {
        self.option(ClientOption::UserId(user_id.into()))
    }

    pub fn session_id(self, session_id: impl Into<String>) -> Self {
        self.option(ClientOption::SessionId(session_id.into()))
    }

    pub fn test_mode(self) -> Self {
        self.option(ClientOption::TestMode)
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.option(ClientOption::Timeout(timeout))
    }

    pub fn http_client(self, http_client: reqwest::Client) -> Self {
        self.option(ClientOption::HttpClient(http_client))
    }

    /// Append an arbitrary option
    pub fn option(mut self, option: ClientOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn build(self) -> Result<Client> {
        Client::new(self.app_id, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    const APP_ID: &str = "11111111-2222-3333-4444-555555555555";

    #[test]
    fn test_empty_app_id_rejected() {
        let err = Client::builder("").build().unwrap_err();
        assert!(matches!(err, Error::MissingAppId));
    }

    #[test]
    fn test_defaults() {
        let client = Client::builder(APP_ID).build().unwrap();

        assert_eq!(client.app_id(), APP_ID);
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(client.hash_salt(), "");
        assert_eq!(client.user_id(), generate_fallback_user_id());
        assert_eq!(client.user_id_hash(), hash_user_id(client.user_id(), ""));
        assert!(uuid::Uuid::parse_str(client.session_id()).is_ok());
        assert!(!client.is_test_mode());
    }

    #[test]
    fn test_each_client_gets_a_new_session() {
        let a = Client::builder(APP_ID).build().unwrap();
        let b = Client::builder(APP_ID).build().unwrap();
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_user_id_then_salt() {
        let client = Client::builder(APP_ID)
            .user_id("somebody@example.com")
            .hash_salt("MySalt")
            .build()
            .unwrap();
        assert_eq!(
            client.user_id_hash(),
            "c05dc5334d83cca7382bca040f2f6e9de56d57d22814cfc4c39b5a55dbc9ef16"
        );
    }

    #[test]
    fn test_salt_then_user_id() {
        let client = Client::builder(APP_ID)
            .hash_salt("MySalt")
            .user_id("somebody@example.com")
            .build()
            .unwrap();
        assert_eq!(
            client.user_id_hash(),
            "c05dc5334d83cca7382bca040f2f6e9de56d57d22814cfc4c39b5a55dbc9ef16"
        );
    }

    #[test]
    fn test_salt_alone_rehashes_fallback_id() {
        let client = Client::builder(APP_ID).hash_salt("pepper").build().unwrap();
        assert_eq!(
            client.user_id_hash(),
            hash_user_id(&generate_fallback_user_id(), "pepper")
        );
    }

    #[test]
    fn test_later_options_win() {
        let client = Client::new(
            APP_ID,
            [
                ClientOption::Endpoint("http://first.invalid/".to_string()),
                ClientOption::UserId("first".to_string()),
                ClientOption::SessionId("s1".to_string()),
                ClientOption::Endpoint("http://second.invalid/".to_string()),
                ClientOption::UserId("second".to_string()),
                ClientOption::SessionId("s2".to_string()),
            ],
        )
        .unwrap();

        assert_eq!(client.endpoint(), "http://second.invalid/");
        assert_eq!(client.user_id(), "second");
        assert_eq!(client.user_id_hash(), hash_user_id("second", ""));
        assert_eq!(client.session_id(), "s2");
    }

    #[test]
    fn test_builder_options() {
        let sink = MemorySink::new();
        let client = Client::builder(APP_ID)
            .endpoint("http://localhost:9/v2/")
            .diagnostic_sink(sink)
            .session_id("fixed")
            .timeout(Duration::from_secs(2))
            .test_mode()
            .build()
            .unwrap();

        assert_eq!(client.endpoint(), "http://localhost:9/v2/");
        assert_eq!(client.session_id(), "fixed");
        assert_eq!(client.timeout(), Some(Duration::from_secs(2)));
        assert!(client.is_test_mode());
    }

    #[test]
    fn test_debug_hides_raw_user_id() {
        let client = Client::builder(APP_ID)
            .user_id("somebody@example.com")
            .build()
            .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("somebody@example.com"));
        assert!(debug.contains(client.user_id_hash()));
    }
}
