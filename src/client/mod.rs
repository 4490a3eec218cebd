//! Client layer: builds requests, calls the Mailer service and maps results back.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, ClientTlsConfig};
use tracing::Instrument as _;

use crate::domain::{
    AuthToken, Content, Endpoint, Recipient, SendOptions, SendRequest, SendResult, Sender,
    ValidationError,
};
use crate::transport::{MailerClient, SendRes, TransportError, WireRequest};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

trait MailerTransport: Send + Sync {
    fn call<'a>(
        &'a self,
        request: WireRequest,
        authorization: &'a MetadataValue<Ascii>,
    ) -> BoxFuture<'a, Result<SendRes, tonic::Status>>;
}

/// Wrap `message` in a request carrying the `authorization` metadata entry.
fn authorized<M>(message: M, authorization: &MetadataValue<Ascii>) -> tonic::Request<M> {
    let mut request = tonic::Request::new(message);
    request
        .metadata_mut()
        .insert(AuthToken::METADATA_KEY, authorization.clone());
    request
}

#[derive(Debug, Clone)]
struct GrpcTransport {
    client: MailerClient,
}

impl MailerTransport for GrpcTransport {
    fn call<'a>(
        &'a self,
        request: WireRequest,
        authorization: &'a MetadataValue<Ascii>,
    ) -> BoxFuture<'a, Result<SendRes, tonic::Status>> {
        Box::pin(async move {
            // Channel handles are cheap to clone.
            let mut client = self.client.clone();
            let response = match request {
                WireRequest::Html(message) => {
                    client
                        .send_html(authorized(message, authorization))
                        .await?
                }
                WireRequest::Template(message) => {
                    client
                        .send_template(authorized(message, authorization))
                        .await?
                }
            };
            Ok(response.into_inner())
        })
    }
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`KannonClient`].
///
/// RPC failures are passed through untouched: the `tonic::Status` keeps the code and
/// message reported by the channel or the Kannon service.
pub enum KannonError {
    /// The call was rejected by the channel or by the service (auth, network, invalid input).
    #[error("rpc error: {0}")]
    Rpc(#[from] tonic::Status),

    /// The gRPC channel could not be set up (TLS configuration, URI).
    #[error("channel error: {0}")]
    Channel(#[from] tonic::transport::Error),

    /// The service answered with a response that could not be mapped to a result.
    #[error("decode error: {0}")]
    Decode(#[from] TransportError),

    /// The client configuration was rejected.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Connection settings for [`KannonClient`].
///
/// `endpoint` is the preferred form. `host` is the older spelling and is still
/// accepted; `skip_tls` only affects values without an explicit scheme. A bare host
/// without a port dials 443 whether or not TLS is used.
pub struct KannonConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, alias = "skipTLS")]
    pub skip_tls: bool,
}

impl KannonConfig {
    /// Config pointing at `endpoint` (`host:port`, `http://...` or `https://...`).
    pub fn endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    /// Config in the legacy `host` form.
    #[deprecated(note = "use `KannonConfig::endpoint`")]
    pub fn host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Self::default()
        }
    }

    /// Resolve into a single [`Endpoint`].
    ///
    /// When both `endpoint` and `host` are set they must resolve to the same target.
    pub fn resolve(&self) -> Result<Endpoint, ValidationError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .filter(|value| !value.trim().is_empty());
        let host = self.host.as_deref().filter(|value| !value.trim().is_empty());

        match (endpoint, host) {
            (Some(endpoint), Some(host)) => {
                let resolved = Endpoint::parse(endpoint, self.skip_tls)?;
                if Endpoint::parse(host, self.skip_tls)? != resolved {
                    return Err(ValidationError::ConflictingEndpoint {
                        endpoint: endpoint.to_owned(),
                        host: host.to_owned(),
                    });
                }
                Ok(resolved)
            }
            (Some(value), None) | (None, Some(value)) => Endpoint::parse(value, self.skip_tls),
            (None, None) => Err(ValidationError::Empty {
                field: Endpoint::FIELD,
            }),
        }
    }
}

#[derive(Clone)]
/// Builder for [`KannonClient`].
///
/// Use this when you need request/connect timeouts or a custom user-agent.
pub struct KannonClientBuilder {
    domain: String,
    api_key: String,
    sender: Sender,
    config: KannonConfig,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl std::fmt::Debug for KannonClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KannonClientBuilder")
            .field("domain", &self.domain)
            .field("sender", &self.sender)
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl KannonClientBuilder {
    pub fn new(
        domain: impl Into<String>,
        api_key: impl Into<String>,
        sender: Sender,
        config: KannonConfig,
    ) -> Self {
        Self {
            domain: domain.into(),
            api_key: api_key.into(),
            sender,
            config,
            timeout: None,
            connect_timeout: None,
            user_agent: None,
        }
    }

    /// Per-request deadline, enforced by the channel.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Deadline for establishing the underlying connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Override the HTTP/2 `user-agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build a [`KannonClient`].
    ///
    /// The channel connects lazily on first use, so this must run inside a Tokio
    /// runtime but does not touch the network.
    pub fn build(self) -> Result<KannonClient, KannonError> {
        let endpoint = self.config.resolve()?;
        let token = AuthToken::encode(&self.domain, &self.api_key);
        let authorization = MetadataValue::try_from(token.authorization()).map_err(|_| {
            ValidationError::InvalidMetadata {
                key: AuthToken::METADATA_KEY,
            }
        })?;

        let mut builder = Channel::from_shared(endpoint.as_str().to_owned()).map_err(|err| {
            ValidationError::InvalidEndpoint {
                input: endpoint.to_string(),
                reason: err.to_string(),
            }
        })?;
        if endpoint.uses_tls() {
            builder = builder.tls_config(ClientTlsConfig::new().with_native_roots())?;
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent)?;
        }

        tracing::debug!(endpoint = %endpoint, tls = endpoint.uses_tls(), "kannon channel configured");

        Ok(KannonClient {
            sender: self.sender,
            authorization,
            transport: Arc::new(GrpcTransport {
                client: MailerClient::new(builder.connect_lazy()),
            }),
        })
    }
}

#[derive(Clone)]
/// High-level Kannon client.
///
/// Holds the fixed sender, the encoded credential and a shared gRPC channel. Each
/// send is one independent unary call; clones share the channel and may be used
/// concurrently.
pub struct KannonClient {
    sender: Sender,
    authorization: MetadataValue<Ascii>,
    transport: Arc<dyn MailerTransport>,
}

impl std::fmt::Debug for KannonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KannonClient")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl KannonClient {
    /// Create a client for `domain` authenticated with `api_key`.
    ///
    /// For timeouts or a custom user-agent, use [`KannonClient::builder`].
    pub fn new(
        domain: impl Into<String>,
        api_key: impl Into<String>,
        sender: Sender,
        config: KannonConfig,
    ) -> Result<Self, KannonError> {
        KannonClientBuilder::new(domain, api_key, sender, config).build()
    }

    /// Start building a client with custom settings.
    pub fn builder(
        domain: impl Into<String>,
        api_key: impl Into<String>,
        sender: Sender,
        config: KannonConfig,
    ) -> KannonClientBuilder {
        KannonClientBuilder::new(domain, api_key, sender, config)
    }

    /// Sender attached to every request from this client.
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Send an inline HTML email.
    ///
    /// Errors:
    /// - [`KannonError::Rpc`] when the channel or the service rejects the call,
    /// - [`KannonError::Decode`] when the response is missing required data.
    pub async fn send_html<I, R>(
        &self,
        recipients: I,
        subject: impl Into<String>,
        html: impl Into<String>,
        options: SendOptions,
    ) -> Result<SendResult, KannonError>
    where
        I: IntoIterator<Item = R>,
        R: Into<Recipient>,
    {
        self.send(Content::Html(html.into()), recipients, subject, options)
            .await
    }

    /// Send an email rendered from a template stored on the Kannon server.
    ///
    /// Errors are the same as for [`KannonClient::send_html`].
    pub async fn send_template<I, R>(
        &self,
        recipients: I,
        subject: impl Into<String>,
        template_id: impl Into<String>,
        options: SendOptions,
    ) -> Result<SendResult, KannonError>
    where
        I: IntoIterator<Item = R>,
        R: Into<Recipient>,
    {
        self.send(
            Content::Template(template_id.into()),
            recipients,
            subject,
            options,
        )
        .await
    }

    async fn send<I, R>(
        &self,
        content: Content,
        recipients: I,
        subject: impl Into<String>,
        options: SendOptions,
    ) -> Result<SendResult, KannonError>
    where
        I: IntoIterator<Item = R>,
        R: Into<Recipient>,
    {
        let request = SendRequest::build(content, recipients, subject, &self.sender, options);
        let span = tracing::debug_span!(
            "kannon.send",
            kind = request.content().kind(),
            recipients = request.recipients().len(),
        );

        async move {
            let wire = crate::transport::encode_send_request(request);
            tracing::debug!(rpc = wire.rpc_name(), "dispatching send");

            let response = self
                .transport
                .call(wire, &self.authorization)
                .await
                .inspect_err(|status| {
                    tracing::warn!(code = ?status.code(), message = status.message(), "send rejected");
                })?;

            let result = crate::transport::decode_send_res(response)?;
            tracing::debug!(message_id = %result.message_id, "send accepted");
            Ok(result)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use crate::domain::{Attachment, Fields};

    use super::*;

    #[derive(Debug, Clone)]
    struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
    }

    #[derive(Debug)]
    struct FakeTransportState {
        calls: Vec<(WireRequest, String)>,
        response: Result<SendRes, tonic::Status>,
    }

    impl FakeTransport {
        fn new(response: Result<SendRes, tonic::Status>) -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeTransportState {
                    calls: Vec::new(),
                    response,
                })),
            }
        }

        fn ok(message_id: &str, template_id: &str) -> Self {
            Self::new(Ok(SendRes {
                message_id: message_id.to_owned(),
                template_id: template_id.to_owned(),
                scheduled_time: None,
            }))
        }

        fn last_request(&self) -> (WireRequest, String) {
            let state = self.state.lock().unwrap();
            state.calls.last().cloned().expect("no call recorded")
        }

        fn call_count(&self) -> usize {
            self.state.lock().unwrap().calls.len()
        }
    }

    impl MailerTransport for FakeTransport {
        fn call<'a>(
            &'a self,
            request: WireRequest,
            authorization: &'a MetadataValue<Ascii>,
        ) -> BoxFuture<'a, Result<SendRes, tonic::Status>> {
            Box::pin(async move {
                let authorization = authorization.to_str().unwrap().to_owned();
                let mut state = self.state.lock().unwrap();
                state.calls.push((request, authorization));
                state.response.clone()
            })
        }
    }

    fn sender() -> Sender {
        Sender::new("test@example.com", "Test Sender")
    }

    fn test_authorization() -> MetadataValue<Ascii> {
        MetadataValue::try_from(
            AuthToken::encode("test.example.com", "test-api-key").authorization(),
        )
        .unwrap()
    }

    fn make_client(transport: FakeTransport) -> KannonClient {
        KannonClient {
            sender: sender(),
            authorization: test_authorization(),
            transport: Arc::new(transport),
        }
    }

    #[tokio::test]
    async fn send_html_attaches_basic_credential_and_maps_result() {
        let transport = FakeTransport::ok("msg-123", "tpl-456");
        let client = make_client(transport.clone());

        let result = client
            .send_html(
                ["user@example.com"],
                "Test Subject",
                "<p>Test</p>",
                SendOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.message_id, "msg-123");
        assert_eq!(result.template_id, "tpl-456");

        let (wire, authorization) = transport.last_request();
        assert_eq!(
            authorization,
            "Basic dGVzdC5leGFtcGxlLmNvbTp0ZXN0LWFwaS1rZXk="
        );
        let WireRequest::Html(wire) = wire else {
            panic!("expected SendHTML payload");
        };
        assert_eq!(wire.subject, "Test Subject");
        assert_eq!(wire.html, "<p>Test</p>");
        assert_eq!(wire.sender.as_ref().map(|s| s.email.as_str()), Some("test@example.com"));
        assert_eq!(wire.sender.as_ref().map(|s| s.alias.as_str()), Some("Test Sender"));
        assert!(wire.scheduled_time.is_some());
        assert!(wire.attachments.is_empty());
        assert!(wire.global_fields.is_empty());
    }

    #[test]
    fn grpc_requests_carry_basic_authorization_metadata() {
        let authorization = test_authorization();
        let expected = "Basic dGVzdC5leGFtcGxlLmNvbTp0ZXN0LWFwaS1rZXk=";

        for content in [
            Content::Html("<p>hi</p>".to_owned()),
            Content::Template("tpl".to_owned()),
        ] {
            let request = SendRequest::build(
                content,
                ["a@example.com"],
                "s",
                &sender(),
                SendOptions::default(),
            );
            let metadata = match crate::transport::encode_send_request(request) {
                WireRequest::Html(message) => {
                    authorized(message, &authorization).metadata().clone()
                }
                WireRequest::Template(message) => {
                    authorized(message, &authorization).metadata().clone()
                }
            };
            let value = metadata.get("authorization").expect("missing authorization");
            assert_eq!(value.to_str().unwrap(), expected);
            assert_eq!(metadata.len(), 1);
        }
    }

    #[tokio::test]
    async fn builder_encodes_authorization_once() {
        let client = KannonClient::new(
            "test.example.com",
            "test-api-key",
            sender(),
            KannonConfig::endpoint("http://localhost:9090"),
        )
        .unwrap();
        assert_eq!(client.authorization, test_authorization());
    }

    #[tokio::test]
    async fn send_template_uses_template_rpc() {
        let transport = FakeTransport::ok("msg-1", "welcome-template");
        let client = make_client(transport.clone());

        let mut fields = Fields::new();
        fields.insert("name".to_owned(), "John".to_owned());
        let recipients = vec![
            Recipient::with_fields("u@example.com", fields.clone()),
            Recipient::from("u2@example.com"),
        ];

        let result = client
            .send_template(
                recipients,
                "Welcome",
                "welcome-template",
                SendOptions::default().global_field("company", "ACME"),
            )
            .await
            .unwrap();
        assert_eq!(result.template_id, "welcome-template");

        let (wire, _) = transport.last_request();
        let WireRequest::Template(wire) = wire else {
            panic!("expected SendTemplate payload");
        };
        assert_eq!(wire.template_id, "welcome-template");
        assert_eq!(wire.recipients.len(), 2);
        assert_eq!(wire.recipients[0].fields, fields);
        assert!(wire.recipients[1].fields.is_empty());
        assert_eq!(
            wire.global_fields,
            BTreeMap::from([("company".to_owned(), "ACME".to_owned())])
        );
    }

    #[tokio::test]
    async fn send_forwards_scheduled_time_and_attachments() {
        let transport = FakeTransport::ok("m", "t");
        let client = make_client(transport.clone());
        let scheduled = chrono::DateTime::from_timestamp(1_900_000_000, 0).unwrap();
        let content = vec![7u8; 1024 * 1024];

        client
            .send_html(
                ["a@example.com"],
                "s",
                "h",
                SendOptions::default()
                    .scheduled_at(scheduled)
                    .attachment(Attachment::new("big.bin", content.clone())),
            )
            .await
            .unwrap();

        let (WireRequest::Html(wire), _) = transport.last_request() else {
            panic!("expected SendHTML payload");
        };
        assert_eq!(
            wire.scheduled_time,
            Some(prost_types::Timestamp {
                seconds: 1_900_000_000,
                nanos: 0,
            })
        );
        assert_eq!(wire.attachments[0].filename, "big.bin");
        assert_eq!(wire.attachments[0].content, content);
    }

    #[tokio::test]
    async fn send_html_propagates_rpc_error_unchanged() {
        let transport = FakeTransport::new(Err(tonic::Status::unauthenticated(
            "Invalid API key",
        )));
        let client = make_client(transport);

        let err = client
            .send_html(["a@example.com"], "s", "h", SendOptions::default())
            .await
            .unwrap_err();
        match err {
            KannonError::Rpc(status) => {
                assert_eq!(status.code(), tonic::Code::Unauthenticated);
                assert_eq!(status.message(), "Invalid API key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_template_propagates_rpc_error_text() {
        let transport = FakeTransport::new(Err(tonic::Status::unavailable("gRPC error")));
        let client = make_client(transport);

        let err = client
            .send_template(["a@example.com"], "s", "tpl", SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, KannonError::Rpc(_)));
        assert!(err.to_string().contains("gRPC error"));
    }

    #[tokio::test]
    async fn send_maps_malformed_response_to_decode_error() {
        let transport = FakeTransport::ok("", "t");
        let client = make_client(transport);

        let err = client
            .send_html(["a@example.com"], "s", "h", SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KannonError::Decode(TransportError::MissingField { .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_sends_are_independent() {
        let transport = FakeTransport::ok("m", "t");
        let client = make_client(transport.clone());

        let (a, b) = tokio::join!(
            client.send_html(["a@example.com"], "one", "h", SendOptions::default()),
            client.send_template(["b@example.com"], "two", "tpl", SendOptions::default()),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(transport.call_count(), 2);
    }

    #[test]
    fn config_resolves_endpoint_and_legacy_host() {
        let endpoint = KannonConfig::endpoint("api.kannon.email:443")
            .resolve()
            .unwrap();
        assert_eq!(endpoint.as_str(), "https://api.kannon.email");

        #[allow(deprecated)]
        let legacy = KannonConfig::host("api.kannon.email:443").resolve().unwrap();
        assert_eq!(legacy, endpoint);

        let both = KannonConfig {
            endpoint: Some("api.kannon.email:443".to_owned()),
            host: Some("https://api.kannon.email".to_owned()),
            skip_tls: false,
        };
        assert_eq!(both.resolve().unwrap(), endpoint);
    }

    #[test]
    fn config_rejects_conflicting_or_missing_endpoint() {
        let conflicting = KannonConfig {
            endpoint: Some("a.example.com:443".to_owned()),
            host: Some("b.example.com:443".to_owned()),
            skip_tls: false,
        };
        assert!(matches!(
            conflicting.resolve(),
            Err(ValidationError::ConflictingEndpoint { .. })
        ));

        assert!(matches!(
            KannonConfig::default().resolve(),
            Err(ValidationError::Empty { field: "endpoint" })
        ));
    }

    #[test]
    fn config_deserializes_both_forms() {
        let config: KannonConfig =
            serde_json::from_str(r#"{ "endpoint": "localhost:9090", "skipTls": true }"#).unwrap();
        let endpoint = config.resolve().unwrap();
        assert!(!endpoint.uses_tls());

        let legacy: KannonConfig =
            serde_json::from_str(r#"{ "host": "localhost:9090", "skipTLS": true }"#).unwrap();
        assert_eq!(legacy.resolve().unwrap(), endpoint);
    }

    #[tokio::test]
    async fn builder_accepts_secure_and_plaintext_endpoints() {
        let client = KannonClient::builder(
            "example.com",
            "key",
            sender(),
            KannonConfig::endpoint("api.kannon.email:443"),
        )
        .timeout(Duration::from_secs(5))
        .connect_timeout(Duration::from_secs(2))
        .user_agent("kannon-test")
        .build()
        .unwrap();
        assert_eq!(client.sender(), &sender());

        KannonClient::new(
            "localhost",
            "dev-key",
            sender(),
            KannonConfig::endpoint("http://localhost:9090"),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn builder_rejects_invalid_config() {
        let err = KannonClient::new("d", "k", sender(), KannonConfig::default()).unwrap_err();
        assert!(matches!(err, KannonError::Validation(_)));
    }
}
