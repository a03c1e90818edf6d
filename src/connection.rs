//! Connection lifecycle for the Redshift datasource
//!
//! One connection serves exactly one plugin operation: Unopened -> Open
//! (after a successful [`open`]) -> Closed (after [`ConnectionHandle::close`]).
//! There are no reconnect or pooled states. Release happens exactly once on
//! every exit path, which the API enforces by making `close` consume the
//! handle.
//!
//! The host wraps connection create/destroy with its own error reporting;
//! [`ConnectionHooks`] is that injection point, reimplemented as explicit
//! callback registrations instead of framework annotations.

use std::future::poll_fn;
use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_postgres::{AsyncMessage, Connection, NoTls};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, error};

use crate::config::{DatasourceConfiguration, SslMode};
use crate::error::{PluginError, Result};

/// Connect timeout for `execute` and `metadata`
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Connect timeout for connectivity tests
pub const TEST_CONNECT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Application name reported to the warehouse (shown in system tables)
pub const APPLICATION_NAME: &str = "redshift-plugin";

type CreateErrorHook = Arc<dyn Fn(&PluginError) + Send + Sync>;
type DestroyedHook = Arc<dyn Fn() + Send + Sync>;

/// Host-provided callbacks observing connection lifecycle outcomes.
///
/// `on_create_error` fires for any failure inside [`open`], configuration or
/// connectivity alike, in addition to the error being returned.
/// `on_destroyed` fires when a handle is released. Neither callback can alter
/// control flow.
#[derive(Clone, Default)]
pub struct ConnectionHooks {
    on_create_error: Option<CreateErrorHook>,
    on_destroyed: Option<DestroyedHook>,
}

impl ConnectionHooks {
    /// Create hooks with no callbacks registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for connection-create failures
    pub fn on_create_error(mut self, hook: impl Fn(&PluginError) + Send + Sync + 'static) -> Self {
        self.on_create_error = Some(Arc::new(hook));
        self
    }

    /// Register a callback for connection release
    pub fn on_destroyed(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_destroyed = Some(Arc::new(hook));
        self
    }

    pub(crate) fn notify_create_error(&self, err: &PluginError) {
        if let Some(hook) = &self.on_create_error {
            hook(err);
        }
    }

    pub(crate) fn notify_destroyed(&self) {
        if let Some(hook) = &self.on_destroyed {
            hook();
        }
    }
}

impl std::fmt::Debug for ConnectionHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHooks")
            .field("on_create_error", &self.on_create_error.is_some())
            .field("on_destroyed", &self.on_destroyed.is_some())
            .finish()
    }
}

/// A live session to the warehouse, owned exclusively by one operation
#[derive(Debug)]
pub struct ConnectionHandle {
    client: tokio_postgres::Client,
    driver: JoinHandle<()>,
    hooks: ConnectionHooks,
}

impl ConnectionHandle {
    /// The driver client for issuing statements
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }

    /// Release the session.
    ///
    /// Best-effort: the caller already holds its result or error, and nothing
    /// that happens during cleanup may replace that outcome. Dropping the
    /// client sends the wire-level termination; aborting the driver task
    /// covers a session that is past talking to us.
    pub fn close(self) {
        drop(self.client);
        self.driver.abort();
        self.hooks.notify_destroyed();
        debug!("connection released");
    }
}

/// Open a connection to the warehouse described by `config`.
///
/// Validates the configuration before any network I/O, then connects with the
/// given timeout, plain or TLS per `ssl_mode`. On success a background task
/// drains the driver's connection messages, logging errors, disconnects,
/// server notifications, and server notices without affecting control flow.
pub async fn open(
    config: &DatasourceConfiguration,
    timeout: Duration,
    hooks: &ConnectionHooks,
) -> Result<ConnectionHandle> {
    let (endpoint, authentication, database) = match config.validate_for_connection() {
        Ok(parts) => parts,
        Err(err) => {
            hooks.notify_create_error(&err);
            return Err(err);
        }
    };

    let mut pg_config = tokio_postgres::Config::new();
    pg_config
        .host(&endpoint.host)
        .port(endpoint.port)
        .user(&authentication.username)
        .password(authentication.password.expose_secret())
        .dbname(database)
        .connect_timeout(timeout)
        .application_name(APPLICATION_NAME);

    debug!(
        "opening connection to {}:{}/{} (ssl_mode: {:?})",
        endpoint.host, endpoint.port, database, config.ssl_mode
    );

    let connected = match config.ssl_mode {
        SslMode::Disable => pg_config
            .connect(NoTls)
            .await
            .map(|(client, connection)| (client, spawn_driver(connection))),
        SslMode::Require => {
            let tls = MakeRustlsConnect::new(relaxed_tls_config());
            pg_config
                .connect(tls)
                .await
                .map(|(client, connection)| (client, spawn_driver(connection)))
        }
    };

    match connected {
        Ok((client, driver)) => Ok(ConnectionHandle {
            client,
            driver,
            hooks: hooks.clone(),
        }),
        Err(e) => {
            let err = PluginError::connection_from("failed to connect to Redshift", &e);
            hooks.notify_create_error(&err);
            Err(err)
        }
    }
}

/// Drive the connection, logging diagnostic events until the session ends
fn spawn_driver<S, T>(mut connection: Connection<S, T>) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match poll_fn(|cx| connection.poll_message(cx)).await {
                Some(Ok(AsyncMessage::Notice(notice))) => {
                    debug!("server notice ({}): {}", notice.severity(), notice.message());
                }
                Some(Ok(AsyncMessage::Notification(n))) => {
                    debug!("server notification on '{}': {}", n.channel(), n.payload());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("connection error: {}", e);
                    break;
                }
                None => {
                    debug!("connection terminated by server");
                    break;
                }
            }
        }
    })
}

/// TLS configuration for [`SslMode::Require`]: encrypt the session but accept
/// the server certificate without verification. Deliberate relaxed-trust mode
/// for clusters fronted by self-signed certificates; verified TLS is a
/// tracked security follow-up.
fn relaxed_tls_config() -> ClientConfig {
    ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(danger::NoCertificateVerification::new(
            rustls::crypto::ring::default_provider(),
        )))
        .with_no_client_auth()
}

/// TLS verifier that accepts any server certificate
mod danger {
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, Error, SignatureScheme};

    #[derive(Debug)]
    pub struct NoCertificateVerification(rustls::crypto::CryptoProvider);

    impl NoCertificateVerification {
        pub fn new(provider: rustls::crypto::CryptoProvider) -> Self {
            Self(provider)
        }
    }

    impl ServerCertVerifier for NoCertificateVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            rustls::crypto::verify_tls12_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            rustls::crypto::verify_tls13_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }
}
