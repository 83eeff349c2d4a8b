use std::{net::SocketAddr, sync::Arc};

use monoio::{
    io::{AsyncReadRent, AsyncWriteRent},
    net::TcpStream,
};
use rustls::{pki_types::ServerName, ClientConfig, ClientConnection};

use crate::{conn::TlsConnection, stream::Stream, TlsError};

/// A client-side session over a raw stream.
pub type TlsStream<IO> = Stream<IO, ClientConnection>;

/// A wrapper around a `rustls::ClientConfig`, providing async `connect`
/// methods.
#[derive(Clone)]
pub struct TlsConnector {
    inner: Arc<ClientConfig>,
}

impl From<Arc<ClientConfig>> for TlsConnector {
    fn from(inner: Arc<ClientConfig>) -> TlsConnector {
        TlsConnector { inner }
    }
}

impl From<ClientConfig> for TlsConnector {
    fn from(inner: ClientConfig) -> TlsConnector {
        TlsConnector {
            inner: Arc::new(inner),
        }
    }
}

impl TlsConnector {
    /// Run the client handshake over a caller-supplied stream.
    ///
    /// On handshake failure the transport is shut down (best-effort,
    /// errors discarded) before the failure is returned, so no socket or
    /// session leaks past this call.
    pub async fn connect<IO>(
        &self,
        domain: ServerName<'static>,
        io: IO,
    ) -> Result<TlsStream<IO>, TlsError>
    where
        IO: AsyncReadRent + AsyncWriteRent,
    {
        let session = ClientConnection::new(self.inner.clone(), domain)?;
        let mut stream = Stream::new(io, session);
        if let Err(e) = stream.handshake().await {
            let _ = stream.shutdown().await;
            return Err(e.into());
        }
        Ok(stream)
    }

    /// Dial `(host, port)` and negotiate, returning the raw session
    /// stream and the peer address.
    ///
    /// The certificate is validated against `subject` when given, else
    /// against the literal `host`; the port only selects the dial
    /// address. Socket errors propagate as raised by the socket layer,
    /// with no retry here.
    pub async fn connect_session(
        &self,
        subject: Option<&str>,
        host: &str,
        port: u16,
    ) -> Result<(TlsStream<TcpStream>, SocketAddr), TlsError> {
        let domain = server_identity(subject, host)?;
        let io = TcpStream::connect((host, port)).await?;
        let peer_addr = io.peer_addr()?;
        let stream = self.connect(domain, io).await?;
        Ok((stream, peer_addr))
    }

    /// Dial `(host, port)`, negotiate and adapt into a [`TlsConnection`].
    pub async fn connect_secure(
        &self,
        subject: Option<&str>,
        host: &str,
        port: u16,
    ) -> Result<TlsConnection, TlsError> {
        let (stream, peer_addr) = self.connect_session(subject, host, port).await?;
        Ok(TlsConnection::new(stream, peer_addr))
    }
}

impl std::fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnector").finish()
    }
}

/// The identity the peer certificate is validated against: the override
/// if given, else the literal host.
fn server_identity(subject: Option<&str>, host: &str) -> Result<ServerName<'static>, TlsError> {
    let name = subject.unwrap_or(host);
    Ok(ServerName::try_from(name.to_owned())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_defaults_to_host() {
        let identity = server_identity(None, "example.com").unwrap();
        assert_eq!(identity, ServerName::try_from("example.com").unwrap());
    }

    #[test]
    fn identity_prefers_override() {
        let identity = server_identity(Some("alt.example.com"), "example.com").unwrap();
        assert_eq!(identity, ServerName::try_from("alt.example.com").unwrap());
    }

    #[test]
    fn identity_accepts_ip_literals() {
        let identity = server_identity(None, "127.0.0.1").unwrap();
        assert!(matches!(identity, ServerName::IpAddress(_)));
    }

    #[test]
    fn invalid_identity_is_rejected() {
        let err = server_identity(None, "bad name!").unwrap_err();
        assert!(matches!(err, TlsError::InvalidName(_)));
    }
}
