use std::sync::Arc;

use monoio::{
    io::{AsyncReadRent, AsyncWriteRent},
    net::TcpListener,
};
use rustls::{ServerConfig, ServerConnection};

use crate::{conn::TlsConnection, stream::Stream, TlsError};

/// A server-side session over a raw stream.
pub type TlsStream<IO> = Stream<IO, ServerConnection>;

/// A wrapper around a `rustls::ServerConfig`, providing async `accept`
/// methods.
#[derive(Clone)]
pub struct TlsAcceptor {
    inner: Arc<ServerConfig>,
}

impl From<Arc<ServerConfig>> for TlsAcceptor {
    fn from(inner: Arc<ServerConfig>) -> TlsAcceptor {
        TlsAcceptor { inner }
    }
}

impl From<ServerConfig> for TlsAcceptor {
    fn from(inner: ServerConfig) -> TlsAcceptor {
        TlsAcceptor {
            inner: Arc::new(inner),
        }
    }
}

impl TlsAcceptor {
    /// Run the server handshake over a caller-supplied stream.
    ///
    /// Same failure contract as [`TlsConnector::connect`](crate::TlsConnector::connect):
    /// on handshake failure the transport is shut down before the error
    /// returns.
    pub async fn accept<IO>(&self, io: IO) -> Result<TlsStream<IO>, TlsError>
    where
        IO: AsyncReadRent + AsyncWriteRent,
    {
        let session = ServerConnection::new(self.inner.clone())?;
        let mut stream = Stream::new(io, session);
        if let Err(e) = stream.handshake().await {
            let _ = stream.shutdown().await;
            return Err(e.into());
        }
        Ok(stream)
    }

    /// Accept one pending client from a pre-bound listener, negotiate
    /// and adapt into a [`TlsConnection`].
    ///
    /// Blocks until a client connects. Exactly one client per call; a
    /// persistent server loops around this itself.
    pub async fn accept_secure(&self, listener: &TcpListener) -> Result<TlsConnection, TlsError> {
        let (io, peer_addr) = listener.accept().await?;
        let stream = self.accept(io).await?;
        Ok(TlsConnection::new(stream, peer_addr))
    }
}

impl std::fmt::Debug for TlsAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsAcceptor").finish()
    }
}
