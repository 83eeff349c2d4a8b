use std::{cell::UnsafeCell, io, net::SocketAddr, rc::Rc};

use monoio::{
    buf::{IoBuf, IoBufMut, IoVecBuf, IoVecBufMut},
    io::{AsyncReadRent, AsyncWriteRent},
    net::TcpStream,
    BufResult,
};
use tracing::debug;

use crate::{
    split::{ReadHalf, WriteHalf},
    stream::Stream,
};

/// An established, bidirectional, encrypted channel to a single peer.
///
/// The connection owns exactly one TLS session and records the peer
/// address captured at connect/accept time. Its read side converts every
/// underlying failure into a plain end-of-stream, its write side surfaces
/// failures verbatim, and [`close`](TlsConnection::close) cannot fail.
///
/// The masking on the read side is deliberate, inherited behavior: it
/// erases the difference between a clean close, a connection reset and a
/// protocol violation. Suppressed errors are logged at debug level; use
/// [`TlsConnector::connect_session`](crate::TlsConnector::connect_session)
/// and drive the raw [`Stream`] instead when the distinction matters.
#[derive(Debug)]
pub struct TlsConnection<IO = TcpStream> {
    stream: Stream<IO, rustls::Connection>,
    peer_addr: SocketAddr,
}

impl<IO> TlsConnection<IO> {
    /// Adapt a negotiated session stream plus its peer address into a
    /// connection. Accepts either role's session type.
    pub fn new<C: Into<rustls::Connection>>(stream: Stream<IO, C>, peer_addr: SocketAddr) -> Self {
        Self {
            stream: stream.map_session(Into::into),
            peer_addr,
        }
    }

    /// The remote endpoint, fixed for the connection's lifetime.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// The underlying engine session.
    pub fn session(&self) -> &rustls::Connection {
        self.stream.session()
    }

    /// Materialize the input and output handles as separately owned
    /// halves bound to this same session.
    pub fn split(self) -> (ReadHalf<IO>, WriteHalf<IO>) {
        let shared = Rc::new(UnsafeCell::new(self));
        (
            ReadHalf {
                inner: shared.clone(),
            },
            WriteHalf { inner: shared },
        )
    }
}

impl<IO: AsyncReadRent + AsyncWriteRent> TlsConnection<IO> {
    /// Orderly close: notify the peer, flush, release the transport.
    /// Never fails; a peer that already tore the socket down only
    /// produces a debug log line.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer_addr, error = %e, "error during close discarded");
        }
    }

    pub(crate) async fn read_suppressed<T: IoBufMut>(
        &mut self,
        buf: T,
        splitted: bool,
    ) -> BufResult<usize, T> {
        let (res, buf) = self.stream.read_inner(buf, splitted).await;
        match res {
            Ok(n) => (Ok(n), buf),
            Err(e) => {
                debug!(peer = %self.peer_addr, error = %e, "read error reported as end-of-stream");
                (Ok(0), buf)
            }
        }
    }
}

impl<IO: AsyncReadRent + AsyncWriteRent> AsyncReadRent for TlsConnection<IO> {
    async fn read<T: IoBufMut>(&mut self, buf: T) -> BufResult<usize, T> {
        self.read_suppressed(buf, false).await
    }

    async fn readv<T: IoVecBufMut>(&mut self, buf: T) -> BufResult<usize, T> {
        let (res, buf) = self.stream.readv(buf).await;
        match res {
            Ok(n) => (Ok(n), buf),
            Err(e) => {
                debug!(peer = %self.peer_addr, error = %e, "read error reported as end-of-stream");
                (Ok(0), buf)
            }
        }
    }
}

impl<IO: AsyncReadRent + AsyncWriteRent> AsyncWriteRent for TlsConnection<IO> {
    async fn write<T: IoBuf>(&mut self, buf: T) -> BufResult<usize, T> {
        self.stream.write(buf).await
    }

    async fn writev<T: IoVecBuf>(&mut self, buf_vec: T) -> BufResult<usize, T> {
        self.stream.writev(buf_vec).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.stream.flush().await
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
