//! Separately owned input/output handles for a [`TlsConnection`].
//!
//! Both halves point at the same connection through an `Rc<UnsafeCell<_>>`,
//! relying on the read and write paths touching disjoint buffers. When a
//! half hits a decrypt error it does not flush the session's pending
//! alert, since the write side may be mid-operation on the other half.

use std::{cell::UnsafeCell, io, net::SocketAddr, rc::Rc};

use monoio::{
    buf::{IoBuf, IoBufMut, IoVecBuf, IoVecBufMut, RawBuf},
    io::{AsyncReadRent, AsyncWriteRent},
    BufResult,
};

use crate::conn::TlsConnection;

/// The pull-based input handle of a split [`TlsConnection`]. Reads yield
/// chunks until end-of-stream; failures surface as end-of-stream too.
#[derive(Debug)]
pub struct ReadHalf<IO> {
    pub(crate) inner: Rc<UnsafeCell<TlsConnection<IO>>>,
}

/// The push-based output handle of a split [`TlsConnection`]. Each write
/// is encrypted and transmitted immediately; failures propagate.
#[derive(Debug)]
pub struct WriteHalf<IO> {
    pub(crate) inner: Rc<UnsafeCell<TlsConnection<IO>>>,
}

impl<IO> ReadHalf<IO> {
    pub fn peer_addr(&self) -> SocketAddr {
        unsafe { &*self.inner.get() }.peer_addr()
    }

    pub fn reunite(self, other: WriteHalf<IO>) -> Result<TlsConnection<IO>, ReuniteError<IO>> {
        reunite(self, other)
    }
}

impl<IO> WriteHalf<IO> {
    pub fn peer_addr(&self) -> SocketAddr {
        unsafe { &*self.inner.get() }.peer_addr()
    }

    pub fn reunite(self, other: ReadHalf<IO>) -> Result<TlsConnection<IO>, ReuniteError<IO>> {
        reunite(other, self)
    }
}

impl<IO: AsyncReadRent + AsyncWriteRent> AsyncReadRent for ReadHalf<IO> {
    async fn read<T: IoBufMut>(&mut self, buf: T) -> BufResult<usize, T> {
        let inner = unsafe { &mut *self.inner.get() };
        inner.read_suppressed(buf, true).await
    }

    async fn readv<T: IoVecBufMut>(&mut self, mut buf: T) -> BufResult<usize, T> {
        let n = match unsafe { RawBuf::new_from_iovec_mut(&mut buf) } {
            Some(raw_buf) => self.read(raw_buf).await.0,
            None => Ok(0),
        };
        if let Ok(n) = n {
            unsafe { buf.set_init(n) };
        }
        (n, buf)
    }
}

impl<IO: AsyncReadRent + AsyncWriteRent> AsyncWriteRent for WriteHalf<IO> {
    async fn write<T: IoBuf>(&mut self, buf: T) -> BufResult<usize, T> {
        let inner = unsafe { &mut *self.inner.get() };
        inner.write(buf).await
    }

    async fn writev<T: IoVecBuf>(&mut self, buf_vec: T) -> BufResult<usize, T> {
        let inner = unsafe { &mut *self.inner.get() };
        inner.writev(buf_vec).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        let inner = unsafe { &mut *self.inner.get() };
        inner.flush().await
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        let inner = unsafe { &mut *self.inner.get() };
        inner.shutdown().await
    }
}

fn reunite<IO>(
    read: ReadHalf<IO>,
    write: WriteHalf<IO>,
) -> Result<TlsConnection<IO>, ReuniteError<IO>> {
    if Rc::ptr_eq(&read.inner, &write.inner) {
        drop(write);
        // This unwrap cannot fail as the api does not allow creating more
        // than two Rcs, and we just dropped the other half.
        Ok(Rc::try_unwrap(read.inner)
            .expect("TlsConnection: try_unwrap failed in reunite")
            .into_inner())
    } else {
        Err(ReuniteError(read, write))
    }
}

/// Error indicating that two halves were not from the same connection, and
/// thus could not be reunited.
#[derive(Debug)]
pub struct ReuniteError<IO>(pub ReadHalf<IO>, pub WriteHalf<IO>);

impl<IO> std::fmt::Display for ReuniteError<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tried to reunite halves that are not from the same connection"
        )
    }
}

impl<IO: std::fmt::Debug> std::error::Error for ReuniteError<IO> {}
