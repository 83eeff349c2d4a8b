use std::io::{self, Read, Write};

use monoio::{
    buf::{IoBuf, IoBufMut, IoVecBuf, IoVecBufMut, RawBuf},
    io::{AsyncReadRent, AsyncWriteRent},
    BufResult,
};

use crate::{
    io_wrapper::{ReadBuffer, WriteBuffer},
    session::Session,
};

/// A TLS session pumped over a raw monoio stream.
///
/// Bytes read are decrypted from `IO`, bytes written are encrypted onto
/// `IO`, with every write pushed to the transport before the call
/// returns. Errors propagate here; the end-of-stream masking of
/// [`TlsConnection`](crate::TlsConnection) happens one layer up, so
/// callers holding a raw `Stream` still see real failures.
#[derive(Debug)]
pub struct Stream<IO, C> {
    io: IO,
    session: C,
    read_buffer: ReadBuffer,
    write_buffer: WriteBuffer,
}

impl<IO, C> Stream<IO, C> {
    pub fn new(io: IO, session: C) -> Self {
        Self {
            io,
            session,
            read_buffer: ReadBuffer::default(),
            write_buffer: WriteBuffer::default(),
        }
    }

    /// The underlying engine session, e.g. to inspect the negotiated
    /// protocol version or peer certificates.
    pub fn session(&self) -> &C {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut C {
        &mut self.session
    }

    /// Swap the session type while keeping the transport and any staged
    /// record bytes. Used to erase the session role after the handshake.
    pub(crate) fn map_session<C2>(self, f: impl FnOnce(C) -> C2) -> Stream<IO, C2> {
        Stream {
            io: self.io,
            session: f(self.session),
            read_buffer: self.read_buffer,
            write_buffer: self.write_buffer,
        }
    }
}

impl<IO: AsyncReadRent + AsyncWriteRent, C: Session> Stream<IO, C> {
    pub(crate) async fn read_io(&mut self, splitted: bool) -> io::Result<usize> {
        let n = loop {
            match self.session.read_tls(&mut self.read_buffer) {
                Ok(n) => break n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.read_buffer.do_io(&mut self.io).await?;
                }
                Err(e) => return Err(e),
            }
        };

        let state = match self.session.process_new_packets() {
            Ok(state) => state,
            Err(e) => {
                // Try to send the pending alert, unless the write side is
                // owned by another half. User should shutdown on error.
                if !splitted {
                    let _ = self.write_io().await;
                }
                return Err(io::Error::new(io::ErrorKind::InvalidData, e));
            }
        };

        if state.peer_has_closed() && self.session.is_handshaking() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "tls handshake alert",
            ));
        }

        Ok(n)
    }

    pub(crate) async fn write_io(&mut self) -> io::Result<usize> {
        let n = loop {
            match self.session.write_tls(&mut self.write_buffer) {
                Ok(n) => break n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.write_buffer.do_io(&mut self.io).await?;
                }
                Err(e) => return Err(e),
            }
        };
        // push the staged records out to the transport
        self.write_buffer.do_io(&mut self.io).await?;

        Ok(n)
    }

    /// Drive the negotiation to completion. Returns the raw bytes read
    /// and written while handshaking.
    pub(crate) async fn handshake(&mut self) -> io::Result<(usize, usize)> {
        let mut rdlen = 0;
        let mut wrlen = 0;
        let mut eof = false;

        loop {
            while self.session.wants_write() && self.session.is_handshaking() {
                wrlen += self.write_io().await?;
            }
            while !eof && self.session.wants_read() && self.session.is_handshaking() {
                let n = self.read_io(false).await?;
                rdlen += n;
                if n == 0 {
                    eof = true;
                }
            }

            if !self.session.is_handshaking() {
                break;
            }
            if eof {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "tls handshake eof",
                ));
            }
        }

        // flush whatever the engine still wants out
        while self.session.wants_write() {
            wrlen += self.write_io().await?;
        }

        Ok((rdlen, wrlen))
    }

    pub(crate) async fn read_inner<T: IoBufMut>(
        &mut self,
        mut buf: T,
        splitted: bool,
    ) -> BufResult<usize, T> {
        let slice = unsafe { std::slice::from_raw_parts_mut(buf.write_ptr(), buf.bytes_total()) };
        loop {
            // drain decrypted data from the session
            match self.session.reader().read(slice) {
                Ok(n) => {
                    unsafe { buf.set_init(n) };
                    return (Ok(n), buf);
                }
                // nothing decrypted yet, feed the session below
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => (),
                Err(e) => {
                    return (Err(e), buf);
                }
            }

            match self.read_io(splitted).await {
                Ok(0) => {
                    return (
                        Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "tls raw stream eof",
                        )),
                        buf,
                    );
                }
                Ok(_) => (),
                Err(e) => {
                    return (Err(e), buf);
                }
            };
        }
    }
}

impl<IO: AsyncReadRent + AsyncWriteRent, C: Session> AsyncReadRent for Stream<IO, C> {
    async fn read<T: IoBufMut>(&mut self, buf: T) -> BufResult<usize, T> {
        self.read_inner(buf, false).await
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

impl<IO: AsyncReadRent + AsyncWriteRent, C: Session> AsyncWriteRent for Stream<IO, C> {
    async fn write<T: IoBuf>(&mut self, buf: T) -> BufResult<usize, T> {
        let slice = unsafe { std::slice::from_raw_parts(buf.read_ptr(), buf.bytes_init()) };

        // encrypt the plaintext, then push every produced record out; no
        // coalescing across calls
        let n = match self.session.writer().write(slice) {
            Ok(n) => n,
            Err(e) => return (Err(e), buf),
        };

        while self.session.wants_write() {
            match self.write_io().await {
                Ok(0) => break,
                Ok(_) => (),
                Err(e) => return (Err(e), buf),
            }
        }
        (Ok(n), buf)
    }

    // TODO: use real writev
    async fn writev<T: IoVecBuf>(&mut self, buf_vec: T) -> BufResult<usize, T> {
        let n = match unsafe { RawBuf::new_from_iovec(&buf_vec) } {
            Some(raw_buf) => self.write(raw_buf).await.0,
            None => Ok(0),
        };
        (n, buf_vec)
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.session.writer().flush()?;
        while self.session.wants_write() {
            self.write_io().await?;
        }
        self.io.flush().await
    }

    /// Orderly shutdown: notify the peer, flush the notification, then
    /// shut the transport down.
    async fn shutdown(&mut self) -> io::Result<()> {
        self.session.send_close_notify();
        while self.session.wants_write() {
            self.write_io().await?;
        }
        self.io.shutdown().await
    }
}
