//! Bridge between the engine's synchronous record IO and monoio's
//! completion-based IO.
//!
//! The session only speaks `io::Read`/`io::Write`, so raw records are
//! staged in these buffers. `WouldBlock` from the sync side means "run
//! `do_io` against the transport first, then try again".

use std::{io, mem};

use bytes::{Buf, BytesMut};
use monoio::io::{AsyncReadRent, AsyncWriteRent, AsyncWriteRentExt};

const RECORD_BUFFER: usize = 16 * 1024;

#[derive(Debug, Default)]
enum ReadState {
    #[default]
    Pending,
    Eof,
    Failed(io::Error),
}

/// Inbound record staging: transport bytes land here via `do_io` and are
/// handed to the session through `io::Read`.
#[derive(Debug, Default)]
pub(crate) struct ReadBuffer {
    buf: BytesMut,
    state: ReadState,
}

impl ReadBuffer {
    /// Fill the buffer from the transport. Returns the bytes available to
    /// the sync side; `Ok(0)` is transport end-of-stream.
    pub(crate) async fn do_io<IO: AsyncReadRent>(&mut self, io: &mut IO) -> io::Result<usize> {
        if !self.buf.is_empty() {
            return Ok(self.buf.len());
        }

        self.buf.reserve(RECORD_BUFFER);
        let buf = mem::take(&mut self.buf);
        let (res, buf) = io.read(buf).await;
        self.buf = buf;
        match res {
            Ok(0) => {
                self.state = ReadState::Eof;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                let kind = e.kind();
                self.state = ReadState::Failed(e);
                Err(kind.into())
            }
        }
    }
}

impl io::Read for ReadBuffer {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.buf.is_empty() {
            return match mem::replace(&mut self.state, ReadState::Pending) {
                // eof is sticky, the transport will not produce more data
                ReadState::Eof => {
                    self.state = ReadState::Eof;
                    Ok(0)
                }
                ReadState::Failed(e) => Err(e),
                ReadState::Pending => Err(io::ErrorKind::WouldBlock.into()),
            };
        }

        let n = self.buf.len().min(out.len());
        out[..n].copy_from_slice(&self.buf[..n]);
        self.buf.advance(n);
        Ok(n)
    }
}

#[derive(Debug, Default)]
enum WriteState {
    #[default]
    Idle,
    Failed(io::Error),
}

/// Outbound record staging: the session writes records here and `do_io`
/// pushes them to the transport.
#[derive(Debug, Default)]
pub(crate) struct WriteBuffer {
    buf: BytesMut,
    state: WriteState,
}

impl WriteBuffer {
    /// Drain the buffer into the transport.
    pub(crate) async fn do_io<IO: AsyncWriteRent>(&mut self, io: &mut IO) -> io::Result<usize> {
        if self.buf.is_empty() {
            return Ok(0);
        }

        let buf = mem::take(&mut self.buf);
        let (res, buf) = io.write_all(buf).await;
        self.buf = buf;
        match res {
            Ok(n) => {
                self.buf.advance(n);
                Ok(n)
            }
            Err(e) => {
                let kind = e.kind();
                self.state = WriteState::Failed(e);
                Err(kind.into())
            }
        }
    }
}

impl io::Write for WriteBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if let WriteState::Failed(_) = self.state {
            match mem::replace(&mut self.state, WriteState::Idle) {
                WriteState::Failed(e) => return Err(e),
                WriteState::Idle => unreachable!(),
            }
        }
        if self.buf.len() >= RECORD_BUFFER {
            return Err(io::ErrorKind::WouldBlock.into());
        }

        let n = data.len().min(RECORD_BUFFER - self.buf.len());
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let WriteState::Failed(_) = self.state {
            match mem::replace(&mut self.state, WriteState::Idle) {
                WriteState::Failed(e) => return Err(e),
                WriteState::Idle => unreachable!(),
            }
        }
        if !self.buf.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        Ok(())
    }
}
