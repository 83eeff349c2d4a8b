use std::io;

use rustls::{ClientConnection, Connection, IoState, Reader, ServerConnection, Writer};

/// The engine surface a [`Stream`](crate::Stream) drives.
///
/// This is exactly what the crate consumes from rustls: record transport
/// (`read_tls`/`write_tls`), decryption (`process_new_packets`), the
/// plaintext endpoints (`reader`/`writer`), negotiation state queries and
/// the orderly-shutdown notification (`send_close_notify`). Implemented
/// for both role-specific connection types and the role-erased
/// [`rustls::Connection`].
pub trait Session {
    fn wants_read(&self) -> bool;
    fn wants_write(&self) -> bool;
    fn is_handshaking(&self) -> bool;
    fn read_tls(&mut self, rd: &mut dyn io::Read) -> io::Result<usize>;
    fn write_tls(&mut self, wr: &mut dyn io::Write) -> io::Result<usize>;
    fn process_new_packets(&mut self) -> Result<IoState, rustls::Error>;
    fn reader(&mut self) -> Reader<'_>;
    fn writer(&mut self) -> Writer<'_>;
    fn send_close_notify(&mut self);
}

// The deref through ConnectionCommon keeps method resolution away from
// the trait itself, otherwise these forwards would recurse.
macro_rules! forward_session {
    ($conn:ty) => {
        impl Session for $conn {
            fn wants_read(&self) -> bool {
                (**self).wants_read()
            }

            fn wants_write(&self) -> bool {
                (**self).wants_write()
            }

            fn is_handshaking(&self) -> bool {
                (**self).is_handshaking()
            }

            fn read_tls(&mut self, rd: &mut dyn io::Read) -> io::Result<usize> {
                (**self).read_tls(rd)
            }

            fn write_tls(&mut self, wr: &mut dyn io::Write) -> io::Result<usize> {
                (**self).write_tls(wr)
            }

            fn process_new_packets(&mut self) -> Result<IoState, rustls::Error> {
                (**self).process_new_packets()
            }

            fn reader(&mut self) -> Reader<'_> {
                (**self).reader()
            }

            fn writer(&mut self) -> Writer<'_> {
                (**self).writer()
            }

            fn send_close_notify(&mut self) {
                (**self).send_close_notify()
            }
        }
    };
}

forward_session!(ClientConnection);
forward_session!(ServerConnection);

impl Session for Connection {
    fn wants_read(&self) -> bool {
        (**self).wants_read()
    }

    fn wants_write(&self) -> bool {
        (**self).wants_write()
    }

    fn is_handshaking(&self) -> bool {
        (**self).is_handshaking()
    }

    fn read_tls(&mut self, rd: &mut dyn io::Read) -> io::Result<usize> {
        Connection::read_tls(self, rd)
    }

    fn write_tls(&mut self, wr: &mut dyn io::Write) -> io::Result<usize> {
        Connection::write_tls(self, wr)
    }

    fn process_new_packets(&mut self) -> Result<IoState, rustls::Error> {
        Connection::process_new_packets(self)
    }

    fn reader(&mut self) -> Reader<'_> {
        Connection::reader(self)
    }

    fn writer(&mut self) -> Writer<'_> {
        Connection::writer(self)
    }

    fn send_close_notify(&mut self) {
        (**self).send_close_notify()
    }
}
