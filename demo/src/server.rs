// An echo server with tls, one self-signed certificate per run.

use monoio::{
    io::{AsyncReadRent, AsyncWriteRentExt},
    net::TcpListener,
};
use monoio_tls_conn::{TlsAcceptor, TlsConnection};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};

#[monoio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let ck = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .expect("generate certificate");
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(ck.key_pair.serialize_der()));
    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![ck.cert.der().clone()], key)
        .expect("invalid certificate or key");
    let acceptor = TlsAcceptor::from(config);

    let listener = TcpListener::bind("127.0.0.1:50443").expect("unable to listen 127.0.0.1:50443");
    println!("echo server with a self-signed cert for localhost on 127.0.0.1:50443");
    loop {
        match acceptor.accept_secure(&listener).await {
            Ok(conn) => {
                println!("accepted {}, will relay data", conn.peer_addr());
                monoio::spawn(echo(conn));
            }
            Err(e) => println!("unable to do handshake: {e}"),
        }
    }
}

async fn echo(mut conn: TlsConnection) {
    let peer = conn.peer_addr();
    let mut n = 0;
    let mut buf = Vec::with_capacity(8 * 1024);
    loop {
        // read; by contract this yields end-of-stream instead of errors
        let (res, b) = conn.read(buf).await;
        buf = b;
        let read = res.expect("read cannot fail by contract");
        if read == 0 {
            break;
        }

        // write all back
        let (res, b) = conn.write_all(buf).await;
        buf = b;
        match res {
            Ok(written) => n += written,
            Err(e) => {
                println!("relay to {peer} aborted: {e}");
                break;
            }
        }
    }

    conn.close().await;
    println!("relay for {peer} finished, {n} bytes echoed");
}
