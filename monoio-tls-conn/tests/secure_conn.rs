use std::{io, time::Duration};

use monoio::{
    io::{AsyncReadRent, AsyncReadRentExt, AsyncWriteRentExt},
    net::{TcpListener, TcpStream},
};
use monoio_tls_conn::{TlsAcceptor, TlsConnector};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

struct TestPki {
    cert: CertificateDer<'static>,
    key: PrivateKeyDer<'static>,
}

fn test_pki(names: &[&str]) -> TestPki {
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    let ck = rcgen::generate_simple_self_signed(names).expect("generate certificate");
    TestPki {
        cert: ck.cert.der().clone(),
        key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(ck.key_pair.serialize_der())),
    }
}

fn acceptor(pki: &TestPki) -> TlsAcceptor {
    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![pki.cert.clone()], pki.key.clone_key())
        .expect("server config");
    TlsAcceptor::from(config)
}

fn connector(pki: &TestPki) -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.add(pki.cert.clone()).expect("trust test certificate");
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(config)
}

fn local_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

#[monoio::test]
async fn round_trip_and_close() {
    let pki = test_pki(&["localhost"]);
    let acceptor = acceptor(&pki);
    let connector = connector(&pki);
    let (listener, port) = local_listener();

    let server = monoio::spawn(async move {
        let conn = acceptor
            .accept_secure(&listener)
            .await
            .expect("server handshake");
        let (mut rh, mut wh) = conn.split();
        let (res, buf) = rh.read(vec![0u8; 64]).await;
        let n = res.unwrap();
        assert_eq!(&buf[..n], b"hello over tls");
        let (res, _) = wh.write_all(buf[..n].to_vec()).await;
        res.unwrap();
        // after the client closes, the next pull is a clean end-of-stream
        let (res, _) = rh.read(vec![0u8; 64]).await;
        assert_eq!(res.unwrap(), 0);
        let conn = rh.reunite(wh).expect("halves from the same connection");
        conn.close().await;
    });

    // dial by ip with the certificate name as override: the override
    // replaces only the validated name, not where we connect
    let mut conn = connector
        .connect_secure(Some("localhost"), "127.0.0.1", port)
        .await
        .expect("client handshake");
    assert_eq!(conn.peer_addr().port(), port);

    let (res, _) = conn.write_all(&b"hello over tls"[..]).await;
    res.unwrap();
    let (res, echoed) = conn.read_exact(vec![0u8; 14]).await;
    res.unwrap();
    assert_eq!(&echoed[..], b"hello over tls");
    conn.close().await;
    server.await;
}

#[monoio::test]
async fn identity_defaults_to_literal_host() {
    // certificate only valid for "localhost"; without an override the
    // dialed host literal is validated, so the handshake must fail
    let pki = test_pki(&["localhost"]);
    let acceptor = acceptor(&pki);
    let connector = connector(&pki);
    let (listener, port) = local_listener();

    let server = monoio::spawn(async move { acceptor.accept_secure(&listener).await.is_err() });

    let res = connector.connect_secure(None, "127.0.0.1", port).await;
    assert!(res.is_err());
    assert!(server.await);
}

#[monoio::test]
async fn identity_defaults_allow_matching_host() {
    let pki = test_pki(&["127.0.0.1"]);
    let acceptor = acceptor(&pki);
    let connector = connector(&pki);
    let (listener, port) = local_listener();

    let server = monoio::spawn(async move {
        let mut conn = acceptor
            .accept_secure(&listener)
            .await
            .expect("server handshake");
        let (res, buf) = conn.read(vec![0u8; 16]).await;
        let n = res.unwrap();
        assert_eq!(&buf[..n], b"ping");
        conn.close().await;
    });

    let mut conn = connector
        .connect_secure(None, "127.0.0.1", port)
        .await
        .expect("client handshake against ip certificate");
    let (res, _) = conn.write_all(&b"ping"[..]).await;
    res.unwrap();
    conn.close().await;
    server.await;
}

#[monoio::test]
async fn failed_connect_releases_socket() {
    let (listener, port) = local_listener();

    let server = monoio::spawn(async move {
        let (mut io, _) = listener.accept().await.unwrap();
        // swallow the client hello and answer with garbage
        let (res, _) = io.read(vec![0u8; 4096]).await;
        res.unwrap();
        let (res, _) = io.write_all(&b"definitely not a tls server\r\n"[..]).await;
        res.unwrap();
        // the connector must close its socket after the failed handshake
        let mut buf = vec![0u8; 4096];
        loop {
            let (res, b) = io.read(buf).await;
            buf = b;
            match res {
                Ok(0) => return true,
                // cleanup may still emit an alert before the socket closes
                Ok(_) => (),
                Err(_) => return false,
            }
        }
    });

    let pki = test_pki(&["localhost"]);
    let res = connector(&pki)
        .connect_secure(Some("localhost"), "127.0.0.1", port)
        .await;
    assert!(res.is_err());
    assert!(server.await, "client socket was not closed after failure");
}

#[monoio::test]
async fn failed_accept_releases_socket() {
    let pki = test_pki(&["localhost"]);
    let acceptor = acceptor(&pki);
    let (listener, port) = local_listener();

    let server = monoio::spawn(async move { acceptor.accept_secure(&listener).await.is_err() });

    let mut io = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let (res, _) = io.write_all(&b"not a client hello"[..]).await;
    res.unwrap();
    assert!(server.await);

    // the acceptor must close the client socket after the failed handshake
    let mut saw_eof = false;
    let mut buf = vec![0u8; 4096];
    loop {
        let (res, b) = io.read(buf).await;
        buf = b;
        match res {
            Ok(0) => {
                saw_eof = true;
                break;
            }
            // the server's alert arrives before the close
            Ok(_) => (),
            Err(_) => break,
        }
    }
    assert!(saw_eof, "server socket was not closed after failure");
}

#[monoio::test]
async fn dropped_peer_reads_as_end_of_stream() {
    let pki = test_pki(&["localhost"]);
    let acceptor = acceptor(&pki);
    let connector = connector(&pki);
    let (listener, port) = local_listener();

    let server = monoio::spawn(async move {
        let mut conn = acceptor
            .accept_secure(&listener)
            .await
            .expect("server handshake");
        let (res, _) = conn.read(vec![0u8; 16]).await;
        assert_eq!(res.unwrap(), 4);
        // vanish without an orderly shutdown
        drop(conn);
    });

    let mut conn = connector
        .connect_secure(Some("localhost"), "127.0.0.1", port)
        .await
        .expect("client handshake");
    let (res, _) = conn.write_all(&b"ping"[..]).await;
    res.unwrap();
    server.await;

    // abrupt peer loss surfaces as a clean end-of-stream, never an error
    let (res, _) = conn.read(vec![0u8; 16]).await;
    assert_eq!(res.unwrap(), 0);
    // and closing a half-torn-down connection must not fail
    conn.close().await;
}

#[monoio::test]
async fn raw_session_keeps_read_errors() {
    let pki = test_pki(&["localhost"]);
    let acceptor = acceptor(&pki);
    let connector = connector(&pki);
    let (listener, port) = local_listener();

    let server = monoio::spawn(async move {
        let mut conn = acceptor
            .accept_secure(&listener)
            .await
            .expect("server handshake");
        let (res, _) = conn.read(vec![0u8; 16]).await;
        assert_eq!(res.unwrap(), 4);
        drop(conn);
    });

    let (mut stream, _peer) = connector
        .connect_session(Some("localhost"), "127.0.0.1", port)
        .await
        .expect("client handshake");
    let (res, _) = stream.write_all(&b"ping"[..]).await;
    res.unwrap();
    server.await;

    // the unadapted stream still reports the failure
    let (res, _) = stream.read(vec![0u8; 16]).await;
    assert!(res.is_err());
}

#[monoio::test(timer_enabled = true)]
async fn write_failures_propagate() {
    let pki = test_pki(&["localhost"]);
    let acceptor = acceptor(&pki);
    let connector = connector(&pki);
    let (listener, port) = local_listener();

    let server = monoio::spawn(async move {
        let conn = acceptor
            .accept_secure(&listener)
            .await
            .expect("server handshake");
        // vanish right away
        drop(conn);
    });

    let mut conn = connector
        .connect_secure(Some("localhost"), "127.0.0.1", port)
        .await
        .expect("client handshake");
    server.await;

    let mut failed = None;
    for _ in 0..50 {
        let (res, _) = conn.write_all(vec![0u8; 16 * 1024]).await;
        if let Err(e) = res {
            failed = Some(e);
            break;
        }
        monoio::time::sleep(Duration::from_millis(5)).await;
    }
    let err = failed.expect("write to a vanished peer must fail");
    assert!(matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
    ));
}
