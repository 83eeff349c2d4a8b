// Fetch a page over https through a secured connection.

use monoio::io::{AsyncReadRent, AsyncWriteRentExt};
use monoio_tls_conn::TlsConnector;
use rustls::RootCertStore;

#[monoio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let connector = TlsConnector::from(config);
    let mut conn = connector
        .connect_secure(None, "rsproxy.cn", 443)
        .await
        .expect("unable to establish secured connection");
    println!("connected to {}", conn.peer_addr());

    let content = b"GET / HTTP/1.0\r\nHost: rsproxy.cn\r\n\r\n";
    let (r, _) = conn.write_all(&content[..]).await;
    r.expect("unable to write http request");
    println!("http request sent");

    let buf = vec![0u8; 1024];
    let (r, buf) = conn.read(buf).await;
    let n = r.expect("read cannot fail by contract");
    println!(
        "http response recv: \n\n{}",
        String::from_utf8_lossy(&buf[..n])
    );
    conn.close().await;
}
