//! The byte-stream transport the engine drives.

use pin_project::pin_project;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{lookup_host, TcpSocket, TcpStream, UnixStream};
use tracing::debug;

use crate::Error;

/// A connected byte stream to a single memcached endpoint.
///
/// The engine does its own buffering and framing; the streams are used raw.
#[pin_project(project = ConnectionProjection)]
#[derive(Debug)]
pub enum Connection {
    /// TCP connection.
    Tcp(#[pin] TcpStream),
    /// UNIX domain socket connection.
    Unix(#[pin] UnixStream),
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.project() {
            ConnectionProjection::Tcp(s) => s.poll_read(cx, buf),
            ConnectionProjection::Unix(s) => s.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.project() {
            ConnectionProjection::Tcp(s) => s.poll_write(cx, buf),
            ConnectionProjection::Unix(s) => s.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context) -> Poll<io::Result<()>> {
        match self.project() {
            ConnectionProjection::Tcp(s) => s.poll_flush(cx),
            ConnectionProjection::Unix(s) => s.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context) -> Poll<io::Result<()>> {
        match self.project() {
            ConnectionProjection::Tcp(s) => s.poll_shutdown(cx),
            ConnectionProjection::Unix(s) => s.poll_shutdown(cx),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Addr {
    Tcp(String),
    Unix(String),
    Unknown(String),
}

impl Addr {
    const DEFAULT_PORT: u16 = 11211;

    fn parse(dsn: &str) -> Result<Self, Error> {
        let url = url::Url::parse(dsn).map_err(|e| {
            Error::Connect(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("failed to parse DSN: {}", e),
            ))
        })?;

        match url.scheme() {
            "unix" => Ok(Addr::Unix(url.path().to_string())),
            "tcp" => Ok(Addr::Tcp(format!(
                "{}:{}",
                url.host_str().ok_or_else(|| {
                    Error::Connect(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "no host found in DSN",
                    ))
                })?,
                url.port().unwrap_or(Self::DEFAULT_PORT)
            ))),
            _ => Ok(Addr::Unknown(dsn.to_string())),
        }
    }
}

impl Connection {
    /// Connects to the endpoint named by `dsn`.
    ///
    /// Accepts `tcp://<host>:<port>`, `unix://<path>`, or a bare
    /// `<host>:<port>` which is treated as TCP.
    pub async fn new<S: AsRef<str>>(dsn: S) -> Result<Self, Error> {
        match Addr::parse(dsn.as_ref())? {
            Addr::Unix(path) => {
                let stream = UnixStream::connect(&path).await.map_err(Error::Connect)?;
                debug!(path = %path, "connected");
                Ok(Connection::Unix(stream))
            }
            Addr::Tcp(authority) | Addr::Unknown(authority) => {
                let addrs = lookup_host(authority)
                    .await
                    .map_err(Error::Connect)?
                    .collect::<Vec<SocketAddr>>();

                let mut last_err = None;

                for addr in addrs {
                    let socket = TcpSocket::new_v4().map_err(Error::Connect)?;
                    socket.set_nodelay(true).map_err(Error::Connect)?;
                    match socket.connect(addr).await {
                        Ok(stream) => {
                            debug!(%addr, "connected");
                            return Ok(Connection::Tcp(stream));
                        }
                        Err(e) => last_err = Some(Error::Connect(e)),
                    }
                }
                Err(last_err.unwrap_or_else(|| {
                    Error::Connect(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "could not resolve to any address",
                    ))
                }))
            }
        }
    }
}
