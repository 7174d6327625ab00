//! Connection-limited TCP listener
//!
//! Every accepted stream owns one slot of a semaphore sized to the maximum
//! number of open connections. The slot is taken before `accept` is polled,
//! so a saturated listener stops accepting and excess clients wait in the
//! kernel backlog instead of being refused.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;
use vex_core::{Error, Result};

/// TCP listener admitting at most `max_connections` open connections
#[derive(Debug)]
pub struct LimitListener {
    inner: TcpListener,
    slots: Arc<Semaphore>,
    max_connections: usize,
}

impl LimitListener {
    /// Bind `addr`. Failure is fatal and never retried.
    pub async fn bind(addr: SocketAddr, max_connections: usize) -> Result<Self> {
        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        Ok(Self {
            inner,
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Wait for a free slot, then for a connection.
    ///
    /// Transient per-connection failures are logged and skipped; anything
    /// else is returned as [`Error::Accept`].
    pub async fn accept(&self) -> Result<(LimitedStream, SocketAddr)> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| Error::Internal("connection limiter closed".to_string()))?;

        loop {
            match self.inner.accept().await {
                Ok((stream, remote)) => {
                    return Ok((
                        LimitedStream {
                            stream,
                            _permit: permit,
                        },
                        remote,
                    ))
                }
                Err(err) if is_transient(&err) => {
                    warn!(error = %err, "Transient accept error");
                }
                Err(err) => return Err(Error::Accept(err)),
            }
        }
    }

    /// Bound local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Connections currently holding a slot
    pub fn open_connections(&self) -> usize {
        self.max_connections - self.slots.available_permits()
    }

    /// Configured connection limit
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
    )
}

/// Accepted stream that releases its slot when dropped
#[derive(Debug)]
pub struct LimitedStream {
    stream: TcpStream,
    _permit: OwnedSemaphorePermit,
}

impl LimitedStream {
    /// Remote address of the peer
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl AsyncRead for LimitedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for LimitedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.stream.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn local_listener(max: usize) -> LimitListener {
        LimitListener::bind("127.0.0.1:0".parse().unwrap(), max)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_slot_released_on_drop() {
        let listener = local_listener(2).await;
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        assert_eq!(listener.open_connections(), 1);

        drop(stream);
        assert_eq!(listener.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_saturated_listener_waits() {
        let listener = local_listener(1).await;
        let addr = listener.local_addr().unwrap();

        let _first = TcpStream::connect(addr).await.unwrap();
        let _second = TcpStream::connect(addr).await.unwrap();

        let (held, _) = listener.accept().await.unwrap();
        assert_eq!(listener.open_connections(), 1);

        // The second client is connected at the TCP level but not admitted
        let blocked = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(blocked.is_err());

        drop(held);
        let admitted = tokio::time::timeout(Duration::from_secs(5), listener.accept()).await;
        assert!(matches!(admitted, Ok(Ok(_))));
        assert_eq!(listener.open_connections(), 1);
    }

    #[tokio::test]
    async fn test_bind_occupied_address() {
        let listener = local_listener(1).await;
        let addr = listener.local_addr().unwrap();

        let result = LimitListener::bind(addr, 1).await;
        assert!(matches!(result, Err(Error::Bind { addr: a, .. }) if a == addr));
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }
}
