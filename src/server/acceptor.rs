//! TCP accept loop
//!
//! Accepts consumers and hands each socket to the client registry. The
//! listening socket is owned by the loop and closed when it returns.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::registry::ClientRegistry;

use super::shutdown::StopToken;

/// Exponential retry delay for transient accept errors
#[derive(Debug, Clone)]
pub struct AcceptBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl AcceptBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            current: initial,
        }
    }

    /// Delay to wait now; doubles the next one up to the cap
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Start over from the initial delay
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Whether an accept error is worth retrying
///
/// Aborted handshakes and descriptor exhaustion clear up on their own;
/// anything else means the listener itself is broken.
pub fn is_transient(error: &io::Error) -> bool {
    use io::ErrorKind::*;

    if matches!(
        error.kind(),
        ConnectionAborted | ConnectionReset | ConnectionRefused | Interrupted | WouldBlock | TimedOut
    ) {
        return true;
    }

    #[cfg(unix)]
    {
        // ENOMEM, ENFILE, EMFILE
        matches!(error.raw_os_error(), Some(12) | Some(23) | Some(24))
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// Accept loop feeding the client registry
pub struct Acceptor {
    listener: TcpListener,
    registry: Arc<ClientRegistry>,
    backoff: AcceptBackoff,
    tcp_nodelay: bool,
    stop: StopToken,
}

impl Acceptor {
    pub fn new(
        listener: TcpListener,
        registry: Arc<ClientRegistry>,
        backoff: AcceptBackoff,
        tcp_nodelay: bool,
        stop: StopToken,
    ) -> Self {
        Self {
            listener,
            registry,
            backoff,
            tcp_nodelay,
            stop,
        }
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until stopped or the listener fails
    pub async fn run(mut self) {
        loop {
            let accepted = tokio::select! {
                biased;
                _ = self.stop.stopped() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((socket, peer_addr)) => {
                    self.backoff.reset();
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) if is_transient(&e) => {
                    let delay = self.backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        retry_ms = delay.as_millis() as u64,
                        "Transient accept error"
                    );

                    tokio::select! {
                        biased;
                        _ = self.stop.stopped() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed, no longer accepting clients");
                    break;
                }
            }
        }

        // Dropping the listener closes the listening socket
        tracing::info!("Listener closed");
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        if let Err(e) = self.configure_socket(&socket) {
            tracing::debug!(peer = %peer_addr, error = %e, "Failed to configure socket");
            return;
        }

        self.registry.add(socket, Some(peer_addr)).await;
    }

    fn configure_socket(&self, socket: &TcpStream) -> io::Result<()> {
        if self.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::audio::AudioFrame;
    use crate::server::shutdown::stop_channel;

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = AcceptBackoff::new(Duration::from_secs(1), Duration::from_secs(4));

        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_fixed_when_max_equals_initial() {
        let mut backoff = AcceptBackoff::new(Duration::from_secs(1), Duration::from_secs(1));

        for _ in 0..5 {
            assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::InvalidInput)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[cfg(unix)]
    #[test]
    fn test_fd_exhaustion_is_transient() {
        assert!(is_transient(&io::Error::from_raw_os_error(24)));
        assert!(is_transient(&io::Error::from_raw_os_error(23)));
    }

    async fn spawn_acceptor(
        registry: Arc<ClientRegistry>,
    ) -> (SocketAddr, tokio::sync::watch::Sender<bool>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, token) = stop_channel();
        let acceptor = Acceptor::new(
            listener,
            registry,
            AcceptBackoff::new(Duration::from_millis(10), Duration::from_millis(100)),
            true,
            token,
        );
        let addr = acceptor.local_addr().unwrap();
        let task = tokio::spawn(acceptor.run());
        (addr, tx, task)
    }

    async fn wait_for_clients(registry: &ClientRegistry, count: usize) {
        for _ in 0..200 {
            if registry.len().await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} clients, have {}", count, registry.len().await);
    }

    #[tokio::test]
    async fn test_accepted_clients_are_registered() {
        let registry = Arc::new(ClientRegistry::new());
        let (addr, _tx, _task) = spawn_acceptor(Arc::clone(&registry)).await;

        let mut a = TcpStream::connect(addr).await.unwrap();
        let mut b = TcpStream::connect(addr).await.unwrap();
        wait_for_clients(&registry, 2).await;

        let frame = AudioFrame::new(0, bytes::Bytes::from_static(b"\x01\x00\x02\x00"));
        let outcome = registry.broadcast(&frame).await;
        assert_eq!(outcome.delivered, 2);

        let mut buf = [0u8; 4];
        a.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"\x01\x00\x02\x00");
        b.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"\x01\x00\x02\x00");
    }

    #[tokio::test]
    async fn test_stop_closes_listener() {
        let registry = Arc::new(ClientRegistry::new());
        let (addr, tx, task) = spawn_acceptor(Arc::clone(&registry)).await;

        tx.send_replace(true);
        task.await.unwrap();

        assert!(TcpStream::connect(addr).await.is_err());
        assert!(registry.is_empty().await);
    }
}
