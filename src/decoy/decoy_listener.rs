//! # Decoy Listener
//!
//! One listening socket per configured protocol, owned exclusively by its accept loop. Every
//! accepted connection gets its own short-lived handler task; there is no connection limit.
//!
//! ```text
//! ┌──────────┐   accept   ┌──────────────┐  spawn  ┌─────────────────────────────────┐
//! │ Attacker │──────────▶│ accept loop   │───────▶│ handler: event → log → banner   │
//! └──────────┘            │ (one/decoy)  │         │          → shutdown → discard   │
//!                         └──────────────┘         └─────────────────────────────────┘
//! ```
//!
//! Handlers never read past one bounded discard and never fail the loop: every I/O error on a
//! peer is logged at debug level and dropped.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::port_selection::bind_in_range;
use crate::configuration::types::{DecoyConfig, Protocol};
use crate::error_handling::types::DecoyError;
use crate::storage::{ConnectionEvent, EventStore};

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);
const DISCARD_BUFFER_SIZE: usize = 1024;

/// State shared by every handler of one decoy.
struct HandlerContext {
    protocol: Protocol,
    port: u16,
    banner: Vec<u8>,
    discard_timeout: Duration,
    store: Arc<dyn EventStore>,
}

pub struct DecoyListener {
    listener: TcpListener,
    context: Arc<HandlerContext>,
}

impl DecoyListener {
    /// Binds the decoy on a port from its configured range.
    ///
    /// A bind failure only concerns this decoy; the caller logs it and carries on with the
    /// others.
    pub fn bind(config: &DecoyConfig, store: Arc<dyn EventStore>) -> Result<Self, DecoyError> {
        let mut rng = StdRng::from_entropy();
        let listener = bind_in_range(config.bind_address, config.port_range, &mut rng)?;
        let port = listener
            .local_addr()
            .map_err(DecoyError::AddressError)?
            .port();

        info!(
            "[+] {} decoy listening on {}:{}",
            config.protocol, config.bind_address, port
        );

        Ok(Self {
            listener,
            context: Arc::new(HandlerContext {
                protocol: config.protocol,
                port,
                banner: config.banner_bytes(),
                discard_timeout: Duration::from_millis(config.discard_timeout_ms),
                store,
            }),
        })
    }

    pub fn local_port(&self) -> u16 {
        self.context.port
    }

    pub fn protocol(&self) -> Protocol {
        self.context.protocol
    }

    /// Spawns the accept loop and returns immediately. The loop ends, and the socket closes,
    /// once `cancel` fires; handlers already running finish on their own.
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.accept_loop(cancel))
    }

    async fn accept_loop(self, cancel: CancellationToken) {
        let protocol = self.context.protocol;
        let port = self.context.port;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let context = Arc::clone(&self.context);
                        tokio::spawn(handle_connection(stream, peer, context));
                    }
                    Err(e) => {
                        warn!("[{}:{}] Accept failed: {}", protocol, port, e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        info!("[-] {} decoy on port {} stopped", protocol, port);
    }
}

async fn handle_connection<S>(mut stream: S, peer: SocketAddr, context: Arc<HandlerContext>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let event = ConnectionEvent::new(context.protocol, peer, context.port);
    info!(
        "[{}] Probe from {}:{} on decoy port {}",
        event.protocol, event.source_ip, event.source_port, event.decoy_port
    );

    let store = Arc::clone(&context.store);
    match tokio::task::spawn_blocking(move || store.append(event)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to record probe from {}: {}", peer, e),
        Err(e) => warn!("Event log task for {} did not complete: {}", peer, e),
    }

    if let Err(e) = stream.write_all(&context.banner).await {
        debug!("Banner send to {} failed: {}", peer, e);
        return;
    }
    if let Err(e) = stream.shutdown().await {
        debug!("Shutdown of {} failed: {}", peer, e);
        return;
    }

    let mut discard = [0u8; DISCARD_BUFFER_SIZE];
    match tokio::time::timeout(context.discard_timeout, stream.read(&mut discard)).await {
        Ok(Ok(n)) => debug!("Discarded {} byte(s) from {}", n, peer),
        Ok(Err(e)) => debug!("Read from {} failed: {}", peer, e),
        Err(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::PortRange;
    use crate::error_handling::types::StorageError;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tokio::net::TcpStream;

    #[derive(Default)]
    struct MemoryStore {
        events: Mutex<Vec<ConnectionEvent>>,
    }

    impl EventStore for MemoryStore {
        fn append(&self, event: ConnectionEvent) -> Result<(), StorageError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }

        fn snapshot(&self) -> Result<Vec<ConnectionEvent>, StorageError> {
            Ok(self.events.lock().unwrap().clone())
        }
    }

    struct FailingStore;

    impl EventStore for FailingStore {
        fn append(&self, _event: ConnectionEvent) -> Result<(), StorageError> {
            Err(StorageError::LockPoisoned)
        }

        fn snapshot(&self) -> Result<Vec<ConnectionEvent>, StorageError> {
            Err(StorageError::LockPoisoned)
        }
    }

    fn decoy_config(protocol: Protocol, banner: Option<&str>) -> DecoyConfig {
        DecoyConfig {
            protocol,
            port_range: PortRange { start: 0, end: 0 },
            banner: banner.map(str::to_string),
            enabled: true,
            bind_address: "127.0.0.1".parse().unwrap(),
            discard_timeout_ms: 200,
        }
    }

    async fn fetch_banner(port: u16) -> (Vec<u8>, u16) {
        let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let source_port = client.local_addr().unwrap().port();
        client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        (received, source_port)
    }

    #[tokio::test]
    async fn test_sequential_clients_receive_banner() {
        let store = Arc::new(MemoryStore::default());
        let decoy =
            DecoyListener::bind(&decoy_config(Protocol::Ssh, None), store.clone()).unwrap();
        let port = decoy.local_port();
        let cancel = CancellationToken::new();
        let handle = decoy.start(cancel.clone());

        for _ in 0..5 {
            let (received, _) = fetch_banner(port).await;
            assert_eq!(received, Protocol::Ssh.default_banner());
        }

        assert_eq!(store.snapshot().unwrap().len(), 5);
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_clients_each_logged() {
        let store = Arc::new(MemoryStore::default());
        let decoy = DecoyListener::bind(
            &decoy_config(Protocol::Http, Some("HTTP/1.1 200 OK\r\n\r\ndecoy")),
            store.clone(),
        )
        .unwrap();
        let port = decoy.local_port();
        let cancel = CancellationToken::new();
        let handle = decoy.start(cancel.clone());

        let clients: Vec<_> = (0..3).map(|_| tokio::spawn(fetch_banner(port))).collect();
        let mut source_ports = HashSet::new();
        for client in clients {
            let (received, source_port) = client.await.unwrap();
            assert_eq!(received, b"HTTP/1.1 200 OK\r\n\r\ndecoy");
            source_ports.insert(source_port);
        }

        let events = store.snapshot().unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.decoy_port == port));
        assert!(events.iter().all(|e| e.protocol == Protocol::Http));
        let logged: HashSet<u16> = events.iter().map(|e| e.source_port).collect();
        assert_eq!(logged, source_ports);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_concurrent_clients() {
        let store = Arc::new(MemoryStore::default());
        let decoy =
            DecoyListener::bind(&decoy_config(Protocol::Http, None), store.clone()).unwrap();
        let port = decoy.local_port();
        let cancel = CancellationToken::new();
        let handle = decoy.start(cancel.clone());

        let clients: Vec<_> = (0..50).map(|_| tokio::spawn(fetch_banner(port))).collect();
        for client in clients {
            let (received, _) = client.await.unwrap();
            assert_eq!(received, Protocol::Http.default_banner());
        }
        assert_eq!(store.snapshot().unwrap().len(), 50);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_store_still_sends_banner() {
        let decoy =
            DecoyListener::bind(&decoy_config(Protocol::Ssh, None), Arc::new(FailingStore))
                .unwrap();
        let port = decoy.local_port();
        let cancel = CancellationToken::new();
        let handle = decoy.start(cancel.clone());

        let (received, _) = fetch_banner(port).await;
        assert_eq!(received, Protocol::Ssh.default_banner());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_port_in_use_does_not_start() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let mut config = decoy_config(Protocol::Http, None);
        config.port_range = PortRange {
            start: port,
            end: port,
        };

        let result = DecoyListener::bind(&config, Arc::new(MemoryStore::default()));
        assert!(matches!(result, Err(DecoyError::BindError(p, _)) if p == port));
    }

    #[tokio::test]
    async fn test_cancel_closes_socket() {
        let decoy = DecoyListener::bind(
            &decoy_config(Protocol::Http, None),
            Arc::new(MemoryStore::default()),
        )
        .unwrap();
        let port = decoy.local_port();
        let cancel = CancellationToken::new();
        let handle = decoy.start(cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    }

    #[tokio::test]
    async fn test_handler_order_on_mock_stream() {
        let store = Arc::new(MemoryStore::default());
        let context = Arc::new(HandlerContext {
            protocol: Protocol::Ssh,
            port: 2222,
            banner: b"SSH-2.0-decoy\r\n".to_vec(),
            discard_timeout: Duration::from_millis(50),
            store: store.clone(),
        });
        let stream = tokio_test::io::Builder::new()
            .write(b"SSH-2.0-decoy\r\n")
            .read(b"SSH-2.0-libssh\r\n")
            .build();
        let peer: SocketAddr = "203.0.113.45:51234".parse().unwrap();

        handle_connection(stream, peer, context).await;

        let events = store.snapshot().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source_ip, peer.ip());
        assert_eq!(events[0].source_port, 51234);
        assert_eq!(events[0].decoy_port, 2222);
        assert_eq!(events[0].protocol, Protocol::Ssh);
    }

    #[tokio::test]
    async fn test_write_error_is_swallowed() {
        let store = Arc::new(MemoryStore::default());
        let context = Arc::new(HandlerContext {
            protocol: Protocol::Http,
            port: 8080,
            banner: b"HTTP/1.1 200 OK\r\n\r\n".to_vec(),
            discard_timeout: Duration::from_millis(50),
            store: store.clone(),
        });
        let stream = tokio_test::io::Builder::new()
            .write_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "peer reset",
            ))
            .build();
        let peer: SocketAddr = "198.51.100.7:40000".parse().unwrap();

        handle_connection(stream, peer, context).await;

        assert_eq!(store.snapshot().unwrap().len(), 1);
    }
}
