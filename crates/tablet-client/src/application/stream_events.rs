//! The client facade: submit events, retarget the stream, manage the worker.
//!
//! # Threading model (for beginners)
//!
//! [`NetworkClient`] is shared (usually as `Arc<NetworkClient>`) between the
//! UI code that produces events and the settings follower that retargets the
//! stream.  None of its methods block:
//!
//! - `submit` pushes onto an unbounded channel and returns.
//! - `reconfigure` pushes a request and returns a [`PendingReconfigure`]
//!   future; awaiting it is optional.
//! - `start` spawns the worker on the current Tokio runtime.
//! - `shutdown` is the only method that waits, and only for the worker to
//!   drain the requests queued before it.
//!
//! The worker, the endpoint and the socket are never shared.  The only lock
//! in this module guards the lifecycle state and is never held across an
//! `.await`.

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tablet_core::{Endpoint, Event, DEFAULT_INPUT_PORT};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::infrastructure::network::{
    DatagramConnector, HostResolver, LinkState, LinkStatus, NetworkError, NetworkWorker,
    ReconfigureOutcome, SystemResolver, UdpConnector, WorkerCommand, WorkerReport,
};

/// Lifecycle misuse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// `start` was called on a client whose worker is running or has stopped.
    #[error("network worker already started")]
    AlreadyStarted,
}

/// Construction-time options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    /// Port used when a host string carries none.
    pub default_port: u16,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_INPUT_PORT,
        }
    }
}

/// A cloneable producer handle.
///
/// Hand one to each input source; every clone feeds the same channel, and
/// each producer's events stay in its own submission order.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<WorkerCommand>,
}

impl EventSink {
    /// Enqueues `event`.  Never blocks and never fails; events submitted
    /// after the worker has stopped are discarded.
    pub fn submit(&self, event: Event) {
        if self.tx.send(WorkerCommand::Event(event)).is_err() {
            trace!("network worker stopped; discarded {:?}", event.opcode());
        }
    }
}

/// The outcome of a queued reconfiguration.
///
/// Resolves once the worker has processed the request, or to
/// [`NetworkError::WorkerStopped`] if the worker terminates first.
/// Dropping it does not cancel the reconfiguration.
#[derive(Debug)]
#[must_use = "the reconfiguration is queued either way; await this to learn the outcome"]
pub struct PendingReconfigure {
    reply: oneshot::Receiver<ReconfigureOutcome>,
}

impl PendingReconfigure {
    /// Waits for the outcome.
    pub async fn outcome(self) -> ReconfigureOutcome {
        self.await
    }
}

impl Future for PendingReconfigure {
    type Output = ReconfigureOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply)
            .poll(cx)
            .map(|reply| reply.unwrap_or(Err(NetworkError::WorkerStopped)))
    }
}

enum Lifecycle {
    Idle(NetworkWorker),
    Running(JoinHandle<WorkerReport>),
    Stopped,
}

/// Streams input events to a reconfigurable host.
pub struct NetworkClient {
    sink: EventSink,
    settings: ClientSettings,
    state: watch::Receiver<LinkState>,
    lifecycle: Mutex<Lifecycle>,
}

impl NetworkClient {
    /// Creates a client with an idle worker.  Events and reconfigurations
    /// may be submitted right away; they are processed once
    /// [`start`](Self::start) is called.
    pub fn new(
        resolver: Arc<dyn HostResolver>,
        connector: Arc<dyn DatagramConnector>,
        settings: ClientSettings,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(LinkState::default());
        let worker = NetworkWorker::new(rx, resolver, connector, state_tx);

        Self {
            sink: EventSink { tx },
            settings,
            state,
            lifecycle: Mutex::new(Lifecycle::Idle(worker)),
        }
    }

    /// Creates a client that resolves with the OS and sends over UDP.
    pub fn with_udp(settings: ClientSettings) -> Self {
        Self::new(Arc::new(SystemResolver), Arc::new(UdpConnector), settings)
    }

    /// Enqueues `event`.  Submitting [`Event::Disconnect`] stops the worker
    /// once everything queued before it has been processed.
    pub fn submit(&self, event: Event) {
        self.sink.submit(event);
    }

    /// A producer handle for another task or thread.
    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Retargets the stream to `host`, using the configured default port
    /// when `host` has none.
    ///
    /// The request is ordered with respect to submitted events.  If `host`
    /// cannot be parsed the current link is still closed and the outcome is
    /// [`NetworkError::InvalidEndpoint`].
    pub fn reconfigure(&self, host: &str) -> PendingReconfigure {
        self.reconfigure_with_port(host, self.settings.default_port)
    }

    /// Like [`reconfigure`](Self::reconfigure) with an explicit default port.
    pub fn reconfigure_with_port(&self, host: &str, default_port: u16) -> PendingReconfigure {
        let target =
            Endpoint::parse(host, default_port).map_err(|source| NetworkError::InvalidEndpoint {
                input: host.to_string(),
                source,
            });
        debug!("reconfiguration requested: {target:?}");

        let (reply, rx) = oneshot::channel();
        // On failure the command, and with it the reply sender, is dropped
        // here, so the pending outcome resolves to WorkerStopped.
        let _ = self.sink.tx.send(WorkerCommand::Reconfigure { target, reply });
        PendingReconfigure { reply: rx }
    }

    /// Spawns the worker on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AlreadyStarted`] if the worker is running or
    /// the client has been shut down.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self) -> Result<(), ClientError> {
        let mut lifecycle = self.lifecycle();
        match mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle(worker) => {
                *lifecycle = Lifecycle::Running(tokio::spawn(worker.run()));
                info!("network client started");
                Ok(())
            }
            other => {
                *lifecycle = other;
                Err(ClientError::AlreadyStarted)
            }
        }
    }

    /// Stops the worker after it has processed everything queued so far.
    ///
    /// A client that was never started spawns its worker here, so queued
    /// requests are still answered.  Every caller, including concurrent ones,
    /// returns only after the worker has terminated and closed its link.
    /// Returns the worker's counters to the first caller and `None` to the
    /// others.
    ///
    /// Cancelling the returned future does not cancel the worker; it still
    /// drains the queue and stops.
    ///
    /// # Panics
    ///
    /// Panics if a never-started client is shut down outside a Tokio runtime.
    pub async fn shutdown(&self) -> Option<WorkerReport> {
        let handle = match self.take_lifecycle() {
            Lifecycle::Idle(worker) => tokio::spawn(worker.run()),
            Lifecycle::Running(handle) => handle,
            Lifecycle::Stopped => {
                self.closed().await;
                return None;
            }
        };
        self.submit(Event::Disconnect);
        match handle.await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("network worker did not finish cleanly: {e}");
                None
            }
        }
    }

    /// Resolves once the worker has published [`LinkStatus::Closed`] or gone.
    async fn closed(&self) {
        let mut state = self.state.clone();
        // An error means the worker dropped its state sender on exit.
        let _ = state.wait_for(|s| s.status == LinkStatus::Closed).await;
    }

    /// The latest published link state.
    pub fn status(&self) -> LinkState {
        self.state.borrow().clone()
    }

    /// A receiver notified on every link state change.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    fn take_lifecycle(&self) -> Lifecycle {
        mem::replace(&mut *self.lifecycle(), Lifecycle::Stopped)
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NetworkClient {
    fn drop(&mut self) {
        // A running worker finishes the queue and exits on its own.
        self.submit(Event::Disconnect);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::network::mock::{RecordingTransport, StaticResolver};
    use std::net::SocketAddr;
    use tablet_core::{DeviceChange, EndpointError};
    use tokio_test::{assert_pending, assert_ready, task};

    fn client(transport: &RecordingTransport) -> NetworkClient {
        NetworkClient::new(
            Arc::new(StaticResolver::new()),
            Arc::new(transport.clone()),
            ClientSettings::default(),
        )
    }

    /// Resolves IP literals after a fixed delay.
    struct DelayedResolver(std::time::Duration);

    #[async_trait::async_trait]
    impl HostResolver for DelayedResolver {
        async fn resolve(&self, endpoint: &Endpoint) -> Result<SocketAddr, NetworkError> {
            tokio::time::sleep(self.0).await;
            StaticResolver::new().resolve(endpoint).await
        }
    }

    fn device(id: u8) -> Event {
        Event::DeviceChange(DeviceChange {
            device_id: id,
            present: true,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_start_twice_returns_already_started() {
        let client = client(&RecordingTransport::new());

        assert_eq!(client.start(), Ok(()));
        assert_eq!(client.start(), Err(ClientError::AlreadyStarted));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_after_shutdown_is_rejected() {
        let client = client(&RecordingTransport::new());
        client.start().unwrap();
        client.shutdown().await;

        assert_eq!(client.start(), Err(ClientError::AlreadyStarted));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let client = client(&RecordingTransport::new());
        client.start().unwrap();

        assert!(client.shutdown().await.is_some());
        assert!(client.shutdown().await.is_none());
        assert_eq!(client.status().status, LinkStatus::Closed);
    }

    #[tokio::test]
    async fn test_shutdown_without_start_still_drains_queue() {
        // Arrange
        let transport = RecordingTransport::new();
        let client = client(&transport);
        let pending = client.reconfigure("10.0.0.5:7273");
        client.submit(device(1));

        // Act
        let report = client.shutdown().await.expect("first shutdown");

        // Assert
        assert_eq!(pending.await, Ok("10.0.0.5:7273".parse().unwrap()));
        assert_eq!(report.frames_sent, 1);
    }

    #[tokio::test]
    async fn test_concurrent_shutdowns_both_wait_for_worker() {
        // Arrange: the worker is still resolving when the second call arrives
        let transport = RecordingTransport::new();
        let client = Arc::new(NetworkClient::new(
            Arc::new(DelayedResolver(std::time::Duration::from_millis(300))),
            Arc::new(transport.clone()),
            ClientSettings::default(),
        ));
        client.start().unwrap();
        let _pending = client.reconfigure("10.0.0.5");

        // Act
        let first = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.shutdown().await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let second = client.shutdown().await;

        // Assert: the second call returned only after the worker stopped
        assert!(second.is_none());
        assert_eq!(client.status().status, LinkStatus::Closed);
        assert_eq!(transport.open_links(), 0);
        assert_eq!(transport.connects().len(), 1);
        let report = first.await.unwrap().expect("first caller gets the report");
        assert_eq!(report.reconfigurations, 1);
    }

    #[tokio::test]
    async fn test_cancelled_shutdown_still_drains_idle_worker() {
        // Arrange: never started, work queued
        let transport = RecordingTransport::new();
        let client = client(&transport);
        let pending = client.reconfigure("10.0.0.5");
        client.submit(device(1));
        client.submit(device(2));

        // Act: give up on the shutdown future before it can complete
        let cancelled =
            tokio::time::timeout(std::time::Duration::ZERO, client.shutdown()).await;

        // Assert: the spawned worker finishes the queue regardless
        assert!(cancelled.is_err());
        assert!(client.shutdown().await.is_none());
        assert_eq!(client.status().status, LinkStatus::Closed);
        assert_eq!(pending.await, Ok("10.0.0.5:40118".parse().unwrap()));
        assert_eq!(transport.frames().len(), 2);
    }

    // ── Reconfiguration ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_reconfigure_is_pending_until_worker_runs() {
        // Arrange
        let client = client(&RecordingTransport::new());
        let mut pending = task::spawn(client.reconfigure("10.0.0.5"));

        // Assert: nothing processes the request before start
        assert_pending!(pending.poll());

        // Act
        client.start().unwrap();
        client.shutdown().await;

        // Assert
        assert!(pending.is_woken());
        let outcome = assert_ready!(pending.poll());
        let expected: SocketAddr = "10.0.0.5:40118".parse().unwrap();
        assert_eq!(outcome, Ok(expected));
    }

    #[tokio::test]
    async fn test_reconfigure_with_invalid_host_reports_invalid_endpoint() {
        let client = client(&RecordingTransport::new());
        client.start().unwrap();

        let outcome = client.reconfigure("10.0.0.5:notaport").await;

        assert_eq!(
            outcome,
            Err(NetworkError::InvalidEndpoint {
                input: "10.0.0.5:notaport".to_string(),
                source: EndpointError::InvalidPort("notaport".to_string()),
            })
        );
        assert_eq!(client.status().status, LinkStatus::Failed);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconfigure_after_shutdown_yields_worker_stopped() {
        let client = client(&RecordingTransport::new());
        client.start().unwrap();
        client.shutdown().await;

        let outcome = client.reconfigure("10.0.0.5").outcome().await;

        assert_eq!(outcome, Err(NetworkError::WorkerStopped));
    }

    #[tokio::test]
    async fn test_reconfigure_with_port_overrides_default() {
        let client = client(&RecordingTransport::new());
        client.start().unwrap();

        let outcome = client.reconfigure_with_port("10.0.0.5", 9000).await;

        assert_eq!(outcome, Ok("10.0.0.5:9000".parse().unwrap()));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_tracks_connected_endpoint() {
        let client = client(&RecordingTransport::new());
        let mut state = client.subscribe();
        client.start().unwrap();

        client.reconfigure("10.0.0.5:7273").await.unwrap();

        assert!(state.has_changed().unwrap());
        let status = state.borrow_and_update().clone();
        assert_eq!(status.status, LinkStatus::Connected);
        assert_eq!(status.endpoint, Some(Endpoint::new("10.0.0.5", 7273)));
        assert_eq!(status.last_fault, None);
        client.shutdown().await;
    }

    // ── Dropping ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_dropping_client_stops_running_worker() {
        // Arrange
        let transport = RecordingTransport::new();
        let client = client(&transport);
        let mut state = client.subscribe();
        client.start().unwrap();
        client.reconfigure("10.0.0.5").await.unwrap();
        assert_eq!(transport.open_links(), 1);

        // Act
        drop(client);

        // Assert: the worker closes its link and publishes Closed
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while state.borrow_and_update().status != LinkStatus::Closed {
                if state.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .expect("worker must stop after the client is dropped");
        assert_eq!(transport.open_links(), 0);
    }

    #[tokio::test]
    async fn test_sink_outlives_client_without_panicking() {
        let client = client(&RecordingTransport::new());
        let sink = client.sink();
        client.start().unwrap();
        client.shutdown().await;
        drop(client);

        sink.submit(device(3));
    }
}
