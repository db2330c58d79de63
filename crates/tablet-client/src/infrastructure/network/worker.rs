//! The network worker: single consumer of the event channel.
//!
//! # How the worker loop works (for beginners)
//!
//! Producers (UI callbacks, the settings follower) never touch the socket.
//! They push [`WorkerCommand`]s into an unbounded `mpsc` channel and return
//! immediately.  The worker is the only task that receives from the channel,
//! and it handles one command at a time, in arrival order:
//!
//! ```text
//! producers ──submit/reconfigure──▶ [ mpsc channel ] ──recv──▶ NetworkWorker
//!                                                               │
//!                                                               ├─ Event      → encode → link.send
//!                                                               ├─ Reconfigure → drop link → resolve → connect
//!                                                               └─ Disconnect → drop link → return report
//! ```
//!
//! Because reconfiguration travels the same channel as data, every event
//! queued before a host change is attempted against the old host and every
//! event queued after it against the new one.  The endpoint and the link are
//! plain fields of the worker: the channel's ordering is the only
//! synchronization they need.
//!
//! # Drop policy
//!
//! With no open link, data events are dropped without error.  A failed send
//! is recorded and the event is dropped, but the link is kept: the next pen
//! sample a few milliseconds later is the retry.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tablet_core::{encode_event_into, Endpoint, Event};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use super::{DatagramConnector, DatagramLink, HostResolver, NetworkError};

/// Result of one reconfiguration attempt: the address now being sent to.
pub type ReconfigureOutcome = Result<SocketAddr, NetworkError>;

/// One item in the event channel.
#[derive(Debug)]
pub enum WorkerCommand {
    /// A data event, or the [`Event::Disconnect`] sentinel.
    Event(Event),
    /// Switch to a new endpoint.  `target` is `Err` when the host string
    /// could not be parsed; the current link is still closed in that case.
    Reconfigure {
        target: Result<Endpoint, NetworkError>,
        reply: oneshot::Sender<ReconfigureOutcome>,
    },
}

/// Coarse link status for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    /// No reconfiguration has been processed yet.
    Unconfigured,
    /// The last reconfiguration opened a link.
    Connected,
    /// The last reconfiguration failed; events are being dropped.
    Failed,
    /// The worker has terminated.
    Closed,
}

/// Snapshot published by the worker after every state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkState {
    pub status: LinkStatus,
    /// The endpoint of the last reconfiguration attempt.
    pub endpoint: Option<Endpoint>,
    /// Resolved address of the open link.
    pub peer: Option<SocketAddr>,
    /// Most recent fault: the failed reconfiguration, or the latest send failure.
    pub last_fault: Option<NetworkError>,
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            status: LinkStatus::Unconfigured,
            endpoint: None,
            peer: None,
            last_fault: None,
        }
    }
}

/// Counters returned when the worker terminates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    /// Frames handed to the link successfully.
    pub frames_sent: u64,
    /// Data events dropped because no link was open.
    pub frames_dropped: u64,
    /// Data events dropped because the send failed.
    pub send_failures: u64,
    /// Reconfiguration requests processed (successful or not).
    pub reconfigurations: u64,
}

/// Owns the datagram link and drains the event channel.
pub struct NetworkWorker {
    rx: mpsc::UnboundedReceiver<WorkerCommand>,
    resolver: Arc<dyn HostResolver>,
    connector: Arc<dyn DatagramConnector>,
    state: watch::Sender<LinkState>,
    endpoint: Option<Endpoint>,
    link: Option<Box<dyn DatagramLink>>,
    /// Reused for every frame.
    frame: Vec<u8>,
    report: WorkerReport,
}

impl NetworkWorker {
    /// Creates an idle worker.  Nothing happens until [`run`](Self::run) is awaited.
    pub fn new(
        rx: mpsc::UnboundedReceiver<WorkerCommand>,
        resolver: Arc<dyn HostResolver>,
        connector: Arc<dyn DatagramConnector>,
        state: watch::Sender<LinkState>,
    ) -> Self {
        Self {
            rx,
            resolver,
            connector,
            state,
            endpoint: None,
            link: None,
            frame: Vec::with_capacity(16),
            report: WorkerReport::default(),
        }
    }

    /// Processes commands until `Disconnect` arrives or every sender is gone.
    ///
    /// The link is closed before returning.  Commands queued behind the
    /// sentinel are discarded with the receiver.
    pub async fn run(mut self) -> WorkerReport {
        debug!("network worker started");

        while let Some(command) = self.rx.recv().await {
            match command {
                WorkerCommand::Event(event) if event.is_disconnect() => {
                    debug!("disconnect received");
                    break;
                }
                WorkerCommand::Event(event) => self.transmit(event).await,
                WorkerCommand::Reconfigure { target, reply } => {
                    let outcome = self.reconfigure(target).await;
                    // The requester may have stopped waiting; the state
                    // channel still carries the outcome.
                    let _ = reply.send(outcome);
                }
            }
        }

        self.close_link();
        self.state.send_modify(|s| {
            s.status = LinkStatus::Closed;
            s.peer = None;
        });
        info!(
            "network worker stopped: {} sent, {} dropped, {} failed, {} reconfigurations",
            self.report.frames_sent,
            self.report.frames_dropped,
            self.report.send_failures,
            self.report.reconfigurations
        );
        self.report
    }

    async fn transmit(&mut self, event: Event) {
        let Some(link) = self.link.as_mut() else {
            self.report.frames_dropped += 1;
            trace!(
                "no open link; dropped {:?} from device {:?}",
                event.opcode(),
                event.device_id()
            );
            return;
        };

        self.frame.clear();
        encode_event_into(&event, &mut self.frame);

        match link.send(&self.frame).await {
            Ok(()) => {
                self.report.frames_sent += 1;
                trace!(
                    "sent {:?} from device {:?} ({} bytes)",
                    event.opcode(),
                    event.device_id(),
                    self.frame.len()
                );
            }
            Err(e) => {
                self.report.send_failures += 1;
                let fault = NetworkError::Transmission {
                    addr: link.peer(),
                    reason: e.to_string(),
                };
                // Only notify subscribers (and log loudly) when the fault changes;
                // an unreachable host fails every single frame.
                let changed = self.state.send_if_modified(|s| {
                    if s.last_fault.as_ref() == Some(&fault) {
                        return false;
                    }
                    s.last_fault = Some(fault.clone());
                    true
                });
                if changed {
                    warn!("{fault}");
                } else {
                    trace!("{fault}");
                }
            }
        }
    }

    async fn reconfigure(&mut self, target: Result<Endpoint, NetworkError>) -> ReconfigureOutcome {
        self.report.reconfigurations += 1;
        // Close first: at most one link is ever open.
        self.close_link();

        let outcome = self.open_link(target).await;
        match &outcome {
            Ok(peer) => {
                info!(
                    "streaming input to {} ({peer})",
                    self.endpoint.as_ref().map_or_else(String::new, Endpoint::to_string)
                );
                let endpoint = self.endpoint.clone();
                self.state.send_modify(|s| {
                    s.status = LinkStatus::Connected;
                    s.endpoint = endpoint;
                    s.peer = Some(*peer);
                    s.last_fault = None;
                });
            }
            Err(e) => {
                warn!("reconfiguration failed, input events will be dropped: {e}");
                let endpoint = self.endpoint.clone();
                self.state.send_modify(|s| {
                    s.status = LinkStatus::Failed;
                    s.endpoint = endpoint;
                    s.peer = None;
                    s.last_fault = Some(e.clone());
                });
            }
        }
        outcome
    }

    async fn open_link(&mut self, target: Result<Endpoint, NetworkError>) -> ReconfigureOutcome {
        let endpoint = target?;
        self.endpoint = Some(endpoint.clone());
        let addr = self.resolver.resolve(&endpoint).await?;
        let link = self.connector.connect(addr).await?;
        self.link = Some(link);
        Ok(addr)
    }

    fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            debug!("closing link to {}", link.peer());
        }
        self.endpoint = None;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
