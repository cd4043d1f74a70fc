//! The hub event loop and its handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use axum::extract::ws::Message;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Size of the join and leave queues.
const CONTROL_BUFFER_SIZE: usize = 64;

/// Size of the broadcast queue.
const BROADCAST_BUFFER_SIZE: usize = 256;

/// Capacity of each client's outbound queue. Sized to absorb a burst of
/// concurrent broadcasts; a client that falls further behind than this is
/// disconnected rather than allowed to stall the hub.
pub const OUTBOUND_BUFFER_SIZE: usize = 256;

/// Per-hub connection identifier.
pub type ConnId = u64;

/// A client's admission ticket: its id and the hub-side sender of its
/// outbound queue. The hub keeps the only sender, so removing the member
/// closes the queue exactly once.
pub struct Registration {
    pub id: ConnId,
    pub sender: mpsc::Sender<Message>,
}

/// Cloneable handle used by adapters and handlers to submit events to the
/// hub. Submission is asynchronous: an event takes effect once the hub loop
/// has processed it. Per-queue FIFO order is preserved; there is no ordering
/// guarantee across the three queues.
#[derive(Clone)]
pub struct HubHandle {
    join_tx: mpsc::Sender<Registration>,
    leave_tx: mpsc::Sender<ConnId>,
    broadcast_tx: mpsc::Sender<Message>,
    next_id: Arc<AtomicU64>,
    members: Arc<AtomicUsize>,
}

impl HubHandle {
    /// Allocate the next connection id for this hub.
    pub fn next_id(&self) -> ConnId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Enqueue a client for admission into membership.
    pub async fn join(&self, registration: Registration) {
        let _ = self.join_tx.send(registration).await;
    }

    /// Enqueue removal of a client. Idempotent: leaving a client that is not
    /// a member is a no-op.
    pub async fn leave(&self, id: ConnId) {
        let _ = self.leave_tx.send(id).await;
    }

    /// Enqueue a message for delivery to every client that is a member at
    /// the moment the hub processes it.
    pub async fn broadcast(&self, message: Message) {
        let _ = self.broadcast_tx.send(message).await;
    }

    /// Current membership size. Written only by the hub loop; reading it
    /// never touches the membership set itself.
    pub fn member_count(&self) -> usize {
        self.members.load(Ordering::Relaxed)
    }
}

/// A running hub. Spawning starts the event loop task; [`Hub::stop`] shuts
/// it down, closing every member's outbound queue.
pub struct Hub {
    handle: HubHandle,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Hub {
    pub fn spawn() -> Self {
        let (join_tx, join_rx) = mpsc::channel(CONTROL_BUFFER_SIZE);
        let (leave_tx, leave_rx) = mpsc::channel(CONTROL_BUFFER_SIZE);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(BROADCAST_BUFFER_SIZE);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let members = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn(run_loop(
            join_rx,
            leave_rx,
            broadcast_rx,
            shutdown_rx,
            members.clone(),
        ));

        Self {
            handle: HubHandle {
                join_tx,
                leave_tx,
                broadcast_tx,
                next_id: Arc::new(AtomicU64::new(1)),
                members,
            },
            shutdown_tx,
            task,
        }
    }

    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Stop the hub: the loop drops every member's outbound sender (closing
    /// the queues) and exits. Consumes the hub; handles left behind become
    /// inert.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

/// The event loop. Sole owner and mutator of the membership set. Processes
/// exactly one ready event per iteration; selection among simultaneously
/// ready queues is unspecified.
async fn run_loop(
    mut join_rx: mpsc::Receiver<Registration>,
    mut leave_rx: mpsc::Receiver<ConnId>,
    mut broadcast_rx: mpsc::Receiver<Message>,
    mut shutdown_rx: oneshot::Receiver<()>,
    gauge: Arc<AtomicUsize>,
) {
    let mut members: HashMap<ConnId, mpsc::Sender<Message>> = HashMap::new();

    loop {
        tokio::select! {
            Some(registration) = join_rx.recv() => {
                debug!(conn = registration.id, "joining");
                members.insert(registration.id, registration.sender);
                gauge.store(members.len(), Ordering::Relaxed);
            }
            Some(id) = leave_rx.recv() => {
                if members.remove(&id).is_some() {
                    debug!(conn = id, "leaving");
                    gauge.store(members.len(), Ordering::Relaxed);
                }
            }
            Some(message) = broadcast_rx.recv() => {
                let mut dropped = Vec::new();
                for (id, sender) in &members {
                    match sender.try_send(message.clone()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            warn!(conn = id, "outbound queue full, disconnecting slow client");
                            dropped.push(*id);
                        }
                        Err(TrySendError::Closed(_)) => {
                            dropped.push(*id);
                        }
                    }
                }
                for id in dropped {
                    members.remove(&id);
                }
                gauge.store(members.len(), Ordering::Relaxed);
            }
            _ = &mut shutdown_rx => {
                break;
            }
        }
    }

    members.clear();
    gauge.store(0, Ordering::Relaxed);
    info!("hub stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::time::{sleep, timeout};

    fn text(content: &'static str) -> Message {
        Message::Text(content.into())
    }

    async fn wait_for_members(handle: &HubHandle, expected: usize) {
        timeout(Duration::from_secs(1), async {
            while handle.member_count() != expected {
                sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("membership did not settle");
    }

    async fn register(handle: &HubHandle, capacity: usize) -> (ConnId, mpsc::Receiver<Message>) {
        let id = handle.next_id();
        let (tx, rx) = mpsc::channel(capacity);
        handle.join(Registration { id, sender: tx }).await;
        (id, rx)
    }

    #[tokio::test]
    async fn test_membership_reflects_joins_minus_leaves() {
        let hub = Hub::spawn();
        let handle = hub.handle();

        let (a, _rx_a) = register(&handle, 8).await;
        let (b, _rx_b) = register(&handle, 8).await;
        wait_for_members(&handle, 2).await;

        handle.leave(a).await;
        let (_c, _rx_c) = register(&handle, 8).await;
        wait_for_members(&handle, 2).await;

        handle.leave(b).await;
        wait_for_members(&handle, 1).await;

        hub.stop().await;
    }

    #[tokio::test]
    async fn test_broadcast_reaches_each_current_member_exactly_once() {
        let hub = Hub::spawn();
        let handle = hub.handle();

        let (_a, mut rx_a) = register(&handle, 8).await;
        let (_b, mut rx_b) = register(&handle, 8).await;
        let (_c, mut rx_c) = register(&handle, 8).await;
        wait_for_members(&handle, 3).await;

        handle.broadcast(text("first")).await;
        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            assert_eq!(rx.recv().await, Some(text("first")));
            assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
        }

        // A member admitted after the broadcast was processed never sees it.
        let (_d, mut rx_d) = register(&handle, 8).await;
        wait_for_members(&handle, 4).await;
        assert_eq!(rx_d.try_recv().unwrap_err(), TryRecvError::Empty);

        handle.broadcast(text("second")).await;
        for rx in [&mut rx_a, &mut rx_b, &mut rx_c, &mut rx_d] {
            assert_eq!(rx.recv().await, Some(text("second")));
        }

        hub.stop().await;
    }

    #[tokio::test]
    async fn test_leave_is_idempotent_and_closes_queue_once() {
        let hub = Hub::spawn();
        let handle = hub.handle();

        let (a, mut rx_a) = register(&handle, 8).await;
        wait_for_members(&handle, 1).await;

        handle.leave(a).await;
        handle.leave(a).await;
        wait_for_members(&handle, 0).await;

        // Queue closed by the hub, exactly once, with nothing delivered.
        assert_eq!(rx_a.recv().await, None);

        hub.stop().await;
    }

    #[tokio::test]
    async fn test_slow_consumer_is_disconnected_without_stalling_others() {
        let hub = Hub::spawn();
        let handle = hub.handle();

        let (_slow, mut rx_slow) = register(&handle, 1).await;
        let (_fast, mut rx_fast) = register(&handle, 8).await;
        wait_for_members(&handle, 2).await;

        // The second message overflows the capacity-1 queue nobody drains.
        handle.broadcast(text("one")).await;
        handle.broadcast(text("two")).await;
        wait_for_members(&handle, 1).await;

        assert_eq!(rx_fast.recv().await, Some(text("one")));
        assert_eq!(rx_fast.recv().await, Some(text("two")));

        // The slow member got the buffered message, then the closed queue.
        assert_eq!(rx_slow.recv().await, Some(text("one")));
        assert_eq!(rx_slow.recv().await, None);

        hub.stop().await;
    }

    #[tokio::test]
    async fn test_stop_closes_member_queues() {
        let hub = Hub::spawn();
        let handle = hub.handle();

        let (_a, mut rx_a) = register(&handle, 8).await;
        wait_for_members(&handle, 1).await;

        hub.stop().await;
        assert_eq!(rx_a.recv().await, None);
        assert_eq!(handle.member_count(), 0);
    }
}
