//! Connection registry and group fan-out for one hub family.
//!
//! Register/unregister are funneled through a bounded event channel drained
//! by the hub task so structural teardown is serialized; join/leave and
//! introspection take the membership lock directly. Outbound delivery is a
//! non-blocking enqueue onto each connection's bounded queue; a full queue
//! schedules eviction and the frame is dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::groups::HubKind;
use super::protocol;
use super::{Framing, SEND_BUFFER_SIZE};

/// Register/unregister queue depth. Eviction bursts larger than this spill
/// into spawned sends rather than blocking dispatch.
const EVENT_QUEUE_SIZE: usize = 64;

#[derive(Debug)]
pub enum EnqueueError {
    Full,
    Closed,
}

/// Live connection state shared between the hub, the pumps, and dispatch.
pub struct Conn {
    pub conn_id: String,
    pub api_key: String,
    pub framing: Framing,
    outbound: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    groups: Mutex<HashSet<String>>,
}

impl Conn {
    pub fn new(
        conn_id: String,
        api_key: String,
        framing: Framing,
    ) -> (Arc<Self>, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(SEND_BUFFER_SIZE);
        (
            Arc::new(Self {
                conn_id,
                api_key,
                framing,
                outbound: Mutex::new(Some(tx)),
                groups: Mutex::new(HashSet::new()),
            }),
            rx,
        )
    }

    /// Non-blocking enqueue of a pre-serialized frame.
    pub fn try_enqueue(&self, frame: Vec<u8>) -> Result<(), EnqueueError> {
        let outbound = self.outbound.lock();
        match outbound.as_ref() {
            None => Err(EnqueueError::Closed),
            Some(tx) => tx.try_send(frame).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
                mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
            }),
        }
    }

    /// Closes the outbound queue. Dropping the sender ends the write pump's
    /// receive loop; the take guarantees this happens at most once.
    pub fn close_outbound(&self) {
        self.outbound.lock().take();
    }

    pub fn groups_snapshot(&self) -> Vec<String> {
        self.groups.lock().iter().cloned().collect()
    }

    fn add_group(&self, group: &str) {
        self.groups.lock().insert(group.to_string());
    }

    fn remove_group(&self, group: &str) {
        self.groups.lock().remove(group);
    }
}

enum HubEvent {
    Register(Arc<Conn>),
    Unregister(Arc<Conn>),
}

#[derive(Default)]
struct Membership {
    conns: HashMap<String, Arc<Conn>>,
    groups: HashMap<String, HashMap<String, Arc<Conn>>>,
}

pub struct Hub {
    kind: HubKind,
    group_prefix: String,
    membership: RwLock<Membership>,
    events_tx: mpsc::Sender<HubEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<HubEvent>>>,
}

impl Hub {
    pub fn new(kind: HubKind, group_prefix: &str) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        Arc::new(Self {
            kind,
            group_prefix: group_prefix.to_string(),
            membership: RwLock::new(Membership::default()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        })
    }

    pub fn kind(&self) -> HubKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn validate_group(&self, group: &str) -> bool {
        self.kind.validate_group(&self.group_prefix, group)
    }

    pub fn parse_group(&self, group: &str) -> Option<(String, String)> {
        self.kind.parse_group(&self.group_prefix, group)
    }

    pub async fn register(&self, conn: Arc<Conn>) {
        let _ = self.events_tx.send(HubEvent::Register(conn)).await;
    }

    pub async fn unregister(&self, conn: Arc<Conn>) {
        let _ = self.events_tx.send(HubEvent::Unregister(conn)).await;
    }

    /// Non-blocking unregister used on dispatch paths; falls back to a
    /// spawned send when the event queue is momentarily full.
    pub fn schedule_unregister(&self, conn: Arc<Conn>) {
        if let Err(mpsc::error::TrySendError::Full(event)) =
            self.events_tx.try_send(HubEvent::Unregister(conn))
        {
            let tx = self.events_tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(event).await;
            });
        }
    }

    /// Adds a connection to a group, keeping the reverse index and the
    /// connection's own subscription set in lockstep.
    pub fn join(&self, conn: &Arc<Conn>, group: &str) {
        let mut membership = self.membership.write();
        membership
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(conn.conn_id.clone(), conn.clone());
        conn.add_group(group);
        debug!(hub = self.name(), conn_id = %conn.conn_id, group, "client joined group");
    }

    pub fn leave(&self, conn: &Arc<Conn>, group: &str) {
        let mut membership = self.membership.write();
        if let Some(bucket) = membership.groups.get_mut(group) {
            bucket.remove(&conn.conn_id);
            if bucket.is_empty() {
                membership.groups.remove(group);
            }
        }
        conn.remove_group(group);
        debug!(hub = self.name(), conn_id = %conn.conn_id, group, "client left group");
    }

    pub fn active_groups(&self) -> Vec<String> {
        let membership = self.membership.read();
        membership
            .groups
            .iter()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(group, _)| group.clone())
            .collect()
    }

    /// Subscribers of a group, bucketed by subscriber key so the streamer
    /// can advance one cursor per key and fan the frame out to every
    /// connection sharing it.
    pub fn subscribers_by_key(&self, group: &str) -> HashMap<String, Vec<Arc<Conn>>> {
        let membership = self.membership.read();
        let mut by_key: HashMap<String, Vec<Arc<Conn>>> = HashMap::new();
        if let Some(bucket) = membership.groups.get(group) {
            for conn in bucket.values() {
                by_key
                    .entry(conn.api_key.clone())
                    .or_default()
                    .push(conn.clone());
            }
        }
        by_key
    }

    pub fn connection_count(&self) -> usize {
        self.membership.read().conns.len()
    }

    /// Enqueues a data frame per connection, formatted for its framing.
    /// Binary consumers get the typed envelope; text consumers get the raw
    /// record embedded as JSON, or the base64 envelope when no raw line is
    /// available. Full queues trigger eviction, not retries.
    pub fn dispatch_to(
        &self,
        conns: &[Arc<Conn>],
        encoded: &[u8],
        raw: Option<&[u8]>,
        group: &str,
        type_url: &str,
    ) {
        for conn in conns {
            let frame = match conn.framing {
                Framing::Binary => protocol::data_binary(group, encoded, type_url),
                Framing::Text => raw
                    .and_then(|line| protocol::data_text_raw(group, line))
                    .unwrap_or_else(|| protocol::data_text_envelope(group, encoded, type_url)),
            };
            match conn.try_enqueue(frame) {
                Ok(()) => {}
                Err(EnqueueError::Full) => {
                    warn!(
                        hub = self.name(),
                        conn_id = %conn.conn_id,
                        group,
                        "send buffer full, evicting slow consumer"
                    );
                    self.schedule_unregister(conn.clone());
                }
                Err(EnqueueError::Closed) => {}
            }
        }
    }

    /// Drives register/unregister until cancellation, then closes every
    /// connection's outbound queue and clears membership.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut events_rx = match self.events_rx.lock().take() {
            Some(rx) => rx,
            None => {
                warn!(hub = self.name(), "hub event loop already running");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(hub = self.name(), "hub shutting down");
                    self.shutdown();
                    return;
                }
                event = events_rx.recv() => {
                    match event {
                        Some(HubEvent::Register(conn)) => {
                            let mut membership = self.membership.write();
                            membership.conns.insert(conn.conn_id.clone(), conn.clone());
                            drop(membership);
                            debug!(hub = self.name(), conn_id = %conn.conn_id, "client registered");
                        }
                        Some(HubEvent::Unregister(conn)) => {
                            self.remove_conn(&conn);
                            debug!(hub = self.name(), conn_id = %conn.conn_id, "client unregistered");
                        }
                        None => return,
                    }
                }
            }
        }
    }

    fn remove_conn(&self, conn: &Arc<Conn>) {
        let mut membership = self.membership.write();
        if membership.conns.remove(&conn.conn_id).is_none() {
            return;
        }
        for group in conn.groups_snapshot() {
            if let Some(bucket) = membership.groups.get_mut(&group) {
                bucket.remove(&conn.conn_id);
                if bucket.is_empty() {
                    membership.groups.remove(&group);
                }
            }
        }
        drop(membership);
        conn.close_outbound();
    }

    fn shutdown(&self) {
        let mut membership = self.membership.write();
        for conn in membership.conns.values() {
            conn.close_outbound();
        }
        membership.conns.clear();
        membership.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_conn(id: &str, key: &str) -> (Arc<Conn>, mpsc::Receiver<Vec<u8>>) {
        Conn::new(id.to_string(), key.to_string(), Framing::Binary)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn join_groups_subscribers_by_key() {
        let hub = Hub::new(HubKind::Orderflow, "blue");
        let cancel = CancellationToken::new();
        let loop_hub = hub.clone();
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move { loop_hub.run(loop_cancel).await });

        let (a1, _rx1) = test_conn("c1", "A");
        let (a2, _rx2) = test_conn("c2", "A");
        let (b1, _rx3) = test_conn("c3", "B");
        for conn in [&a1, &a2, &b1] {
            hub.register(conn.clone()).await;
        }
        settle().await;

        let group = "blue_SPX_orderflow_orderflow";
        hub.join(&a1, group);
        hub.join(&a2, group);
        hub.join(&b1, group);

        let by_key = hub.subscribers_by_key(group);
        assert_eq!(by_key.len(), 2);
        assert_eq!(by_key["A"].len(), 2);
        assert_eq!(by_key["B"].len(), 1);
        assert_eq!(hub.active_groups(), vec![group.to_string()]);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn leave_drops_empty_buckets() {
        let hub = Hub::new(HubKind::Orderflow, "blue");
        let (conn, _rx) = test_conn("c1", "A");
        let group = "blue_SPX_orderflow_orderflow";

        hub.join(&conn, group);
        assert_eq!(hub.active_groups().len(), 1);

        hub.leave(&conn, group);
        assert!(hub.active_groups().is_empty());
        assert!(conn.groups_snapshot().is_empty());
    }

    #[tokio::test]
    async fn unregister_detaches_from_groups_and_closes_queue() {
        let hub = Hub::new(HubKind::Orderflow, "blue");
        let cancel = CancellationToken::new();
        let loop_hub = hub.clone();
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move { loop_hub.run(loop_cancel).await });

        let (conn, mut rx) = test_conn("c1", "A");
        hub.register(conn.clone()).await;
        settle().await;
        let group = "blue_SPX_orderflow_orderflow";
        hub.join(&conn, group);

        hub.unregister(conn.clone()).await;
        settle().await;

        assert!(hub.active_groups().is_empty());
        assert_eq!(hub.connection_count(), 0);
        // Queue closed: receiver drains to None.
        assert!(rx.recv().await.is_none());
        // Enqueue after close is rejected without panicking.
        assert!(matches!(
            conn.try_enqueue(vec![1]),
            Err(EnqueueError::Closed)
        ));
        // Second close is a no-op.
        conn.close_outbound();

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn slow_consumer_is_evicted_on_overflow() {
        let hub = Hub::new(HubKind::Orderflow, "blue");
        let cancel = CancellationToken::new();
        let loop_hub = hub.clone();
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move { loop_hub.run(loop_cancel).await });

        let (slow, _rx_kept_unread) = test_conn("slow", "A");
        let (healthy, mut healthy_rx) = test_conn("fast", "B");
        hub.register(slow.clone()).await;
        hub.register(healthy.clone()).await;
        settle().await;

        let group = "blue_SPX_orderflow_orderflow";
        hub.join(&slow, group);
        hub.join(&healthy, group);

        // Saturate the slow consumer's queue.
        for _ in 0..SEND_BUFFER_SIZE {
            slow.try_enqueue(vec![0]).unwrap();
        }

        let conns: Vec<Arc<Conn>> = vec![slow.clone(), healthy.clone()];
        hub.dispatch_to(&conns, b"payload", None, group, "proto.orderflow");
        settle().await;

        // Slow consumer is gone from the group; healthy one still receives.
        let by_key = hub.subscribers_by_key(group);
        assert!(!by_key.contains_key("A"));
        assert_eq!(by_key["B"].len(), 1);
        assert!(healthy_rx.recv().await.is_some());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_closes_every_queue() {
        let hub = Hub::new(HubKind::Orderflow, "blue");
        let cancel = CancellationToken::new();
        let loop_hub = hub.clone();
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move { loop_hub.run(loop_cancel).await });

        let (c1, mut rx1) = test_conn("c1", "A");
        let (c2, mut rx2) = test_conn("c2", "B");
        hub.register(c1.clone()).await;
        hub.register(c2.clone()).await;
        settle().await;
        hub.join(&c1, "blue_SPX_orderflow_orderflow");

        cancel.cancel();
        task.await.unwrap();

        assert!(rx1.recv().await.is_none());
        assert!(rx2.recv().await.is_none());
        assert_eq!(hub.connection_count(), 0);
        assert!(hub.active_groups().is_empty());
    }
}
