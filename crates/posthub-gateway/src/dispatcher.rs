use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::debug;
use uuid::Uuid;

use posthub_core::inbox::Inbox;
use posthub_core::text::normalize_address;
use posthub_types::events::GatewayEvent;
use posthub_types::models::{NotificationItem, NotificationType};

type ConnectionMap = HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>;

/// Tracks connected wallets, owns their notification inboxes, and fans out
/// events.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for gateway events, every connected client receives these
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Per-address targeted send channels: address -> (conn_id -> sender).
    /// One wallet may have several tabs open.
    connections: RwLock<HashMap<String, ConnectionMap>>,

    /// Notification inboxes keyed by lowercase address
    inboxes: RwLock<HashMap<String, Inbox>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashMap::new()),
                inboxes: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a targeted channel for `address`. Returns (conn_id, receiver).
    pub async fn register_connection(
        &self,
        address: &str,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .connections
            .write()
            .await
            .entry(normalize_address(address))
            .or_default()
            .insert(conn_id, tx);
        (conn_id, rx)
    }

    pub async fn unregister_connection(&self, address: &str, conn_id: Uuid) {
        let key = normalize_address(address);
        let mut connections = self.inner.connections.write().await;
        if let Some(conns) = connections.get_mut(&key) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                connections.remove(&key);
            }
        }
    }

    pub async fn connection_count(&self, address: &str) -> usize {
        self.inner
            .connections
            .read()
            .await
            .get(&normalize_address(address))
            .map_or(0, HashMap::len)
    }

    /// Send a targeted event to every connection of `address`.
    pub async fn send_to_address(&self, address: &str, event: GatewayEvent) {
        let connections = self.inner.connections.read().await;
        if let Some(conns) = connections.get(&normalize_address(address)) {
            for tx in conns.values() {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Stores a notification in the recipient's inbox and pushes it to any
    /// open connections.
    pub async fn deliver(
        &self,
        recipient: &str,
        kind: NotificationType,
        text: String,
        link: Option<String>,
    ) -> NotificationItem {
        let key = normalize_address(recipient);
        let item = self
            .inner
            .inboxes
            .write()
            .await
            .entry(key.clone())
            .or_default()
            .add(kind, text, link, Utc::now().timestamp_millis());

        debug!("notification {} -> {}", item.id, key);
        self.send_to_address(&key, GatewayEvent::Notification(item.clone()))
            .await;
        item
    }

    /// Newest first.
    pub async fn notifications(&self, address: &str) -> Vec<NotificationItem> {
        self.inner
            .inboxes
            .read()
            .await
            .get(&normalize_address(address))
            .map(|inbox| inbox.items().to_vec())
            .unwrap_or_default()
    }

    pub async fn unread(&self, address: &str) -> usize {
        self.inner
            .inboxes
            .read()
            .await
            .get(&normalize_address(address))
            .map_or(0, Inbox::unread_count)
    }

    /// Marks `id` and its duplicates read. Returns the new unread count.
    pub async fn mark_read(&self, address: &str, id: &str) -> usize {
        self.update_inbox(address, |inbox| {
            inbox.mark_read(id);
        })
        .await
    }

    pub async fn mark_all_read(&self, address: &str) -> usize {
        self.update_inbox(address, |inbox| {
            inbox.mark_all_read();
        })
        .await
    }

    pub async fn clear(&self, address: &str) -> usize {
        self.update_inbox(address, Inbox::clear).await
    }

    /// Applies `f` to the inbox, then tells every open tab the new unread count.
    /// Addresses without an inbox are left alone.
    async fn update_inbox<F>(&self, address: &str, f: F) -> usize
    where
        F: FnOnce(&mut Inbox),
    {
        let key = normalize_address(address);
        let unread = {
            let mut inboxes = self.inner.inboxes.write().await;
            let Some(inbox) = inboxes.get_mut(&key) else {
                return 0;
            };
            f(inbox);
            inbox.unread_count()
        };
        self.send_to_address(&key, GatewayEvent::InboxSync { unread })
            .await;
        unread
    }
}
