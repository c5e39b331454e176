use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use posthub_core::text::normalize_address;
use posthub_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Clients must identify within this window.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a single WebSocket connection: Identify handshake, Ready, then the
/// event loop.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher) {
    let (mut sender, mut receiver) = socket.split();

    let address = match wait_for_identify(&mut receiver).await {
        Some(address) => address,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("{} connected to gateway", address);

    let ready = GatewayEvent::Ready {
        address: address.clone(),
        unread: dispatcher.unread(&address).await,
    };
    if !send_event(&mut sender, &ready).await {
        return;
    }

    run_connection_loop(sender, receiver, dispatcher, address).await;
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: Dispatcher,
    address: String,
) {
    let (conn_id, mut user_rx) = dispatcher.register_connection(&address).await;

    // Replay anything still unread. Items delivered after registration are
    // also queued on user_rx, so remember what went out here.
    let mut replayed = HashSet::new();
    for item in dispatcher.notifications(&address).await.into_iter().rev() {
        if item.read {
            continue;
        }
        replayed.insert(item.id.clone());
        if !send_event(&mut sender, &GatewayEvent::Notification(item)).await {
            dispatcher.unregister_connection(&address, conn_id).await;
            return;
        }
    }

    let mut broadcast_rx = dispatcher.subscribe();
    let dispatcher_clone = dispatcher.clone();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver lagged by {} messages", n);
                            continue;
                        }
                        Err(_) => break,
                    };
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                }
                result = user_rx.recv() => {
                    let Some(event) = result else { break };
                    if already_replayed(&mut replayed, &event) {
                        continue;
                    }
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let address_recv = address.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(&dispatcher_clone, &address_recv, cmd).await,
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            address_recv,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister_connection(&address, conn_id).await;
    info!("{} disconnected from gateway", address);
}

/// Waits for `Identify { address }`. The address is lowercased.
async fn wait_for_identify(receiver: &mut SplitStream<WebSocket>) -> Option<String> {
    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { address }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let address = normalize_address(&address);
                    if !address.is_empty() {
                        return Some(address);
                    }
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify).await.ok().flatten()
}

async fn handle_command(dispatcher: &Dispatcher, address: &str, cmd: GatewayCommand) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::MarkRead { id } => {
            let unread = dispatcher.mark_read(address, &id).await;
            debug!("{} marked {} read ({} unread)", address, id, unread);
        }

        GatewayCommand::MarkAllRead => {
            dispatcher.mark_all_read(address).await;
        }

        GatewayCommand::Clear => {
            info!("{} cleared notifications", address);
            dispatcher.clear(address).await;
        }
    }
}

/// True if `event` is a notification the unread replay already sent. Each id
/// is skipped at most once.
fn already_replayed(replayed: &mut HashSet<String>, event: &GatewayEvent) -> bool {
    match event {
        GatewayEvent::Notification(item) => replayed.remove(&item.id),
        _ => false,
    }
}

/// Serializes and sends one event. Returns false once the socket is gone.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &GatewayEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use posthub_types::models::NotificationType;

    #[tokio::test]
    async fn test_commands_update_inbox() {
        let dispatcher = Dispatcher::new();
        let item = dispatcher
            .deliver("0xabc", NotificationType::Reply, "r".into(), None)
            .await;
        dispatcher
            .deliver("0xabc", NotificationType::Like, "l".into(), Some("/post/9".into()))
            .await;

        handle_command(&dispatcher, "0xabc", GatewayCommand::MarkRead { id: item.id }).await;
        assert_eq!(dispatcher.unread("0xabc").await, 1);

        handle_command(&dispatcher, "0xabc", GatewayCommand::MarkAllRead).await;
        assert_eq!(dispatcher.unread("0xabc").await, 0);

        handle_command(&dispatcher, "0xabc", GatewayCommand::Clear).await;
        assert!(dispatcher.notifications("0xabc").await.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_during_replay_is_sent_once() {
        let dispatcher = Dispatcher::new();
        let (_conn_id, mut user_rx) = dispatcher.register_connection("0xabc").await;

        // Lands between registration and the replay snapshot
        let item = dispatcher
            .deliver("0xabc", NotificationType::Reply, "r".into(), None)
            .await;

        let mut replayed: HashSet<String> = dispatcher
            .notifications("0xabc")
            .await
            .into_iter()
            .filter(|n| !n.read)
            .map(|n| n.id)
            .collect();
        assert!(replayed.contains(&item.id));

        let queued = user_rx.recv().await.unwrap();
        assert!(already_replayed(&mut replayed, &queued));

        // A second event with the same id is no longer suppressed
        assert!(!already_replayed(&mut replayed, &queued));

        let later = dispatcher
            .deliver("0xabc", NotificationType::Like, "l".into(), None)
            .await;
        let queued = user_rx.recv().await.unwrap();
        assert!(matches!(&queued, GatewayEvent::Notification(n) if n.id == later.id));
        assert!(!already_replayed(&mut replayed, &queued));
    }
}
