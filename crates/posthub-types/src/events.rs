use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::NotificationItem;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms the connection is bound to an address
    Ready { address: String, unread: usize },

    /// A notification addressed to the connected wallet
    Notification(NotificationItem),

    /// Inbox state changed from another connection or REST call
    InboxSync { unread: usize },

    /// A new post was published
    PostCreated {
        id: Uuid,
        author: String,
        title: String,
    },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Bind the connection to a wallet address
    Identify { address: String },

    /// Mark one notification (and its duplicates) read
    MarkRead { id: String },

    MarkAllRead,

    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_format() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"Identify","data":{"address":"0xabc"}}"#).unwrap();
        assert!(matches!(cmd, GatewayCommand::Identify { address } if address == "0xabc"));

        let cmd: GatewayCommand = serde_json::from_str(r#"{"type":"MarkAllRead"}"#).unwrap();
        assert!(matches!(cmd, GatewayCommand::MarkAllRead));
    }
}
