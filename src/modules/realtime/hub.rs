use std::sync::Arc;

use serde::Deserialize;
use sqlx::postgres::{PgListener, PgPool};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::config::RealtimeConfig;
use crate::features::files::models::{ChangeEvent, ChangeKind, FileRecord};
use crate::modules::storage::FileRow;

/// Callback invoked for every event delivered to a subscription
pub type EventHandler = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// NOTIFY channel the `files` change trigger publishes on; must match the
/// `pg_notify` call in the migrations
pub const FILE_CHANGES_CHANNEL: &str = "file_changes";

/// Handle for one owner's event stream; delivery stops when it is dropped
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Notification body written by the `files` change trigger
#[derive(Debug, Deserialize)]
struct ChangePayload {
    kind: String,
    record: FileRow,
}

/// Decode a trigger notification into a change event
pub fn decode_payload(payload: &str) -> Result<ChangeEvent, String> {
    let payload: ChangePayload =
        serde_json::from_str(payload).map_err(|e| format!("Invalid change payload: {}", e))?;

    let kind = ChangeKind::from_operation(&payload.kind)
        .ok_or_else(|| format!("Unknown change kind '{}'", payload.kind))?;

    Ok(ChangeEvent::new(kind, FileRecord::from(payload.record)))
}

/// Fan-out point between the database change feed and open sessions
pub struct RealtimeHub {
    events: broadcast::Sender<ChangeEvent>,
    state: watch::Sender<ConnectionState>,
}

impl RealtimeHub {
    pub fn new(buffer: usize) -> Self {
        let (events, _) = broadcast::channel(buffer.max(1));
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self { events, state }
    }

    /// Send an event to every live subscription, returning how many
    /// receivers saw it
    pub fn publish(&self, event: ChangeEvent) -> usize {
        // Err only means nobody is subscribed right now
        self.events.send(event).unwrap_or(0)
    }

    pub fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if changed {
            debug!("Realtime connection state: {:?}", next);
        }
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn subscribe(&self, owner_id: &str, handler: EventHandler) -> Subscription {
        // Register the receiver before spawning so no event published after
        // this call is missed
        let mut receiver = self.events.subscribe();
        let owner_id = owner_id.to_string();

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if event.record.owner_id == owner_id {
                            handler(event);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(
                            "Realtime subscription for {} lagged, {} events missed",
                            owner_id, missed
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Subscription { task }
    }

    /// Run the Postgres LISTEN loop in the background, reconnecting after
    /// every connection loss
    pub fn spawn_pg_listener(self: Arc<Self>, pool: PgPool, config: RealtimeConfig) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match connect_listener(&pool, FILE_CHANGES_CHANNEL).await {
                    Ok(mut listener) => {
                        info!(
                            "Realtime listener subscribed to channel '{}'",
                            FILE_CHANGES_CHANNEL
                        );
                        self.set_state(ConnectionState::Connected);
                        self.pump(&mut listener).await;
                    }
                    Err(e) => {
                        warn!(
                            "Failed to connect realtime listener on '{}': {}",
                            FILE_CHANGES_CHANNEL, e
                        );
                    }
                }

                self.set_state(ConnectionState::Disconnected);
                tokio::time::sleep(config.reconnect_delay).await;
            }
        })
    }

    /// Forward notifications until the connection drops
    async fn pump(&self, listener: &mut PgListener) {
        loop {
            match listener.try_recv().await {
                Ok(Some(notification)) => match decode_payload(notification.payload()) {
                    Ok(event) => {
                        debug!("Change event {:?} for file {}", event.kind, event.record.id);
                        self.publish(event);
                    }
                    Err(e) => warn!("Skipping realtime payload: {}", e),
                },
                Ok(None) => {
                    warn!("Realtime listener connection lost");
                    return;
                }
                Err(e) => {
                    warn!("Realtime listener error: {}", e);
                    return;
                }
            }
        }
    }
}

async fn connect_listener(pool: &PgPool, channel: &str) -> Result<PgListener, sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(channel).await?;
    Ok(listener)
}
