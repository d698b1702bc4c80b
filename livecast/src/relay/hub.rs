use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use api::event::Outbound;

use crate::metrics;

pub type ConnectionId = String;

type Outbox = mpsc::Sender<Arc<Outbound>>;

#[derive(Default)]
struct Rooms {
    connections: HashMap<ConnectionId, Outbox>,
    members: HashMap<Uuid, HashSet<ConnectionId>>,
}

/// Routing table of relay connections and podcast rooms.
///
/// Events are queued on a bounded per-connection outbox; a connection that
/// does not drain its queue loses events instead of stalling the room.
#[derive(Clone)]
pub struct Hub {
    rooms: Arc<RwLock<Rooms>>,
    capacity: usize,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Default::default(),
            capacity,
        }
    }

    pub async fn connect(&self) -> (ConnectionId, mpsc::Receiver<Arc<Outbound>>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4().to_string();
        self.rooms.write().await.connections.insert(id.clone(), tx);
        metrics::CONNECTION.inc();
        debug!("relay connection {} opened", id);
        (id, rx)
    }

    /// Forgets the connection, returns the rooms it was in
    pub async fn disconnect(&self, connection: &str) -> Vec<Uuid> {
        let mut rooms = self.rooms.write().await;
        if rooms.connections.remove(connection).is_some() {
            metrics::CONNECTION.dec();
        }
        let mut left = Vec::new();
        rooms.members.retain(|room, members| {
            if members.remove(connection) {
                left.push(*room);
            }
            !members.is_empty()
        });
        left
    }

    pub async fn join(&self, room: Uuid, connection: &str) {
        self.rooms
            .write()
            .await
            .members
            .entry(room)
            .or_default()
            .insert(connection.to_string());
    }

    pub async fn leave(&self, room: Uuid, connection: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.members.get_mut(&room) {
            members.remove(connection);
            if members.is_empty() {
                rooms.members.remove(&room);
            }
        }
    }

    pub async fn room_size(&self, room: Uuid) -> usize {
        self.rooms
            .read()
            .await
            .members
            .get(&room)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    pub async fn send(&self, connection: &str, event: Outbound) -> bool {
        let event = Arc::new(event);
        match self.rooms.read().await.connections.get(connection) {
            Some(outbox) => deliver(connection, outbox, &event),
            None => false,
        }
    }

    /// Sends to every member of `room` except `except`, returns the number of
    /// connections the event was queued for
    pub async fn emit_room(&self, room: Uuid, event: Outbound, except: Option<&str>) -> usize {
        let event = Arc::new(event);
        let rooms = self.rooms.read().await;
        let members = match rooms.members.get(&room) {
            Some(members) => members,
            None => return 0,
        };
        members
            .iter()
            .filter(|id| Some(id.as_str()) != except)
            .filter_map(|id| rooms.connections.get(id).map(|outbox| (id, outbox)))
            .filter(|(id, outbox)| deliver(id, outbox, &event))
            .count()
    }

    /// Sends to every open connection of the namespace
    pub async fn emit_all(&self, event: Outbound) -> usize {
        let event = Arc::new(event);
        self.rooms
            .read()
            .await
            .connections
            .iter()
            .filter(|(id, outbox)| deliver(id, outbox, &event))
            .count()
    }
}

fn deliver(connection: &str, outbox: &Outbox, event: &Arc<Outbound>) -> bool {
    match outbox.try_send(event.clone()) {
        Ok(_) => true,
        Err(TrySendError::Full(_)) => {
            metrics::DROPPED.inc();
            debug!("relay connection {} is lagging, event dropped", connection);
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::event::{ErrorEvent, SessionStarted};

    fn event(n: i64) -> Outbound {
        Outbound::SessionStarted(SessionStarted {
            session_id: "p".to_string(),
            title: "t".to_string(),
            started_at: n,
        })
    }

    #[tokio::test]
    async fn test_room_fan_out_skips_sender() {
        let hub = Hub::new(8);
        let room = Uuid::new_v4();
        let (a, mut rx_a) = hub.connect().await;
        let (b, mut rx_b) = hub.connect().await;
        let (_c, mut rx_c) = hub.connect().await;
        hub.join(room, &a).await;
        hub.join(room, &b).await;

        assert_eq!(hub.emit_room(room, event(1), Some(&a)).await, 1);
        assert_eq!(*rx_b.recv().await.unwrap(), event(1));
        assert!(rx_a.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());

        assert_eq!(hub.emit_all(event(2)).await, 3);
        assert_eq!(*rx_c.recv().await.unwrap(), event(2));
    }

    #[tokio::test]
    async fn test_slow_connection_drops() {
        let hub = Hub::new(1);
        let room = Uuid::new_v4();
        let (a, mut rx) = hub.connect().await;
        hub.join(room, &a).await;

        assert_eq!(hub.emit_room(room, event(1), None).await, 1);
        assert_eq!(hub.emit_room(room, event(2), None).await, 0);
        assert_eq!(*rx.recv().await.unwrap(), event(1));
        assert!(
            hub.send(
                &a,
                Outbound::Error(ErrorEvent {
                    kind: "x".to_string(),
                    message: "y".to_string()
                })
            )
            .await
        );
    }

    #[tokio::test]
    async fn test_disconnect_leaves_rooms() {
        let hub = Hub::new(4);
        let (r1, r2) = (Uuid::new_v4(), Uuid::new_v4());
        let (a, _rx) = hub.connect().await;
        hub.join(r1, &a).await;
        hub.join(r2, &a).await;
        assert_eq!(hub.room_size(r1).await, 1);

        let mut left = hub.disconnect(&a).await;
        left.sort();
        let mut expected = vec![r1, r2];
        expected.sort();
        assert_eq!(left, expected);
        assert_eq!(hub.room_size(r1).await, 0);
        assert!(!hub.send(&a, event(1)).await);
    }
}
