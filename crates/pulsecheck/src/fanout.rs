//! Broadcast groups: who receives an event sent "to the session".
//!
//! Each connection registers an outbound channel when it connects. A
//! connection joins the group named by a session code when it creates
//! or joins that session; a broadcast reaches every member of the group
//! at the moment of the call.

use std::collections::{HashMap, HashSet};

use pulsecheck_protocol::{ServerEvent, SessionCode};
use pulsecheck_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel end for delivering events to one connection's writer.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

/// Outbound channels plus the group each connection belongs to.
#[derive(Debug, Default)]
pub struct Fanout {
    outboxes: HashMap<ConnectionId, Outbox>,
    groups: HashMap<SessionCode, HashSet<ConnectionId>>,
    /// Reverse of `groups`: a connection is in at most one group.
    subscriptions: HashMap<ConnectionId, SessionCode>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the channel that delivers events to `conn`.
    pub fn register(&mut self, conn: ConnectionId, outbox: Outbox) {
        self.outboxes.insert(conn, outbox);
    }

    /// Forgets `conn` entirely: its channel and its group membership.
    pub fn unregister(&mut self, conn: ConnectionId) {
        self.outboxes.remove(&conn);
        self.leave(conn);
    }

    /// Puts `conn` in the group for `code`, leaving any previous group.
    pub fn subscribe(&mut self, code: &SessionCode, conn: ConnectionId) {
        if self.subscriptions.get(&conn) == Some(code) {
            return;
        }
        self.leave(conn);
        self.groups.entry(code.clone()).or_default().insert(conn);
        self.subscriptions.insert(conn, code.clone());
    }

    /// Removes `conn` from whatever group it is in.
    pub fn leave(&mut self, conn: ConnectionId) {
        let Some(code) = self.subscriptions.remove(&conn) else {
            return;
        };
        if let Some(members) = self.groups.get_mut(&code) {
            members.remove(&conn);
            if members.is_empty() {
                self.groups.remove(&code);
            }
        }
    }

    /// Removes the whole group for `code`.
    pub fn dissolve(&mut self, code: &SessionCode) {
        if let Some(members) = self.groups.remove(code) {
            for conn in members {
                self.subscriptions.remove(&conn);
            }
        }
    }

    /// Sends an event to a single connection.
    pub fn emit(&self, conn: ConnectionId, event: ServerEvent) {
        self.deliver(conn, event);
    }

    /// Sends an event to every current member of the group. Returns how
    /// many members it was handed to.
    pub fn broadcast(&self, code: &SessionCode, event: &ServerEvent) -> usize {
        let Some(members) = self.groups.get(code) else {
            return 0;
        };
        members
            .iter()
            .filter(|conn| self.deliver(**conn, event.clone()))
            .count()
    }

    #[cfg(test)]
    fn members(&self, code: &SessionCode) -> Vec<ConnectionId> {
        self.groups
            .get(code)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Silently drops the event if the connection's writer is gone; the
    /// disconnect path will clean up after it.
    fn deliver(&self, conn: ConnectionId, event: ServerEvent) -> bool {
        match self.outboxes.get(&conn) {
            Some(outbox) => outbox.send(event).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn connect(fanout: &mut Fanout, id: u64) -> UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        fanout.register(cid(id), tx);
        rx
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_broadcast_reaches_only_group_members() {
        let mut fanout = Fanout::new();
        let code = SessionCode::new("AB23CD");
        let mut a = connect(&mut fanout, 1);
        let mut b = connect(&mut fanout, 2);
        let mut outsider = connect(&mut fanout, 3);
        fanout.subscribe(&code, cid(1));
        fanout.subscribe(&code, cid(2));

        let sent = fanout.broadcast(&code, &ServerEvent::SessionEnded);

        assert_eq!(sent, 2);
        assert_eq!(drain(&mut a), vec![ServerEvent::SessionEnded]);
        assert_eq!(drain(&mut b), vec![ServerEvent::SessionEnded]);
        assert!(drain(&mut outsider).is_empty());
    }

    #[test]
    fn test_broadcast_unknown_group_sends_nothing() {
        let fanout = Fanout::new();
        assert_eq!(
            fanout.broadcast(&SessionCode::new("NONE22"), &ServerEvent::SessionEnded),
            0
        );
    }

    #[test]
    fn test_subscribe_moves_connection_between_groups() {
        let mut fanout = Fanout::new();
        let first = SessionCode::new("AAAAAA");
        let second = SessionCode::new("BBBBBB");
        let _rx = connect(&mut fanout, 1);

        fanout.subscribe(&first, cid(1));
        fanout.subscribe(&second, cid(1));

        assert!(fanout.members(&first).is_empty());
        assert_eq!(fanout.members(&second), vec![cid(1)]);
    }

    #[test]
    fn test_unregister_removes_from_group() {
        let mut fanout = Fanout::new();
        let code = SessionCode::new("AB23CD");
        let _a = connect(&mut fanout, 1);
        let mut b = connect(&mut fanout, 2);
        fanout.subscribe(&code, cid(1));
        fanout.subscribe(&code, cid(2));

        fanout.unregister(cid(1));
        let sent = fanout.broadcast(&code, &ServerEvent::SessionEnded);

        assert_eq!(sent, 1);
        assert_eq!(drain(&mut b).len(), 1);
    }

    #[test]
    fn test_dissolve_clears_group_and_subscriptions() {
        let mut fanout = Fanout::new();
        let code = SessionCode::new("AB23CD");
        let mut a = connect(&mut fanout, 1);
        fanout.subscribe(&code, cid(1));

        fanout.dissolve(&code);

        assert!(fanout.members(&code).is_empty());
        assert_eq!(fanout.broadcast(&code, &ServerEvent::SessionEnded), 0);
        // The connection itself is still reachable directly.
        fanout.emit(cid(1), ServerEvent::SessionEnded);
        assert_eq!(drain(&mut a).len(), 1);
    }

    #[test]
    fn test_emit_to_closed_receiver_is_ignored() {
        let mut fanout = Fanout::new();
        let rx = connect(&mut fanout, 1);
        drop(rx);

        fanout.emit(cid(1), ServerEvent::SessionEnded);
    }
}
